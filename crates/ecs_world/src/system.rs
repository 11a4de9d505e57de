//! Systems and the ordered schedule that runs them.
//!
//! A system is anything that takes the world and a time delta. Closures and
//! plain functions of shape `FnMut(&mut World, f64)` are systems already.

use tracing::debug;

use crate::world::World;

/// A unit of per-frame logic.
pub trait System {
    /// Name used in logs and for [`Schedule::remove`].
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Run once against `world`. `dt` is the time step in seconds.
    fn run(&mut self, world: &mut World, dt: f64);
}

impl<F> System for F
where
    F: FnMut(&mut World, f64),
{
    fn run(&mut self, world: &mut World, dt: f64) {
        self(world, dt);
    }
}

/// Attaches a fixed name to a system.
struct Named<S> {
    name: String,
    inner: S,
}

impl<S: System> System for Named<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, world: &mut World, dt: f64) {
        self.inner.run(world, dt);
    }
}

/// An ordered list of named systems.
///
/// Systems run in insertion order. Each one sees the mutations of every
/// system before it within the same run.
#[derive(Default)]
pub struct Schedule {
    systems: Vec<Box<dyn System>>,
}

impl Schedule {
    /// An empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `system` under `name`.
    pub fn add(&mut self, name: impl Into<String>, system: impl System + 'static) -> &mut Self {
        let name = name.into();
        debug!(system = name.as_str(), position = self.systems.len(), "system added");
        self.systems.push(Box::new(Named {
            name,
            inner: system,
        }));
        self
    }

    /// Builder form of [`Schedule::add`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, system: impl System + 'static) -> Self {
        self.add(name, system);
        self
    }

    /// Remove the first system called `name`.
    ///
    /// Returns `true` if one was found.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.systems.iter().position(|s| s.name() == name) {
            Some(index) => {
                self.systems.remove(index);
                true
            }
            None => false,
        }
    }

    /// System names in run order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Number of systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if no system is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Run every system once against `world`.
    pub fn run(&mut self, world: &mut World, dt: f64) {
        world.update(dt, &mut self.systems);
    }
}

impl std::fmt::Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field("systems", &self.names())
            .finish()
    }
}
