//! # Object Pool
//!
//! Free-list backed allocator for values that are attached and detached
//! frequently. Slots are constructed once by a factory and then recycled.

use crate::error::{EcsError, Result};

/// Handle to a slot in an [`ObjectPool`].
///
/// The handle stays valid until it is released. After release the same
/// handle may be issued again for a new occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolHandle(usize);

impl PoolHandle {
    /// Index of the slot inside the pool's backing storage.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A pool of reusable `T` slots.
///
/// Active slots are tracked in a dense list together with a handle to
/// active-index table, so `release` is O(1) via swap-with-last.
///
/// Recycled slots are handed back as-is. The previous occupant's data is
/// still there, so callers must overwrite every field they care about.
///
/// # Example
///
/// ```rust
/// use ecs_core::ObjectPool;
///
/// let mut pool = ObjectPool::new(|| [0.0_f32; 2]);
/// let h = pool.acquire();
/// *pool.get_mut(h).unwrap() = [1.0, 2.0];
/// pool.release(h).unwrap();
///
/// // Same slot, stale contents.
/// let again = pool.acquire();
/// assert_eq!(again, h);
/// assert_eq!(*pool.get(again).unwrap(), [1.0, 2.0]);
/// ```
pub struct ObjectPool<T> {
    factory: Box<dyn Fn() -> T + Send + Sync>,
    /// Every slot ever constructed, active or free.
    slots: Vec<T>,
    /// Indices of free slots; the last entry is reused first.
    free: Vec<usize>,
    /// Dense list of active handles.
    active: Vec<PoolHandle>,
    /// Position of each slot inside `active`, `None` while the slot is free.
    active_index: Vec<Option<usize>>,
}

impl<T> ObjectPool<T> {
    /// Creates an empty pool. Slots are constructed lazily on `acquire`.
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::with_capacity(0, factory)
    }

    /// Creates a pool with `capacity` slots constructed up front.
    pub fn with_capacity(capacity: usize, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        let slots: Vec<T> = (0..capacity).map(|_| factory()).collect();
        Self {
            factory: Box::new(factory),
            slots,
            free: (0..capacity).rev().collect(),
            active: Vec::with_capacity(capacity),
            active_index: vec![None; capacity],
        }
    }

    /// Number of constructed slots, active or free.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently handed out.
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of constructed slots waiting for reuse.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Hands out a slot, recycling a released one when possible.
    ///
    /// Never fails; the pool grows through the factory when the free list is
    /// empty.
    pub fn acquire(&mut self) -> PoolHandle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push((self.factory)());
                self.active_index.push(None);
                self.slots.len() - 1
            }
        };
        self.active_index[index] = Some(self.active.len());
        let handle = PoolHandle(index);
        self.active.push(handle);
        handle
    }

    /// Returns an active slot to the free list.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] if `handle` is not currently active.
    pub fn release(&mut self, handle: PoolHandle) -> Result<()> {
        let position = self
            .active_index
            .get(handle.0)
            .copied()
            .flatten()
            .ok_or(EcsError::InvalidHandle(handle))?;

        self.active.swap_remove(position);
        // The former last element now sits at `position`; patch its back-reference.
        if let Some(moved) = self.active.get(position) {
            self.active_index[moved.0] = Some(position);
        }
        self.active_index[handle.0] = None;
        self.free.push(handle.0);
        Ok(())
    }

    /// Returns `true` if `handle` is currently handed out.
    #[inline]
    #[must_use]
    pub fn is_active(&self, handle: PoolHandle) -> bool {
        matches!(self.active_index.get(handle.0), Some(Some(_)))
    }

    /// Borrows an active slot.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] if `handle` is not currently active.
    pub fn get(&self, handle: PoolHandle) -> Result<&T> {
        if !self.is_active(handle) {
            return Err(EcsError::InvalidHandle(handle));
        }
        Ok(&self.slots[handle.0])
    }

    /// Mutably borrows an active slot.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidHandle`] if `handle` is not currently active.
    pub fn get_mut(&mut self, handle: PoolHandle) -> Result<&mut T> {
        if !self.is_active(handle) {
            return Err(EcsError::InvalidHandle(handle));
        }
        Ok(&mut self.slots[handle.0])
    }

    /// Iterates active slots in dense-list order.
    pub fn active(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.active
            .iter()
            .map(move |&handle| (handle, &self.slots[handle.0]))
    }

    /// Drops free slots at the tail of the backing storage and trims spare
    /// allocation. Handles of active slots are unaffected.
    ///
    /// Returns the number of slots dropped.
    pub fn shrink(&mut self) -> usize {
        let before = self.slots.len();
        while matches!(self.active_index.last(), Some(None)) {
            self.active_index.pop();
            self.slots.pop();
        }
        let len = self.slots.len();
        self.free.retain(|&index| index < len);

        self.slots.shrink_to_fit();
        self.active_index.shrink_to_fit();
        self.free.shrink_to_fit();
        self.active.shrink_to_fit();
        before - len
    }
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("capacity", &self.capacity())
            .field("active", &self.active_count())
            .field("free", &self.free_count())
            .finish()
    }
}
