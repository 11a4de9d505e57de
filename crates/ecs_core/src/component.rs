//! Component types: nominal tokens paired with a default field template.
//!
//! ## Nominal identity
//!
//! A [`ComponentType`] is identified by its [`ComponentTypeId`], minted from a
//! process-wide counter when the type is declared. Two types whose templates
//! happen to share field names are still distinct types, and two worlds
//! registering the same type agree on its identity.
//!
//! ## Shape
//!
//! Component data is a flat map of named JSON fields ([`Fields`]). The
//! template fixes which field names exist; values supplied later may only set
//! fields the template declares.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EcsError, Result};

/// The field map stored in every component slot.
pub type Fields = serde_json::Map<String, Value>;

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique token identifying a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    fn mint() -> Self {
        Self(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
struct Shape {
    name: String,
    defaults: Fields,
}

/// A declared component type.
///
/// Cloning is cheap: clones share the template and compare equal. The
/// template is read-only; every slot receives its own deep copy.
///
/// # Examples
///
/// ```rust
/// use ecs_core::ComponentType;
/// use serde_json::json;
///
/// let position = ComponentType::new("Position", json!({ "x": 0.0, "y": 0.0 })).unwrap();
/// let other = ComponentType::new("Position", json!({ "x": 0.0, "y": 0.0 })).unwrap();
/// assert_ne!(position, other);
/// assert_eq!(position, position.clone());
/// ```
#[derive(Debug, Clone)]
pub struct ComponentType {
    id: ComponentTypeId,
    shape: Arc<Shape>,
}

impl ComponentType {
    /// Declares a new component type with the given default template.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidValues`] if `defaults` is not a JSON object.
    pub fn new(name: impl Into<String>, defaults: Value) -> Result<Self> {
        let name = name.into();
        let defaults = match defaults {
            Value::Object(fields) => fields,
            Value::Null => Fields::new(),
            other => {
                return Err(EcsError::InvalidValues {
                    component: name,
                    reason: format!("template must be an object, got {other}"),
                });
            }
        };
        Ok(Self::from_fields(name, defaults))
    }

    /// Declares a component type from an already-built field map.
    #[must_use]
    pub fn from_fields(name: impl Into<String>, defaults: Fields) -> Self {
        Self {
            id: ComponentTypeId::mint(),
            shape: Arc::new(Shape {
                name: name.into(),
                defaults,
            }),
        }
    }

    /// Declares a data-less marker type.
    #[must_use]
    pub fn tag(name: impl Into<String>) -> Self {
        Self::from_fields(name, Fields::new())
    }

    /// Declares a component type whose template is a serialised Rust value.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidValues`] if `value` does not serialise to a JSON
    /// object.
    pub fn from_value<T: Serialize>(name: impl Into<String>, value: &T) -> Result<Self> {
        let name = name.into();
        let json = serde_json::to_value(value).map_err(|e| EcsError::InvalidValues {
            component: name.clone(),
            reason: e.to_string(),
        })?;
        Self::new(name, json)
    }

    /// The nominal token identifying this type.
    #[must_use]
    pub fn id(&self) -> ComponentTypeId {
        self.id
    }

    /// Name given at declaration; used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shape.name
    }

    /// The registration template.
    #[must_use]
    pub fn defaults(&self) -> &Fields {
        &self.shape.defaults
    }

    /// A fresh deep copy of the template.
    #[must_use]
    pub fn instantiate(&self) -> Fields {
        self.shape.defaults.clone()
    }

    /// Overwrites a recycled slot with a deep copy of the template.
    pub fn reset(&self, slot: &mut Fields) {
        slot.clone_from(&self.shape.defaults);
    }

    /// Checks `values` against the template and returns its fields.
    ///
    /// `None` and `null` both mean "no values". Anything else must be an
    /// object whose keys are all declared by the template.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidValues`] on a non-object or an undeclared field.
    pub fn validate(&self, values: Option<Value>) -> Result<Fields> {
        let fields = match values {
            None | Some(Value::Null) => return Ok(Fields::new()),
            Some(Value::Object(fields)) => fields,
            Some(other) => {
                return Err(self.invalid(format!("expected an object, got {other}")));
            }
        };
        if let Some(unknown) = fields.keys().find(|k| !self.shape.defaults.contains_key(*k)) {
            return Err(self.invalid(format!("no field named '{unknown}'")));
        }
        Ok(fields)
    }

    fn invalid(&self, reason: String) -> EcsError {
        EcsError::InvalidValues {
            component: self.shape.name.clone(),
            reason,
        }
    }
}

/// Assigns every entry of `values` onto `slot`, field by field.
pub fn merge(slot: &mut Fields, values: Fields) {
    for (key, value) in values {
        slot.insert(key, value);
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl std::hash::Hash for ComponentType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
