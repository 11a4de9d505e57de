//! Error taxonomy for the ECS core.
//!
//! Every variant is a caller contract violation. Nothing here is transient,
//! so nothing is retried.

use crate::entity::Entity;
use crate::pool::PoolHandle;

/// Errors raised by the storage layer and the world built on top of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity was never created, or has already been deleted.
    #[error("unknown entity: {0}")]
    UnknownEntity(Entity),

    /// The component type was never registered with this world.
    #[error("component type '{0}' is not registered")]
    UnregisteredComponent(String),

    /// The entity does not currently carry the component.
    #[error("{entity} has no '{component}' component")]
    ComponentNotPresent {
        /// The entity that was queried.
        entity: Entity,
        /// Name of the missing component type.
        component: String,
    },

    /// A pool handle that is not currently active.
    #[error("pool handle {0:?} is not active")]
    InvalidHandle(PoolHandle),

    /// Every bit of the composition mask is already assigned.
    #[error("cannot register more than {limit} component types")]
    TooManyComponentTypes {
        /// Width of the composition mask in bits.
        limit: u32,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Supplied component values do not fit the component's shape.
    #[error("invalid values for '{component}': {reason}")]
    InvalidValues {
        /// Name of the component type.
        component: String,
        /// What was wrong with the values.
        reason: String,
    },
}

/// Result alias used throughout the ECS crates.
pub type Result<T> = std::result::Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_culprit() {
        let err = EcsError::ComponentNotPresent {
            entity: Entity::from_raw(7),
            component: "Velocity".to_string(),
        };
        assert_eq!(err.to_string(), "Entity(7) has no 'Velocity' component");

        let err = EcsError::UnregisteredComponent("Health".to_string());
        assert_eq!(err.to_string(), "component type 'Health' is not registered");
    }
}
