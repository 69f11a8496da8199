//! # Root Error Types
//!
//! All errors that can occur while mutating the entity stores.
//!
//! Every variant is a precondition violation: the operation that returns it
//! has not touched any index.

use thiserror::Error;

use crate::ecs::{EntityId, GroupId};

/// Errors that can occur in the engine root.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RootError {
    /// A swap named the same group as source and destination.
    #[error("can't move entity {entity} to group {group}, it already belongs to it")]
    SameGroupSwap {
        /// The entity being swapped.
        entity: EntityId,
        /// The group named twice.
        group: GroupId,
    },

    /// The entity has no `EntityInfoView` in the group.
    #[error("entity {entity} not found in group {group}")]
    EntityNotFound {
        /// The missing entity.
        entity: EntityId,
        /// The group that was searched.
        group: GroupId,
    },

    /// The group has no live entry.
    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    /// The entity id is already pending or live, in any group.
    #[error("can't build entity {entity} in group {group}, the id is already in use")]
    DuplicateEntity {
        /// The duplicated entity.
        entity: EntityId,
        /// The target group.
        group: GroupId,
    },

    /// A descriptor with no builders was used.
    #[error("entity descriptor `{0}` declares no entity views")]
    EmptyDescriptor(&'static str),

    /// A descriptor declared the same view type twice.
    #[error("entity descriptor `{descriptor}` declares view `{view}` more than once")]
    DuplicateViewType {
        /// The descriptor name.
        descriptor: &'static str,
        /// The repeated view type.
        view: &'static str,
    },

    /// A type-erased collection did not hold the expected view type.
    #[error("collection holds `{found}`, expected `{expected}`")]
    ViewTypeMismatch {
        /// The type the caller expected.
        expected: &'static str,
        /// The type the collection actually stores.
        found: &'static str,
    },

    /// A factory or functions handle outlived its root.
    #[error("engines root unavailable")]
    RootUnavailable,

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for root operations.
pub type RootResult<T> = Result<T, RootError>;
