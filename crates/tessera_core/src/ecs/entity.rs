//! # Entity Identity
//!
//! Entities are plain integer identifiers. Their structure lives in the
//! [`EntityInfoView`] stored next to their component views:
//! - The entity id
//! - The group the entity currently belongs to
//! - The descriptor listing its component view types

use std::fmt;

use serde::Deserialize;

use super::builder::EntityDescriptor;
use super::view::{EntityView, View};

/// Unique identifier for an entity.
///
/// Unique among live entities at any instant. An id may be reused once the
/// entity holding it has been removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EntityId {
    #[inline]
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Identifier of a logical group of entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct GroupId(pub u32);

impl GroupId {
    /// Group used when an entity is built without naming one.
    pub const STANDARD: Self = Self(0);
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GroupId {
    #[inline]
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Bookkeeping view every entity carries.
///
/// Built by the root alongside the descriptor's own views and removed
/// together with them. Engines may subscribe to it like any other
/// queryable view.
#[derive(Clone, Debug)]
pub struct EntityInfoView {
    id: EntityId,
    group: GroupId,
    descriptor: EntityDescriptor,
}

impl EntityInfoView {
    /// Creates the info view for an entity about to be built.
    #[must_use]
    pub fn new(id: EntityId, group: GroupId, descriptor: EntityDescriptor) -> Self {
        Self {
            id,
            group,
            descriptor,
        }
    }

    /// Returns the group the entity currently belongs to.
    #[inline]
    #[must_use]
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Returns the descriptor the entity was built from.
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    #[inline]
    pub(crate) fn set_group(&mut self, group: GroupId) {
        self.group = group;
    }
}

impl EntityView for EntityInfoView {
    #[inline]
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl View for EntityInfoView {}
