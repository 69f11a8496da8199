//! # Entity Views
//!
//! A view is one typed record of data attached to an entity. Views are plain
//! structs; they only have to report the entity they belong to.
//!
//! Every stored view lives behind a shared handle so the same instance can sit
//! in its group list, its group index and the global list at once. Engines
//! keep handles and write through them between frames.
//!
//! ## Ancestry Tags
//!
//! Engines subscribe to a [`ViewTag`]. A view type is always reachable through
//! its own tag and, in addition, through every tag listed in
//! [`View::ANCESTRY`]:
//!
//! ```rust,ignore
//! struct Damageable; // marker, never instantiated
//!
//! impl View for HealthView {
//!     const ANCESTRY: &'static [ViewTag] = &[ViewTag::of::<Damageable>()];
//! }
//! ```
//!
//! An engine registered for `Damageable` then hears about every view type
//! carrying that tag.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::entity::EntityId;

/// Shared handle to a stored view of a known type.
pub type SharedView<V> = Arc<RwLock<V>>;

/// Shared handle to a stored view of an erased type.
pub type DynView = Arc<RwLock<dyn EntityView>>;

/// Upcast helper so erased views can be downcast again.
pub trait AsAny {
    /// Returns `self` as [`Any`].
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Object-safe part of a view: what engines see when they are notified.
pub trait EntityView: AsAny + Send + Sync + 'static {
    /// The entity this view belongs to.
    fn entity_id(&self) -> EntityId;
}

impl dyn EntityView {
    /// Attempts to downcast an erased view to its concrete type.
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: EntityView>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Static description of a view type.
pub trait View: EntityView + Sized {
    /// Whether views of this type are indexed by entity id in their group.
    ///
    /// Non-queryable views are only reachable by iteration and never
    /// produce engine notifications.
    const QUERYABLE: bool = true;

    /// Extra tags this view type answers to, nearest first.
    const ANCESTRY: &'static [ViewTag] = &[];
}

/// A view type that can be constructed for a freshly built entity.
pub trait BuildView: View {
    /// Creates the initial view for `id`, optionally reading `implementors`.
    fn build(id: EntityId, implementors: &Implementors) -> Self;
}

/// Identity of a view type or of an ancestry marker.
#[derive(Clone, Copy)]
pub struct ViewTag {
    type_id: fn() -> TypeId,
    name: fn() -> &'static str,
}

impl ViewTag {
    /// Returns the tag for `T`.
    #[inline]
    #[must_use]
    pub const fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>,
            name: std::any::type_name::<T>,
        }
    }

    /// Returns the [`TypeId`] this tag stands for.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Returns the type name, for diagnostics.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        (self.name)()
    }
}

impl PartialEq for ViewTag {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ViewTag {}

impl fmt::Debug for ViewTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewTag").field(&self.name()).finish()
    }
}

/// Opaque data sources handed to [`BuildView::build`].
///
/// The root never looks inside; views pick out what they understand by type.
#[derive(Default)]
pub struct Implementors {
    items: Vec<Box<dyn Any + Send + Sync>>,
}

impl Implementors {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an implementor.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, item: T) -> Self {
        self.items.push(Box::new(item));
        self
    }

    /// Returns the first implementor of type `T`.
    #[must_use]
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.items.iter().find_map(|item| item.downcast_ref::<T>())
    }

    /// Returns the number of implementors.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no implementors.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for Implementors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementors").field("len", &self.items.len()).finish()
    }
}
