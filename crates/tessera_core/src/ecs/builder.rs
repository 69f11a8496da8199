//! # Entity View Builders
//!
//! A descriptor is the static recipe for one kind of entity: the ordered list
//! of view types it is made of. Each entry is an [`EntityViewBuilder`] that
//! knows how to allocate, preallocate and relocate views of its type.
//!
//! ```rust,ignore
//! let ship = EntityDescriptor::new("ship")
//!     .with::<PositionView>()
//!     .with::<HealthView>();
//! ```
//!
//! Descriptors are cheap to clone; every entity built from one shares its
//! builder list.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::collection::{IndexedTypedCollection, TypedCollection, ViewCollection};
use super::entity::{EntityId, EntityInfoView};
use super::view::{BuildView, Implementors, ViewTag};
use crate::error::{RootError, RootResult};

/// Knows how to allocate and move views of one concrete type.
pub trait EntityViewBuilder: Send + Sync + fmt::Debug {
    /// The view type this builder produces.
    fn view_type(&self) -> ViewTag;

    /// Whether the view type is queryable.
    fn is_queryable(&self) -> bool;

    /// Ancestry tags of the view type.
    fn ancestry(&self) -> &'static [ViewTag];

    /// New empty list collection for the view type.
    fn create(&self) -> Box<dyn ViewCollection>;

    /// New empty indexed collection for the view type.
    fn create_indexed(&self) -> Box<dyn ViewCollection>;

    /// New empty list collection with room for `size` views.
    fn preallocate(&self, size: usize) -> Box<dyn ViewCollection>;

    /// Builds the view for entity `id` and appends it to `target`.
    ///
    /// # Errors
    ///
    /// [`RootError::ViewTypeMismatch`] if `target` stores another view type.
    fn build_view(
        &self,
        id: EntityId,
        implementors: &Implementors,
        target: &mut dyn ViewCollection,
    ) -> RootResult<()>;

    /// Relocates the view of entity `id` from `from` into `to`.
    ///
    /// Returns `false` if `from` had no view for the entity.
    ///
    /// # Errors
    ///
    /// [`RootError::ViewTypeMismatch`] if either collection stores another
    /// view type.
    fn move_view(
        &self,
        id: EntityId,
        from: &mut dyn ViewCollection,
        to: &mut dyn ViewCollection,
    ) -> RootResult<bool>;
}

/// The [`EntityViewBuilder`] for a view type `V`.
pub struct ViewBuilder<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V: BuildView> ViewBuilder<V> {
    /// Creates the builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V: BuildView> Default for ViewBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for ViewBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewBuilder")
            .field(&std::any::type_name::<V>())
            .finish()
    }
}

impl<V: BuildView> EntityViewBuilder for ViewBuilder<V> {
    fn view_type(&self) -> ViewTag {
        ViewTag::of::<V>()
    }

    fn is_queryable(&self) -> bool {
        V::QUERYABLE
    }

    fn ancestry(&self) -> &'static [ViewTag] {
        V::ANCESTRY
    }

    fn create(&self) -> Box<dyn ViewCollection> {
        Box::new(TypedCollection::<V>::new())
    }

    fn create_indexed(&self) -> Box<dyn ViewCollection> {
        Box::new(IndexedTypedCollection::<V>::new())
    }

    fn preallocate(&self, size: usize) -> Box<dyn ViewCollection> {
        Box::new(TypedCollection::<V>::with_capacity(size))
    }

    fn build_view(
        &self,
        id: EntityId,
        implementors: &Implementors,
        target: &mut dyn ViewCollection,
    ) -> RootResult<()> {
        let found = target.view_type();
        let Some(list) = target.as_any_mut().downcast_mut::<TypedCollection<V>>() else {
            return Err(RootError::ViewTypeMismatch {
                expected: std::any::type_name::<V>(),
                found: found.name(),
            });
        };

        list.push(V::build(id, implementors));
        Ok(())
    }

    fn move_view(
        &self,
        id: EntityId,
        from: &mut dyn ViewCollection,
        to: &mut dyn ViewCollection,
    ) -> RootResult<bool> {
        let found = from.view_type();
        if found != self.view_type() {
            return Err(RootError::ViewTypeMismatch {
                expected: std::any::type_name::<V>(),
                found: found.name(),
            });
        }
        from.move_view(id, to)
    }
}

/// Ordered list of view builders describing one kind of entity.
#[derive(Clone)]
pub struct EntityDescriptor {
    name: &'static str,
    builders: Arc<[Arc<dyn EntityViewBuilder>]>,
}

impl EntityDescriptor {
    /// Creates a descriptor with no views yet.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            builders: Arc::from(Vec::new()),
        }
    }

    /// Appends the view type `V`.
    #[must_use]
    pub fn with<V: BuildView>(self) -> Self {
        self.with_builder(Arc::new(ViewBuilder::<V>::new()))
    }

    /// Appends a custom builder.
    #[must_use]
    pub fn with_builder(self, builder: Arc<dyn EntityViewBuilder>) -> Self {
        let mut builders = self.builders.to_vec();
        builders.push(builder);
        Self {
            name: self.name,
            builders: Arc::from(builders),
        }
    }

    /// Returns the descriptor name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the builders, in declaration order.
    #[inline]
    #[must_use]
    pub fn builders(&self) -> &[Arc<dyn EntityViewBuilder>] {
        &self.builders
    }

    /// Iterates over the declared view types.
    pub fn view_types(&self) -> impl Iterator<Item = ViewTag> + '_ {
        self.builders.iter().map(|builder| builder.view_type())
    }

    /// Checks that the descriptor can build entities.
    ///
    /// # Errors
    ///
    /// - [`RootError::EmptyDescriptor`] if no views are declared
    /// - [`RootError::DuplicateViewType`] if a view type appears twice, or
    ///   if [`EntityInfoView`] is declared explicitly
    pub fn validate(&self) -> RootResult<()> {
        if self.builders.is_empty() {
            return Err(RootError::EmptyDescriptor(self.name));
        }

        let mut seen = HashSet::with_capacity(self.builders.len() + 1);
        seen.insert(ViewTag::of::<EntityInfoView>().id());
        for tag in self.view_types() {
            if !seen.insert(tag.id()) {
                return Err(RootError::DuplicateViewType {
                    descriptor: self.name,
                    view: tag.name(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("views", &self.builders.len())
            .finish()
    }
}
