//! # Typed View Collections
//!
//! Dense, resizable storage for the views of one concrete type.
//!
//! ```text
//! views:  [V7, V2, V9]     <- handles, iterated in bulk
//! ids:    [ 7,  2,  9]     <- parallel entity ids
//! slots:  {7: 0, 2: 1, 9: 2}
//!
//! remove(2):  swap-with-last, pop, patch slot of the moved entry
//! views:  [V7, V9]
//! slots:  {7: 0, 9: 1}
//! ```
//!
//! Compaction and slot patching happen in the same call, so the slot map never
//! points past the live range. Order is not preserved across removals.

use std::any::Any;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::RwLock;

use super::entity::EntityId;
use super::view::{DynView, SharedView, View, ViewTag};
use crate::error::{RootError, RootResult};

/// Ordered collection of views of type `V`, with removal by entity id.
pub struct TypedCollection<V> {
    views: Vec<SharedView<V>>,
    ids: Vec<EntityId>,
    slots: HashMap<EntityId, usize>,
}

impl<V: View> Default for TypedCollection<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: View> TypedCollection<V> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            views: Vec::new(),
            ids: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Creates an empty collection with room for `capacity` views.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            views: Vec::with_capacity(capacity),
            ids: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the number of views.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns `true` if the collection holds no views.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Returns how many views fit before the backing array grows.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.views.capacity()
    }

    /// Reserves room for `additional` more views without changing the length.
    pub fn add_capacity(&mut self, additional: usize) {
        self.views.reserve(additional);
        self.ids.reserve(additional);
        self.slots.reserve(additional);
    }

    /// Returns a new, empty collection of the same type.
    #[must_use]
    pub fn create(&self) -> Self {
        Self::new()
    }

    /// Wraps `view` in a shared handle and appends it.
    pub fn push(&mut self, view: V) -> SharedView<V> {
        let shared = Arc::new(RwLock::new(view));
        self.add(Arc::clone(&shared));
        shared
    }

    /// Appends a view handle.
    ///
    /// The entity must not already have a view here. Debug builds panic on
    /// a duplicate; release builds replace the old handle so the entity
    /// still appears once.
    pub fn add(&mut self, view: SharedView<V>) {
        let id = view.read().entity_id();
        let existing = self.slots.get(&id).copied();
        debug_assert!(existing.is_none(), "entity {id} already present in collection");
        if let Some(slot) = existing {
            self.views[slot] = view;
            return;
        }

        self.slots.insert(id, self.views.len());
        self.views.push(view);
        self.ids.push(id);
    }

    /// Removes the view of entity `id`.
    ///
    /// Returns `true` if the entity was present.
    #[inline]
    pub fn remove_by_identity(&mut self, id: EntityId) -> bool {
        self.take(id).is_some()
    }

    /// Removes the view of entity `id` and hands back its handle.
    pub fn take(&mut self, id: EntityId) -> Option<SharedView<V>> {
        let slot = self.slots.remove(&id)?;
        let view = self.views.swap_remove(slot);
        self.ids.swap_remove(slot);

        // The former last entry now lives in `slot`
        if let Some(&moved) = self.ids.get(slot) {
            self.slots.insert(moved, slot);
        }

        debug_assert_eq!(self.views.len(), self.ids.len());
        Some(view)
    }

    /// Returns `true` if entity `id` has a view here.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Returns the backing array for bulk iteration.
    ///
    /// The slice length is the view count.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[SharedView<V>] {
        &self.views
    }

    /// Returns the entity ids, in the same order as [`Self::as_slice`].
    #[inline]
    #[must_use]
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Iterates over the view handles.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, SharedView<V>> {
        self.views.iter()
    }

    /// Removes every view, keeping the allocation.
    pub fn clear(&mut self) {
        self.views.clear();
        self.ids.clear();
        self.slots.clear();
    }

    #[inline]
    fn slot_of(&self, id: EntityId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    /// Empties the collection into the given targets, keeping the allocation.
    fn drain_to(
        &mut self,
        list: &mut Self,
        mut index: Option<&mut Self>,
        global: &mut Self,
    ) -> Vec<DynView> {
        self.ids.clear();
        self.slots.clear();

        let mut drained: Vec<DynView> = Vec::with_capacity(self.views.len());
        for view in self.views.drain(..) {
            if let Some(index) = index.as_deref_mut() {
                index.add(Arc::clone(&view));
            }
            global.add(Arc::clone(&view));
            list.add(Arc::clone(&view));
            drained.push(view);
        }
        drained
    }
}

/// A [`TypedCollection`] that also answers point lookups by entity id.
///
/// Used for queryable view types inside a group.
pub struct IndexedTypedCollection<V> {
    list: TypedCollection<V>,
}

impl<V: View> Default for IndexedTypedCollection<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: View> IndexedTypedCollection<V> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            list: TypedCollection::new(),
        }
    }

    /// Creates an empty collection with room for `capacity` views.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: TypedCollection::with_capacity(capacity),
        }
    }

    /// Returns a new, empty collection of the same type.
    #[must_use]
    pub fn create(&self) -> Self {
        Self::new()
    }

    /// Returns the view of entity `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&SharedView<V>> {
        self.list.slot_of(id).map(|slot| &self.list.views[slot])
    }
}

impl<V> Deref for IndexedTypedCollection<V> {
    type Target = TypedCollection<V>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl<V> DerefMut for IndexedTypedCollection<V> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.list
    }
}

/// Type-erased interface over [`TypedCollection`] and
/// [`IndexedTypedCollection`], used by the stores.
pub trait ViewCollection: Send + Sync {
    /// The view type stored.
    fn view_type(&self) -> ViewTag;

    /// Whether the stored view type is queryable.
    fn is_queryable(&self) -> bool;

    /// Ancestry tags of the stored view type.
    fn ancestry(&self) -> &'static [ViewTag];

    /// Returns the number of views.
    fn len(&self) -> usize;

    /// Returns `true` if there are no views.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many views fit before the backing array grows.
    fn capacity(&self) -> usize;

    /// Reserves room for `additional` more views.
    fn add_capacity(&mut self, additional: usize);

    /// Returns `true` if entity `id` has a view here.
    fn contains(&self, id: EntityId) -> bool;

    /// Removes the view of entity `id`, returning whether it was present.
    fn remove_by_identity(&mut self, id: EntityId) -> bool;

    /// Removes the view of entity `id` and returns its handle.
    fn take_view(&mut self, id: EntityId) -> Option<DynView>;

    /// Entity ids in storage order.
    fn entity_ids(&self) -> &[EntityId];

    /// Erased handles to every view, in storage order.
    fn views(&self) -> Vec<DynView>;

    /// New empty collection of the same concrete type.
    fn create(&self) -> Box<dyn ViewCollection>;

    /// New empty indexed collection of the same view type.
    fn create_indexed(&self) -> Box<dyn ViewCollection>;

    /// Relocates the view of entity `id` into `to`, keeping the same instance.
    ///
    /// Returns `false` if the entity had no view here.
    ///
    /// # Errors
    ///
    /// [`RootError::ViewTypeMismatch`] if `to` stores another view type. In
    /// that case nothing is moved.
    fn move_view(&mut self, id: EntityId, to: &mut dyn ViewCollection) -> RootResult<bool>;

    /// Drains every view into a live group list, the group index (if any) and
    /// the global list. Returns the drained handles.
    ///
    /// # Errors
    ///
    /// [`RootError::ViewTypeMismatch`] if a target stores another view type.
    /// In that case nothing is drained.
    fn drain_into(
        &mut self,
        list: &mut dyn ViewCollection,
        index: Option<&mut dyn ViewCollection>,
        global: &mut dyn ViewCollection,
    ) -> RootResult<Vec<DynView>>;

    /// Removes every view, keeping the allocation.
    fn clear(&mut self);

    /// Returns `self` as [`Any`].
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` as mutable [`Any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Downcasts an erased collection to the list of `V` it wraps.
fn list_mut<V: View>(collection: &mut dyn ViewCollection) -> RootResult<&mut TypedCollection<V>> {
    let found = collection.view_type();
    if collection.as_any().is::<TypedCollection<V>>() {
        if let Some(list) = collection.as_any_mut().downcast_mut::<TypedCollection<V>>() {
            return Ok(list);
        }
    } else if let Some(indexed) = collection
        .as_any_mut()
        .downcast_mut::<IndexedTypedCollection<V>>()
    {
        return Ok(&mut indexed.list);
    }

    Err(RootError::ViewTypeMismatch {
        expected: std::any::type_name::<V>(),
        found: found.name(),
    })
}

/// Downcasts an erased collection to `TypedCollection<V>`.
///
/// Returns `None` for other view types and for indexed collections.
#[must_use]
pub fn downcast_list<V: View>(collection: &dyn ViewCollection) -> Option<&TypedCollection<V>> {
    collection.as_any().downcast_ref::<TypedCollection<V>>()
}

/// Downcasts an erased collection to `IndexedTypedCollection<V>`.
#[must_use]
pub fn downcast_indexed<V: View>(
    collection: &dyn ViewCollection,
) -> Option<&IndexedTypedCollection<V>> {
    collection.as_any().downcast_ref::<IndexedTypedCollection<V>>()
}

impl<V: View> ViewCollection for TypedCollection<V> {
    fn view_type(&self) -> ViewTag {
        ViewTag::of::<V>()
    }

    fn is_queryable(&self) -> bool {
        V::QUERYABLE
    }

    fn ancestry(&self) -> &'static [ViewTag] {
        V::ANCESTRY
    }

    fn len(&self) -> usize {
        TypedCollection::len(self)
    }

    fn capacity(&self) -> usize {
        TypedCollection::capacity(self)
    }

    fn add_capacity(&mut self, additional: usize) {
        TypedCollection::add_capacity(self, additional);
    }

    fn contains(&self, id: EntityId) -> bool {
        TypedCollection::contains(self, id)
    }

    fn remove_by_identity(&mut self, id: EntityId) -> bool {
        TypedCollection::remove_by_identity(self, id)
    }

    fn take_view(&mut self, id: EntityId) -> Option<DynView> {
        self.take(id).map(|view| view as DynView)
    }

    fn entity_ids(&self) -> &[EntityId] {
        TypedCollection::entity_ids(self)
    }

    fn views(&self) -> Vec<DynView> {
        self.views.iter().map(|view| Arc::clone(view) as DynView).collect()
    }

    fn create(&self) -> Box<dyn ViewCollection> {
        Box::new(TypedCollection::<V>::new())
    }

    fn create_indexed(&self) -> Box<dyn ViewCollection> {
        Box::new(IndexedTypedCollection::<V>::new())
    }

    fn move_view(&mut self, id: EntityId, to: &mut dyn ViewCollection) -> RootResult<bool> {
        let target = list_mut::<V>(to)?;
        match self.take(id) {
            Some(view) => {
                target.add(view);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn drain_into(
        &mut self,
        list: &mut dyn ViewCollection,
        index: Option<&mut dyn ViewCollection>,
        global: &mut dyn ViewCollection,
    ) -> RootResult<Vec<DynView>> {
        let list = list_mut::<V>(list)?;
        let global = list_mut::<V>(global)?;
        let index = match index {
            Some(index) => Some(list_mut::<V>(index)?),
            None => None,
        };
        Ok(self.drain_to(list, index, global))
    }

    fn clear(&mut self) {
        TypedCollection::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<V: View> ViewCollection for IndexedTypedCollection<V> {
    fn view_type(&self) -> ViewTag {
        ViewTag::of::<V>()
    }

    fn is_queryable(&self) -> bool {
        V::QUERYABLE
    }

    fn ancestry(&self) -> &'static [ViewTag] {
        V::ANCESTRY
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn capacity(&self) -> usize {
        self.list.capacity()
    }

    fn add_capacity(&mut self, additional: usize) {
        self.list.add_capacity(additional);
    }

    fn contains(&self, id: EntityId) -> bool {
        self.list.contains(id)
    }

    fn remove_by_identity(&mut self, id: EntityId) -> bool {
        self.list.remove_by_identity(id)
    }

    fn take_view(&mut self, id: EntityId) -> Option<DynView> {
        ViewCollection::take_view(&mut self.list, id)
    }

    fn entity_ids(&self) -> &[EntityId] {
        self.list.entity_ids()
    }

    fn views(&self) -> Vec<DynView> {
        ViewCollection::views(&self.list)
    }

    fn create(&self) -> Box<dyn ViewCollection> {
        Box::new(IndexedTypedCollection::<V>::new())
    }

    fn create_indexed(&self) -> Box<dyn ViewCollection> {
        Box::new(IndexedTypedCollection::<V>::new())
    }

    fn move_view(&mut self, id: EntityId, to: &mut dyn ViewCollection) -> RootResult<bool> {
        ViewCollection::move_view(&mut self.list, id, to)
    }

    fn drain_into(
        &mut self,
        list: &mut dyn ViewCollection,
        index: Option<&mut dyn ViewCollection>,
        global: &mut dyn ViewCollection,
    ) -> RootResult<Vec<DynView>> {
        self.list.drain_into(list, index, global)
    }

    fn clear(&mut self) {
        self.list.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::view::EntityView;

    #[derive(Debug, Clone, PartialEq)]
    struct Hp {
        id: EntityId,
        value: i32,
    }

    impl EntityView for Hp {
        fn entity_id(&self) -> EntityId {
            self.id
        }
    }

    impl View for Hp {}

    #[derive(Debug)]
    struct Trail {
        id: EntityId,
    }

    impl EntityView for Trail {
        fn entity_id(&self) -> EntityId {
            self.id
        }
    }

    impl View for Trail {
        const QUERYABLE: bool = false;
    }

    fn hp(id: u32, value: i32) -> Hp {
        Hp {
            id: EntityId(id),
            value,
        }
    }

    #[test]
    fn test_swap_remove_patches_slots() {
        let mut list = IndexedTypedCollection::<Hp>::new();
        for (i, value) in [(0, 0), (1, 10), (2, 20), (3, 30)] {
            list.push(hp(i, value));
        }

        assert!(list.remove_by_identity(EntityId(1)));
        assert!(!list.remove_by_identity(EntityId(1)));
        assert_eq!(list.len(), 3);

        // Last entry was moved into the hole
        assert_eq!(list.entity_ids(), &[EntityId(0), EntityId(3), EntityId(2)]);
        assert_eq!(list.get(EntityId(3)).unwrap().read().value, 30);
        assert_eq!(list.get(EntityId(2)).unwrap().read().value, 20);
        assert!(list.get(EntityId(1)).is_none());
    }

    #[test]
    fn test_remove_last() {
        let mut list = TypedCollection::<Hp>::new();
        list.push(hp(5, 1));
        assert!(list.remove_by_identity(EntityId(5)));
        assert!(list.is_empty());
        assert!(!list.contains(EntityId(5)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already present")]
    fn test_add_rejects_same_entity() {
        let mut list = TypedCollection::<Hp>::new();
        list.push(hp(1, 1));
        list.push(hp(1, 2));
    }

    #[test]
    fn test_add_capacity_keeps_len() {
        let mut list = TypedCollection::<Hp>::new();
        list.add_capacity(32);
        assert!(list.capacity() >= 32);
        assert_eq!(list.len(), 0);

        let before = list.capacity();
        for i in 0..32 {
            list.push(hp(i, 0));
        }
        assert_eq!(list.capacity(), before);
    }

    #[test]
    fn test_move_keeps_instance() {
        let mut from: Box<dyn ViewCollection> = Box::new(TypedCollection::<Hp>::new());
        let mut to = from.create();

        let handle = from
            .as_any_mut()
            .downcast_mut::<TypedCollection<Hp>>()
            .unwrap()
            .push(hp(9, 99));

        assert!(from.move_view(EntityId(9), to.as_mut()).unwrap());
        assert!(from.is_empty());

        let moved = downcast_list::<Hp>(to.as_ref()).unwrap();
        assert!(Arc::ptr_eq(&moved.as_slice()[0], &handle));
    }

    #[test]
    fn test_move_type_mismatch_moves_nothing() {
        let mut from: Box<dyn ViewCollection> = Box::new(TypedCollection::<Hp>::new());
        let mut to: Box<dyn ViewCollection> = Box::new(TypedCollection::<Trail>::new());
        from.as_any_mut()
            .downcast_mut::<TypedCollection<Hp>>()
            .unwrap()
            .push(hp(1, 1));

        let err = from.move_view(EntityId(1), to.as_mut()).unwrap_err();
        assert!(matches!(err, RootError::ViewTypeMismatch { .. }));
        assert!(from.contains(EntityId(1)));
    }

    #[test]
    fn test_drain_into_targets() {
        let mut pending = TypedCollection::<Hp>::with_capacity(4);
        pending.push(hp(1, 10));
        pending.push(hp(2, 20));
        let capacity = pending.capacity();

        let mut list = pending.create();
        let mut index = IndexedTypedCollection::<Hp>::new();
        let mut global = pending.create();

        let drained = ViewCollection::drain_into(
            &mut pending,
            &mut list,
            Some(&mut index as &mut dyn ViewCollection),
            &mut global,
        )
        .unwrap();

        assert_eq!(drained.len(), 2);
        assert!(pending.is_empty());
        assert_eq!(pending.capacity(), capacity);
        assert_eq!(list.len(), 2);
        assert_eq!(global.len(), 2);
        assert!(Arc::ptr_eq(index.get(EntityId(2)).unwrap(), &list.as_slice()[1]));
    }

    #[test]
    fn test_erased_flags() {
        let hp_list: Box<dyn ViewCollection> = Box::new(TypedCollection::<Hp>::new());
        let mut trails = TypedCollection::<Trail>::new();
        trails.push(Trail { id: EntityId(4) });
        let trail_list: Box<dyn ViewCollection> = Box::new(trails);
        assert!(hp_list.is_queryable());
        assert!(!trail_list.is_queryable());
        assert_eq!(trail_list.entity_ids(), &[EntityId(4)]);
        assert_eq!(hp_list.view_type(), ViewTag::of::<Hp>());
        assert!(downcast_indexed::<Hp>(hp_list.create_indexed().as_ref()).is_some());
    }
}
