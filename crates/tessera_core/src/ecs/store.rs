//! # Group and Global Stores
//!
//! ```text
//! GroupStore:   group ──► { view type ──► list }       all view types
//!                         { view type ──► indexed }    queryable types only
//! GlobalStore:  view type ──► list                     every group merged
//! ```
//!
//! The same view handle sits in every structure that lists it, so a write
//! through any of them is seen by all.

use std::any::TypeId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::collection::{downcast_indexed, downcast_list, IndexedTypedCollection, TypedCollection, ViewCollection};
use super::entity::{EntityId, GroupId};
use super::view::{DynView, View, ViewTag};

/// Erased collections keyed by view type.
pub type CollectionMap = HashMap<TypeId, Box<dyn ViewCollection>>;

/// Reserves `additional` slots in the collection for `tag`, creating it
/// with `make` if the map has none yet.
pub(crate) fn reserve_in(
    map: &mut CollectionMap,
    tag: ViewTag,
    additional: usize,
    make: impl FnOnce() -> Box<dyn ViewCollection>,
) {
    match map.entry(tag.id()) {
        Entry::Occupied(entry) => entry.into_mut().add_capacity(additional),
        Entry::Vacant(entry) => {
            let mut collection = make();
            collection.add_capacity(additional);
            entry.insert(collection);
        }
    }
}

/// A view taken out of the stores, kept alive for notification.
pub struct RemovedView {
    /// The view handle, no longer reachable through any index.
    pub view: DynView,
    /// The concrete view type.
    pub view_type: ViewTag,
    /// The view type's ancestry tags.
    pub ancestry: &'static [ViewTag],
}

/// The collections of one group.
#[derive(Default)]
pub struct GroupViews {
    lists: CollectionMap,
    indexed: CollectionMap,
}

impl GroupViews {
    /// Returns the list collection for `tag`.
    #[must_use]
    pub fn list(&self, tag: ViewTag) -> Option<&dyn ViewCollection> {
        self.lists.get(&tag.id()).map(AsRef::as_ref)
    }

    /// Returns the indexed collection for `tag`.
    #[must_use]
    pub fn indexed(&self, tag: ViewTag) -> Option<&dyn ViewCollection> {
        self.indexed.get(&tag.id()).map(AsRef::as_ref)
    }

    /// Iterates over every list collection.
    pub fn lists(&self) -> impl Iterator<Item = &dyn ViewCollection> + '_ {
        self.lists.values().map(AsRef::as_ref)
    }

    /// Iterates over every indexed collection.
    pub fn indexed_collections(&self) -> impl Iterator<Item = &dyn ViewCollection> + '_ {
        self.indexed.values().map(AsRef::as_ref)
    }

    /// Returns `true` if the group holds no views at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.values().all(|list| list.is_empty())
    }

    /// Every (view type, entity) pair listed in the group.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ViewTag, EntityId)> {
        let mut pairs = Vec::with_capacity(self.lists.values().map(|list| list.len()).sum());
        for list in self.lists.values() {
            let tag = list.view_type();
            pairs.extend(list.entity_ids().iter().map(|&id| (tag, id)));
        }
        pairs
    }

    pub(crate) fn lists_mut(&mut self) -> &mut CollectionMap {
        &mut self.lists
    }

    pub(crate) fn indexed_mut(&mut self) -> &mut CollectionMap {
        &mut self.indexed
    }

    /// Lists and indexed collections at once.
    pub(crate) fn split_mut(&mut self) -> (&mut CollectionMap, &mut CollectionMap) {
        (&mut self.lists, &mut self.indexed)
    }

    /// Moves the views of one type for entity `id` into `dest`.
    ///
    /// Destination collections are created from the source ones when
    /// missing. `mover` performs the actual relocation.
    pub(crate) fn move_entity_view<F>(
        &mut self,
        dest: &mut GroupViews,
        tag: ViewTag,
        mut mover: F,
    ) -> crate::RootResult<bool>
    where
        F: FnMut(&mut dyn ViewCollection, &mut dyn ViewCollection) -> crate::RootResult<bool>,
    {
        let mut moved = false;

        if let Some(from) = self.lists.get_mut(&tag.id()) {
            let to = dest.lists.entry(tag.id()).or_insert_with(|| from.create());
            moved |= mover(from.as_mut(), to.as_mut())?;
        }

        if let Some(from) = self.indexed.get_mut(&tag.id()) {
            let to = dest.indexed.entry(tag.id()).or_insert_with(|| from.create());
            moved |= mover(from.as_mut(), to.as_mut())?;
        }

        Ok(moved)
    }

    fn clear(&mut self) {
        for list in self.lists.values_mut() {
            list.clear();
        }
        for index in self.indexed.values_mut() {
            index.clear();
        }
    }
}

/// Per-group partition of all entity views.
#[derive(Default)]
pub struct GroupStore {
    groups: HashMap<GroupId, GroupViews>,
}

impl GroupStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collections of `group`.
    #[inline]
    #[must_use]
    pub fn group(&self, group: GroupId) -> Option<&GroupViews> {
        self.groups.get(&group)
    }

    /// Returns `true` if `group` has an entry.
    #[inline]
    #[must_use]
    pub fn contains_group(&self, group: GroupId) -> bool {
        self.groups.contains_key(&group)
    }

    /// Iterates over every group.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &GroupViews)> + '_ {
        self.groups.iter().map(|(id, views)| (*id, views))
    }

    /// Returns the number of groups.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if there are no groups.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns `true` if entity `id` is listed under `tag` in `group`.
    #[must_use]
    pub fn contains(&self, group: GroupId, tag: ViewTag, id: EntityId) -> bool {
        self.group(group)
            .and_then(|views| views.list(tag))
            .is_some_and(|list| list.contains(id))
    }

    /// Returns the group listing entity `id` under `tag`, if any.
    #[must_use]
    pub fn group_of(&self, tag: ViewTag, id: EntityId) -> Option<GroupId> {
        self.iter()
            .find(|(_, views)| views.list(tag).is_some_and(|list| list.contains(id)))
            .map(|(group, _)| group)
    }

    /// Returns the list of `V` in `group`.
    #[must_use]
    pub fn list<V: View>(&self, group: GroupId) -> Option<&TypedCollection<V>> {
        self.group(group)
            .and_then(|views| views.list(ViewTag::of::<V>()))
            .and_then(downcast_list::<V>)
    }

    /// Returns the indexed collection of `V` in `group`.
    #[must_use]
    pub fn indexed<V: View>(&self, group: GroupId) -> Option<&IndexedTypedCollection<V>> {
        self.group(group)
            .and_then(|views| views.indexed(ViewTag::of::<V>()))
            .and_then(downcast_indexed::<V>)
    }

    pub(crate) fn group_mut(&mut self, group: GroupId) -> &mut GroupViews {
        self.groups.entry(group).or_default()
    }

    pub(crate) fn take_group(&mut self, group: GroupId) -> Option<GroupViews> {
        self.groups.remove(&group)
    }

    /// Borrows two distinct groups at once, creating `second` if missing.
    ///
    /// Returns `None` if the groups are the same or `first` has no entry.
    pub(crate) fn pair_mut(
        &mut self,
        first: GroupId,
        second: GroupId,
    ) -> Option<(&mut GroupViews, &mut GroupViews)> {
        if first == second || !self.groups.contains_key(&first) {
            return None;
        }
        self.groups.entry(second).or_default();

        let (mut a, mut b) = (None, None);
        for (id, views) in &mut self.groups {
            if *id == first {
                a = Some(views);
            } else if *id == second {
                b = Some(views);
            }
        }
        a.zip(b)
    }

    pub(crate) fn groups_mut(&mut self) -> impl Iterator<Item = (GroupId, &mut GroupViews)> + '_ {
        self.groups.iter_mut().map(|(id, views)| (*id, views))
    }

    /// Empties every collection, keeping groups and allocations.
    pub(crate) fn clear_views(&mut self) {
        for views in self.groups.values_mut() {
            views.clear();
        }
    }

    /// Drops every group.
    pub(crate) fn clear(&mut self) {
        self.groups.clear();
    }

    /// Removes the `tag` view of entity `id` from `group` and from `global`.
    ///
    /// Collections left empty are dropped from their maps. For queryable
    /// types the indexed view is fetched before anything is removed and
    /// returned once it is gone from every index.
    pub fn remove_entity_view(
        &mut self,
        global: &mut GlobalStore,
        tag: ViewTag,
        id: EntityId,
        group: GroupId,
    ) -> Option<RemovedView> {
        let views = self.groups.get_mut(&group)?;
        let key = tag.id();

        let mut removed = None;
        if let Some(index) = views.indexed.get_mut(&key) {
            removed = index.take_view(id).map(|view| RemovedView {
                view,
                view_type: index.view_type(),
                ancestry: index.ancestry(),
            });
            if index.is_empty() {
                views.indexed.remove(&key);
            }
        }

        if let Some(list) = views.lists.get_mut(&key) {
            let found = list.remove_by_identity(id);
            debug_assert!(found, "entity {id} missing from group {group} list");
            if list.is_empty() {
                views.lists.remove(&key);
            }
        }

        global.remove(tag, id);
        removed
    }
}

/// Every view of a type, across all groups.
#[derive(Default)]
pub struct GlobalStore {
    lists: CollectionMap,
}

impl GlobalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the erased collection for `tag`.
    #[must_use]
    pub fn collection(&self, tag: ViewTag) -> Option<&dyn ViewCollection> {
        self.lists.get(&tag.id()).map(AsRef::as_ref)
    }

    /// Returns the list of `V`.
    #[must_use]
    pub fn list<V: View>(&self) -> Option<&TypedCollection<V>> {
        self.collection(ViewTag::of::<V>()).and_then(downcast_list::<V>)
    }

    /// Iterates over every collection.
    pub fn iter(&self) -> impl Iterator<Item = &dyn ViewCollection> + '_ {
        self.lists.values().map(AsRef::as_ref)
    }

    /// Removes entity `id` from the `tag` list, dropping the list if it
    /// becomes empty.
    pub fn remove(&mut self, tag: ViewTag, id: EntityId) -> bool {
        let key = tag.id();
        let Some(list) = self.lists.get_mut(&key) else {
            return false;
        };

        let found = list.remove_by_identity(id);
        if list.is_empty() {
            self.lists.remove(&key);
        }
        found
    }

    pub(crate) fn lists_mut(&mut self) -> &mut CollectionMap {
        &mut self.lists
    }

    pub(crate) fn clear(&mut self) {
        self.lists.clear();
    }
}
