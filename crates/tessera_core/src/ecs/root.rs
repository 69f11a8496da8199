//! # Engine Root Core
//!
//! Owns the stores and drives the notifier.
//!
//! ```text
//!  build_entity_in_group ──► pending (current arena)
//!                                 │
//!  submit_entity_views ───────────┘ swap, drain ──► GroupStore + GlobalStore
//!                                                        │  add callbacks
//!  remove_entity / remove_group_and_entities ────────────┤  remove callbacks
//!  swap_entity_group ────────────────────────────────────┘  (silent)
//! ```
//!
//! Every operation checks its preconditions before touching an index. A
//! returned error means nothing changed.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::builder::EntityDescriptor;
use super::collection::{IndexedTypedCollection, TypedCollection, ViewCollection};
use super::entity::{EntityId, EntityInfoView, GroupId};
use super::notifier::EngineNotifier;
use super::store::{reserve_in, GlobalStore, GroupStore, GroupViews, RemovedView};
use super::view::{DynView, Implementors, SharedView, View, ViewTag};
use crate::config::RootConfig;
use crate::error::{RootError, RootResult};
use crate::sync::DoubleBuffer;

/// Tag of the bookkeeping view every entity carries.
const INFO: ViewTag = ViewTag::of::<EntityInfoView>();

/// Counts returned by [`EngineRootCore::submit_entity_views`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmitStats {
    /// Entities made visible.
    pub entities: usize,
    /// Views made visible, `EntityInfoView`s included.
    pub views: usize,
}

/// The entity storage core.
///
/// # Example
///
/// ```rust,ignore
/// let mut root = EngineRootCore::new(RootConfig::default());
/// let ship = EntityDescriptor::new("ship").with::<HealthView>();
///
/// root.build_entity_in_group(EntityId(1), GroupId(3), &ship, &Implementors::new())?;
/// root.submit_entity_views()?;
///
/// let hp = root.query_entity_view::<HealthView>(EntityId(1), GroupId(3));
/// ```
pub struct EngineRootCore {
    config: RootConfig,
    groups: GroupStore,
    global: GlobalStore,
    pending: DoubleBuffer<GroupStore>,
    notifier: Arc<EngineNotifier>,
}

impl Default for EngineRootCore {
    fn default() -> Self {
        Self::new(RootConfig::default())
    }
}

impl EngineRootCore {
    /// Creates an empty root with its own notifier.
    #[must_use]
    pub fn new(config: RootConfig) -> Self {
        Self::with_notifier(config, Arc::new(EngineNotifier::new()))
    }

    /// Creates an empty root that reports to an existing notifier.
    #[must_use]
    pub fn with_notifier(config: RootConfig, notifier: Arc<EngineNotifier>) -> Self {
        Self {
            config,
            groups: GroupStore::new(),
            global: GlobalStore::new(),
            pending: DoubleBuffer::default(),
            notifier,
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RootConfig {
        &self.config
    }

    /// Returns the notifier engines subscribe to.
    #[inline]
    #[must_use]
    pub fn notifier(&self) -> &Arc<EngineNotifier> {
        &self.notifier
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Builds an entity in the configured standard group.
    ///
    /// # Errors
    ///
    /// See [`Self::build_entity_in_group`].
    pub fn build_entity(
        &mut self,
        id: EntityId,
        descriptor: &EntityDescriptor,
        implementors: &Implementors,
    ) -> RootResult<()> {
        let group = self.config.standard_group;
        self.build_entity_in_group(id, group, descriptor, implementors)
    }

    /// Builds an entity into the pending buffer of `group`.
    ///
    /// The entity stays invisible to queries and engines until the next
    /// [`Self::submit_entity_views`].
    ///
    /// # Errors
    ///
    /// - [`RootError::EmptyDescriptor`] / [`RootError::DuplicateViewType`]
    ///   for a malformed descriptor
    /// - [`RootError::DuplicateEntity`] if `id` is already pending or live,
    ///   in any group
    pub fn build_entity_in_group(
        &mut self,
        id: EntityId,
        group: GroupId,
        descriptor: &EntityDescriptor,
        implementors: &Implementors,
    ) -> RootResult<()> {
        descriptor.validate()?;

        // Ids are unique across groups, pending and live alike
        let duplicate = self.pending.current().group_of(INFO, id).is_some()
            || self.global.collection(INFO).is_some_and(|live| live.contains(id));
        if duplicate {
            return Err(RootError::DuplicateEntity { entity: id, group });
        }

        let capacity = self.config.initial_capacity;
        let lists = self.pending.current_mut().group_mut(group).lists_mut();

        for builder in descriptor.builders() {
            let target = lists.entry(builder.view_type().id()).or_insert_with(|| {
                let mut list = builder.create();
                list.add_capacity(capacity);
                list
            });
            builder.build_view(id, implementors, target.as_mut())?;
        }

        let info = lists
            .entry(INFO.id())
            .or_insert_with(|| Box::new(TypedCollection::<EntityInfoView>::with_capacity(capacity)));
        let found = info.view_type();
        let Some(info) = info
            .as_any_mut()
            .downcast_mut::<TypedCollection<EntityInfoView>>()
        else {
            return Err(RootError::ViewTypeMismatch {
                expected: INFO.name(),
                found: found.name(),
            });
        };
        info.push(EntityInfoView::new(id, group, descriptor.clone()));

        trace!(entity = %id, group = %group, descriptor = descriptor.name(), "entity pending");
        Ok(())
    }

    /// Moves everything built since the last submission into the live stores.
    ///
    /// Engines receive `add` callbacks for every queryable view once all of
    /// them are in place.
    ///
    /// # Errors
    ///
    /// [`RootError::ViewTypeMismatch`] if a pending collection does not match
    /// the live collection registered for its type.
    pub fn submit_entity_views(&mut self) -> RootResult<SubmitStats> {
        self.pending.swap();

        let mut stats = SubmitStats::default();
        let mut added: Vec<(ViewTag, &'static [ViewTag], Vec<DynView>)> = Vec::new();

        for (group, pending) in self.pending.other_mut().groups_mut() {
            if pending.is_empty() {
                continue;
            }

            let (live_lists, live_indexed) = self.groups.group_mut(group).split_mut();
            for (key, pending_list) in pending.lists_mut().iter_mut() {
                if pending_list.is_empty() {
                    continue;
                }

                let list = live_lists
                    .entry(*key)
                    .or_insert_with(|| pending_list.create());
                let global = self
                    .global
                    .lists_mut()
                    .entry(*key)
                    .or_insert_with(|| pending_list.create());

                let views = if pending_list.is_queryable() {
                    let index = live_indexed
                        .entry(*key)
                        .or_insert_with(|| pending_list.create_indexed());
                    pending_list.drain_into(list.as_mut(), Some(index.as_mut()), global.as_mut())?
                } else {
                    pending_list.drain_into(list.as_mut(), None, global.as_mut())?
                };

                stats.views += views.len();
                if pending_list.view_type() == INFO {
                    stats.entities += views.len();
                }
                if pending_list.is_queryable() {
                    added.push((pending_list.view_type(), pending_list.ancestry(), views));
                }
            }
        }

        for (view_type, ancestry, views) in added {
            for view in views {
                self.notifier
                    .notify_added_chain(view_type, ancestry, &*view.read());
            }
        }

        if stats.entities > 0 {
            debug!(entities = stats.entities, views = stats.views, "entity views submitted");
        }
        Ok(stats)
    }

    // =========================================================================
    // Preallocate
    // =========================================================================

    /// Reserves room for `size` more entities of `descriptor` in `group`.
    ///
    /// Collections are created where missing in the live group, both pending
    /// arenas and the global store. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// [`RootError::EmptyDescriptor`] / [`RootError::DuplicateViewType`] for a
    /// malformed descriptor.
    pub fn preallocate(
        &mut self,
        group: GroupId,
        size: usize,
        descriptor: &EntityDescriptor,
    ) -> RootResult<()> {
        descriptor.validate()?;

        let (current, other) = self.pending.both_mut();
        let live = self.groups.group_mut(group);

        for builder in descriptor.builders() {
            let tag = builder.view_type();
            reserve_in(self.global.lists_mut(), tag, size, || builder.create());
            reserve_in(live.lists_mut(), tag, size, || builder.create());
            if builder.is_queryable() {
                reserve_in(live.indexed_mut(), tag, size, || builder.create_indexed());
            }
            for arena in [&mut *current, &mut *other] {
                reserve_in(arena.group_mut(group).lists_mut(), tag, size, || builder.create());
            }
        }

        let info_list = || -> Box<dyn ViewCollection> { Box::new(TypedCollection::<EntityInfoView>::new()) };
        reserve_in(self.global.lists_mut(), INFO, size, info_list);
        reserve_in(live.lists_mut(), INFO, size, info_list);
        reserve_in(live.indexed_mut(), INFO, size, || {
            Box::new(IndexedTypedCollection::<EntityInfoView>::new())
        });
        for arena in [current, other] {
            reserve_in(arena.group_mut(group).lists_mut(), INFO, size, info_list);
        }

        debug!(group = %group, size, descriptor = descriptor.name(), "preallocated");
        Ok(())
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Removes entity `id` from `group` and notifies subscribed engines.
    ///
    /// Returns the number of removal callbacks made.
    ///
    /// # Errors
    ///
    /// - [`RootError::GroupNotFound`] if the group has no live entry
    /// - [`RootError::EntityNotFound`] if the entity is not live in it
    pub fn remove_entity(&mut self, id: EntityId, group: GroupId) -> RootResult<usize> {
        if !self.groups.contains_group(group) {
            return Err(RootError::GroupNotFound(group));
        }
        let descriptor = self
            .query_entity_info(id, group)
            .map(|info| info.read().descriptor().clone())
            .ok_or(RootError::EntityNotFound { entity: id, group })?;

        let mut notified = 0;
        for tag in descriptor.view_types().chain(std::iter::once(INFO)) {
            notified += self.remove_view_and_notify(tag, id, group);
        }

        debug!(entity = %id, group = %group, notified, "entity removed");
        Ok(notified)
    }

    /// Removes every entity of `group`, then the group itself.
    ///
    /// Returns the number of removal callbacks made.
    ///
    /// # Errors
    ///
    /// [`RootError::GroupNotFound`] if the group has no live entry.
    pub fn remove_group_and_entities(&mut self, group: GroupId) -> RootResult<usize> {
        let snapshot = self
            .groups
            .group(group)
            .map(GroupViews::snapshot)
            .ok_or(RootError::GroupNotFound(group))?;

        let mut notified = 0;
        for &(tag, id) in &snapshot {
            notified += self.remove_view_and_notify(tag, id, group);
        }
        self.groups.take_group(group);

        debug!(group = %group, views = snapshot.len(), notified, "group removed");
        Ok(notified)
    }

    fn remove_view_and_notify(&mut self, tag: ViewTag, id: EntityId, group: GroupId) -> usize {
        let Some(RemovedView {
            view,
            view_type,
            ancestry,
        }) = self
            .groups
            .remove_entity_view(&mut self.global, tag, id, group)
        else {
            return 0;
        };

        let guard = view.read();
        self.notifier.notify_removal_chain(view_type, ancestry, &*guard)
    }

    // =========================================================================
    // Swap
    // =========================================================================

    /// Moves entity `id` from group `from` to group `to`.
    ///
    /// The same view instances move; their contents are untouched and no
    /// engine is notified.
    ///
    /// # Errors
    ///
    /// - [`RootError::SameGroupSwap`] if `from == to`
    /// - [`RootError::EntityNotFound`] if the entity is not live in `from`
    pub fn swap_entity_group(&mut self, id: EntityId, from: GroupId, to: GroupId) -> RootResult<()> {
        if from == to {
            return Err(RootError::SameGroupSwap {
                entity: id,
                group: from,
            });
        }

        let info = self
            .query_entity_info(id, from)
            .map(Arc::clone)
            .ok_or(RootError::EntityNotFound { entity: id, group: from })?;
        let descriptor = info.read().descriptor().clone();

        let Some((source, dest)) = self.groups.pair_mut(from, to) else {
            return Err(RootError::GroupNotFound(from));
        };

        for builder in descriptor.builders() {
            source.move_entity_view(dest, builder.view_type(), |src, dst| {
                builder.move_view(id, src, dst)
            })?;
            trace!(entity = %id, view = builder.view_type().name(), "view moved");
        }
        source.move_entity_view(dest, INFO, |src, dst| src.move_view(id, dst))?;

        info.write().set_group(to);
        debug!(entity = %id, from = %from, to = %to, "entity swapped");
        Ok(())
    }

    // =========================================================================
    // Dispose
    // =========================================================================

    /// Announces the removal of every live queryable view, then empties all
    /// stores and both pending arenas.
    ///
    /// Returns the number of removal callbacks made.
    pub fn dispose(&mut self) -> usize {
        let mut notified = 0;
        for collection in self.global.iter() {
            if !collection.is_queryable() {
                continue;
            }
            let view_type = collection.view_type();
            let ancestry = collection.ancestry();
            for view in collection.views() {
                notified += self
                    .notifier
                    .notify_removal_chain(view_type, ancestry, &*view.read());
            }
        }

        let pending: usize = self
            .pending
            .current()
            .iter()
            .chain(self.pending.other().iter())
            .filter_map(|(_, views)| views.list(INFO))
            .map(|list| list.len())
            .sum();
        if pending > 0 {
            warn!(pending, "disposing with unsubmitted entities");
        }

        self.groups.clear();
        self.global.clear();
        let (current, other) = self.pending.both_mut();
        current.clear_views();
        other.clear_views();

        debug!(notified, "root disposed");
        notified
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns the view of type `V` of entity `id` in `group`.
    ///
    /// `None` if the group, the type or the entity is absent, or if `V` is
    /// not queryable.
    #[must_use]
    pub fn query_entity_view<V: View>(&self, id: EntityId, group: GroupId) -> Option<&SharedView<V>> {
        self.groups.indexed::<V>(group)?.get(id)
    }

    /// Returns every view of type `V` in `group`; empty if there are none.
    #[must_use]
    pub fn query_group_views<V: View>(&self, group: GroupId) -> &[SharedView<V>] {
        self.groups
            .list::<V>(group)
            .map(TypedCollection::as_slice)
            .unwrap_or_default()
    }

    /// Returns every view of type `V` across all groups; empty if there are
    /// none.
    #[must_use]
    pub fn query_views<V: View>(&self) -> &[SharedView<V>] {
        self.global
            .list::<V>()
            .map(TypedCollection::as_slice)
            .unwrap_or_default()
    }

    /// Returns the bookkeeping view of entity `id` in `group`.
    #[must_use]
    pub fn query_entity_info(&self, id: EntityId, group: GroupId) -> Option<&SharedView<EntityInfoView>> {
        self.query_entity_view::<EntityInfoView>(id, group)
    }

    /// Returns `true` if `group` has a live entry.
    #[inline]
    #[must_use]
    pub fn has_group(&self, group: GroupId) -> bool {
        self.groups.contains_group(group)
    }

    /// Returns the ids of every live group, in ascending order.
    #[must_use]
    pub fn group_ids(&self) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self.groups.iter().map(|(id, _)| id).collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of live entities in `group`.
    #[must_use]
    pub fn entity_count(&self, group: GroupId) -> usize {
        self.groups.list::<EntityInfoView>(group).map_or(0, TypedCollection::len)
    }

    /// Returns the number of entities built into `group` and not yet submitted.
    #[must_use]
    pub fn pending_count(&self, group: GroupId) -> usize {
        self.pending
            .current()
            .list::<EntityInfoView>(group)
            .map_or(0, TypedCollection::len)
    }

    /// Returns the live per-group store.
    #[inline]
    #[must_use]
    pub fn group_store(&self) -> &GroupStore {
        &self.groups
    }

    /// Returns the live global store.
    #[inline]
    #[must_use]
    pub fn global_store(&self) -> &GlobalStore {
        &self.global
    }
}
