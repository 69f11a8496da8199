//! Integration tests for the engine root.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tessera_core::{
    BuildView, Engine, EngineRootCore, EntityDescriptor, EntityId, EntityInfoView, EntityView,
    EnginesRoot, GroupId, Implementors, RootConfig, RootError, View, ViewCollection, ViewTag,
};

/// Ancestry marker shared by every living view.
enum Living {}

#[derive(Debug)]
struct Health {
    id: EntityId,
    value: i32,
}

impl EntityView for Health {
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl View for Health {
    const ANCESTRY: &'static [ViewTag] = &[ViewTag::of::<Living>()];
}

impl BuildView for Health {
    fn build(id: EntityId, implementors: &Implementors) -> Self {
        Self {
            id,
            value: implementors.get::<i32>().copied().unwrap_or(10),
        }
    }
}

#[derive(Debug)]
struct Mesh {
    id: EntityId,
}

impl EntityView for Mesh {
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl View for Mesh {
    const QUERYABLE: bool = false;
}

impl BuildView for Mesh {
    fn build(id: EntityId, _implementors: &Implementors) -> Self {
        Self { id }
    }
}

#[derive(Default)]
struct Counter {
    added: AtomicUsize,
    removed: AtomicUsize,
    last_removed: Mutex<Vec<(EntityId, i32)>>,
}

impl Engine for Counter {
    fn add(&self, _view: &dyn EntityView) {
        self.added.fetch_add(1, Ordering::SeqCst);
    }

    fn remove(&self, view: &dyn EntityView) {
        self.removed.fetch_add(1, Ordering::SeqCst);
        if let Some(health) = view.downcast_ref::<Health>() {
            self.last_removed.lock().push((health.id, health.value));
        }
    }
}

fn unit() -> EntityDescriptor {
    EntityDescriptor::new("unit").with::<Health>().with::<Mesh>()
}

fn populated(groups: &[(GroupId, u32)]) -> EngineRootCore {
    let mut root = EngineRootCore::default();
    let mut next = 0;
    for &(group, count) in groups {
        for _ in 0..count {
            root.build_entity_in_group(EntityId(next), group, &unit(), &Implementors::new())
                .unwrap();
            next += 1;
        }
    }
    root.submit_entity_views().unwrap();
    root
}

fn assert_index_mirrors_global(root: &EngineRootCore) {
    let global = root.query_views::<Health>();
    let mut listed = 0;
    for group in root.group_ids() {
        let views = root.query_group_views::<Health>(group);
        listed += views.len();
        for view in views {
            let id = view.read().entity_id();
            let indexed = root.query_entity_view::<Health>(id, group).unwrap();
            assert!(Arc::ptr_eq(indexed, view));
            let in_global = global.iter().filter(|g| Arc::ptr_eq(g, view)).count();
            assert_eq!(in_global, 1, "entity {id} listed {in_global} times globally");
        }
    }
    assert_eq!(listed, global.len());
}

#[test]
fn test_group_index_mirrors_global() {
    let mut root = populated(&[(GroupId(1), 5), (GroupId(2), 3)]);
    assert_index_mirrors_global(&root);

    root.remove_entity(EntityId(2), GroupId(1)).unwrap();
    root.swap_entity_group(EntityId(6), GroupId(2), GroupId(1)).unwrap();
    assert_index_mirrors_global(&root);
    assert_eq!(root.query_views::<Health>().len(), 7);
}

#[test]
fn test_removed_entity_is_absent_everywhere() {
    let mut root = populated(&[(GroupId(1), 3)]);
    let engine = Arc::new(Counter::default());
    root.notifier().register_for::<Health>(engine.clone());

    root.query_entity_view::<Health>(EntityId(1), GroupId(1))
        .unwrap()
        .write()
        .value = 42;
    root.remove_entity(EntityId(1), GroupId(1)).unwrap();

    assert!(root.query_entity_view::<Health>(EntityId(1), GroupId(1)).is_none());
    assert!(root.query_entity_info(EntityId(1), GroupId(1)).is_none());
    assert!(root
        .query_group_views::<Mesh>(GroupId(1))
        .iter()
        .all(|mesh| mesh.read().id != EntityId(1)));
    assert_eq!(root.entity_count(GroupId(1)), 2);

    // Engines see the last state of the view
    assert_eq!(*engine.last_removed.lock(), vec![(EntityId(1), 42)]);
}

#[test]
fn test_swap_preserves_views_without_callbacks() {
    let mut root = populated(&[(GroupId(1), 2)]);
    let engine = Arc::new(Counter::default());
    root.notifier().register_for::<Health>(engine.clone());

    let before = Arc::clone(root.query_entity_view::<Health>(EntityId(0), GroupId(1)).unwrap());
    before.write().value = 77;

    root.swap_entity_group(EntityId(0), GroupId(1), GroupId(5)).unwrap();

    let after = root.query_entity_view::<Health>(EntityId(0), GroupId(5)).unwrap();
    assert!(Arc::ptr_eq(&before, after));
    assert_eq!(after.read().value, 77);
    assert!(root.query_entity_view::<Health>(EntityId(0), GroupId(1)).is_none());
    assert_eq!(root.query_group_views::<Mesh>(GroupId(5)).len(), 1);
    assert_eq!(root.query_group_views::<Mesh>(GroupId(1)).len(), 1);

    let info = root.query_entity_info(EntityId(0), GroupId(5)).unwrap();
    assert_eq!(info.read().group(), GroupId(5));

    assert_eq!(engine.removed.load(Ordering::SeqCst), 0);
    assert_eq!(engine.added.load(Ordering::SeqCst), 0);
}

#[test]
fn test_same_group_swap_changes_nothing() {
    let mut root = populated(&[(GroupId(1), 2)]);
    let snapshot = root.group_store().group(GroupId(1)).unwrap().snapshot();

    assert_eq!(
        root.swap_entity_group(EntityId(0), GroupId(1), GroupId(1)),
        Err(RootError::SameGroupSwap {
            entity: EntityId(0),
            group: GroupId(1)
        })
    );
    assert_eq!(root.group_store().group(GroupId(1)).unwrap().snapshot().len(), snapshot.len());
    assert_eq!(root.group_ids(), vec![GroupId(1)]);
    assert_eq!(root.entity_count(GroupId(1)), 2);
}

#[test]
fn test_swap_unknown_entity_fails() {
    let mut root = populated(&[(GroupId(1), 1)]);
    assert_eq!(
        root.swap_entity_group(EntityId(9), GroupId(1), GroupId(2)),
        Err(RootError::EntityNotFound {
            entity: EntityId(9),
            group: GroupId(1)
        })
    );
    assert!(!root.has_group(GroupId(2)));
}

#[test]
fn test_group_removal_notifies_each_pair_once() {
    let mut root = populated(&[(GroupId(3), 4), (GroupId(4), 1)]);
    let concrete = Arc::new(Counter::default());
    let ancestor = Arc::new(Counter::default());
    root.notifier().register_for::<Health>(concrete.clone());
    root.notifier().register_for::<Living>(ancestor.clone());

    let notified = root.remove_group_and_entities(GroupId(3)).unwrap();

    // Mesh is not queryable and never notifies
    assert_eq!(notified, 8);
    assert_eq!(concrete.removed.load(Ordering::SeqCst), 4);
    assert_eq!(ancestor.removed.load(Ordering::SeqCst), 4);
    assert!(!root.has_group(GroupId(3)));
    assert_eq!(root.query_views::<Health>().len(), 1);
    assert_eq!(root.query_views::<EntityInfoView>().len(), 1);

    assert_eq!(
        root.remove_group_and_entities(GroupId(3)),
        Err(RootError::GroupNotFound(GroupId(3)))
    );
}

#[test]
fn test_preallocate_avoids_growth() {
    let mut root = EngineRootCore::default();
    let group = GroupId(8);
    root.preallocate(group, 100, &unit()).unwrap();

    let capacity = |root: &EngineRootCore| {
        let views = root.group_store().group(group).unwrap();
        (
            views.list(ViewTag::of::<Health>()).map(ViewCollection::capacity),
            views.indexed(ViewTag::of::<Health>()).map(ViewCollection::capacity),
            views.list(ViewTag::of::<Mesh>()).map(ViewCollection::capacity),
            root.global_store()
                .collection(ViewTag::of::<Health>())
                .map(ViewCollection::capacity),
        )
    };
    let before = capacity(&root);

    for i in 0..100 {
        root.build_entity_in_group(EntityId(i), group, &unit(), &Implementors::new())
            .unwrap();
    }
    root.submit_entity_views().unwrap();

    assert_eq!(root.entity_count(group), 100);
    assert_eq!(capacity(&root), before);

    // A second call on a filled group still reserves room
    root.preallocate(group, 100, &unit()).unwrap();
    let (list, ..) = capacity(&root);
    assert!(list.unwrap() >= 200);
}

#[test]
fn test_duplicate_pending_build_writes_nothing() {
    let mut root = EngineRootCore::default();
    root.build_entity_in_group(EntityId(1), GroupId(1), &unit(), &Implementors::new().with(5_i32))
        .unwrap();

    let err = root
        .build_entity_in_group(EntityId(1), GroupId(1), &unit(), &Implementors::new().with(9_i32))
        .unwrap_err();
    assert_eq!(
        err,
        RootError::DuplicateEntity {
            entity: EntityId(1),
            group: GroupId(1)
        }
    );
    assert_eq!(root.pending_count(GroupId(1)), 1);

    let stats = root.submit_entity_views().unwrap();
    assert_eq!(stats.entities, 1);
    assert_eq!(stats.views, 3);
    let health = root.query_entity_view::<Health>(EntityId(1), GroupId(1)).unwrap();
    assert_eq!(health.read().value, 5);

    // Live ids are unique across groups
    assert_eq!(
        root.build_entity_in_group(EntityId(1), GroupId(2), &unit(), &Implementors::new()),
        Err(RootError::DuplicateEntity {
            entity: EntityId(1),
            group: GroupId(2)
        })
    );
    root.build_entity_in_group(EntityId(2), GroupId(2), &unit(), &Implementors::new())
        .unwrap();
}

#[test]
fn test_same_id_pending_in_two_groups_rejected() {
    let mut root = EngineRootCore::default();
    root.build_entity_in_group(EntityId(1), GroupId(1), &unit(), &Implementors::new())
        .unwrap();

    assert_eq!(
        root.build_entity_in_group(EntityId(1), GroupId(2), &unit(), &Implementors::new()),
        Err(RootError::DuplicateEntity {
            entity: EntityId(1),
            group: GroupId(2)
        })
    );
    assert_eq!(root.pending_count(GroupId(2)), 0);

    root.submit_entity_views().unwrap();
    assert_eq!(root.entity_count(GroupId(1)), 1);
    assert_eq!(root.entity_count(GroupId(2)), 0);
    assert_index_mirrors_global(&root);

    // Removing it leaves nothing behind in the global store
    root.remove_entity(EntityId(1), GroupId(1)).unwrap();
    assert!(root.query_views::<Health>().is_empty());
    assert_index_mirrors_global(&root);
}

#[test]
fn test_malformed_descriptor_rejected() {
    let mut root = EngineRootCore::default();
    let empty = EntityDescriptor::new("empty");
    assert_eq!(
        root.build_entity(EntityId(1), &empty, &Implementors::new()),
        Err(RootError::EmptyDescriptor("empty"))
    );
    assert_eq!(root.pending_count(GroupId::STANDARD), 0);
}

#[test]
fn test_submit_announces_additions() {
    let mut root = EngineRootCore::default();
    let engine = Arc::new(Counter::default());
    root.notifier().register_for::<Living>(engine.clone());

    for i in 0..3 {
        root.build_entity(EntityId(i), &unit(), &Implementors::new()).unwrap();
    }
    assert_eq!(engine.added.load(Ordering::SeqCst), 0);

    root.submit_entity_views().unwrap();
    assert_eq!(engine.added.load(Ordering::SeqCst), 3);

    assert_eq!(root.submit_entity_views().unwrap().entities, 0);
    assert_eq!(engine.added.load(Ordering::SeqCst), 3);
}

#[test]
fn test_facade_handles_outlive_root() {
    let root = EnginesRoot::new(RootConfig::default());
    let factory = root.entity_factory();
    let functions = root.entity_functions();
    let engine = Arc::new(Counter::default());
    root.notifier().register_for::<Health>(engine.clone());

    factory.build_entity(EntityId(1), &unit(), &Implementors::new()).unwrap();
    root.submit_entity_views().unwrap();
    drop(root);

    // Dropping the root disposes it
    assert_eq!(engine.removed.load(Ordering::SeqCst), 1);
    assert_eq!(
        functions.remove_entity(EntityId(1), GroupId::STANDARD),
        Err(RootError::RootUnavailable)
    );
    assert_eq!(
        factory.preallocate(GroupId(1), 4, &unit()),
        Err(RootError::RootUnavailable)
    );
}

#[test]
fn test_config_from_toml() {
    let config = RootConfig::from_toml_str(
        r"
        standard_group = 12
        initial_capacity = 32
        ",
    )
    .unwrap();

    let mut root = EngineRootCore::new(config);
    root.build_entity(EntityId(1), &unit(), &Implementors::new()).unwrap();
    root.submit_entity_views().unwrap();
    assert!(root.has_group(GroupId(12)));
}

#[test]
fn test_removed_id_can_be_rebuilt_elsewhere() {
    let mut root = populated(&[(GroupId(1), 1)]);
    root.remove_entity(EntityId(0), GroupId(1)).unwrap();

    root.build_entity_in_group(EntityId(0), GroupId(2), &unit(), &Implementors::new().with(3_i32))
        .unwrap();
    root.submit_entity_views().unwrap();

    let health = root.query_entity_view::<Health>(EntityId(0), GroupId(2)).unwrap();
    assert_eq!(health.read().value, 3);
    assert_index_mirrors_global(&root);
}
