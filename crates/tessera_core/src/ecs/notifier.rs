//! # Engine Notifier
//!
//! Routes structural changes to the engines that care about them.
//!
//! Engines subscribe to a [`ViewTag`]: either a concrete view type or one of
//! the ancestry markers view types declare. A removed view is announced to
//! its own tag first, then to each of its ancestry tags in order.
//!
//! The subscription table is locked only while it is read or written, never
//! while an engine runs, so a callback may unregister itself or others.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::view::{EntityView, ViewTag};

/// A consumer of structural changes.
///
/// Callbacks run while the notified view is read-locked; engines must not
/// try to write to it from inside the callback.
pub trait Engine: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once a view has been submitted into the live stores.
    fn add(&self, _view: &dyn EntityView) {}

    /// Called once a view has been removed from every index.
    fn remove(&self, view: &dyn EntityView);
}

/// Subscription table from view tags to engines.
#[derive(Default)]
pub struct EngineNotifier {
    engines: RwLock<HashMap<TypeId, Vec<Arc<dyn Engine>>>>,
}

impl EngineNotifier {
    /// Creates an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `engine` to `tag`.
    ///
    /// Returns `false` if the engine was already subscribed to it.
    pub fn register(&self, tag: ViewTag, engine: Arc<dyn Engine>) -> bool {
        let mut engines = self.engines.write();
        let list = engines.entry(tag.id()).or_default();
        if list.iter().any(|known| same_engine(known, &engine)) {
            return false;
        }

        tracing::debug!(engine = engine.name(), tag = tag.name(), "engine registered");
        list.push(engine);
        true
    }

    /// Subscribes `engine` to the tag of `T`.
    pub fn register_for<T: ?Sized + 'static>(&self, engine: Arc<dyn Engine>) -> bool {
        self.register(ViewTag::of::<T>(), engine)
    }

    /// Unsubscribes `engine` from `tag`.
    ///
    /// Returns `false` if it was not subscribed.
    pub fn unregister(&self, tag: ViewTag, engine: &Arc<dyn Engine>) -> bool {
        let mut engines = self.engines.write();
        let Some(list) = engines.get_mut(&tag.id()) else {
            return false;
        };

        let before = list.len();
        list.retain(|known| !same_engine(known, engine));
        let removed = list.len() != before;
        if list.is_empty() {
            engines.remove(&tag.id());
        }
        removed
    }

    /// Returns a snapshot of the engines subscribed to `tag`, in
    /// registration order.
    #[must_use]
    pub fn subscribers(&self, tag: ViewTag) -> Vec<Arc<dyn Engine>> {
        self.engines
            .read()
            .get(&tag.id())
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of engines subscribed to `tag`.
    #[must_use]
    pub fn subscriber_count(&self, tag: ViewTag) -> usize {
        self.engines.read().get(&tag.id()).map_or(0, Vec::len)
    }

    /// Announces the removal of `view` to every engine subscribed to `tag`.
    ///
    /// Returns the number of callbacks made.
    pub fn notify_removal(&self, tag: ViewTag, view: &dyn EntityView) -> usize {
        let engines = self.subscribers(tag);
        for engine in &engines {
            engine.remove(view);
        }
        engines.len()
    }

    /// Announces the addition of `view` to every engine subscribed to `tag`.
    pub fn notify_added(&self, tag: ViewTag, view: &dyn EntityView) -> usize {
        let engines = self.subscribers(tag);
        for engine in &engines {
            engine.add(view);
        }
        engines.len()
    }

    /// Announces a removal along a view type's ancestry: the concrete tag
    /// first, then each ancestry tag.
    pub fn notify_removal_chain(
        &self,
        view_type: ViewTag,
        ancestry: &[ViewTag],
        view: &dyn EntityView,
    ) -> usize {
        std::iter::once(&view_type)
            .chain(ancestry)
            .map(|tag| self.notify_removal(*tag, view))
            .sum()
    }

    /// Announces an addition along a view type's ancestry.
    pub fn notify_added_chain(
        &self,
        view_type: ViewTag,
        ancestry: &[ViewTag],
        view: &dyn EntityView,
    ) -> usize {
        std::iter::once(&view_type)
            .chain(ancestry)
            .map(|tag| self.notify_added(*tag, view))
            .sum()
    }
}

/// Compares engines by address, ignoring vtables.
fn same_engine(a: &Arc<dyn Engine>, b: &Arc<dyn Engine>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}
