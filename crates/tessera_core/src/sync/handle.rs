//! # Shared Root Handles
//!
//! ```text
//!                 ┌─────────────────────────────┐
//!  EnginesRoot ──►│ Arc<Mutex<EngineRootCore>>  │
//!                 └─────────────────────────────┘
//!                          ▲           ▲
//!                     Weak │           │ Weak
//!                 EntityFactory   EntityFunctions
//! ```
//!
//! The root owns the core. Factories and function handles only borrow it:
//! once the root is dropped they fail with [`RootError::RootUnavailable`]
//! instead of keeping it alive.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

use crate::config::RootConfig;
use crate::ecs::{
    EngineNotifier, EngineRootCore, EntityDescriptor, EntityId, GroupId, Implementors,
    SubmitStats,
};
use crate::error::{RootError, RootResult};

/// Owning handle to an [`EngineRootCore`].
pub struct EnginesRoot {
    core: Arc<Mutex<EngineRootCore>>,
    notifier: Arc<EngineNotifier>,
}

impl EnginesRoot {
    /// Creates a root with its own core.
    #[must_use]
    pub fn new(config: RootConfig) -> Self {
        let core = EngineRootCore::new(config);
        let notifier = Arc::clone(core.notifier());
        Self {
            core: Arc::new(Mutex::new(core)),
            notifier,
        }
    }

    /// Locks the core for direct access.
    ///
    /// Engine callbacks run while this lock is held; they must not call back
    /// into the root.
    pub fn lock(&self) -> MutexGuard<'_, EngineRootCore> {
        self.core.lock()
    }

    /// Returns the notifier, usable without locking the core.
    #[inline]
    #[must_use]
    pub fn notifier(&self) -> &Arc<EngineNotifier> {
        &self.notifier
    }

    /// Hands out a non-owning handle for building entities.
    #[must_use]
    pub fn entity_factory(&self) -> EntityFactory {
        EntityFactory {
            core: Arc::downgrade(&self.core),
        }
    }

    /// Hands out a non-owning handle for removing and swapping entities.
    #[must_use]
    pub fn entity_functions(&self) -> EntityFunctions {
        EntityFunctions {
            core: Arc::downgrade(&self.core),
        }
    }

    /// Makes pending entities visible. See
    /// [`EngineRootCore::submit_entity_views`].
    ///
    /// # Errors
    ///
    /// Propagates the core's error.
    pub fn submit_entity_views(&self) -> RootResult<SubmitStats> {
        self.core.lock().submit_entity_views()
    }
}

impl Default for EnginesRoot {
    fn default() -> Self {
        Self::new(RootConfig::default())
    }
}

impl Drop for EnginesRoot {
    fn drop(&mut self) {
        self.core.lock().dispose();
    }
}

/// Upgrades a weak core reference.
fn upgrade(core: &Weak<Mutex<EngineRootCore>>) -> RootResult<Arc<Mutex<EngineRootCore>>> {
    core.upgrade().ok_or(RootError::RootUnavailable)
}

/// Non-owning handle for building entities.
#[derive(Clone)]
pub struct EntityFactory {
    core: Weak<Mutex<EngineRootCore>>,
}

impl EntityFactory {
    /// Builds an entity in the standard group.
    ///
    /// # Errors
    ///
    /// [`RootError::RootUnavailable`] once the root is gone, otherwise the
    /// errors of [`EngineRootCore::build_entity`].
    pub fn build_entity(
        &self,
        id: EntityId,
        descriptor: &EntityDescriptor,
        implementors: &Implementors,
    ) -> RootResult<()> {
        upgrade(&self.core)?
            .lock()
            .build_entity(id, descriptor, implementors)
    }

    /// Builds an entity in `group`.
    ///
    /// # Errors
    ///
    /// [`RootError::RootUnavailable`] once the root is gone, otherwise the
    /// errors of [`EngineRootCore::build_entity_in_group`].
    pub fn build_entity_in_group(
        &self,
        id: EntityId,
        group: GroupId,
        descriptor: &EntityDescriptor,
        implementors: &Implementors,
    ) -> RootResult<()> {
        upgrade(&self.core)?
            .lock()
            .build_entity_in_group(id, group, descriptor, implementors)
    }

    /// Reserves room for `size` entities of `descriptor` in `group`.
    ///
    /// # Errors
    ///
    /// [`RootError::RootUnavailable`] once the root is gone, otherwise the
    /// errors of [`EngineRootCore::preallocate`].
    pub fn preallocate(
        &self,
        group: GroupId,
        size: usize,
        descriptor: &EntityDescriptor,
    ) -> RootResult<()> {
        upgrade(&self.core)?.lock().preallocate(group, size, descriptor)
    }
}

/// Non-owning handle for removing and moving entities.
#[derive(Clone)]
pub struct EntityFunctions {
    core: Weak<Mutex<EngineRootCore>>,
}

impl EntityFunctions {
    /// Removes an entity. Returns the number of removal callbacks.
    ///
    /// # Errors
    ///
    /// [`RootError::RootUnavailable`] once the root is gone, otherwise the
    /// errors of [`EngineRootCore::remove_entity`].
    pub fn remove_entity(&self, id: EntityId, group: GroupId) -> RootResult<usize> {
        upgrade(&self.core)?.lock().remove_entity(id, group)
    }

    /// Removes a group and all its entities.
    ///
    /// # Errors
    ///
    /// [`RootError::RootUnavailable`] once the root is gone, otherwise the
    /// errors of [`EngineRootCore::remove_group_and_entities`].
    pub fn remove_group_and_entities(&self, group: GroupId) -> RootResult<usize> {
        upgrade(&self.core)?.lock().remove_group_and_entities(group)
    }

    /// Moves an entity between groups.
    ///
    /// # Errors
    ///
    /// [`RootError::RootUnavailable`] once the root is gone, otherwise the
    /// errors of [`EngineRootCore::swap_entity_group`].
    pub fn swap_entity_group(&self, id: EntityId, from: GroupId, to: GroupId) -> RootResult<()> {
        upgrade(&self.core)?.lock().swap_entity_group(id, from, to)
    }
}
