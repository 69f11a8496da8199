//! # Tessera Core
//!
//! Entity storage for engine-driven simulations:
//! - Entities are built from descriptors into typed view collections
//! - Views are grouped, indexed by entity id and mirrored globally
//! - Engines are told when views appear and disappear
//!
//! ## Architecture Rules
//!
//! 1. **Staged builds** - New entities are invisible until submitted
//! 2. **Dense storage** - Each view type has its own contiguous collection
//! 3. **Checked mutations** - An operation that fails leaves every store untouched
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{EngineRootCore, EntityDescriptor, EntityId, GroupId, Implementors, RootConfig};
//!
//! let mut root = EngineRootCore::new(RootConfig::default());
//! let unit = EntityDescriptor::new("unit").with::<HealthView>();
//!
//! root.preallocate(GroupId(1), 1_000, &unit)?;
//! root.build_entity_in_group(EntityId(7), GroupId(1), &unit, &Implementors::new())?;
//! root.submit_entity_views()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod sync;

pub use config::RootConfig;
pub use ecs::{
    BuildView, DynView, Engine, EngineNotifier, EngineRootCore, EntityDescriptor, EntityId,
    EntityInfoView, EntityView, EntityViewBuilder, GlobalStore, GroupId, GroupStore,
    Implementors, IndexedTypedCollection, SharedView, SubmitStats, TypedCollection, View,
    ViewCollection, ViewTag,
};
pub use error::{RootError, RootResult};
pub use sync::{DoubleBuffer, EnginesRoot, EntityFactory, EntityFunctions};
