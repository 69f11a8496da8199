//! # Entity View Storage
//!
//! Entities are bags of views. Each view type lives in its own dense
//! collection, partitioned by group and mirrored in a global list.
//!
//! ## Design Philosophy
//!
//! - Views are shared handles; every index holding a view holds the same one
//! - Builds are staged and only become visible on submission
//! - Removals notify engines after the view is gone from every index
//! - Moving between groups relocates handles and notifies no one

mod builder;
mod collection;
mod entity;
mod notifier;
mod root;
mod store;
mod view;

pub use builder::{EntityDescriptor, EntityViewBuilder, ViewBuilder};
pub use collection::{downcast_indexed, downcast_list, IndexedTypedCollection, TypedCollection, ViewCollection};
pub use entity::{EntityId, EntityInfoView, GroupId};
pub use notifier::{Engine, EngineNotifier};
pub use root::{EngineRootCore, SubmitStats};
pub use store::{CollectionMap, GlobalStore, GroupStore, GroupViews, RemovedView};
pub use view::{AsAny, BuildView, DynView, EntityView, Implementors, SharedView, View, ViewTag};
