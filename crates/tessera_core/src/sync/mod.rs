//! # Buffering and Shared Access
//!
//! ```text
//! build  ──► pending arena (DoubleBuffer::current)
//! submit ──► swap, drain the other arena into the live stores
//! ```
//!
//! [`EnginesRoot`] wraps the core for sharing; factories and function
//! handles hold weak references to it.

mod double_buffer;
mod handle;

pub use double_buffer::DoubleBuffer;
pub use handle::{EnginesRoot, EntityFactory, EntityFunctions};
