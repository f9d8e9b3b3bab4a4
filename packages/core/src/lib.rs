//! Blockline Core Editing Engine
//!
//! This crate provides the document model, structural edit algorithms, and
//! service orchestration for the Blockline outline editor. A document is a
//! forest of typed blocks; the engine owns the authoritative in-memory
//! state and notifies the host of every change through domain events, so
//! rendering and durable storage stay outside.
//!
//! # Architecture
//!
//! - **Id-indexed arena**: the whole forest lives in one [`tree::Tree`],
//!   hierarchy as plain id relations (no reference cycles to manage)
//! - **Pure JSON properties**: type-specific data stored in each node's
//!   `properties` field, with typed wrappers on top
//! - **Local-first**: mutations apply synchronously; hosts mirror them from
//!   the event stream and may lag or fail independently
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, typed wrappers, factory)
//! - [`behaviors`] - Node type system and trait-based behaviors
//! - [`tree`] - The arena and its structural invariants
//! - [`editing`] - Split/merge/indent/outdent keyboard commands
//! - [`services`] - NodeService, view-state persistence, pending identity

pub mod models;
pub mod behaviors;
pub mod tree;
pub mod editing;
pub mod services;

// Re-export commonly used types
pub use models::*;
pub use behaviors::*;
pub use editing::{DeletionContext, EditCommand, EditOutcome};
pub use services::*;
pub use tree::{DetachedPosition, Tree, TreeError};
