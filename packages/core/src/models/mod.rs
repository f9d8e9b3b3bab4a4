//! Data Models
//!
//! This module contains the core data structures used throughout Blockline:
//!
//! - `Node` - universal node model for all block types
//! - `NodeType` - closed block type vocabulary
//! - Type-specific wrappers (`TaskNode`, `DateNode`) built on the Node
//!   foundation
//! - `NodeFactory` - per-type construction with default properties
//!
//! All block types use the pure JSON approach with type-specific data stored
//! in the `properties` field of the universal node record.

mod date_node;
mod factory;
mod node;
mod task_node;

pub use date_node::{DateNode, DateNodeBuilder, DEFAULT_DATE_FORMAT};
pub use factory::NodeFactory;
pub use node::{Node, NodeType, ValidationError};
pub use task_node::{TaskNode, TaskNodeBuilder, TaskStatus};
