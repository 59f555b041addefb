//! Core domain types for the plantmon dashboard.
//!
//! This crate provides the static side of the system:
//! - `HierarchyNode`: company → location → building → sensor/dashboard/plant-head tree
//! - `Hierarchy`: validated, immutable tree with the shared traversal utilities
//! - `Selection`: the currently focused node
//! - `merge`: static + live metric merge with declarative unit annotation
//! - `style`: per-type labels, icons and colors used by the UI

pub mod catalog;
pub mod error;
pub mod merge;
pub mod node;
pub mod selection;
pub mod style;
pub mod tree;

pub use catalog::builtin_hierarchy;
pub use error::{CoreError, Result};
pub use merge::{merge_for_node, merge_metrics, MergedMetrics, UnitRule, UnitTable};
pub use node::{HierarchyNode, MetricMap, NodeDetails, NodeStatus, NodeType};
pub use selection::Selection;
pub use style::NodeStyle;
pub use tree::Hierarchy;
