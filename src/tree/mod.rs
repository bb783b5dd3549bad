pub mod build;
pub mod predict;
#[allow(clippy::module_inception)]
pub mod tree;

pub use build::{build_tree, TreeBuilder};
pub use predict::estimate_size;
pub use tree::{DecisionNode, NodeSplit, TreeNode};
