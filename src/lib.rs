// Modules
pub mod binning;
pub mod config;
pub mod constants;
pub mod data;
pub mod entropy;
pub mod errors;
pub mod io;
pub mod model;
pub mod splitter;
pub mod tree;
pub mod utils;
pub mod value;

// Individual classes, and functions
pub use binning::{BinEdges, BinningMethod, BinningOptions};
pub use config::TreeConfig;
pub use data::{Dataset, FeatureType, Record, TargetType};
pub use errors::DecisionTreeError;
pub use model::{JsonIO, Model};
pub use tree::{build_tree, TreeNode};
pub use value::Value;
