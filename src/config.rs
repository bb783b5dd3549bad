//! Tree Configuration
//!
//! Hyper-parameters controlling tree induction and prediction fan-out.
use crate::constants::{MAX_DEPTH, MIN_INFO_GAIN, MIN_SAMPLES_LEAF, N_PREDICT_WORKERS};
use crate::errors::DecisionTreeError;
use crate::model::JsonIO;
use crate::utils::{validate_nonzero_parameter, validate_positive_float_parameter};
use serde::{Deserialize, Serialize};

fn default_max_depth() -> usize {
    MAX_DEPTH
}
fn default_min_samples_leaf() -> usize {
    MIN_SAMPLES_LEAF
}
fn default_min_info_gain() -> f64 {
    MIN_INFO_GAIN
}
fn default_num_workers() -> usize {
    N_PREDICT_WORKERS
}
fn default_parallel() -> bool {
    true
}

/// Stopping rules and concurrency settings.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct TreeConfig {
    /// Nodes at this depth become leaves.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Subsets with at most this many samples become leaves.
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Winning splits with a lower gain ratio are pruned to a leaf.
    #[serde(default = "default_min_info_gain")]
    pub min_info_gain: f64,
    /// Number of contiguous record chunks predicted independently.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// Build categorical branches and predict chunks concurrently.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            max_depth: MAX_DEPTH,
            min_samples_leaf: MIN_SAMPLES_LEAF,
            min_info_gain: MIN_INFO_GAIN,
            num_workers: N_PREDICT_WORKERS,
            parallel: true,
        }
    }
}

impl TreeConfig {
    /// Set the maximum depth of the tree.
    /// * `max_depth` - Nodes at this depth always become leaves.
    pub fn set_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples needed to split.
    /// * `min_samples_leaf` - Subsets of this size or smaller become leaves.
    pub fn set_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the weak-split pruning threshold.
    /// * `min_info_gain` - Minimum gain ratio a split must reach.
    pub fn set_min_info_gain(mut self, min_info_gain: f64) -> Self {
        self.min_info_gain = min_info_gain;
        self
    }

    /// Set the number of prediction workers.
    /// * `num_workers` - Number of contiguous chunks the records are split into.
    pub fn set_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Enable or disable concurrent tree building and prediction.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<(), DecisionTreeError> {
        validate_positive_float_parameter(self.min_info_gain, "min_info_gain")?;
        validate_nonzero_parameter(self.num_workers, "num_workers")?;
        Ok(())
    }
}

impl JsonIO for TreeConfig {}
