/// Nodes at this depth always become leaves.
pub const MAX_DEPTH: usize = 20;
/// Subsets of this size or smaller always become leaves.
pub const MIN_SAMPLES_LEAF: usize = 5;
/// Winning splits with a gain ratio below this are pruned.
pub const MIN_INFO_GAIN: f64 = 0.001;
/// Contiguous record chunks evaluated independently during prediction.
pub const N_PREDICT_WORKERS: usize = 4;
/// Gain and gain ratio of a candidate that cannot split its subset.
pub const NO_SPLIT: f64 = -1.0;
/// Targets with at most this many distinct values are treated as classes.
pub const MAX_CATEGORICAL_TARGET_VALUES: usize = 10;
/// Text written for predictions that resolved to a missing value.
pub const UNKNOWN_PREDICTION: &str = "unknown";
