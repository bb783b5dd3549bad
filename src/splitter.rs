//! Splitter
//!
//! Gain-ratio split search over categorical and numerical features.
use crate::constants::NO_SPLIT;
use crate::data::{Dataset, FeatureType};
use crate::entropy::entropy;
use crate::errors::DecisionTreeError;
use crate::value::{compare_values, midpoint, sort_values, Value};
use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;
use std::cmp::Ordering;

/// Sample indices implied by a candidate split.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitPartition {
    /// No usable split.
    None,
    /// `(value key, indices)` groups in order of first occurrence.
    Categorical(Vec<(String, Vec<usize>)>),
    /// Missing values and values below `threshold` go left.
    Numerical {
        threshold: Value,
        left: Vec<usize>,
        right: Vec<usize>,
    },
}

/// A candidate split and its quality.
///
/// `info_gain == gain_ratio == -1` means no usable split was found.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitCriteria {
    pub feature: String,
    pub split_type: Option<FeatureType>,
    pub info_gain: f64,
    pub gain_ratio: f64,
    pub partition: SplitPartition,
}

impl Default for SplitCriteria {
    fn default() -> Self {
        SplitCriteria {
            feature: String::new(),
            split_type: None,
            info_gain: NO_SPLIT,
            gain_ratio: NO_SPLIT,
            partition: SplitPartition::None,
        }
    }
}

impl SplitCriteria {
    fn no_split_for(feature: &str, split_type: FeatureType) -> Self {
        SplitCriteria {
            feature: feature.to_string(),
            split_type: Some(split_type),
            ..Default::default()
        }
    }

    pub fn is_split(&self) -> bool {
        self.partition != SplitPartition::None
    }

    /// Threshold of a numerical split.
    pub fn split_value(&self) -> Option<&Value> {
        match &self.partition {
            SplitPartition::Numerical { threshold, .. } => Some(threshold),
            _ => None,
        }
    }
}

#[inline]
fn gain_ratio(info_gain: f64, split_info: f64) -> f64 {
    // A single-valued partition carries no split information.
    if split_info > 0.0 {
        info_gain / split_info
    } else {
        0.0
    }
}

/// Searches the split with the highest gain ratio for a subset of records.
pub struct GainRatioSplitter<'a> {
    data: &'a Dataset,
    target_column: &'a str,
    parallel: bool,
}

impl<'a> GainRatioSplitter<'a> {
    pub fn new(data: &'a Dataset, target_column: &'a str) -> Self {
        GainRatioSplitter {
            data,
            target_column,
            parallel: true,
        }
    }

    /// Evaluate features concurrently. The chosen split does not depend on it.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Best split of `indices` over `features`.
    ///
    /// A pure subset returns the no-split sentinel. Otherwise every feature
    /// but the target is evaluated, and the strictly highest gain ratio wins,
    /// so ties keep the earlier feature.
    ///
    /// # Errors
    ///
    /// [`DecisionTreeError::MissingFeatureType`] when a feature is not
    /// classified as categorical or numerical.
    pub fn find_best_split(&self, indices: &[usize], features: &[String]) -> Result<SplitCriteria, DecisionTreeError> {
        let base_entropy = entropy(self.data, indices, self.target_column);
        if base_entropy == 0.0 {
            return Ok(SplitCriteria::default());
        }

        let evaluate = |feature: &String| -> Result<Option<SplitCriteria>, DecisionTreeError> {
            if feature == self.target_column {
                return Ok(None);
            }
            let split = match self.data.feature_type(feature)? {
                FeatureType::Categorical => self.find_categorical_split(indices, feature, base_entropy),
                FeatureType::Numerical => self.find_numerical_split(indices, feature, base_entropy),
            };
            Ok(Some(split))
        };
        let candidates: Vec<Option<SplitCriteria>> = if self.parallel {
            features.par_iter().map(evaluate).collect::<Result<_, _>>()?
        } else {
            features.iter().map(evaluate).collect::<Result<_, _>>()?
        };

        let mut best = SplitCriteria::default();
        for candidate in candidates.into_iter().flatten() {
            if candidate.gain_ratio > best.gain_ratio {
                best = candidate;
            }
        }
        Ok(best)
    }

    /// One branch per distinct value of `feature`, missing values grouped together.
    pub fn find_categorical_split(&self, indices: &[usize], feature: &str, base_entropy: f64) -> SplitCriteria {
        let mut position: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for &idx in indices {
            let key = self.data.get(idx, feature).key();
            match position.get(&key) {
                Some(&p) => groups[p].1.push(idx),
                None => {
                    position.insert(key.clone(), groups.len());
                    groups.push((key, vec![idx]));
                }
            }
        }
        if groups.is_empty() {
            return SplitCriteria::no_split_for(feature, FeatureType::Categorical);
        }

        let n = indices.len() as f64;
        let mut weighted_entropy = 0.0;
        let mut split_info = 0.0;
        for (_, group) in &groups {
            let p = group.len() as f64 / n;
            weighted_entropy += p * entropy(self.data, group, self.target_column);
            split_info -= p * p.log2();
        }

        let info_gain = base_entropy - weighted_entropy;
        SplitCriteria {
            feature: feature.to_string(),
            split_type: Some(FeatureType::Categorical),
            info_gain,
            gain_ratio: gain_ratio(info_gain, split_info),
            partition: SplitPartition::Categorical(groups),
        }
    }

    /// Best binary threshold of `feature`, tried at the midpoint of every
    /// pair of adjacent distinct values.
    ///
    /// Fewer than two distinct present values, or no threshold that leaves
    /// both sides non-empty, returns the no-split sentinel. Non-finite
    /// midpoints are never thresholds. Ties keep the lower threshold.
    pub fn find_numerical_split(&self, indices: &[usize], feature: &str, base_entropy: f64) -> SplitCriteria {
        let mut best = SplitCriteria::no_split_for(feature, FeatureType::Numerical);

        let mut seen: HashSet<String> = HashSet::new();
        let mut values: Vec<Value> = Vec::new();
        for &idx in indices {
            let value = self.data.get(idx, feature);
            if !value.is_missing() && seen.insert(value.key()) {
                values.push(value.clone());
            }
        }
        if values.len() < 2 {
            return best;
        }
        sort_values(&mut values);

        let n = indices.len() as f64;
        for pair in values.windows(2) {
            let threshold = match midpoint(&pair[0], &pair[1]) {
                Some(Value::Float(t)) if !t.is_finite() => continue,
                Some(t) => t,
                None => continue,
            };
            let (left, right): (Vec<usize>, Vec<usize>) = indices.iter().copied().partition(|&idx| {
                let value = self.data.get(idx, feature);
                value.is_missing() || compare_values(value, &threshold) == Ordering::Less
            });
            if left.is_empty() || right.is_empty() {
                continue;
            }

            let left_p = left.len() as f64 / n;
            let right_p = right.len() as f64 / n;
            let weighted_entropy = left_p * entropy(self.data, &left, self.target_column)
                + right_p * entropy(self.data, &right, self.target_column);
            let info_gain = base_entropy - weighted_entropy;
            let split_info = -left_p * left_p.log2() - right_p * right_p.log2();
            let ratio = gain_ratio(info_gain, split_info);

            if ratio > best.gain_ratio {
                best.info_gain = info_gain;
                best.gain_ratio = ratio;
                best.partition = SplitPartition::Numerical { threshold, left, right };
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record;
    use std::collections::HashMap as StdHashMap;

    fn dataset(rows: Vec<(Value, Value, &str)>) -> Dataset {
        let records = rows
            .into_iter()
            .map(|(c, n, t)| record([("color", c), ("size", n), ("label", Value::from(t))]))
            .collect();
        Dataset::new(
            vec!["color".to_string(), "size".to_string(), "label".to_string()],
            records,
            StdHashMap::from([
                ("color".to_string(), FeatureType::Categorical),
                ("size".to_string(), FeatureType::Numerical),
                ("label".to_string(), FeatureType::Categorical),
            ]),
        )
    }

    fn all(data: &Dataset) -> Vec<usize> {
        (0..data.len()).collect()
    }

    fn features() -> Vec<String> {
        vec!["color".to_string(), "size".to_string(), "label".to_string()]
    }

    #[test]
    fn test_categorical_feature_separates_classes() {
        // Color separates the classes, size does not.
        let data = dataset(vec![
            ("red".into(), Value::Int(1), "yes"),
            ("blue".into(), Value::Int(1), "no"),
            ("red".into(), Value::Int(2), "yes"),
            ("blue".into(), Value::Int(2), "no"),
            ("red".into(), Value::Int(1), "yes"),
        ]);
        for parallel in [true, false] {
            let splitter = GainRatioSplitter::new(&data, "label").set_parallel(parallel);
            let best = splitter.find_best_split(&all(&data), &features()).unwrap();
            assert_eq!(best.feature, "color");
            assert_eq!(best.split_type, Some(FeatureType::Categorical));
            assert!(best.gain_ratio > 0.0);
            assert!((best.gain_ratio - 1.0).abs() < 1e-12);
            match best.partition {
                SplitPartition::Categorical(groups) => {
                    assert_eq!(groups[0], ("red".to_string(), vec![0, 2, 4]));
                    assert_eq!(groups[1], ("blue".to_string(), vec![1, 3]));
                }
                _ => panic!("expected a categorical partition"),
            }
        }
    }

    #[test]
    fn test_pure_subset_is_sentinel() {
        let data = dataset(vec![
            ("red".into(), Value::Int(1), "yes"),
            ("blue".into(), Value::Int(3), "yes"),
        ]);
        let best = GainRatioSplitter::new(&data, "label")
            .find_best_split(&all(&data), &features())
            .unwrap();
        assert_eq!(best.info_gain, -1.0);
        assert_eq!(best.gain_ratio, -1.0);
        assert!(!best.is_split());
    }

    #[test]
    fn test_ties_keep_earlier_feature() {
        // Both features separate the classes perfectly with the same partition sizes.
        let data = dataset(vec![
            ("red".into(), Value::Float(1.2), "yes"),
            ("blue".into(), Value::Float(2.4), "no"),
            ("red".into(), Value::Float(1.5), "yes"),
            ("blue".into(), Value::Float(2.1), "no"),
            ("red".into(), Value::Float(1.8), "yes"),
        ]);
        let best = GainRatioSplitter::new(&data, "label")
            .find_best_split(&all(&data), &features())
            .unwrap();
        assert_eq!(best.feature, "color");

        let reversed = vec!["size".to_string(), "color".to_string()];
        let best = GainRatioSplitter::new(&data, "label")
            .find_best_split(&all(&data), &reversed)
            .unwrap();
        assert_eq!(best.feature, "size");
        match best.split_value() {
            Some(Value::Float(v)) => assert!((v - 1.95).abs() < 1e-9),
            other => panic!("unexpected threshold {:?}", other),
        }
    }

    #[test]
    fn test_missing_feature_type_is_error() {
        let data = dataset(vec![
            ("red".into(), Value::Int(1), "yes"),
            ("blue".into(), Value::Int(3), "no"),
        ]);
        let unknown = vec!["weight".to_string()];
        let result = GainRatioSplitter::new(&data, "label").find_best_split(&all(&data), &unknown);
        assert!(matches!(result, Err(DecisionTreeError::MissingFeatureType(f)) if f == "weight"));
    }

    #[test]
    fn test_single_valued_categorical_has_zero_ratio() {
        let data = dataset(vec![
            ("red".into(), Value::Int(1), "yes"),
            ("red".into(), Value::Int(3), "no"),
        ]);
        let splitter = GainRatioSplitter::new(&data, "label");
        let split = splitter.find_categorical_split(&all(&data), "color", 1.0);
        assert_eq!(split.gain_ratio, 0.0);
        assert_eq!(split.info_gain, 0.0);
    }

    #[test]
    fn test_numerical_single_index_is_sentinel() {
        let data = dataset(vec![
            ("red".into(), Value::Int(1), "yes"),
            ("blue".into(), Value::Int(3), "no"),
        ]);
        let split = GainRatioSplitter::new(&data, "label").find_numerical_split(&[0], "size", 1.0);
        assert_eq!(split.info_gain, -1.0);
        assert_eq!(split.gain_ratio, -1.0);
        assert_eq!(split.split_value(), None);
    }

    #[test]
    fn test_numerical_identical_values_never_split() {
        let data = dataset(vec![
            ("red".into(), Value::Float(4.0), "yes"),
            ("blue".into(), Value::Int(4), "no"),
            ("blue".into(), Value::Missing, "no"),
        ]);
        let split = GainRatioSplitter::new(&data, "label").find_numerical_split(&all(&data), "size", 0.918);
        assert!(!split.is_split());
        assert_eq!(split.gain_ratio, -1.0);
    }

    #[test]
    fn test_numerical_missing_goes_left() {
        let data = dataset(vec![
            ("red".into(), Value::Float(1.0), "no"),
            ("red".into(), Value::Missing, "no"),
            ("red".into(), Value::Float(3.0), "yes"),
            ("red".into(), Value::Float(4.0), "yes"),
        ]);
        let split = GainRatioSplitter::new(&data, "label").find_numerical_split(&all(&data), "size", 1.0);
        assert!((split.gain_ratio - 1.0).abs() < 1e-12);
        assert_eq!(
            split.partition,
            SplitPartition::Numerical {
                threshold: Value::Float(2.0),
                left: vec![0, 1],
                right: vec![2, 3],
            }
        );
    }

    #[test]
    fn test_numerical_non_finite_midpoints_are_skipped() {
        let data = dataset(vec![
            ("red".into(), Value::Float(1.0), "a"),
            ("red".into(), Value::Float(2.0), "a"),
            ("red".into(), Value::Float(f64::NAN), "b"),
            ("red".into(), Value::Float(f64::INFINITY), "b"),
        ]);
        let split = GainRatioSplitter::new(&data, "label").find_numerical_split(&all(&data), "size", 1.0);
        match split.split_value() {
            Some(Value::Float(t)) => assert_eq!(*t, 1.5),
            other => panic!("unexpected threshold {:?}", other),
        }

        let only_non_finite = dataset(vec![
            ("red".into(), Value::Float(f64::NEG_INFINITY), "a"),
            ("red".into(), Value::Float(f64::INFINITY), "b"),
        ]);
        let split = GainRatioSplitter::new(&only_non_finite, "label").find_numerical_split(&[0, 1], "size", 1.0);
        assert!(!split.is_split());
    }

    #[test]
    fn test_numerical_integer_midpoint() {
        let data = dataset(vec![
            ("red".into(), Value::Int(1), "no"),
            ("red".into(), Value::Int(4), "yes"),
            ("red".into(), Value::Int(8), "yes"),
        ]);
        let split = GainRatioSplitter::new(&data, "label").find_numerical_split(&all(&data), "size", 0.918);
        assert_eq!(split.split_value(), Some(&Value::Int(2)));
    }

    #[test]
    fn test_numerical_ties_keep_lower_threshold() {
        // Thresholds 1.5 and 2.5 both isolate a single "odd" sample.
        let data = dataset(vec![
            ("red".into(), Value::Float(1.0), "a"),
            ("red".into(), Value::Float(2.0), "b"),
            ("red".into(), Value::Float(3.0), "a"),
        ]);
        let base = entropy(&data, &all(&data), "label");
        let split = GainRatioSplitter::new(&data, "label").find_numerical_split(&all(&data), "size", base);
        assert_eq!(split.split_value(), Some(&Value::Float(1.5)));
    }
}
