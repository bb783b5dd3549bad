//! Data
//!
//! Records, feature classification and the [`Dataset`] context that every
//! training and prediction routine operates on.
use crate::constants::MAX_CATEGORICAL_TARGET_VALUES;
use crate::errors::DecisionTreeError;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display};

/// Column name to value. An absent column reads as [`Value::Missing`].
pub type Record = HashMap<String, Value>;

/// How a feature is partitioned during split search.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    /// One branch per distinct value.
    #[serde(alias = "date")]
    Categorical,
    /// Binary `< threshold` / `>= threshold` branches.
    #[serde(alias = "numeric")]
    Numerical,
}

impl Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeatureType::Categorical => write!(f, "categorical"),
            FeatureType::Numerical => write!(f, "numerical"),
        }
    }
}

/// Kind of target a model was trained on. Only recorded, classification
/// is performed either way.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    #[default]
    Categorical,
    Numeric,
}

static MISSING: Value = Value::Missing;

/// Ordered columns, their records and per-column feature types.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    pub feature_types: HashMap<String, FeatureType>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<Record>, feature_types: HashMap<String, FeatureType>) -> Self {
        Dataset {
            columns,
            records,
            feature_types,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Value of `column` in record `idx`, missing when the record lacks the column.
    #[inline]
    pub fn get(&self, idx: usize, column: &str) -> &Value {
        self.records[idx].get(column).unwrap_or(&MISSING)
    }

    /// Feature type of `column`.
    pub fn feature_type(&self, column: &str) -> Result<FeatureType, DecisionTreeError> {
        self.feature_types
            .get(column)
            .copied()
            .ok_or_else(|| DecisionTreeError::MissingFeatureType(column.to_string()))
    }

    /// Columns used for splitting, in column order, excluding the target.
    pub fn features(&self, target_column: &str) -> Vec<String> {
        self.columns.iter().filter(|c| c.as_str() != target_column).cloned().collect()
    }

    /// Check that `target_column` is one of the columns.
    pub fn validate_target(&self, target_column: &str) -> Result<(), DecisionTreeError> {
        if self.columns.iter().any(|c| c == target_column) {
            Ok(())
        } else {
            Err(DecisionTreeError::TargetNotFound(target_column.to_string()))
        }
    }

    /// Classify the target column. A numerical column with more than
    /// [`MAX_CATEGORICAL_TARGET_VALUES`] distinct values is numeric.
    pub fn infer_target_type(&self, target_column: &str) -> TargetType {
        if self.feature_types.get(target_column) != Some(&FeatureType::Numerical) {
            return TargetType::Categorical;
        }
        let distinct: HashSet<String> = self
            .records
            .iter()
            .filter_map(|r| r.get(target_column))
            .map(|v| v.key())
            .collect();
        if distinct.len() > MAX_CATEGORICAL_TARGET_VALUES {
            TargetType::Numeric
        } else {
            TargetType::Categorical
        }
    }
}

/// Build a record from `(column, value)` pairs, skipping missing values.
pub fn record<I, K, V>(fields: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .filter(|(_, v): &(String, Value)| !v.is_missing())
        .collect()
}
