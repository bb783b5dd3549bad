//! Binning
//!
//! Optional discretization of numerical features into interval indices.
//! Edges are fitted on the training set and reapplied unchanged at
//! prediction time.
use crate::data::{Dataset, FeatureType};
use crate::errors::DecisionTreeError;
use crate::model::JsonIO;
use crate::utils::{items_to_strings, validate_nonzero_parameter};
use crate::value::Value;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};
use std::str::FromStr;

// Equal-frequency outer edges sit this far outside the observed range.
const EDGE_MARGIN: f64 = 0.0001;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "snake_case")]
pub enum BinningMethod {
    /// Uniform intervals between the observed minimum and maximum.
    #[default]
    EqualWidth,
    /// Cut points at quantile positions of the sorted values.
    EqualFrequency,
}

impl FromStr for BinningMethod {
    type Err = DecisionTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal_width" => Ok(BinningMethod::EqualWidth),
            "equal_frequency" => Ok(BinningMethod::EqualFrequency),
            _ => Err(DecisionTreeError::ParseString(
                s.to_string(),
                "BinningMethod".to_string(),
                items_to_strings(vec!["equal_width", "equal_frequency"]),
            )),
        }
    }
}

impl Display for BinningMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BinningMethod::EqualWidth => write!(f, "equal_width"),
            BinningMethod::EqualFrequency => write!(f, "equal_frequency"),
        }
    }
}

/// How bin edges are computed.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct BinningOptions {
    pub method: BinningMethod,
    pub n_bins: usize,
    /// Caller-supplied edges, used as is for the features they name.
    #[serde(default)]
    pub custom_edges: HashMap<String, Vec<f64>>,
}

impl Default for BinningOptions {
    fn default() -> Self {
        BinningOptions {
            method: BinningMethod::EqualWidth,
            n_bins: 10,
            custom_edges: HashMap::new(),
        }
    }
}

impl BinningOptions {
    pub fn new(method: BinningMethod, n_bins: usize) -> Self {
        BinningOptions {
            method,
            n_bins,
            custom_edges: HashMap::new(),
        }
    }

    /// Use `edges` for `feature` instead of computing them.
    pub fn set_custom_edges(mut self, feature: &str, edges: Vec<f64>) -> Self {
        self.custom_edges.insert(feature.to_string(), edges);
        self
    }
}

fn numeric_values(data: &Dataset, feature: &str) -> Vec<f64> {
    (0..data.len()).filter_map(|i| data.get(i, feature).as_f64()).collect()
}

/// `n_bins + 1` uniform edges from the minimum to the maximum of `values`.
pub fn equal_width_edges(values: &[f64], n_bins: usize) -> Option<Vec<f64>> {
    let first = *values.first()?;
    let (min, max) = values
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let width = (max - min) / n_bins as f64;
    Some((0..=n_bins).map(|i| min + i as f64 * width).collect())
}

/// `n_bins + 1` edges placing roughly the same number of values in each bin.
///
/// The outer edges lie just outside the observed range, inner edge `i` is
/// the sorted value at position `round(i * len / n_bins)`.
pub fn equal_frequency_edges(values: &[f64], n_bins: usize) -> Option<Vec<f64>> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = sorted.len() - 1;
    let mut edges = vec![0.0; n_bins + 1];
    edges[0] = sorted[0] - EDGE_MARGIN;
    edges[n_bins] = sorted[last] + EDGE_MARGIN;
    for (i, edge) in edges.iter_mut().enumerate().take(n_bins).skip(1) {
        let position = (i as f64 * sorted.len() as f64 / n_bins as f64).round() as usize;
        *edge = sorted[position.min(last)];
    }
    Some(edges)
}

/// Fitted bin edges per feature.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct BinEdges {
    pub edges: BTreeMap<String, Vec<f64>>,
}

impl BinEdges {
    /// Compute edges for every numerical feature among `features`.
    ///
    /// Features without any numeric value get no edges.
    pub fn fit(data: &Dataset, features: &[String], options: &BinningOptions) -> Result<Self, DecisionTreeError> {
        validate_nonzero_parameter(options.n_bins, "n_bins")?;
        let mut edges = BTreeMap::new();
        for feature in features {
            if data.feature_types.get(feature) != Some(&FeatureType::Numerical) {
                continue;
            }
            if let Some(custom) = options.custom_edges.get(feature) {
                edges.insert(feature.clone(), custom.clone());
                continue;
            }
            let values = numeric_values(data, feature);
            let fitted = match options.method {
                BinningMethod::EqualWidth => equal_width_edges(&values, options.n_bins),
                BinningMethod::EqualFrequency => equal_frequency_edges(&values, options.n_bins),
            };
            if let Some(e) = fitted {
                edges.insert(feature.clone(), e);
            }
        }
        info!(
            "Fitted {} bins with method {} for {} features.",
            options.n_bins,
            options.method,
            edges.len()
        );
        Ok(BinEdges { edges })
    }

    /// Index of the interval containing `value`.
    ///
    /// Intervals are half open, except that the maximum edge itself belongs
    /// to the last bin. `None` when the feature has no edges, the value is
    /// not numeric, or it lies outside the edges.
    pub fn bin_index(&self, feature: &str, value: &Value) -> Option<usize> {
        let edges = self.edges.get(feature)?;
        let v = value.as_f64()?;
        if edges.len() < 2 {
            return None;
        }
        if let Some(i) = edges.windows(2).position(|w| v >= w[0] && v < w[1]) {
            return Some(i);
        }
        if v == edges[edges.len() - 1] {
            return Some(edges.len() - 2);
        }
        None
    }

    // Out of range values are clamped to the first or last bin.
    fn clamped_bin(&self, feature: &str, value: &Value) -> Option<usize> {
        if let Some(i) = self.bin_index(feature, value) {
            return Some(i);
        }
        let edges = self.edges.get(feature).filter(|e| e.len() >= 2)?;
        let v = value.as_f64()?;
        if v < edges[0] {
            Some(0)
        } else if v > edges[edges.len() - 1] {
            Some(edges.len() - 2)
        } else {
            None
        }
    }

    /// Replace every binned numeric value of `data` by its bin index.
    ///
    /// Missing and non-numeric values are left untouched.
    pub fn transform(&self, data: &mut Dataset) {
        for record in data.records.iter_mut() {
            for (feature, value) in record.iter_mut() {
                if let Some(i) = self.clamped_bin(feature, value) {
                    *value = Value::Int(i as i64);
                }
            }
        }
    }
}

impl JsonIO for BinEdges {}
