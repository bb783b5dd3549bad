//! Entropy
//!
//! Target impurity and majority vote over a subset of record indices.
use crate::data::Dataset;
use crate::value::Value;
use hashbrown::HashMap;

/// Occurrence count of one target class within a subset.
#[derive(Debug)]
pub struct ClassCount<'a> {
    pub key: String,
    pub count: usize,
    /// First value seen with this key.
    pub value: &'a Value,
}

/// Count `target_column` classes over `indices`, in order of first occurrence.
///
/// Classes are identified by [`Value::key`]. The fixed order keeps every
/// floating point sum and tie-break reproducible.
pub fn class_counts<'a>(data: &'a Dataset, indices: &[usize], target_column: &str) -> Vec<ClassCount<'a>> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<ClassCount> = Vec::new();
    for &idx in indices {
        let value = data.get(idx, target_column);
        let key = value.key();
        match position.get(&key) {
            Some(&p) => counts[p].count += 1,
            None => {
                position.insert(key.clone(), counts.len());
                counts.push(ClassCount { key, count: 1, value });
            }
        }
    }
    counts
}

/// Base-2 Shannon entropy of the target distribution over `indices`.
///
/// An empty subset has entropy 0.
pub fn entropy(data: &Dataset, indices: &[usize], target_column: &str) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let n = indices.len() as f64;
    let e: f64 = class_counts(data, indices, target_column)
        .iter()
        .map(|c| {
            let p = c.count as f64 / n;
            -p * p.log2()
        })
        .sum();
    // A pure subset sums to -0.0.
    e.max(0.0)
}

/// Most frequent target value over `indices`, missing for an empty subset.
///
/// Ties resolve to the class that occurs first in `indices`.
pub fn most_common(data: &Dataset, indices: &[usize], target_column: &str) -> Value {
    let mut best: Option<ClassCount> = None;
    for c in class_counts(data, indices, target_column) {
        if best.as_ref().map_or(true, |b| c.count > b.count) {
            best = Some(c);
        }
    }
    best.map(|c| c.value.clone()).unwrap_or(Value::Missing)
}
