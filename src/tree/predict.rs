use super::tree::{NodeSplit, TreeNode};
use crate::data::Record;
use crate::value::{compare_values, Value};
use rayon::prelude::*;
use std::cmp::Ordering;

/// Routing weight of a subtree: its leaf count, 0 for an absent branch.
pub fn estimate_size(node: Option<&TreeNode>) -> usize {
    node.map_or(0, TreeNode::n_leaves)
}

// Largest subtree, ties keep the first in iteration order.
fn largest<'a, I: Iterator<Item = &'a TreeNode>>(nodes: I) -> Option<&'a TreeNode> {
    let mut best: Option<&TreeNode> = None;
    for node in nodes {
        if estimate_size(Some(node)) > estimate_size(best) {
            best = Some(node);
        }
    }
    best
}

impl TreeNode {
    /// Route a single record to a leaf and return its prediction.
    ///
    /// Unseen categories and missing values follow the largest subtree.
    /// A numerical branch that is absent yields the node's own prediction.
    pub fn predict_record<'a>(&'a self, record: &Record) -> &'a Value {
        let mut node = self;
        loop {
            let decision = match node {
                TreeNode::Leaf { prediction } => return prediction,
                TreeNode::Decision(d) => d,
            };
            let value = record.get(&decision.feature).filter(|v| !v.is_missing());
            let next = match decision.split() {
                NodeSplit::Categorical { children } => value
                    .and_then(|v| children.get(&v.key()))
                    .or_else(|| largest(children.values())),
                NodeSplit::Numerical {
                    split_value,
                    left,
                    right,
                } => {
                    let (left, right) = (left.as_deref(), right.as_deref());
                    match value {
                        Some(v) if compare_values(v, split_value) == Ordering::Less => left,
                        Some(_) => right,
                        None if estimate_size(right) > estimate_size(left) => right,
                        None => left,
                    }
                }
            };
            match next {
                Some(child) => node = child,
                None => return &decision.prediction,
            }
        }
    }

    fn predict_single_threaded(&self, records: &[Record]) -> Vec<Value> {
        records.iter().map(|r| self.predict_record(r).clone()).collect()
    }

    // Records are cut into `num_workers` contiguous chunks, the last one
    // shorter when the count does not divide evenly. Each chunk writes only
    // its own slice of the output.
    fn predict_parallel(&self, records: &[Record], num_workers: usize) -> Vec<Value> {
        let mut predictions = vec![Value::Missing; records.len()];
        if records.is_empty() {
            return predictions;
        }
        let chunk_size = records.len().div_ceil(num_workers.max(1));
        predictions
            .par_chunks_mut(chunk_size)
            .zip(records.par_chunks(chunk_size))
            .for_each(|(out, chunk)| {
                for (p, r) in out.iter_mut().zip(chunk) {
                    *p = self.predict_record(r).clone();
                }
            });
        predictions
    }

    /// Predict every record, preserving order.
    ///
    /// * `records` - Records to route through the tree.
    /// * `num_workers` - Number of contiguous chunks evaluated concurrently.
    /// * `parallel` - Evaluate chunks concurrently.
    pub fn predict(&self, records: &[Record], num_workers: usize, parallel: bool) -> Vec<Value> {
        if parallel {
            self.predict_parallel(records, num_workers)
        } else {
            self.predict_single_threaded(records)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record;
    use crate::tree::tree::DecisionNode;
    use std::collections::BTreeMap;

    fn decision(feature: &str, split: NodeSplit) -> TreeNode {
        TreeNode::Decision(DecisionNode::new(feature.to_string(), Value::Missing, split))
    }

    fn leaf(v: &str) -> Option<Box<TreeNode>> {
        Some(Box::new(TreeNode::leaf(Value::from(v))))
    }

    fn numeric_tree() -> TreeNode {
        decision(
            "feature1",
            NodeSplit::Numerical {
                split_value: Value::Float(10.0),
                left: leaf("A"),
                right: leaf("B"),
            },
        )
    }

    // Categorical root: "sunny" holds a two-leaf subtree, "rain" a single leaf.
    fn outlook_tree() -> TreeNode {
        let sunny = decision(
            "humidity",
            NodeSplit::Numerical {
                split_value: Value::Int(70),
                left: leaf("yes"),
                right: leaf("no"),
            },
        );
        decision(
            "outlook",
            NodeSplit::Categorical {
                children: BTreeMap::from([
                    ("rain".to_string(), TreeNode::leaf(Value::from("yes"))),
                    ("sunny".to_string(), sunny),
                ]),
            },
        )
    }

    #[test]
    fn test_predict_leaf() {
        let tree = TreeNode::leaf(Value::from("A"));
        assert_eq!(tree.predict_record(&Record::new()), &Value::from("A"));
    }

    #[test]
    fn test_predict_numerical_threshold() {
        let tree = numeric_tree();
        assert_eq!(tree.predict_record(&record([("feature1", 5.0)])), &Value::from("A"));
        assert_eq!(tree.predict_record(&record([("feature1", 10.0)])), &Value::from("B"));
        assert_eq!(tree.predict_record(&record([("feature1", 15_i64)])), &Value::from("B"));
    }

    #[test]
    fn test_predict_numerical_missing_prefers_larger_side() {
        // Equal sizes go left.
        assert_eq!(numeric_tree().predict_record(&Record::new()), &Value::from("A"));

        let tree = decision(
            "x",
            NodeSplit::Numerical {
                split_value: Value::Int(0),
                left: leaf("small"),
                right: Some(Box::new(numeric_tree())),
            },
        );
        assert_eq!(tree.predict_record(&record([("feature1", 1.0)])), &Value::from("A"));
    }

    #[test]
    fn test_predict_absent_branch_uses_node_prediction() {
        let tree = TreeNode::Decision(DecisionNode::new(
            "x".to_string(),
            Value::from("fallback"),
            NodeSplit::Numerical {
                split_value: Value::Int(3),
                left: leaf("low"),
                right: None,
            },
        ));
        assert_eq!(tree.predict_record(&record([("x", 1_i64)])), &Value::from("low"));
        assert_eq!(tree.predict_record(&record([("x", 9_i64)])), &Value::from("fallback"));

        let bare = TreeNode::Decision(DecisionNode::new(
            "x".to_string(),
            Value::Missing,
            NodeSplit::Numerical {
                split_value: Value::Int(3),
                left: None,
                right: None,
            },
        ));
        assert!(bare.predict_record(&Record::new()).is_missing());
    }

    #[test]
    fn test_predict_categorical() {
        let tree = outlook_tree();
        let rain = record([("outlook", Value::from("rain")), ("humidity", Value::Int(90))]);
        assert_eq!(tree.predict_record(&rain), &Value::from("yes"));
        let sunny = record([("outlook", Value::from("sunny")), ("humidity", Value::Int(90))]);
        assert_eq!(tree.predict_record(&sunny), &Value::from("no"));
    }

    #[test]
    fn test_predict_unseen_and_missing_category_follow_largest_subtree() {
        let tree = outlook_tree();
        let overcast = record([("outlook", Value::from("overcast")), ("humidity", Value::Int(50))]);
        assert_eq!(tree.predict_record(&overcast), &Value::from("yes"));
        let missing = record([("humidity", Value::Int(80))]);
        assert_eq!(tree.predict_record(&missing), &Value::from("no"));
    }

    #[test]
    fn test_equal_size_subtrees_route_to_smallest_key() {
        let split = |feature: &str, low: &str, high: &str| {
            decision(
                feature,
                NodeSplit::Numerical {
                    split_value: Value::Int(0),
                    left: leaf(low),
                    right: leaf(high),
                },
            )
        };
        let tree = decision(
            "season",
            NodeSplit::Categorical {
                children: BTreeMap::from([
                    ("winter".to_string(), split("wind", "calm", "storm")),
                    ("autumn".to_string(), split("rain", "dry", "wet")),
                    ("summer".to_string(), split("sun", "cloudy", "clear")),
                ]),
            },
        );
        let unseen = record([("season", Value::from("monsoon")), ("rain", Value::Int(5))]);
        assert_eq!(tree.predict_record(&unseen), &Value::from("wet"));
        let missing = record([("rain", Value::Int(-1))]);
        assert_eq!(tree.predict_record(&missing), &Value::from("dry"));
    }

    #[test]
    fn test_estimate_size() {
        assert_eq!(estimate_size(None), 0);
        assert_eq!(estimate_size(Some(&TreeNode::leaf(Value::Int(1)))), 1);
        assert_eq!(estimate_size(Some(&outlook_tree())), 3);
    }

    #[test]
    fn test_predict_order_independent_of_workers() {
        let tree = outlook_tree();
        let records: Vec<Record> = (0..103_i64)
            .map(|i| {
                let outlook = if i % 3 == 0 { "rain" } else { "sunny" };
                record([("outlook", Value::from(outlook)), ("humidity", Value::Int(i))])
            })
            .collect();
        let expected = tree.predict(&records, 1, false);
        assert_eq!(expected.len(), 103);
        assert_eq!(expected[1], Value::from("yes"));
        assert_eq!(expected[71], Value::from("no"));
        for workers in [1, 2, 4, 7, 200] {
            assert_eq!(tree.predict(&records, workers, true), expected);
        }
        assert!(tree.predict(&[], 4, true).is_empty());
    }
}
