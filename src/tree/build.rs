use crate::config::TreeConfig;
use crate::data::Dataset;
use crate::entropy::{entropy, most_common};
use crate::errors::DecisionTreeError;
use crate::splitter::{GainRatioSplitter, SplitPartition};
use crate::tree::tree::{DecisionNode, NodeSplit, TreeNode};
use crate::value::Value;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Grows a tree over a dataset by recursive gain-ratio splitting.
pub struct TreeBuilder<'a> {
    data: &'a Dataset,
    target_column: &'a str,
    config: &'a TreeConfig,
    splitter: GainRatioSplitter<'a>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(data: &'a Dataset, target_column: &'a str, config: &'a TreeConfig) -> Self {
        TreeBuilder {
            data,
            target_column,
            config,
            splitter: GainRatioSplitter::new(data, target_column).set_parallel(config.parallel),
        }
    }

    /// Build a tree over every record, splitting on all columns but the target.
    ///
    /// # Errors
    ///
    /// Fails when the target is not a column, the configuration is invalid,
    /// or a feature that reaches split search has no feature type.
    pub fn build_tree(&self) -> Result<TreeNode, DecisionTreeError> {
        self.config.validate()?;
        self.data.validate_target(self.target_column)?;
        if self.data.is_empty() {
            warn!("Training set is empty, the tree is a single leaf without a prediction.");
        }

        let features = self.data.features(self.target_column);
        let indices: Vec<usize> = (0..self.data.len()).collect();
        let tree = self.build_node(&indices, &features, 0)?;

        info!(
            "Built tree for '{}' from {} records: {} nodes, {} leaves, depth {}.",
            self.target_column,
            self.data.len(),
            tree.n_nodes(),
            tree.n_leaves(),
            tree.depth()
        );
        Ok(tree)
    }

    fn majority_leaf(&self, indices: &[usize]) -> TreeNode {
        TreeNode::leaf(most_common(self.data, indices, self.target_column))
    }

    /// Build the subtree for `indices`.
    ///
    /// Stopping rules, in order: maximum depth, too few samples, pure subset,
    /// and a winning gain ratio below `min_info_gain`.
    pub fn build_node(
        &self,
        indices: &[usize],
        features: &[String],
        depth: usize,
    ) -> Result<TreeNode, DecisionTreeError> {
        if depth >= self.config.max_depth
            || indices.len() <= self.config.min_samples_leaf
            || entropy(self.data, indices, self.target_column) == 0.0
        {
            return Ok(self.majority_leaf(indices));
        }

        let split = self.splitter.find_best_split(indices, features)?;
        if split.gain_ratio < self.config.min_info_gain || !split.is_split() {
            debug!(
                "Pruning {} samples at depth {}, best gain ratio {:.6} on '{}'.",
                indices.len(),
                depth,
                split.gain_ratio,
                split.feature
            );
            return Ok(self.majority_leaf(indices));
        }
        debug!(
            "Splitting {} samples at depth {} on '{}', gain ratio {:.6}.",
            indices.len(),
            depth,
            split.feature,
            split.gain_ratio
        );

        match split.partition {
            SplitPartition::Categorical(groups) => {
                self.build_categorical(indices, features, depth, split.feature, groups)
            }
            SplitPartition::Numerical { threshold, left, right } => {
                self.build_numerical(features, depth, split.feature, threshold, left, right)
            }
            SplitPartition::None => Ok(self.majority_leaf(indices)),
        }
    }

    // Each value branch is built as its own task, and the finished subtrees
    // are merged into the children map after all of them complete. The first
    // failing branch aborts the whole build.
    fn build_categorical(
        &self,
        indices: &[usize],
        features: &[String],
        depth: usize,
        feature: String,
        groups: Vec<(String, Vec<usize>)>,
    ) -> Result<TreeNode, DecisionTreeError> {
        type Child = Option<(String, TreeNode)>;
        let build_child = |(key, child_indices): (String, Vec<usize>)| -> Result<Child, DecisionTreeError> {
            if child_indices.is_empty() {
                return Ok(None);
            }
            let child = self.build_node(&child_indices, features, depth + 1)?;
            Ok(Some((key, child)))
        };
        let built: Vec<Child> = if self.config.parallel {
            groups.into_par_iter().map(build_child).collect::<Result<_, _>>()?
        } else {
            groups.into_iter().map(build_child).collect::<Result<_, _>>()?
        };

        let children: BTreeMap<String, TreeNode> = built.into_iter().flatten().collect();
        if children.is_empty() {
            warn!("Categorical split on '{}' produced no children, using a leaf.", feature);
            return Ok(self.majority_leaf(indices));
        }
        Ok(TreeNode::Decision(DecisionNode::new(
            feature,
            Value::Missing,
            NodeSplit::Categorical { children },
        )))
    }

    fn build_numerical(
        &self,
        features: &[String],
        depth: usize,
        feature: String,
        threshold: Value,
        left: Vec<usize>,
        right: Vec<usize>,
    ) -> Result<TreeNode, DecisionTreeError> {
        let (left_node, right_node) = if self.config.parallel {
            rayon::join(
                || self.build_node(&left, features, depth + 1),
                || self.build_node(&right, features, depth + 1),
            )
        } else {
            (
                self.build_node(&left, features, depth + 1),
                self.build_node(&right, features, depth + 1),
            )
        };
        let (left_node, right_node) = (left_node?, right_node?);

        // Sibling leaves that print the same prediction collapse into one leaf.
        if let (TreeNode::Leaf { prediction: l }, TreeNode::Leaf { prediction: r }) = (&left_node, &right_node) {
            if l.key() == r.key() {
                return Ok(TreeNode::leaf(l.clone()));
            }
        }

        Ok(TreeNode::Decision(DecisionNode::new(
            feature,
            Value::Missing,
            NodeSplit::Numerical {
                split_value: threshold,
                left: Some(Box::new(left_node)),
                right: Some(Box::new(right_node)),
            },
        )))
    }
}

/// Build a decision tree predicting `target_column` from the other columns of `data`.
pub fn build_tree(data: &Dataset, target_column: &str, config: &TreeConfig) -> Result<TreeNode, DecisionTreeError> {
    TreeBuilder::new(data, target_column, config).build_tree()
}
