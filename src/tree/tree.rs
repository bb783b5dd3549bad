use crate::constants::UNKNOWN_PREDICTION;
use crate::data::FeatureType;
use crate::errors::DecisionTreeError;
use crate::value::Value;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// A node of a decision tree. Each child is owned by its parent, and a
/// tree is never mutated once built or loaded.
#[derive(Deserialize, Clone, PartialEq, Debug)]
#[serde(try_from = "RawNode")]
pub enum TreeNode {
    Leaf { prediction: Value },
    Decision(DecisionNode),
}

/// Internal node holding a splitting rule.
#[derive(Clone, PartialEq, Debug)]
pub struct DecisionNode {
    pub feature: String,
    /// Returned when routing reaches an absent branch. Built trees leave
    /// this missing.
    pub prediction: Value,
    split: NodeSplit,
    n_leaves: usize,
}

#[derive(Clone, PartialEq, Debug)]
pub enum NodeSplit {
    /// One child per normalized feature value, in key order.
    Categorical { children: BTreeMap<String, TreeNode> },
    /// `value < split_value` goes left, everything else right.
    Numerical {
        split_value: Value,
        left: Option<Box<TreeNode>>,
        right: Option<Box<TreeNode>>,
    },
}

impl NodeSplit {
    pub fn split_type(&self) -> FeatureType {
        match self {
            NodeSplit::Categorical { .. } => FeatureType::Categorical,
            NodeSplit::Numerical { .. } => FeatureType::Numerical,
        }
    }

    fn children(&self) -> Vec<&TreeNode> {
        match self {
            NodeSplit::Categorical { children } => children.values().collect(),
            NodeSplit::Numerical { left, right, .. } => left.iter().chain(right.iter()).map(|c| &**c).collect(),
        }
    }
}

impl DecisionNode {
    pub fn new(feature: String, prediction: Value, split: NodeSplit) -> Self {
        let n_leaves = split.children().iter().map(|c| c.n_leaves()).sum();
        DecisionNode {
            feature,
            prediction,
            split,
            n_leaves,
        }
    }

    pub fn split(&self) -> &NodeSplit {
        &self.split
    }
}

impl TreeNode {
    pub fn leaf(prediction: Value) -> Self {
        TreeNode::Leaf { prediction }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// The leaf prediction, or the fallback prediction of a decision node.
    pub fn prediction(&self) -> &Value {
        match self {
            TreeNode::Leaf { prediction } => prediction,
            TreeNode::Decision(d) => &d.prediction,
        }
    }

    /// Number of leaves in the subtree, memoized on decision nodes.
    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Decision(d) => d.n_leaves,
        }
    }

    /// Total number of nodes in the subtree.
    pub fn n_nodes(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Decision(d) => 1 + d.split.children().iter().map(|c| c.n_nodes()).sum::<usize>(),
        }
    }

    /// Length of the longest root to leaf path, a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Decision(d) => 1 + d.split.children().iter().map(|c| c.depth()).max().unwrap_or(0),
        }
    }
}

// Persisted layout. Every node carries `is_leaf`, the remaining fields are
// omitted when empty.
#[derive(Serialize)]
struct RawNodeRef<'a> {
    is_leaf: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    prediction: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    split_value: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    split_type: Option<FeatureType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<&'a BTreeMap<String, TreeNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    left: Option<&'a TreeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    right: Option<&'a TreeNode>,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default)]
    is_leaf: bool,
    #[serde(default)]
    prediction: Value,
    #[serde(default)]
    feature: String,
    #[serde(default)]
    split_value: Value,
    #[serde(default)]
    split_type: Option<FeatureType>,
    #[serde(default)]
    children: Option<BTreeMap<String, TreeNode>>,
    #[serde(default)]
    left: Option<Box<TreeNode>>,
    #[serde(default)]
    right: Option<Box<TreeNode>>,
}

fn present(v: &Value) -> Option<&Value> {
    if v.is_missing() {
        None
    } else {
        Some(v)
    }
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = match self {
            TreeNode::Leaf { prediction } => RawNodeRef {
                is_leaf: true,
                prediction: present(prediction),
                feature: None,
                split_value: None,
                split_type: None,
                children: None,
                left: None,
                right: None,
            },
            TreeNode::Decision(d) => {
                let mut raw = RawNodeRef {
                    is_leaf: false,
                    prediction: present(&d.prediction),
                    feature: Some(d.feature.as_str()),
                    split_value: None,
                    split_type: Some(d.split.split_type()),
                    children: None,
                    left: None,
                    right: None,
                };
                match &d.split {
                    NodeSplit::Categorical { children } => {
                        raw.children = Some(children).filter(|c| !c.is_empty());
                    }
                    NodeSplit::Numerical {
                        split_value,
                        left,
                        right,
                    } => {
                        raw.split_value = present(split_value);
                        raw.left = left.as_deref();
                        raw.right = right.as_deref();
                    }
                }
                raw
            }
        };
        raw.serialize(serializer)
    }
}

impl TryFrom<RawNode> for TreeNode {
    type Error = DecisionTreeError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        if raw.is_leaf {
            return Ok(TreeNode::leaf(raw.prediction));
        }
        if raw.feature.is_empty() {
            return Err(DecisionTreeError::InvalidTree(
                "decision node without a feature".to_string(),
            ));
        }
        let split = match raw.split_type {
            Some(FeatureType::Categorical) => {
                let children = raw.children.unwrap_or_default();
                if children.is_empty() {
                    return Err(DecisionTreeError::InvalidTree(format!(
                        "categorical split on '{}' has no children",
                        raw.feature
                    )));
                }
                NodeSplit::Categorical { children }
            }
            Some(FeatureType::Numerical) => {
                if raw.split_value.is_missing() {
                    return Err(DecisionTreeError::InvalidTree(format!(
                        "numerical split on '{}' has no split value",
                        raw.feature
                    )));
                }
                NodeSplit::Numerical {
                    split_value: raw.split_value,
                    left: raw.left,
                    right: raw.right,
                }
            }
            None => {
                return Err(DecisionTreeError::InvalidTree(format!(
                    "split on '{}' has no split type",
                    raw.feature
                )))
            }
        };
        Ok(TreeNode::Decision(DecisionNode::new(raw.feature, raw.prediction, split)))
    }
}

fn fmt_prediction(prediction: &Value) -> String {
    if prediction.is_missing() {
        UNKNOWN_PREDICTION.to_string()
    } else {
        prediction.to_string()
    }
}

fn fmt_node(node: &TreeNode, depth: usize, r: &mut String) {
    let indent = "      ".repeat(depth);
    match node {
        TreeNode::Leaf { prediction } => {
            *r += format!("{}predict {}\n", indent, fmt_prediction(prediction)).as_str();
        }
        TreeNode::Decision(d) => match &d.split {
            NodeSplit::Categorical { children } => {
                for (key, child) in children {
                    *r += format!("{}{} == {}\n", indent, d.feature, key).as_str();
                    fmt_node(child, depth + 1, r);
                }
            }
            NodeSplit::Numerical {
                split_value,
                left,
                right,
            } => {
                for (op, side) in [("<", left), (">=", right)] {
                    *r += format!("{}{} {} {}\n", indent, d.feature, op, split_value).as_str();
                    match side {
                        Some(child) => fmt_node(child, depth + 1, r),
                        None => *r += format!("{}      predict {}\n", indent, fmt_prediction(&d.prediction)).as_str(),
                    }
                }
            }
        },
    }
}

impl Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut r = String::new();
        fmt_node(self, 0, &mut r);
        write!(f, "{}", r)
    }
}
