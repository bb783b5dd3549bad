//! Model
//!
//! A trained tree together with the schema it was trained on, and the
//! JSON persistence shared by every serializable type of the crate.
use crate::config::TreeConfig;
use crate::data::{Dataset, FeatureType, TargetType};
use crate::errors::DecisionTreeError;
use crate::tree::{build_tree, TreeNode};
use crate::value::Value;
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Save and load a serde type as JSON.
pub trait JsonIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file, creating missing parent directories.
    ///
    /// * `path` - Path to save to.
    fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), DecisionTreeError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DecisionTreeError::UnableToWrite(e.to_string()))?;
        }
        fs::write(path, self.json_dump()?).map_err(|e| DecisionTreeError::UnableToWrite(e.to_string()))
    }

    /// Dump as a json object.
    fn json_dump(&self) -> Result<String, DecisionTreeError> {
        serde_json::to_string(self).map_err(|e| DecisionTreeError::UnableToWrite(e.to_string()))
    }

    /// Load from a json string.
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, DecisionTreeError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| DecisionTreeError::UnableToRead(e.to_string()))
    }

    /// Load from a path to a json object.
    ///
    /// * `path` - Path to load from.
    fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, DecisionTreeError> {
        let json_str = fs::read_to_string(path).map_err(|e| DecisionTreeError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

/// A trained decision tree and the training schema.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Model {
    pub tree: TreeNode,
    /// Feature type of every classified training column.
    pub feature_types: BTreeMap<String, FeatureType>,
    pub target_column: String,
    #[serde(default)]
    pub target_type: TargetType,
    /// Training columns in file order, the target included.
    pub columns: Vec<String>,
}

impl Model {
    /// Train a tree on `data` predicting `target_column`.
    ///
    /// * `data` - Training records with classified feature types.
    /// * `target_column` - Column to predict.
    /// * `config` - Stopping rules and concurrency settings.
    pub fn fit(data: &Dataset, target_column: &str, config: &TreeConfig) -> Result<Self, DecisionTreeError> {
        let tree = build_tree(data, target_column, config)?;
        Ok(Model {
            tree,
            feature_types: data.feature_types.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            target_column: target_column.to_string(),
            target_type: data.infer_target_type(target_column),
            columns: data.columns.clone(),
        })
    }

    /// Predict every record of `data`, in record order.
    pub fn predict(&self, data: &Dataset, config: &TreeConfig) -> Result<Vec<Value>, DecisionTreeError> {
        config.validate()?;
        let predictions = self.tree.predict(&data.records, config.num_workers, config.parallel);
        info!("Predicted {} records.", predictions.len());
        Ok(predictions)
    }

    /// Feature columns in training order.
    pub fn features(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| **c != self.target_column)
            .map(|c| c.as_str())
            .collect()
    }

    /// Save the model to `path`.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), DecisionTreeError> {
        let path = path.as_ref();
        self.save_json(path)?;
        info!("Saved model for '{}' to {}.", self.target_column, path.display());
        Ok(())
    }

    /// Load a model from `path`.
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self, DecisionTreeError> {
        let path = path.as_ref();
        let model = Self::load_json(path)?;
        info!(
            "Loaded model for '{}' from {}: {} leaves, depth {}.",
            model.target_column,
            path.display(),
            model.tree.n_leaves(),
            model.tree.depth()
        );
        Ok(model)
    }
}

impl JsonIO for Model {}
