//! Multi-output Random Forest Regressor

use crate::model::{check_width, ModelOutput, PredictiveModel};
use crate::InferenceError;
use ndarray::{ArrayView1, ArrayView2};
use serde::Deserialize;

/// Marker for "no child" in the node arrays
const LEAF: i64 = -1;

/// One regression tree in flat node-array form
///
/// Node 0 is the root. An internal node sends a row left when
/// `row[feature] <= threshold`. Children always have a larger index than
/// their parent, so traversal terminates.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "TreeRepr")]
pub struct RegressionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<f64>,
}

#[derive(Deserialize)]
struct TreeRepr {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<f64>,
}

impl TryFrom<TreeRepr> for RegressionTree {
    type Error = InferenceError;

    fn try_from(repr: TreeRepr) -> Result<Self, Self::Error> {
        let nodes = repr.value.len();
        let lengths = [
            repr.children_left.len(),
            repr.children_right.len(),
            repr.feature.len(),
            repr.threshold.len(),
        ];
        if nodes == 0 || lengths.iter().any(|&len| len != nodes) {
            return Err(InferenceError::Artifact(format!(
                "tree node arrays must be non-empty and of equal length, found {} values and {:?}",
                nodes, lengths
            )));
        }

        for node in 0..nodes {
            let (left, right) = (repr.children_left[node], repr.children_right[node]);
            if left == LEAF && right == LEAF {
                continue;
            }
            let valid_child = |child: i64| child > node as i64 && (child as usize) < nodes;
            if !valid_child(left) || !valid_child(right) || repr.feature[node] < 0 {
                return Err(InferenceError::Artifact(format!(
                    "tree node {} has invalid children ({}, {}) or feature {}",
                    node, left, right, repr.feature[node]
                )));
            }
        }

        Ok(Self {
            children_left: repr.children_left,
            children_right: repr.children_right,
            feature: repr.feature,
            threshold: repr.threshold,
            value: repr.value,
        })
    }
}

impl RegressionTree {
    /// Leaf value reached by a feature row
    fn predict_row(&self, row: &ArrayView1<'_, f64>) -> f64 {
        let mut node = 0usize;
        loop {
            let left = self.children_left[node];
            if left == LEAF {
                return self.value[node];
            }
            let feature = self.feature[node] as usize;
            node = if row[feature] <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
    }

    /// Highest feature index any split reads
    fn max_feature(&self) -> Option<usize> {
        self.children_left
            .iter()
            .zip(&self.feature)
            .filter(|(left, _)| **left != LEAF)
            .map(|(_, feature)| *feature as usize)
            .max()
    }
}

/// Forest per output; each output is the mean of its trees
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ForestRepr")]
pub struct ForestRegressor {
    input_width: usize,
    outputs: Vec<Vec<RegressionTree>>,
}

#[derive(Deserialize)]
struct ForestRepr {
    input_width: usize,
    outputs: Vec<Vec<RegressionTree>>,
}

impl TryFrom<ForestRepr> for ForestRegressor {
    type Error = InferenceError;

    fn try_from(repr: ForestRepr) -> Result<Self, Self::Error> {
        Self::new(repr.input_width, repr.outputs)
    }
}

impl ForestRegressor {
    pub fn new(input_width: usize, outputs: Vec<Vec<RegressionTree>>) -> Result<Self, InferenceError> {
        if outputs.is_empty() || outputs.iter().any(Vec::is_empty) {
            return Err(InferenceError::Artifact(
                "forest needs at least one tree per output".to_string(),
            ));
        }

        let max_feature = outputs.iter().flatten().filter_map(RegressionTree::max_feature).max();
        if let Some(feature) = max_feature {
            if feature >= input_width {
                return Err(InferenceError::Artifact(format!(
                    "tree splits on feature {} but input width is {}",
                    feature, input_width
                )));
            }
        }

        Ok(Self { input_width, outputs })
    }
}

impl PredictiveModel for ForestRegressor {
    fn kind(&self) -> &str {
        "forest"
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.input_width)
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<ModelOutput, InferenceError> {
        check_width(self.input_width, &features)?;

        let rows = features
            .rows()
            .into_iter()
            .map(|row| {
                self.outputs
                    .iter()
                    .map(|trees| {
                        let sum: f64 = trees.iter().map(|tree| tree.predict_row(&row)).sum();
                        sum / trees.len() as f64
                    })
                    .collect()
            })
            .collect();

        Ok(ModelOutput::Rows(rows))
    }
}
