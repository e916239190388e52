//! Random forest classifier stored as flat per-tree node arrays.
//!
//! Each tree keeps the layout of a fitted decision tree: node `i` is a leaf
//! when `children_left[i] == -1`, otherwise samples with
//! `x[feature[i]] <= threshold[i]` go left.

use std::path::Path;

use log::debug;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::artifact::read_json;
use crate::error::{InferenceError, Result};
use crate::traits::Classifier;

pub const LEAF: i64 = -1;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Class weights per node. Only the proportions matter.
    pub value: Vec<Vec<f64>>,
    /// Weighted number of training samples reaching each node.
    #[serde(alias = "cover")]
    pub weighted_n_node_samples: Vec<f64>,
}

impl Tree {
    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] == LEAF
    }

    pub fn left(&self, node: usize) -> usize {
        self.children_left[node] as usize
    }

    pub fn right(&self, node: usize) -> usize {
        self.children_right[node] as usize
    }

    pub fn split_feature(&self, node: usize) -> usize {
        self.feature[node] as usize
    }

    pub fn cover(&self, node: usize) -> f64 {
        self.weighted_n_node_samples[node]
    }

    /// Child a sample descends into from an internal node.
    ///
    /// Fitted trees store single precision thresholds and compare the
    /// feature after casting it to `f32`.
    pub fn next_node(&self, node: usize, x: ArrayView1<f64>) -> usize {
        let value = x[self.split_feature(node)] as f32 as f64;
        if value <= self.threshold[node] {
            self.left(node)
        } else {
            self.right(node)
        }
    }

    /// Leaf reached by `x`.
    pub fn apply(&self, x: ArrayView1<f64>) -> usize {
        let mut node = 0;
        while !self.is_leaf(node) {
            node = self.next_node(node, x);
        }
        node
    }

    /// Node class weights normalised to probabilities. An empty node stays at zero.
    pub fn node_probabilities(&self, node: usize) -> Vec<f64> {
        let row = &self.value[node];
        let total: f64 = row.iter().sum();
        if total > 0.0 {
            row.iter().map(|v| v / total).collect()
        } else {
            vec![0.0; row.len()]
        }
    }

    fn validate(&self, index: usize, n_features: usize, n_classes: usize) -> Result<()> {
        let invalid = |msg: String| InferenceError::InvalidArtifact(format!("tree {}: {}", index, msg));

        let n = self.node_count();
        if n == 0 {
            return Err(invalid("has no nodes".to_string()));
        }
        let lengths = [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
            self.weighted_n_node_samples.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(invalid(format!("node arrays differ in length (expected {})", n)));
        }

        for node in 0..n {
            if self.value[node].len() != n_classes {
                return Err(invalid(format!(
                    "node {} has {} class values, expected {}",
                    node,
                    self.value[node].len(),
                    n_classes
                )));
            }
            if self.cover(node).is_nan() || self.cover(node) <= 0.0 {
                return Err(invalid(format!("node {} has no cover", node)));
            }
            if self.is_leaf(node) {
                continue;
            }
            // children are always stored after their parent, which also rules out cycles
            for child in [self.children_left[node], self.children_right[node]] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(invalid(format!("node {} has out of order child {}", node, child)));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(invalid(format!("node {} splits on unknown feature {}", node, feature)));
            }
        }
        Ok(())
    }
}

/// Ensemble of decision trees whose leaf probabilities are averaged.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(n_features: usize, n_classes: usize, trees: Vec<Tree>) -> Result<Self> {
        let forest = RandomForest {
            n_features,
            n_classes,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let forest: RandomForest = read_json(path)?;
        forest.validate()?;
        debug!(
            "Loaded forest: {} trees, {} features, {} classes",
            forest.trees.len(),
            forest.n_features,
            forest.n_classes
        );
        Ok(forest)
    }

    fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(InferenceError::InvalidArtifact("forest has no trees".to_string()));
        }
        if self.n_classes == 0 {
            return Err(InferenceError::InvalidArtifact("forest has no classes".to_string()));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index, self.n_features, self.n_classes)?;
        }
        Ok(())
    }

    pub(crate) fn check_input(&self, x: ArrayView1<f64>) -> Result<()> {
        if x.len() != self.n_features {
            return Err(InferenceError::ShapeMismatch {
                expected: self.n_features,
                actual: x.len(),
            });
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn predict(&self, x: ArrayView1<f64>) -> Result<usize> {
        let proba = self.predict_proba(x)?;
        let mut best = 0;
        for (class, &p) in proba.iter().enumerate() {
            if p > proba[best] {
                best = class;
            }
        }
        Ok(best)
    }

    fn predict_proba(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        self.check_input(x)?;

        let mut proba = Array1::<f64>::zeros(self.n_classes);
        for tree in &self.trees {
            let leaf = tree.apply(x);
            for (class, p) in tree.node_probabilities(leaf).into_iter().enumerate() {
                proba[class] += p;
            }
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn name(&self) -> &str {
        "random_forest"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::array;

    /// Single split on feature 0 at 0.5: three normal samples left, one abnormal right.
    pub(crate) fn stump() -> Tree {
        Tree {
            children_left: vec![1, LEAF, LEAF],
            children_right: vec![2, LEAF, LEAF],
            feature: vec![0, -2, -2],
            threshold: vec![0.5, -2.0, -2.0],
            value: vec![vec![3.0, 1.0], vec![3.0, 0.0], vec![0.0, 1.0]],
            weighted_n_node_samples: vec![4.0, 3.0, 1.0],
        }
    }

    /// Depth two tree over features 0 and 1.
    pub(crate) fn two_level() -> Tree {
        Tree {
            children_left: vec![1, 3, 5, LEAF, LEAF, LEAF, LEAF],
            children_right: vec![2, 4, 6, LEAF, LEAF, LEAF, LEAF],
            feature: vec![0, 1, 1, -2, -2, -2, -2],
            threshold: vec![0.0, 0.0, 1.0, -2.0, -2.0, -2.0, -2.0],
            value: vec![
                vec![5.0, 5.0],
                vec![4.0, 2.0],
                vec![1.0, 3.0],
                vec![3.0, 0.0],
                vec![1.0, 2.0],
                vec![1.0, 1.0],
                vec![0.0, 2.0],
            ],
            weighted_n_node_samples: vec![10.0, 6.0, 4.0, 3.0, 3.0, 2.0, 2.0],
        }
    }

    #[test]
    fn single_tree_probabilities_follow_the_leaf() {
        let forest = RandomForest::new(2, 2, vec![stump()]).unwrap();
        let left = forest.predict_proba(array![0.2, 9.0].view()).unwrap();
        assert_eq!(left.to_vec(), vec![1.0, 0.0]);
        let right = forest.predict_proba(array![0.7, 9.0].view()).unwrap();
        assert_eq!(right.to_vec(), vec![0.0, 1.0]);
        assert_eq!(forest.predict(array![0.7, 9.0].view()).unwrap(), 1);
    }

    #[test]
    fn threshold_is_inclusive_on_the_left() {
        let forest = RandomForest::new(2, 2, vec![stump()]).unwrap();
        assert_eq!(forest.predict(array![0.5, 0.0].view()).unwrap(), 0);
    }

    #[test]
    fn forest_averages_tree_probabilities() {
        let forest = RandomForest::new(2, 2, vec![stump(), two_level()]).unwrap();
        // stump -> right leaf [0, 1]; two_level -> node 2 -> node 6 [0, 1]
        let proba = forest.predict_proba(array![2.0, 2.0].view()).unwrap();
        assert!((proba[1] - 1.0).abs() < 1e-12);

        // stump -> left leaf [1, 0]; two_level -> node 1 -> node 4 [1/3, 2/3]
        let proba = forest.predict_proba(array![-1.0, 1.0].view()).unwrap();
        assert!((proba[0] - (1.0 + 1.0 / 3.0) / 2.0).abs() < 1e-12);
        assert!((proba.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn features_are_compared_in_single_precision() {
        let mut tree = stump();
        tree.threshold[0] = 0.1f32 as f64;
        let forest = RandomForest::new(2, 2, vec![tree]).unwrap();
        // above the threshold in f64, equal to it once rounded to f32
        let x = array![0.1f32 as f64 + 1e-10, 0.0];
        assert!(x[0] > forest.trees[0].threshold[0]);
        assert_eq!(forest.predict(x.view()).unwrap(), 0);
    }

    #[test]
    fn ties_resolve_to_the_first_class() {
        let forest = RandomForest::new(2, 2, vec![two_level()]).unwrap();
        // node 2 -> node 5 with [1, 1]
        assert_eq!(forest.predict(array![1.0, 0.5].view()).unwrap(), 0);
    }

    #[test]
    fn wrong_input_length_is_rejected() {
        let forest = RandomForest::new(2, 2, vec![stump()]).unwrap();
        assert!(matches!(
            forest.predict_proba(array![1.0].view()),
            Err(InferenceError::ShapeMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn malformed_trees_are_rejected() {
        let mut backwards = stump();
        backwards.children_left[0] = 0;
        assert!(RandomForest::new(2, 2, vec![backwards]).is_err());

        let mut unknown_feature = stump();
        unknown_feature.feature[0] = 5;
        assert!(RandomForest::new(2, 2, vec![unknown_feature]).is_err());

        let mut empty_leaf = stump();
        empty_leaf.weighted_n_node_samples[2] = 0.0;
        assert!(RandomForest::new(2, 2, vec![empty_leaf]).is_err());

        let mut short = stump();
        short.threshold.pop();
        assert!(RandomForest::new(2, 2, vec![short]).is_err());

        assert!(RandomForest::new(2, 2, vec![]).is_err());
        assert!(RandomForest::new(2, 3, vec![stump()]).is_err());
    }
}
