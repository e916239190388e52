//! Exact TreeSHAP attributions for the random forest.
//!
//! Attributions are computed with the path-dependent algorithm of Lundberg
//! et al.: the training cover stored on every node stands in for the
//! background distribution, so no reference data set is needed. Leaf values
//! are the normalised class probabilities, and per-tree attributions are
//! averaged over the forest, which makes
//! `expected_value(c) + sum(attributions) == predict_proba(x)[c]`.

use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{InferenceError, Result};
use crate::forest::{RandomForest, Tree};
use crate::traits::AttributionEngine;

/// One step of the decision path tracked during the recursion.
#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` for the placeholder element at the root.
    feature: Option<usize>,
    /// Fraction of the cover flowing down this path when the feature is unknown.
    zero_fraction: f64,
    /// 1 when `x` follows this path, 0 otherwise.
    one_fraction: f64,
    /// Permutation weight of subsets of the current path length.
    pweight: f64,
}

pub struct TreeExplainer {
    forest: Arc<RandomForest>,
    expected_values: Array1<f64>,
}

impl TreeExplainer {
    pub fn new(forest: Arc<RandomForest>) -> Self {
        let mut expected_values = Array1::<f64>::zeros(forest.n_classes);
        for tree in &forest.trees {
            for (class, value) in tree_expected_values(tree).into_iter().enumerate() {
                expected_values[class] += value;
            }
        }
        expected_values /= forest.trees.len() as f64;

        TreeExplainer {
            forest,
            expected_values,
        }
    }

    /// Mean model output over the training cover for `class`.
    pub fn expected_value(&self, class: usize) -> f64 {
        self.expected_values.get(class).copied().unwrap_or(0.0)
    }

    /// Attributions for every class, shaped `(n_features, n_classes)`.
    pub fn shap_values(&self, x: ArrayView1<f64>) -> Result<Array2<f64>> {
        self.forest.check_input(x)?;

        let mut phi = Array2::<f64>::zeros((self.forest.n_features, self.forest.n_classes));
        for tree in &self.forest.trees {
            let mut walker = TreeWalker {
                tree,
                x,
                phi: &mut phi,
            };
            walker.recurse(0, Vec::new(), 1.0, 1.0, None);
        }
        phi /= self.forest.trees.len() as f64;
        Ok(phi)
    }
}

impl AttributionEngine for TreeExplainer {
    fn compute_attributions(&self, x: ArrayView1<f64>, class: usize) -> Result<Array1<f64>> {
        if class >= self.forest.n_classes {
            return Err(InferenceError::InvalidArtifact(format!(
                "class {} requested from a {}-class model",
                class, self.forest.n_classes
            )));
        }
        let phi = self.shap_values(x)?;
        Ok(phi.column(class).to_owned())
    }
}

/// Cover-weighted average of the leaf probabilities of one tree.
fn tree_expected_values(tree: &Tree) -> Vec<f64> {
    fn walk(tree: &Tree, node: usize, weight: f64, acc: &mut [f64]) {
        if tree.is_leaf(node) {
            for (class, p) in tree.node_probabilities(node).into_iter().enumerate() {
                acc[class] += weight * p;
            }
            return;
        }
        let cover = tree.cover(node);
        let (left, right) = (tree.left(node), tree.right(node));
        walk(tree, left, weight * tree.cover(left) / cover, acc);
        walk(tree, right, weight * tree.cover(right) / cover, acc);
    }

    let mut acc = vec![0.0; tree.value[0].len()];
    walk(tree, 0, 1.0, &mut acc);
    acc
}

struct TreeWalker<'a, 'x> {
    tree: &'a Tree,
    x: ArrayView1<'x, f64>,
    phi: &'a mut Array2<f64>,
}

impl TreeWalker<'_, '_> {
    fn recurse(
        &mut self,
        node: usize,
        mut path: Vec<PathElement>,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        if self.tree.is_leaf(node) {
            let leaf = self.tree.node_probabilities(node);
            for i in 1..path.len() {
                let weight = unwound_path_sum(&path, i);
                let element = path[i];
                let Some(feature) = element.feature else {
                    continue;
                };
                let scale = weight * (element.one_fraction - element.zero_fraction);
                for (class, value) in leaf.iter().enumerate() {
                    self.phi[[feature, class]] += scale * value;
                }
            }
            return;
        }

        let split = self.tree.split_feature(node);
        let hot = self.tree.next_node(node, self.x);
        let cold = if hot == self.tree.left(node) {
            self.tree.right(node)
        } else {
            self.tree.left(node)
        };
        let cover = self.tree.cover(node);
        let hot_zero_fraction = self.tree.cover(hot) / cover;
        let cold_zero_fraction = self.tree.cover(cold) / cover;

        // a feature split on twice along one path only counts once
        let mut incoming_zero = 1.0;
        let mut incoming_one = 1.0;
        if let Some(index) = path.iter().position(|e| e.feature == Some(split)) {
            incoming_zero = path[index].zero_fraction;
            incoming_one = path[index].one_fraction;
            unwind_path(&mut path, index);
        }

        self.recurse(
            hot,
            path.clone(),
            hot_zero_fraction * incoming_zero,
            incoming_one,
            Some(split),
        );
        self.recurse(cold, path, cold_zero_fraction * incoming_zero, 0.0, Some(split));
    }
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

/// Undo `extend_path` for the element at `index`.
fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let denom = (depth + 1) as f64;

    let mut next_one_portion = path[depth].pweight;
    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero_fraction * (depth - i) as f64);
        }
    }

    // weights stay in place, the removed element's successors shift down
    let weights: Vec<f64> = path[..depth].iter().map(|e| e.pweight).collect();
    path.remove(index);
    for (element, weight) in path.iter_mut().zip(weights) {
        element.pweight = weight;
    }
}

/// Total permutation weight of the path with the element at `index` removed.
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let denom = (depth + 1) as f64;

    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;
    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * (depth - i) as f64 / denom;
        } else {
            total += path[i].pweight / zero_fraction / ((depth - i) as f64 / denom);
        }
    }
    total
}
