//! Exact path-dependent TreeSHAP.
//!
//! Attributions are computed per tree on the ensemble's additive scale and
//! summed. For boosted models the margin-space result is then mapped onto
//! the probability scale with a single factor, which keeps every sign and
//! makes `base_value + Σ phi` equal the predicted probability.

use crate::domain::{sigmoid, ClassAttributions, FeatureVector, Node, Objective, Tree, NUM_FEATURES};
use crate::ports::{AttributionError, Explainer, RiskModel};

/// Below this margin gap the sigmoid slope at the expectation is used.
const SLOPE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].weight += one_fraction * path[i].weight * (i + 1) as f64 / denom;
        path[i].weight = zero_fraction * path[i].weight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, k: usize) {
    let depth = path.len() - 1;
    let PathElement {
        zero_fraction,
        one_fraction,
        ..
    } = path[k];
    let denom = (depth + 1) as f64;
    let mut next_one = path[depth].weight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next_one * denom / ((i + 1) as f64 * one_fraction);
            next_one = tmp - path[i].weight * zero_fraction * (depth - i) as f64 / denom;
        } else {
            path[i].weight = path[i].weight * denom / (zero_fraction * (depth - i) as f64);
        }
    }
    for i in k..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.truncate(depth);
}

/// Total weight of the path with element `k` unwound, without mutating it.
fn unwound_path_sum(path: &[PathElement], k: usize) -> f64 {
    let depth = path.len() - 1;
    let PathElement {
        zero_fraction,
        one_fraction,
        ..
    } = path[k];
    let denom = (depth + 1) as f64;
    let mut next_one = path[depth].weight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one * denom / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one = path[i].weight - tmp * zero_fraction * (depth - i) as f64 / denom;
        } else if zero_fraction != 0.0 {
            total += path[i].weight / zero_fraction / ((depth - i) as f64 / denom);
        }
    }
    total
}

struct TreeWalk<'a> {
    tree: &'a Tree,
    covers: Vec<f64>,
    x: &'a [f64],
}

impl TreeWalk<'_> {
    fn recurse(
        &self,
        idx: usize,
        mut path: Vec<PathElement>,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
        phi: &mut [f64],
    ) {
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        match self.tree.nodes[idx] {
            Node::Leaf { value, .. } => {
                for i in 1..path.len() {
                    let w = unwound_path_sum(&path, i);
                    let el = path[i];
                    if let Some(f) = el.feature {
                        phi[f] += w * (el.one_fraction - el.zero_fraction) * value;
                    }
                }
            }
            Node::Split {
                feature: split,
                threshold,
                left,
                right,
            } => {
                let (hot, cold) = if self.x[split] < threshold {
                    (left, right)
                } else {
                    (right, left)
                };
                let cover = self.covers[idx];
                let hot_zero = self.covers[hot] / cover;
                let cold_zero = self.covers[cold] / cover;

                let mut incoming_zero = 1.0;
                let mut incoming_one = 1.0;
                if let Some(k) = path.iter().skip(1).position(|e| e.feature == Some(split)) {
                    let k = k + 1;
                    incoming_zero = path[k].zero_fraction;
                    incoming_one = path[k].one_fraction;
                    unwind_path(&mut path, k);
                }

                self.recurse(
                    hot,
                    path.clone(),
                    hot_zero * incoming_zero,
                    incoming_one,
                    Some(split),
                    phi,
                );
                self.recurse(cold, path, cold_zero * incoming_zero, 0.0, Some(split), phi);
            }
        }
    }
}

/// Add the attributions of one tree for row `x` into `phi`.
///
/// The contributions sum to `tree.predict(x) - tree.expected_value()`.
pub fn tree_shap(tree: &Tree, x: &[f64], phi: &mut [f64]) {
    let walk = TreeWalk {
        tree,
        covers: tree.node_covers(),
        x,
    };
    walk.recurse(0, Vec::new(), 1.0, 1.0, None, phi);
}

/// TreeSHAP explainer for models exposing a [`crate::domain::TreeEnsemble`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeExplainer;

impl TreeExplainer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Explainer for TreeExplainer {
    fn explain<M: RiskModel + ?Sized>(
        &self,
        model: &M,
        features: &FeatureVector,
    ) -> Result<ClassAttributions, AttributionError> {
        let ensemble = model
            .tree_ensemble()
            .ok_or(AttributionError::UnsupportedModel)?;
        let x = features.as_slice();

        let mut phi = vec![0.0; NUM_FEATURES];
        for tree in &ensemble.trees {
            tree_shap(tree, x, &mut phi);
        }
        let expected = ensemble.expected_raw_output();

        let (scale, base_value) = match ensemble.objective {
            Objective::BinaryProbability => (1.0 / ensemble.trees.len() as f64, expected),
            Objective::BinaryLogistic => {
                let margin = ensemble.raw_output(x);
                let p0 = sigmoid(expected);
                let gap = margin - expected;
                let scale = if gap.abs() > SLOPE_EPSILON {
                    (sigmoid(margin) - p0) / gap
                } else {
                    p0 * (1.0 - p0)
                };
                (scale, p0)
            }
        };

        let positive: Vec<f64> = phi.iter().map(|v| v * scale).collect();
        if !base_value.is_finite() || positive.iter().any(|v| !v.is_finite()) {
            return Err(AttributionError::NonFinite);
        }
        let negative = positive.iter().map(|v| -v).collect();

        Ok(ClassAttributions {
            per_class: vec![negative, positive],
            expected_values: vec![1.0 - base_value, base_value],
        })
    }
}
