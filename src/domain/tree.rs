//! Decision-tree ensemble structure and evaluation.
//!
//! Trees are stored as node arenas with the root at index 0. A child index
//! is always greater than its parent's, so a reverse scan visits children
//! before parents.

use serde::{Deserialize, Serialize};

use super::patient::NUM_FEATURES;

/// How tree outputs combine into a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Boosted trees: `sigmoid(base_score + Σ tree(x))`
    BinaryLogistic,
    /// Averaged forest: `base_score + mean tree(x)`, clamped to `[0, 1]`
    BinaryProbability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// `x[feature] < threshold` goes left, otherwise right.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
        /// Training rows that reached this leaf
        cover: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Leaf value reached by `x`.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value, .. } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if x[feature] < threshold { left } else { right },
            }
        }
    }

    /// Cover of every node; a split's cover is the sum of its children's.
    #[must_use]
    pub fn node_covers(&self) -> Vec<f64> {
        let mut covers = vec![0.0; self.nodes.len()];
        for idx in (0..self.nodes.len()).rev() {
            covers[idx] = match self.nodes[idx] {
                Node::Leaf { cover, .. } => cover,
                Node::Split { left, right, .. } => covers[left] + covers[right],
            };
        }
        covers
    }

    /// Cover-weighted mean leaf value.
    #[must_use]
    pub fn expected_value(&self) -> f64 {
        let covers = self.node_covers();
        let mut expected = vec![0.0; self.nodes.len()];
        for idx in (0..self.nodes.len()).rev() {
            expected[idx] = match self.nodes[idx] {
                Node::Leaf { value, .. } => value,
                Node::Split { left, right, .. } => {
                    (covers[left] * expected[left] + covers[right] * expected[right])
                        / covers[idx]
                }
            };
        }
        expected[0]
    }

    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let mut parents = vec![0usize; self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= NUM_FEATURES {
                        return Err(format!("node {idx}: feature index {feature} out of range"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx}: non-finite threshold"));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx}: invalid child index {child}"));
                        }
                        parents[child] += 1;
                    }
                }
                Node::Leaf { value, cover } => {
                    if !value.is_finite() {
                        return Err(format!("node {idx}: non-finite leaf value"));
                    }
                    if !cover.is_finite() || cover <= 0.0 {
                        return Err(format!("node {idx}: leaf cover must be positive"));
                    }
                }
            }
        }
        if let Some(idx) = parents.iter().skip(1).position(|&n| n != 1) {
            return Err(format!("node {} must have exactly one parent", idx + 1));
        }
        Ok(())
    }
}

/// An ensemble of regression trees over [`super::FEATURE_ORDER`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub objective: Objective,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Check structural invariants.
    ///
    /// # Errors
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        if !self.base_score.is_finite() {
            return Err("non-finite base_score".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| format!("tree {i}: {e}"))?;
        }
        if self.objective == Objective::BinaryProbability {
            if self.base_score != 0.0 {
                return Err("averaged forests must have base_score 0".to_string());
            }
            let out_of_range = self.trees.iter().flat_map(|t| &t.nodes).any(
                |node| matches!(node, Node::Leaf { value, .. } if !(0.0..=1.0).contains(value)),
            );
            if out_of_range {
                return Err("averaged forest leaf values must lie in [0, 1]".to_string());
            }
        }
        Ok(())
    }

    /// Scale on which trees are additive: the margin for boosted models, the
    /// probability for averaged forests.
    #[must_use]
    pub fn raw_output(&self, x: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        match self.objective {
            Objective::BinaryLogistic => self.base_score + sum,
            Objective::BinaryProbability => self.base_score + sum / self.trees.len() as f64,
        }
    }

    /// Expected raw output over the training distribution.
    #[must_use]
    pub fn expected_raw_output(&self) -> f64 {
        let sum: f64 = self.trees.iter().map(Tree::expected_value).sum();
        match self.objective {
            Objective::BinaryLogistic => self.base_score + sum,
            Objective::BinaryProbability => self.base_score + sum / self.trees.len() as f64,
        }
    }

    /// Positive-class probability.
    #[must_use]
    pub fn probability(&self, x: &[f64]) -> f64 {
        let raw = self.raw_output(x);
        match self.objective {
            Objective::BinaryLogistic => sigmoid(raw),
            Objective::BinaryProbability => raw.clamp(0.0, 1.0),
        }
    }
}

#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Depth-2 tree on `cp` then `ca`.
    pub fn stump_pair() -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature: 2,
                    threshold: 1.5,
                    left: 1,
                    right: 2,
                },
                Node::Leaf {
                    value: -0.8,
                    cover: 60.0,
                },
                Node::Split {
                    feature: 11,
                    threshold: 0.5,
                    left: 3,
                    right: 4,
                },
                Node::Leaf {
                    value: 0.2,
                    cover: 25.0,
                },
                Node::Leaf {
                    value: 1.1,
                    cover: 15.0,
                },
            ],
        }
    }

    pub fn logistic(trees: Vec<Tree>) -> TreeEnsemble {
        TreeEnsemble {
            objective: Objective::BinaryLogistic,
            base_score: -0.1,
            trees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn row(cp: f64, ca: f64) -> Vec<f64> {
        let mut x = vec![0.0; NUM_FEATURES];
        x[2] = cp;
        x[11] = ca;
        x
    }

    #[test]
    fn test_split_rule_is_strict_less_than() {
        let tree = stump_pair();
        assert_eq!(tree.predict(&row(1.0, 0.0)), -0.8);
        assert_eq!(tree.predict(&row(1.5, 0.0)), 0.2);
        assert_eq!(tree.predict(&row(3.0, 2.0)), 1.1);
    }

    #[test]
    fn test_covers_and_expectation() {
        let tree = stump_pair();
        let covers = tree.node_covers();
        assert_eq!(covers[0], 100.0);
        assert_eq!(covers[2], 40.0);

        let expected = (60.0 * -0.8 + 25.0 * 0.2 + 15.0 * 1.1) / 100.0;
        assert!((tree.expected_value() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_probability() {
        let model = logistic(vec![stump_pair()]);
        let x = row(3.0, 2.0);
        assert!((model.raw_output(&x) - 1.0).abs() < 1e-12);
        assert!((model.probability(&x) - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_averaged_forest_probability() {
        let mut leafy = stump_pair();
        for node in &mut leafy.nodes {
            if let Node::Leaf { value, .. } = node {
                *value = (*value + 1.0) / 2.5;
            }
        }
        let model = TreeEnsemble {
            objective: Objective::BinaryProbability,
            base_score: 0.0,
            trees: vec![leafy.clone(), leafy],
        };
        model.validate().expect("Should be valid");
        let p = model.probability(&row(0.0, 0.0));
        assert!((p - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_validation_rejects_bad_structure() {
        let mut tree = stump_pair();
        if let Node::Split { left, .. } = &mut tree.nodes[2] {
            *left = 1;
        }
        assert!(logistic(vec![tree]).validate().is_err());

        let mut tree = stump_pair();
        if let Node::Split { feature, .. } = &mut tree.nodes[0] {
            *feature = NUM_FEATURES;
        }
        assert!(logistic(vec![tree]).validate().is_err());

        let mut tree = stump_pair();
        tree.nodes[4] = Node::Leaf {
            value: 1.0,
            cover: 0.0,
        };
        assert!(logistic(vec![tree]).validate().is_err());

        assert!(logistic(vec![]).validate().is_err());
        assert!(logistic(vec![stump_pair()]).validate().is_ok());
    }
}
