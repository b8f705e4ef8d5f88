//! Classification stage: encoded feature vector -> fraud probability

use crate::error::ScoringError;
use crate::models::manifest::{GradientBoostingSpec, LogisticSpec, TreeNodeSpec};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;

/// Final step of a pipeline
pub enum Classifier {
    Logistic(LogisticModel),
    GradientBoosting(TreeEnsemble),
    #[cfg(feature = "onnx")]
    Onnx(crate::models::onnx::OnnxClassifier),
}

impl Classifier {
    /// Probability of the fraud class for one encoded row
    pub fn fraud_probability(&self, features: &[f64]) -> Result<f64, ScoringError> {
        match self {
            Classifier::Logistic(model) => model.predict(features),
            Classifier::GradientBoosting(model) => model.predict(features),
            #[cfg(feature = "onnx")]
            Classifier::Onnx(model) => model.predict(features),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Classifier::Logistic(_) => "logistic",
            Classifier::GradientBoosting(_) => "gradient_boosting",
            #[cfg(feature = "onnx")]
            Classifier::Onnx(_) => "onnx",
        }
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Binary logistic regression
pub struct LogisticModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticModel {
    pub fn from_spec(spec: &LogisticSpec) -> Result<Self> {
        if !spec.intercept.is_finite() || spec.coefficients.iter().any(|c| !c.is_finite()) {
            bail!("logistic coefficients must be finite");
        }
        Ok(Self {
            coefficients: spec.coefficients.clone(),
            intercept: spec.intercept,
        })
    }

    fn predict(&self, features: &[f64]) -> Result<f64, ScoringError> {
        if features.len() != self.coefficients.len() {
            return Err(ScoringError::SchemaMismatch(format!(
                "logistic model expects {} features, got {}",
                self.coefficients.len(),
                features.len()
            )));
        }
        let margin = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        Ok(sigmoid(margin))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        missing: usize,
    },
    Leaf(f64),
}

/// One flattened regression tree; node 0 is the root
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_spec(root: &TreeNodeSpec) -> Result<Self> {
        // nodeid -> spec, gathered depth-first
        let mut by_id: HashMap<u32, &TreeNodeSpec> = HashMap::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let id = match node {
                TreeNodeSpec::Split {
                    nodeid, children, ..
                } => {
                    stack.extend(children.iter());
                    *nodeid
                }
                TreeNodeSpec::Leaf { nodeid, .. } => *nodeid,
            };
            if by_id.insert(id, node).is_some() {
                bail!("duplicate node id {}", id);
            }
        }

        // Root first, then remaining ids in ascending order
        let root_id = match root {
            TreeNodeSpec::Split { nodeid, .. } | TreeNodeSpec::Leaf { nodeid, .. } => *nodeid,
        };
        let mut order: Vec<u32> = by_id.keys().copied().filter(|id| *id != root_id).collect();
        order.sort_unstable();
        order.insert(0, root_id);
        let index: HashMap<u32, usize> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let resolve = |id: u32| -> Result<usize> {
            index
                .get(&id)
                .copied()
                .with_context(|| format!("reference to unknown node {}", id))
        };

        let mut nodes = Vec::with_capacity(order.len());
        for id in &order {
            let node = match by_id[id] {
                TreeNodeSpec::Leaf { leaf, .. } => {
                    if !leaf.is_finite() {
                        bail!("node {} has a non-finite leaf value", id);
                    }
                    Node::Leaf(*leaf)
                }
                TreeNodeSpec::Split {
                    split,
                    split_condition,
                    yes,
                    no,
                    missing,
                    ..
                } => Node::Split {
                    feature: parse_feature_ref(split)?,
                    threshold: *split_condition,
                    yes: resolve(*yes)?,
                    no: resolve(*no)?,
                    missing: resolve(*missing)?,
                },
            };
            nodes.push(node);
        }
        Ok(Self { nodes })
    }

    fn leaf_value(&self, features: &[f64]) -> Result<f64, ScoringError> {
        let mut current = 0;
        // A well-formed tree reaches a leaf in fewer hops than it has nodes
        for _ in 0..=self.nodes.len() {
            match &self.nodes[current] {
                Node::Leaf(value) => return Ok(*value),
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    let x = features.get(*feature).copied().ok_or_else(|| {
                        ScoringError::SchemaMismatch(format!(
                            "tree splits on feature f{} but only {} features were provided",
                            feature,
                            features.len()
                        ))
                    })?;
                    current = if x.is_nan() {
                        *missing
                    } else if x < *threshold {
                        *yes
                    } else {
                        *no
                    };
                }
            }
        }
        Err(ScoringError::Runtime("tree traversal did not terminate".to_string()))
    }
}

fn parse_feature_ref(split: &str) -> Result<usize> {
    split
        .strip_prefix('f')
        .and_then(|index| index.parse().ok())
        .with_context(|| format!("unsupported split feature reference {:?}", split))
}

/// Gradient-boosted tree ensemble with a logistic link
pub struct TreeEnsemble {
    base_margin: f64,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn from_spec(spec: &GradientBoostingSpec) -> Result<Self> {
        if !(spec.base_score > 0.0 && spec.base_score < 1.0) {
            bail!("base_score {} must lie strictly between 0 and 1", spec.base_score);
        }
        let trees = spec
            .trees
            .iter()
            .enumerate()
            .map(|(i, tree)| Tree::from_spec(tree).with_context(|| format!("tree {}", i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            base_margin: (spec.base_score / (1.0 - spec.base_score)).ln(),
            trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn predict(&self, features: &[f64]) -> Result<f64, ScoringError> {
        let mut margin = self.base_margin;
        for tree in &self.trees {
            margin += tree.leaf_value(features)?;
        }
        Ok(sigmoid(margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(json: &str) -> TreeEnsemble {
        let spec: GradientBoostingSpec = serde_json::from_str(json).unwrap();
        TreeEnsemble::from_spec(&spec).unwrap()
    }

    const ONE_STUMP: &str = r#"{"trees": [
        {"nodeid": 0, "split": "f1", "split_condition": 21.0, "yes": 1, "no": 2, "missing": 2,
         "children": [{"nodeid": 1, "leaf": -1.0}, {"nodeid": 2, "leaf": 1.0}]}
    ]}"#;

    #[test]
    fn test_logistic_probability() {
        let model = LogisticModel::from_spec(&LogisticSpec {
            coefficients: vec![2.0, -1.0],
            intercept: 0.5,
        })
        .unwrap();

        let p = model.predict(&[1.0, 2.5]).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
        assert!(matches!(
            model.predict(&[1.0]),
            Err(ScoringError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_tree_branches() {
        let model = stump(ONE_STUMP);
        assert_eq!(model.tree_count(), 1);

        let low = model.predict(&[0.0, 10.0]).unwrap();
        let high = model.predict(&[0.0, 22.0]).unwrap();
        assert!((low - sigmoid(-1.0)).abs() < 1e-12);
        assert!((high - sigmoid(1.0)).abs() < 1e-12);

        // NaN follows the missing branch
        let missing = model.predict(&[0.0, f64::NAN]).unwrap();
        assert_eq!(missing, high);
    }

    #[test]
    fn test_tree_needs_enough_features() {
        let model = stump(ONE_STUMP);
        assert!(matches!(
            model.predict(&[0.0]),
            Err(ScoringError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_base_score_shifts_margin() {
        let spec: GradientBoostingSpec =
            serde_json::from_str(r#"{"base_score": 0.2, "trees": []}"#).unwrap();
        let model = TreeEnsemble::from_spec(&spec).unwrap();

        assert!((model.predict(&[]).unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_dangling_reference() {
        let spec: GradientBoostingSpec = serde_json::from_str(
            r#"{"trees": [
                {"nodeid": 0, "split": "f0", "split_condition": 1.0, "yes": 1, "no": 7, "missing": 1,
                 "children": [{"nodeid": 1, "leaf": 0.1}]}
            ]}"#,
        )
        .unwrap();

        assert!(TreeEnsemble::from_spec(&spec).is_err());
    }

    #[test]
    fn test_rejects_named_feature_reference() {
        assert!(parse_feature_ref("hour").is_err());
        assert_eq!(parse_feature_ref("f12").unwrap(), 12);
    }
}
