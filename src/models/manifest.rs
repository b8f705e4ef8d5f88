//! JSON pipeline manifest
//!
//! The on-disk form of a trained pipeline: an ordered list of named steps,
//! a column transformer followed by a classifier, mirroring how the
//! training code composed it.

use crate::models::CategoricalColumn;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineManifest {
    pub steps: Vec<NamedStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedStep {
    pub name: String,
    pub step: StepSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepSpec {
    ColumnTransformer(ColumnTransformerSpec),
    Logistic(LogisticSpec),
    GradientBoosting(GradientBoostingSpec),
    Onnx(OnnxSpec),
}

impl StepSpec {
    pub fn is_classifier(&self) -> bool {
        !matches!(self, StepSpec::ColumnTransformer(_))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnTransformerSpec {
    pub transformers: Vec<TransformerEntry>,
    #[serde(default)]
    pub remainder: Remainder,
}

/// What happens to columns no transformer claims
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remainder {
    #[default]
    Drop,
    Passthrough,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformerEntry {
    pub name: String,
    pub columns: Vec<String>,
    pub transformer: TransformerSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformerSpec {
    OneHot(OneHotSpec),
    StandardScaler(ScalerSpec),
    Passthrough,
    Pipeline(TransformerChain),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformerChain {
    pub steps: Vec<NamedTransformer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedTransformer {
    pub name: String,
    pub transformer: TransformerSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OneHotSpec {
    /// One category list per encoded column
    pub categories: Vec<Vec<String>>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScalerSpec {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogisticSpec {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradientBoostingSpec {
    /// Prior probability of the positive class
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    pub trees: Vec<TreeNodeSpec>,
}

fn default_base_score() -> f64 {
    0.5
}

/// Node of an XGBoost JSON tree dump
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNodeSpec {
    Split {
        nodeid: u32,
        /// Feature reference, `f<index>`
        split: String,
        split_condition: f64,
        yes: u32,
        no: u32,
        missing: u32,
        children: Vec<TreeNodeSpec>,
    },
    Leaf {
        nodeid: u32,
        leaf: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnnxSpec {
    /// Model file, relative to the manifest
    pub path: String,
    #[serde(default = "default_onnx_threads")]
    pub threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Name of the encoder step inside a nested transformer pipeline
const ONEHOT_STEP: &str = "onehot";

/// Locate the categorical encoder and the columns it encodes.
///
/// Looks at the first column transformer step; inside it, the first
/// transformer that is a one-hot encoder, or a nested pipeline holding a
/// one-hot step named `onehot`. Returns `None` if the shape is not recognized.
pub fn find_categorical_encoder(steps: &[NamedStep]) -> Option<Vec<CategoricalColumn>> {
    let preprocess = steps.iter().find_map(|s| match &s.step {
        StepSpec::ColumnTransformer(ct) => Some(ct),
        _ => None,
    })?;

    preprocess.transformers.iter().find_map(|entry| {
        let encoder = match &entry.transformer {
            TransformerSpec::OneHot(ohe) => Some(ohe),
            TransformerSpec::Pipeline(chain) => chain
                .steps
                .iter()
                .find(|s| s.name == ONEHOT_STEP)
                .and_then(|s| match &s.transformer {
                    TransformerSpec::OneHot(ohe) => Some(ohe),
                    _ => None,
                }),
            _ => None,
        }?;

        Some(
            entry
                .columns
                .iter()
                .zip(&encoder.categories)
                .map(|(column, categories)| CategoricalColumn {
                    column: column.clone(),
                    categories: categories.clone(),
                })
                .collect(),
        )
    })
}
