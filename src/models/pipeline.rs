//! Pipeline built from a JSON manifest

use crate::error::ScoringError;
use crate::models::classifier::{Classifier, LogisticModel, TreeEnsemble};
use crate::models::manifest::{
    find_categorical_encoder, ColumnTransformerSpec, HandleUnknown, OneHotSpec, PipelineManifest,
    Remainder, ScalerSpec, StepSpec, TransformerSpec,
};
use crate::models::{CategoricalColumn, Pipeline, PreprocessingDescriptor};
use crate::types::{FeatureRow, FeatureValue};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Column transformer + classifier, as described by a [`PipelineManifest`]
pub struct ManifestPipeline {
    name: String,
    preprocess: Option<ColumnTransformerSpec>,
    classifier: Classifier,
    categorical: Option<Vec<CategoricalColumn>>,
}

impl ManifestPipeline {
    /// Validate a manifest and build the runtime pipeline.
    ///
    /// `base_dir` anchors relative paths inside the manifest.
    pub fn from_manifest(name: &str, manifest: PipelineManifest, base_dir: &Path) -> Result<Self> {
        let categorical = find_categorical_encoder(&manifest.steps);

        let mut steps = manifest.steps;
        let Some(last) = steps.pop() else {
            bail!("pipeline has no steps");
        };
        if !last.step.is_classifier() {
            bail!("final step {:?} is not a classifier", last.name);
        }

        let mut preprocess = None;
        for step in steps {
            match step.step {
                StepSpec::ColumnTransformer(ct) if preprocess.is_none() => {
                    validate_column_transformer(&ct)
                        .with_context(|| format!("step {:?}", step.name))?;
                    preprocess = Some(ct);
                }
                StepSpec::ColumnTransformer(_) => {
                    bail!("step {:?}: only one column transformer is supported", step.name)
                }
                _ => bail!(
                    "step {:?}: classifiers are only allowed as the final step",
                    step.name
                ),
            }
        }

        let classifier = build_classifier(&last.step, base_dir)
            .with_context(|| format!("step {:?}", last.name))?;

        Ok(Self {
            name: name.to_string(),
            preprocess,
            classifier,
            categorical,
        })
    }

    pub fn step_count(&self) -> usize {
        usize::from(self.preprocess.is_some()) + 1
    }

    /// Encode one row into the classifier's numeric input
    fn encode(&self, row: &FeatureRow) -> Result<Vec<f64>, ScoringError> {
        match &self.preprocess {
            Some(ct) => transform_row(ct, row),
            None => row
                .iter()
                .map(|(column, value)| numeric(column, value))
                .collect(),
        }
    }
}

impl Pipeline for ManifestPipeline {
    fn predict_proba(&self, rows: &[FeatureRow]) -> Result<Vec<[f64; 2]>, ScoringError> {
        rows.iter()
            .map(|row| {
                let features = self.encode(row)?;
                let p = self.classifier.fraud_probability(&features)?;
                if !p.is_finite() {
                    return Err(ScoringError::Runtime(format!(
                        "classifier produced non-finite probability {}",
                        p
                    )));
                }
                let p = p.clamp(0.0, 1.0);
                Ok([1.0 - p, p])
            })
            .collect()
    }

    fn preprocessing(&self) -> Option<&dyn PreprocessingDescriptor> {
        self.categorical
            .as_ref()
            .map(|_| self as &dyn PreprocessingDescriptor)
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.classifier.kind())
    }
}

impl PreprocessingDescriptor for ManifestPipeline {
    fn categorical_columns(&self) -> &[CategoricalColumn] {
        self.categorical.as_deref().unwrap_or(&[])
    }
}

fn build_classifier(step: &StepSpec, base_dir: &Path) -> Result<Classifier> {
    match step {
        StepSpec::Logistic(spec) => Ok(Classifier::Logistic(LogisticModel::from_spec(spec)?)),
        StepSpec::GradientBoosting(spec) => {
            Ok(Classifier::GradientBoosting(TreeEnsemble::from_spec(spec)?))
        }
        #[cfg(feature = "onnx")]
        StepSpec::Onnx(spec) => Ok(Classifier::Onnx(
            crate::models::onnx::OnnxClassifier::load(base_dir.join(&spec.path), spec.threads)?,
        )),
        #[cfg(not(feature = "onnx"))]
        StepSpec::Onnx(spec) => bail!(
            "ONNX classifier {} requires the `onnx` feature",
            base_dir.join(&spec.path).display()
        ),
        StepSpec::ColumnTransformer(_) => bail!("column transformer is not a classifier"),
    }
}

fn validate_column_transformer(ct: &ColumnTransformerSpec) -> Result<()> {
    for entry in &ct.transformers {
        validate_transformer(&entry.transformer, entry.columns.len())
            .with_context(|| format!("transformer {:?}", entry.name))?;
    }
    Ok(())
}

/// Check a transformer against the width of its input
fn validate_transformer(spec: &TransformerSpec, width: usize) -> Result<usize> {
    match spec {
        TransformerSpec::OneHot(ohe) => {
            if ohe.categories.len() != width {
                bail!(
                    "one-hot encoder has {} category lists for {} columns",
                    ohe.categories.len(),
                    width
                );
            }
            Ok(ohe.categories.iter().map(Vec::len).sum())
        }
        TransformerSpec::StandardScaler(scaler) => {
            if scaler.mean.len() != width || scaler.scale.len() != width {
                bail!("scaler statistics do not match {} columns", width);
            }
            Ok(width)
        }
        TransformerSpec::Passthrough => Ok(width),
        TransformerSpec::Pipeline(chain) => chain.steps.iter().try_fold(width, |w, step| {
            validate_transformer(&step.transformer, w)
                .with_context(|| format!("nested step {:?}", step.name))
        }),
    }
}

fn transform_row(ct: &ColumnTransformerSpec, row: &FeatureRow) -> Result<Vec<f64>, ScoringError> {
    let mut encoded = Vec::new();
    let mut claimed: HashSet<&str> = HashSet::new();

    for entry in &ct.transformers {
        let mut values = Vec::with_capacity(entry.columns.len());
        for column in &entry.columns {
            let value = row.get(column).ok_or_else(|| {
                ScoringError::SchemaMismatch(format!("column {:?} is missing", column))
            })?;
            values.push(value.clone());
            claimed.insert(column.as_str());
        }

        for value in apply(&entry.transformer, values)? {
            encoded.push(numeric(&entry.name, &value)?);
        }
    }

    if ct.remainder == Remainder::Passthrough {
        for (column, value) in row.iter() {
            if !claimed.contains(column) {
                encoded.push(numeric(column, value)?);
            }
        }
    }

    Ok(encoded)
}

fn apply(spec: &TransformerSpec, values: Vec<FeatureValue>) -> Result<Vec<FeatureValue>, ScoringError> {
    match spec {
        TransformerSpec::OneHot(ohe) => one_hot(ohe, &values),
        TransformerSpec::StandardScaler(scaler) => scale(scaler, &values),
        TransformerSpec::Passthrough => Ok(values),
        TransformerSpec::Pipeline(chain) => chain
            .steps
            .iter()
            .try_fold(values, |acc, step| apply(&step.transformer, acc)),
    }
}

fn one_hot(ohe: &OneHotSpec, values: &[FeatureValue]) -> Result<Vec<FeatureValue>, ScoringError> {
    let mut out = Vec::new();
    for (value, categories) in values.iter().zip(&ohe.categories) {
        let rendered = value.render();
        let hit = categories.iter().position(|c| *c == rendered);
        if hit.is_none() && ohe.handle_unknown == HandleUnknown::Error {
            return Err(ScoringError::SchemaMismatch(format!(
                "unknown category {:?}; encoder knows {:?}",
                rendered, categories
            )));
        }
        out.extend((0..categories.len()).map(|i| {
            FeatureValue::Number(if Some(i) == hit { 1.0 } else { 0.0 })
        }));
    }
    Ok(out)
}

fn scale(scaler: &ScalerSpec, values: &[FeatureValue]) -> Result<Vec<FeatureValue>, ScoringError> {
    if values.len() != scaler.mean.len() {
        return Err(ScoringError::SchemaMismatch(format!(
            "scaler expects {} inputs, got {}",
            scaler.mean.len(),
            values.len()
        )));
    }
    values
        .iter()
        .zip(scaler.mean.iter().zip(&scaler.scale))
        .map(|(value, (mean, scale))| {
            let x = value.as_f64().ok_or_else(|| {
                ScoringError::SchemaMismatch(format!("cannot scale non-numeric value {:?}", value.render()))
            })?;
            // Zero-variance columns are only centered
            let scale = if *scale == 0.0 { 1.0 } else { *scale };
            Ok(FeatureValue::Number((x - mean) / scale))
        })
        .collect()
}

fn numeric(column: &str, value: &FeatureValue) -> Result<f64, ScoringError> {
    value.as_f64().ok_or_else(|| {
        ScoringError::SchemaMismatch(format!(
            "{:?} produced non-numeric value {:?}",
            column,
            value.render()
        ))
    })
}
