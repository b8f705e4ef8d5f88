//! ONNX Runtime classifier step

use crate::error::ScoringError;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// ONNX-exported classifier consuming the encoded feature vector
pub struct OnnxClassifier {
    path: PathBuf,
    /// Runtime sessions need exclusive access per run
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(path: P, threads: usize) -> Result<Self> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = threads, "Loading ONNX classifier");

        let session = Session::builder()
            .map_err(|e| anyhow::anyhow!("{}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow::anyhow!("{}", e))?
            .with_intra_threads(threads)
            .map_err(|e| anyhow::anyhow!("{}", e))?
            .commit_from_file(path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            input = %input_name,
            output = %output_name,
            "ONNX classifier loaded successfully"
        );

        Ok(Self {
            path: path.to_path_buf(),
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, ScoringError> {
        // Shape [1, num_features]
        let data: Vec<f32> = features.iter().map(|&x| x as f32).collect();
        let shape = vec![1_i64, data.len() as i64];
        let input = Tensor::from_array((shape, data)).map_err(runtime_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ScoringError::Runtime(format!("Lock error: {}", e)))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(runtime_error)?;

        if let Some(output) = outputs.get(self.output_name.as_str()) {
            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let dims: Vec<i64> = shape.iter().copied().collect();
                let prob = fraud_prob_from_tensor(&dims, data);
                debug!(model = %self.path.display(), prob = prob, "Extracted from tensor");
                return Ok(prob);
            }
        }

        // Fallback: any float tensor output that is not the label
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let dims: Vec<i64> = shape.iter().copied().collect();
                return Ok(fraud_prob_from_tensor(&dims, data));
            }
        }

        Err(ScoringError::Runtime(format!(
            "{} produced no probability tensor",
            self.path.display()
        )))
    }
}

fn runtime_error(e: impl std::fmt::Display) -> ScoringError {
    ScoringError::Runtime(e.to_string())
}

/// Fraud probability (class 1) from a `[batch, classes]` or `[classes]` tensor
fn fraud_prob_from_tensor(dims: &[i64], data: &[f32]) -> f64 {
    let classes = dims.last().copied().unwrap_or(0);
    let value = match classes {
        c if c >= 2 => data.get(1),
        1 => data.first(),
        _ => data.last(),
    };
    value.map(|&v| f64::from(v)).unwrap_or(0.0)
}
