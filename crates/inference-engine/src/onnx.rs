//! ONNX Backend (tract)

use crate::{Classifier, InferenceError, ModelOutput};
use std::path::Path;
use tracing::{debug, info};
use tract_onnx::pb;
use tract_onnx::prelude::*;
use tract_onnx::Onnx;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Binary classifier executed from an ONNX graph.
///
/// Expects a single `[1, n]` float input, an optional int64 label output and
/// a `[1, 2]` float probability output (class 1 = fraud). Graphs must stick to
/// operators tract implements: core-domain graphs (`MatMul`, `Gemm`, `Add`,
/// `Sigmoid`, `Softmax`, `ArgMax`, ...) and, from `ai.onnx.ml`, only
/// `TreeEnsembleClassifier` and `CategoryMapper`. skl2onnx exports of linear
/// models use `ai.onnx.ml.LinearClassifier` and are rejected at load; serve
/// those as `logistic_regression` manifests instead.
pub struct OnnxClassifier {
    plan: OnnxPlan,
    n_features: usize,
    threshold: f64,
}

fn model_load_error(e: impl std::fmt::Display) -> InferenceError {
    InferenceError::ModelLoadError(e.to_string())
}

/// Operators of the top-level graph that tract has no implementation for
fn unsupported_ops(onnx: &Onnx, proto: &pb::ModelProto) -> Vec<String> {
    let mut ops: Vec<String> = proto
        .graph
        .iter()
        .flat_map(|graph| graph.node.iter())
        .filter(|node| !onnx.op_register.0.contains_key(&node.op_type))
        .map(|node| {
            if node.domain.is_empty() {
                node.op_type.clone()
            } else {
                format!("{}.{}", node.domain, node.op_type)
            }
        })
        .collect();
    ops.sort();
    ops.dedup();
    ops
}

impl OnnxClassifier {
    /// Load and optimise an ONNX model for a fixed input width
    pub fn load(path: &Path, n_features: usize, threshold: f64) -> Result<Self, InferenceError> {
        info!("Loading ONNX model from {}", path.display());

        let onnx = tract_onnx::onnx();
        let located = |e: InferenceError| match e {
            InferenceError::ModelLoadError(msg) => {
                InferenceError::ModelLoadError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        };

        let proto = onnx
            .proto_model_for_path(path)
            .map_err(|e| located(model_load_error(format!("{:#}", e))))?;
        let model_dir = path.parent().and_then(|dir| dir.to_str());

        Self::from_proto(&onnx, &proto, model_dir, n_features, threshold).map_err(located)
    }

    fn from_proto(
        onnx: &Onnx,
        proto: &pb::ModelProto,
        model_dir: Option<&str>,
        n_features: usize,
        threshold: f64,
    ) -> Result<Self, InferenceError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(InferenceError::ModelLoadError(format!(
                "decision threshold {} is outside [0, 1]",
                threshold
            )));
        }

        let unsupported = unsupported_ops(onnx, proto);
        if !unsupported.is_empty() {
            return Err(InferenceError::ModelLoadError(format!(
                "unsupported ONNX operators: {}",
                unsupported.join(", ")
            )));
        }

        let parsed = onnx
            .parse(proto, model_dir)
            .map_err(|e| model_load_error(format!("{:#}", e)))?;
        if !parsed.unresolved_inputs.is_empty() {
            return Err(model_load_error(format!(
                "unresolved graph inputs {:?}",
                parsed.unresolved_inputs
            )));
        }

        let plan = parsed
            .model
            .with_input_fact(0, f32::fact([1, n_features]).into())
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| model_load_error(format!("{:#}", e)))?;

        debug!("ONNX model optimised for input [1, {}]", n_features);
        Ok(Self {
            plan,
            n_features,
            threshold,
        })
    }

    fn run(&self, features: &[f64]) -> TractResult<(Option<bool>, Option<f64>)> {
        let row: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.n_features), row)?.into();
        let outputs = self.plan.run(tvec!(input.into()))?;

        let mut label = None;
        let mut probability = None;
        for output in outputs.iter() {
            let tensor: &Tensor = output;
            if tensor.datum_type() == i64::datum_type() && label.is_none() {
                label = tensor.as_slice::<i64>()?.first().map(|&l| l != 0);
            } else if tensor.datum_type() == f32::datum_type()
                && tensor.shape().last() == Some(&2)
                && probability.is_none()
            {
                probability = tensor.as_slice::<f32>()?.get(1).map(|&p| p as f64);
            }
        }
        Ok((label, probability))
    }
}

impl Classifier for OnnxClassifier {
    fn model_type(&self) -> &str {
        "OnnxClassifier"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<ModelOutput, InferenceError> {
        if features.len() != self.n_features {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("[1, {}]", self.n_features),
                actual: format!("[1, {}]", features.len()),
            });
        }

        let (label, probability) = self
            .run(features)
            .map_err(|e| InferenceError::InferenceFailed(format!("{:#}", e)))?;

        let probability = probability
            .filter(|p| p.is_finite())
            .ok_or_else(|| {
                InferenceError::InferenceFailed(
                    "model has no [1, 2] float probability output".to_string(),
                )
            })?
            .clamp(0.0, 1.0);

        Ok(ModelOutput {
            label: label.unwrap_or(probability >= self.threshold),
            probability,
        })
    }
}
