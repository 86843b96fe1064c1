//! Inference Service
//!
//! Orchestrates validation, preprocessing, prediction and metrics for
//! single transactions and CSV batches.

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use data_validator::{CsvBatchReader, Transaction, TransactionValidator, ValidationConfig};
use feature_engine::FeatureVector;
use inference_engine::{InferenceEngine, LoadedModel, ModelInfo, ModelOutput};
use metrics_recorder::MetricsRecorder;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Categorical risk bucket of a fraud probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    High,
    Critical,
}

impl RiskLevel {
    /// Bucket a probability (strictly greater than each threshold)
    pub fn from_probability(probability: f64, config: &ServiceConfig) -> Self {
        if probability > config.critical_threshold {
            RiskLevel::Critical
        } else if probability > config.high_threshold {
            RiskLevel::High
        } else {
            RiskLevel::Low
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

fn round_probability<S: Serializer>(probability: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((probability * 10_000.0).round() / 10_000.0)
}

/// Prediction for one transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub is_fraud: bool,
    /// Unrounded in memory; four decimals on the wire
    #[serde(serialize_with = "round_probability")]
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub model_version: String,
}

/// Model status reported by the health endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceHealth {
    /// Model description, absent when no model is loaded
    pub model: Option<String>,
    pub model_loaded: bool,
}

/// Fraud inference service, built once at start-up and shared by all handlers
pub struct InferenceService {
    engine: InferenceEngine,
    metrics: Arc<MetricsRecorder>,
    config: ServiceConfig,
}

impl InferenceService {
    /// Create a new service
    pub fn new(
        engine: InferenceEngine,
        metrics: Arc<MetricsRecorder>,
        config: ServiceConfig,
    ) -> Self {
        info!(
            "Inference service ready: model={} loaded={}, thresholds high>{} critical>{}",
            engine.model_path().display(),
            engine.is_loaded(),
            config.high_threshold,
            config.critical_threshold
        );
        Self {
            engine,
            metrics,
            config,
        }
    }

    /// Get the metrics recorder
    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Loaded model, or `ModelUnavailable`
    pub fn ensure_available(&self) -> Result<&LoadedModel, ServiceError> {
        Ok(self.engine.model()?)
    }

    fn validator(model: &LoadedModel) -> TransactionValidator {
        if model.preprocessor().profile().requires_time() {
            TransactionValidator::new(ValidationConfig::default())
        } else {
            TransactionValidator::new(ValidationConfig::without_time())
        }
    }

    /// Predict one JSON transaction payload
    pub fn predict(&self, payload: &Value) -> Result<PredictionResult, ServiceError> {
        let model = self.ensure_available()?;
        let transaction = Self::validator(model).validate_json(payload)?;
        self.predict_transaction(&transaction)
    }

    /// Predict an already validated transaction
    pub fn predict_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<PredictionResult, ServiceError> {
        let model = self.ensure_available()?;
        let features = model.preprocessor().transform(transaction)?;
        let output = self.engine.predict(&features)?;

        self.metrics
            .record_prediction(transaction.amount, output.probability, output.label);
        Ok(self.result(model, output))
    }

    /// Predict every row of a CSV upload.
    ///
    /// All-or-nothing: every row is validated and preprocessed before the
    /// first prediction, and metrics are recorded only once the whole batch
    /// succeeded.
    pub fn predict_batch(&self, csv: &[u8]) -> Result<Vec<PredictionResult>, ServiceError> {
        let model = self.ensure_available()?;
        let reader = CsvBatchReader::new(Self::validator(model), self.config.max_batch_rows);
        let transactions = reader.read(csv)?;

        let features = transactions
            .iter()
            .enumerate()
            .map(|(i, tx)| {
                model
                    .preprocessor()
                    .transform(tx)
                    .map_err(|e| ServiceError::InvalidInput(format!("Row {}: {}", i + 1, e)))
            })
            .collect::<Result<Vec<FeatureVector>, _>>()?;

        let outputs = features
            .iter()
            .enumerate()
            .map(|(i, f)| {
                self.engine.predict(f).map_err(|e| match ServiceError::from(e) {
                    ServiceError::InvalidInput(msg) => {
                        ServiceError::InvalidInput(format!("Row {}: {}", i + 1, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<ModelOutput>, _>>()?;

        let results = transactions
            .iter()
            .zip(outputs)
            .map(|(tx, output)| {
                self.metrics
                    .record_prediction(tx.amount, output.probability, output.label);
                self.result(model, output)
            })
            .collect::<Vec<_>>();

        debug!(
            "Batch of {} transactions predicted, totals: {}",
            results.len(),
            self.metrics.snapshot()
        );
        Ok(results)
    }

    /// Metadata of the loaded model
    pub fn model_info(&self) -> Result<ModelInfo, ServiceError> {
        Ok(self.ensure_available()?.info().clone())
    }

    /// Model status, never fails
    pub fn health(&self) -> ServiceHealth {
        let model = self.engine.model().ok();
        ServiceHealth {
            model: model.map(|m| m.info().description.clone()),
            model_loaded: model.is_some(),
        }
    }

    fn result(&self, model: &LoadedModel, output: ModelOutput) -> PredictionResult {
        PredictionResult {
            is_fraud: output.label,
            probability: output.probability,
            risk_level: RiskLevel::from_probability(output.probability, &self.config),
            model_version: model.info().model_version.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use data_validator::V_FIELDS;
    use feature_engine::{AmountTimeScaler, PreprocessingProfile, Preprocessor, ScalerParams};
    use inference_engine::{Classifier, InferenceError, LogisticRegression};
    use proptest::prelude::*;
    use serde_json::json;

    /// Probability read straight from `V1`, label from the sign of `V2`
    pub(crate) struct EchoClassifier {
        n_features: usize,
        v1: usize,
    }

    impl EchoClassifier {
        pub(crate) fn new(profile: PreprocessingProfile) -> Self {
            let columns = profile.columns();
            Self {
                n_features: columns.len(),
                v1: columns.iter().position(|c| *c == "V1").unwrap(),
            }
        }
    }

    impl Classifier for EchoClassifier {
        fn model_type(&self) -> &str {
            "EchoClassifier"
        }

        fn n_features(&self) -> usize {
            self.n_features
        }

        fn predict(&self, features: &[f64]) -> Result<ModelOutput, InferenceError> {
            Ok(ModelOutput {
                label: features[self.v1 + 1] > 0.0,
                probability: features[self.v1].clamp(0.0, 1.0),
            })
        }
    }

    pub(crate) fn echo_service(preprocessor: Preprocessor) -> InferenceService {
        let classifier = EchoClassifier::new(preprocessor.profile());
        let model =
            LoadedModel::new("UnderSampling", "echo", preprocessor, Box::new(classifier)).unwrap();
        InferenceService::new(
            InferenceEngine::with_model("memory", model),
            Arc::new(MetricsRecorder::new().unwrap()),
            ServiceConfig::default(),
        )
    }

    pub(crate) fn unavailable_service() -> InferenceService {
        InferenceService::new(
            InferenceEngine::unavailable("models/missing.json", "model artifact not found"),
            Arc::new(MetricsRecorder::new().unwrap()),
            ServiceConfig::default(),
        )
    }

    fn persisted() -> Preprocessor {
        Preprocessor::scaled_amount_time(AmountTimeScaler {
            amount: ScalerParams { center: 22.0, scale: 71.565 },
            time: ScalerParams { center: 84692.0, scale: 85119.0 },
        })
    }

    pub(crate) fn payload(amount: f64, v1: f64, v2: f64) -> Value {
        let mut payload = json!({ "Time": 406.0, "Amount": amount });
        for field in V_FIELDS {
            payload[field] = json!(0.0);
        }
        payload["V1"] = json!(v1);
        payload["V2"] = json!(v2);
        payload
    }

    fn csv(rows: &[(f64, &str)]) -> Vec<u8> {
        let mut out = String::from("Time,Amount");
        for field in V_FIELDS {
            out.push(',');
            out.push_str(field);
        }
        for (time, amount) in rows {
            out.push_str(&format!("\n{},{}", time, amount));
            for i in 0..V_FIELDS.len() {
                out.push_str(if i == 0 { ",0.3" } else { ",0" });
            }
        }
        out.into_bytes()
    }

    #[test]
    fn test_risk_level_thresholds() {
        let config = ServiceConfig::default();
        assert_eq!(RiskLevel::from_probability(0.85, &config), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_probability(0.6, &config), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.2, &config), RiskLevel::Low);
        // Thresholds are strict
        assert_eq!(RiskLevel::from_probability(0.8, &config), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.5, &config), RiskLevel::Low);
    }

    #[test]
    fn test_predict_reports_risk_level() {
        let service = echo_service(persisted());

        let result = service.predict(&payload(10.0, 0.85, 1.0)).unwrap();
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert_eq!(result.model_version, "UnderSampling");

        assert_eq!(service.predict(&payload(10.0, 0.6, 1.0)).unwrap().risk_level, RiskLevel::High);
        assert_eq!(service.predict(&payload(10.0, 0.2, 1.0)).unwrap().risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_is_fraud_follows_label_not_risk() {
        let service = echo_service(persisted());

        let critical_but_safe = service.predict(&payload(10.0, 0.95, -1.0)).unwrap();
        assert_eq!(critical_but_safe.risk_level, RiskLevel::Critical);
        assert!(!critical_but_safe.is_fraud);

        let low_but_fraud = service.predict(&payload(10.0, 0.05, 1.0)).unwrap();
        assert_eq!(low_but_fraud.risk_level, RiskLevel::Low);
        assert!(low_but_fraud.is_fraud);
    }

    #[test]
    fn test_missing_field_is_invalid_input() {
        let service = echo_service(persisted());
        let mut body = payload(10.0, 0.5, 1.0);
        body.as_object_mut().unwrap().remove("V14");

        match service.predict(&body) {
            Err(ServiceError::InvalidInput(msg)) => assert!(msg.contains("V14")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(service.metrics().snapshot().predictions_total(), 0);
    }

    #[test]
    fn test_profile_b_does_not_require_time() {
        let service = echo_service(Preprocessor::raw_amount());
        let mut body = payload(10.0, 0.3, 1.0);
        body.as_object_mut().unwrap().remove("Time");
        assert!(service.predict(&body).is_ok());
    }

    #[test]
    fn test_unavailable_model() {
        let service = unavailable_service();

        assert!(matches!(
            service.predict(&payload(1.0, 0.1, 0.0)),
            Err(ServiceError::ModelUnavailable(_))
        ));
        assert!(matches!(
            service.predict(&json!("not even an object")),
            Err(ServiceError::ModelUnavailable(_))
        ));
        assert!(matches!(
            service.predict_batch(&csv(&[(0.0, "1.0")])),
            Err(ServiceError::ModelUnavailable(_))
        ));
        assert!(matches!(service.model_info(), Err(ServiceError::ModelUnavailable(_))));
    }

    #[test]
    fn test_health_reports_model_state() {
        let health = echo_service(persisted()).health();
        assert!(health.model_loaded);
        assert_eq!(health.model.as_deref(), Some("echo"));

        let health = unavailable_service().health();
        assert!(!health.model_loaded);
        assert_eq!(health.model, None);
    }

    #[test]
    fn test_metrics_after_fraud_and_safe_predictions() {
        let service = echo_service(persisted());
        for _ in 0..3 {
            service.predict(&payload(5.0, 0.9, 1.0)).unwrap();
        }
        for _ in 0..5 {
            service.predict(&payload(60.0, 0.1, -1.0)).unwrap();
        }

        let snap = service.metrics().snapshot();
        assert_eq!(snap.fraud_total, 3);
        assert_eq!(snap.amount.count, 8);
        assert_eq!(snap.amount_processed_total, 315.0);
    }

    #[test]
    fn test_batch_predicts_every_row() {
        let service = echo_service(persisted());
        let results = service
            .predict_batch(&csv(&[(0.0, "10.0"), (1.0, "20.0"), (2.0, "30.0")]))
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.risk_level == RiskLevel::Low));
        assert!((results[0].probability - 0.3).abs() < 1e-12);
        assert_eq!(service.metrics().snapshot().amount.count, 3);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let service = echo_service(persisted());
        let err = service
            .predict_batch(&csv(&[(0.0, "10.0"), (1.0, "abc"), (2.0, "30.0")]))
            .unwrap_err();

        match err {
            ServiceError::InvalidInput(msg) => {
                assert!(msg.contains("Row 2"));
                assert!(msg.contains("Amount"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(service.metrics().snapshot().predictions_total(), 0);
    }

    #[test]
    fn test_batch_row_limit() {
        let service = InferenceService::new(
            echo_service(persisted()).engine,
            Arc::new(MetricsRecorder::new().unwrap()),
            ServiceConfig {
                max_batch_rows: 2,
                ..Default::default()
            },
        );
        let err = service
            .predict_batch(&csv(&[(0.0, "1"), (1.0, "2"), (2.0, "3")]))
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    fn logistic_service(preprocessor: Preprocessor) -> InferenceService {
        let n = preprocessor.feature_count();
        let mut coefficients = vec![0.05; n];
        coefficients[0] = 0.8;
        let lr = LogisticRegression::new(coefficients, -1.0, 0.5, None).unwrap();
        let model = LoadedModel::new("v", "lr", preprocessor, Box::new(lr)).unwrap();
        InferenceService::new(
            InferenceEngine::with_model("memory", model),
            Arc::new(MetricsRecorder::new().unwrap()),
            ServiceConfig::default(),
        )
    }

    #[test]
    fn test_profile_b_is_idempotent() {
        let service = logistic_service(Preprocessor::raw_amount());
        let body = payload(149.62, -1.36, -0.07);

        let first = service.predict(&body).unwrap();
        let second = service.predict(&body).unwrap();
        assert_eq!(first.probability, second.probability);
        assert_eq!(first, second);
    }

    // Compatibility mode reproduces the single-row refit: repeated calls agree,
    // but Amount no longer influences the probability at all.
    #[test]
    fn test_refit_per_request_known_issue() {
        let service = logistic_service(Preprocessor::scaled_amount_time_refit());

        let first = service.predict(&payload(1.0, 0.2, 0.1)).unwrap();
        let again = service.predict(&payload(1.0, 0.2, 0.1)).unwrap();
        let huge = service.predict(&payload(90_000.0, 0.2, 0.1)).unwrap();

        assert_eq!(first.probability, again.probability);
        assert_eq!(first.probability, huge.probability);

        // With persisted parameters Amount moves the probability
        let service = logistic_service(persisted());
        let small = service.predict(&payload(1.0, 0.2, 0.1)).unwrap();
        let large = service.predict(&payload(90_000.0, 0.2, 0.1)).unwrap();
        assert!(large.probability > small.probability);
    }

    #[test]
    fn test_wire_format() {
        let result = PredictionResult {
            is_fraud: true,
            probability: 0.876_543_21,
            risk_level: RiskLevel::Critical,
            model_version: "UnderSampling".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["probability"], json!(0.8765));
        assert_eq!(json["risk_level"], "CRITICAL");
        assert_eq!(json["is_fraud"], true);
        assert_eq!(json["model_version"], "UnderSampling");
    }

    proptest! {
        #[test]
        fn prop_probability_and_risk_are_consistent(
            amount in 0.0f64..50_000.0,
            v1 in -10.0f64..10.0,
            v2 in -10.0f64..10.0,
        ) {
            let service = logistic_service(persisted());
            let result = service.predict(&payload(amount, v1, v2)).unwrap();

            prop_assert!((0.0..=1.0).contains(&result.probability));
            let config = ServiceConfig::default();
            let expected = RiskLevel::from_probability(result.probability, &config);
            prop_assert_eq!(result.risk_level, expected);
        }
    }
}
