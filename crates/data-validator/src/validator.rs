//! Transaction Schema Validator

use crate::error::ValidationError;
use crate::transaction::{Transaction, V_FEATURE_COUNT, V_FIELDS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validation configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Whether `Time` is a required field
    pub require_time: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { require_time: true }
    }
}

impl ValidationConfig {
    /// Schema without the `Time` column
    pub fn without_time() -> Self {
        Self {
            require_time: false,
        }
    }
}

/// Validator turning loosely typed records into [`Transaction`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionValidator {
    config: ValidationConfig,
}

impl TransactionValidator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Names of the required fields, in the order they are checked
    pub fn required_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::with_capacity(V_FEATURE_COUNT + 2);
        if self.config.require_time {
            fields.push("Time");
        }
        fields.push("Amount");
        fields.extend_from_slice(&V_FIELDS);
        fields
    }

    /// Validate a JSON payload. Unknown keys are ignored.
    pub fn validate_json(&self, payload: &Value) -> Result<Transaction, ValidationError> {
        let object = payload.as_object().ok_or_else(|| {
            ValidationError::InvalidFormat(format!(
                "expected a JSON object, got {}",
                json_type_name(payload)
            ))
        })?;

        self.assemble(|field| match object.get(field) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| {
                ValidationError::InvalidType {
                    field,
                    found: n.to_string(),
                }
            }),
            Some(other) => Err(ValidationError::InvalidType {
                field,
                found: json_type_name(other).to_string(),
            }),
        })
    }

    /// Validate a record of raw text cells, looked up by column name
    pub fn validate_cells<'a, F>(&self, mut cell: F) -> Result<Transaction, ValidationError>
    where
        F: FnMut(&'static str) -> Option<&'a str>,
    {
        self.assemble(|field| match cell(field).map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ValidationError::InvalidType {
                    field,
                    found: format!("\"{}\"", raw),
                }),
        })
    }

    fn assemble<F>(&self, mut lookup: F) -> Result<Transaction, ValidationError>
    where
        F: FnMut(&'static str) -> Result<Option<f64>, ValidationError>,
    {
        let mut required = |field: &'static str| -> Result<f64, ValidationError> {
            let value = lookup(field)?.ok_or(ValidationError::MissingField(field))?;
            Self::validate_finite(field, value)
        };

        let time = if self.config.require_time {
            Some(required("Time")?)
        } else {
            None
        };
        let amount = required("Amount")?;

        let mut v = [0.0; V_FEATURE_COUNT];
        for (slot, field) in v.iter_mut().zip(V_FIELDS) {
            *slot = required(field)?;
        }

        Ok(Transaction::new(time, amount, v))
    }

    /// Reject NaN and infinities
    pub fn validate_finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ValidationError::NonFinite { field, value })
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
