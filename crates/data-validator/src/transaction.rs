//! Card Transaction Record

/// Number of anonymised PCA components (`V1..V28`)
pub const V_FEATURE_COUNT: usize = 28;

/// Wire names of the anonymised components, in training order
pub const V_FIELDS: [&str; V_FEATURE_COUNT] = [
    "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12", "V13", "V14",
    "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23", "V24", "V25", "V26", "V27",
    "V28",
];

/// A validated card transaction.
///
/// `time` is `None` when the schema in use does not carry `Time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transaction {
    /// Seconds elapsed since the first transaction of the capture window
    pub time: Option<f64>,
    /// Monetary amount
    pub amount: f64,
    /// Anonymised components `V1..V28`
    pub v: [f64; V_FEATURE_COUNT],
}

impl Transaction {
    /// Create a transaction from its parts
    pub fn new(time: Option<f64>, amount: f64, v: [f64; V_FEATURE_COUNT]) -> Self {
        Self { time, amount, v }
    }
}
