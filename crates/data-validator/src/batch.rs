//! CSV Batch Reader

use crate::error::ValidationError;
use crate::transaction::Transaction;
use crate::validator::TransactionValidator;
use std::collections::HashMap;
use tracing::debug;

/// Reads a CSV upload (header row + one transaction per row) into validated transactions.
///
/// All-or-nothing: the first malformed row aborts the whole batch.
#[derive(Debug, Clone)]
pub struct CsvBatchReader {
    validator: TransactionValidator,
    max_rows: usize,
}

impl CsvBatchReader {
    /// Create a reader enforcing `max_rows` data rows
    pub fn new(validator: TransactionValidator, max_rows: usize) -> Self {
        Self {
            validator,
            max_rows,
        }
    }

    /// Parse and validate every row
    pub fn read(&self, data: &[u8]) -> Result<Vec<Transaction>, ValidationError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(data);

        let headers = reader.headers()?.clone();
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();

        let mut columns = HashMap::new();
        for field in self.validator.required_fields() {
            let position = index
                .get(field)
                .copied()
                .ok_or(ValidationError::MissingField(field))?;
            columns.insert(field, position);
        }

        let mut transactions = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let row = i + 1;
            if row > self.max_rows {
                return Err(ValidationError::TooManyRows {
                    limit: self.max_rows,
                });
            }

            let record = record.map_err(|e| ValidationError::from(e).at_row(row))?;
            let transaction = self
                .validator
                .validate_cells(|field| columns.get(field).and_then(|&idx| record.get(idx)))
                .map_err(|e| e.at_row(row))?;
            transactions.push(transaction);
        }

        debug!("Parsed CSV batch of {} rows", transactions.len());
        Ok(transactions)
    }
}
