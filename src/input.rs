//! Request body parsing: JSON-lines text into an ordered [`RecordBatch`].

use serde_json::Value;

use crate::{
    error::ServiceError,
    model::{Record, RecordBatch},
};

/// Decodes a raw `/predict` body as UTF-8 and parses it with [`parse_records`].
pub fn parse_body(body: &[u8]) -> Result<RecordBatch, ServiceError> {
    let text = std::str::from_utf8(body).map_err(|e| {
        ServiceError::InvalidInput(format!("request body is not valid UTF-8: {e}"))
    })?;
    parse_records(text)
}

/// Parses a `/predict` body.
///
/// Accepts raw JSON lines, a JSON string whose content is JSON lines, or a
/// JSON array of records. Blank lines are skipped; at least one record is
/// required.
pub fn parse_records(body: &str) -> Result<RecordBatch, ServiceError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput("request body is empty".into()));
    }

    let records = if trimmed.starts_with('"') {
        let inner: String = serde_json::from_str(trimmed)
            .map_err(|e| ServiceError::InvalidInput(format!("invalid JSON string body: {e}")))?;
        parse_json_lines(&inner)?
    } else if trimmed.starts_with('[') {
        parse_array(trimmed)?
    } else {
        parse_json_lines(trimmed)?
    };

    RecordBatch::new(records)
        .ok_or_else(|| ServiceError::InvalidInput("no records in request body".into()))
}

fn parse_json_lines(text: &str) -> Result<Vec<Record>, ServiceError> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str::<Record>(line)
            .map_err(|e| ServiceError::InvalidInput(format!("line {}: {e}", idx + 1)))?;
        records.push(record);
    }
    Ok(records)
}

fn parse_array(text: &str) -> Result<Vec<Record>, ServiceError> {
    let items: Vec<Value> = serde_json::from_str(text)
        .map_err(|e| ServiceError::InvalidInput(format!("invalid JSON array: {e}")))?;

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            serde_json::from_value::<Record>(item)
                .map_err(|e| ServiceError::InvalidInput(format!("record {}: {e}", idx + 1)))
        })
        .collect()
}
