use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// One input observation. Unknown fields are ignored; both known fields are
/// required and must be JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Record {
    pub gre: f64,
    pub gpa: f64,
}

impl Record {
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Gre => self.gre,
            Feature::Gpa => self.gpa,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Gre,
    Gpa,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Gre => f.write_str("gre"),
            Feature::Gpa => f.write_str("gpa"),
        }
    }
}

/// Ordered, non-empty batch of records handed to a model in a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    records: Vec<Record>,
}

impl RecordBatch {
    /// Returns `None` for an empty batch.
    pub fn new(records: Vec<Record>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self { records })
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn column(&self, feature: Feature) -> Vec<f64> {
        self.records.iter().map(|r| r.value(feature)).collect()
    }

    /// Flattens the batch into a `len() x features.len()` row-major matrix.
    pub fn to_row_major(&self, features: &[Feature]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.records.len() * features.len());
        for record in &self.records {
            out.extend(features.iter().map(|&f| record.value(f)));
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub predictions: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub name: String,
    pub kind: String,
    pub features: Vec<Feature>,
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> RecordBatch {
        RecordBatch::new(vec![
            Record { gre: 320.0, gpa: 3.8 },
            Record { gre: 300.0, gpa: 3.2 },
        ])
        .unwrap()
    }

    #[test]
    fn empty_batch_is_refused() {
        assert!(RecordBatch::new(Vec::new()).is_none());
    }

    #[test]
    fn columns_follow_record_order() {
        let batch = batch();
        assert_eq!(batch.column(Feature::Gre), vec![320.0, 300.0]);
        assert_eq!(batch.column(Feature::Gpa), vec![3.8, 3.2]);
    }

    #[test]
    fn row_major_respects_feature_order() {
        let batch = batch();
        assert_eq!(
            batch.to_row_major(&[Feature::Gpa, Feature::Gre]),
            vec![3.8, 320.0, 3.2, 300.0]
        );
    }

    #[test]
    fn feature_names_are_lowercase() {
        let parsed: Vec<Feature> = serde_json::from_str(r#"["gre", "gpa"]"#).unwrap();
        assert_eq!(parsed, vec![Feature::Gre, Feature::Gpa]);
        assert!(serde_json::from_str::<Feature>(r#""rank""#).is_err());
    }
}
