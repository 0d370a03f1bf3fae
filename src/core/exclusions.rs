use serde::{Deserialize, Serialize};

/// Why a single record was excluded from the batch.
///
/// None of these abort the run; they are reported alongside the results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecordError {
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },
    #[error("duplicate object number, first seen at row {first_row}")]
    DuplicateObjectNumber { first_row: usize },
    #[error("object number must be 20 digits: {value:?}")]
    InvalidObjectNumber { value: String },
    #[error("{field} must be a 2 character code: {value:?}")]
    InvalidCode { field: String, value: String },
    #[error("{field} is not a valid number: {value:?}")]
    InvalidNumber { field: String, value: String },
    #[error("{field} must not be negative: {value}")]
    NegativeAmount { field: String, value: String },
    #[error("arithmetic overflow computing {stage}")]
    ArithmeticOverflow { stage: String },
}

impl RecordError {
    pub fn missing(field: &str) -> Self {
        RecordError::MissingRequiredField {
            field: field.to_string(),
        }
    }

    pub fn overflow(stage: &str) -> Self {
        RecordError::ArithmeticOverflow {
            stage: stage.to_string(),
        }
    }

    /// Short stable name of the error kind, used for counters and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordError::MissingRequiredField { .. } => "MissingRequiredField",
            RecordError::DuplicateObjectNumber { .. } => "DuplicateObjectNumber",
            RecordError::InvalidObjectNumber { .. } => "InvalidObjectNumber",
            RecordError::InvalidCode { .. } => "InvalidCode",
            RecordError::InvalidNumber { .. } => "InvalidNumber",
            RecordError::NegativeAmount { .. } => "NegativeAmount",
            RecordError::ArithmeticOverflow { .. } => "ArithmeticOverflow",
        }
    }
}

/// A raw row that did not make it to a tax computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    /// 1-based position of the row in the input batch
    pub row: usize,
    /// Object number as it appeared in the input, if any
    pub object_number: Option<String>,
    pub reason: RecordError,
}

impl Exclusion {
    pub fn new(row: usize, object_number: Option<&str>, reason: RecordError) -> Self {
        log::debug!(
            "Excluding row {}: object_number={:?} reason={}",
            row,
            object_number,
            reason
        );
        Exclusion {
            row,
            object_number: object_number.map(str::to_string),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(RecordError::missing("x").kind(), "MissingRequiredField");
        assert_eq!(
            RecordError::DuplicateObjectNumber { first_row: 1 }.kind(),
            "DuplicateObjectNumber"
        );
        assert_eq!(RecordError::overflow("limit_1").kind(), "ArithmeticOverflow");
    }

    #[test]
    fn display_messages() {
        let err = RecordError::InvalidNumber {
            field: "avalpred_vigact".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "avalpred_vigact is not a valid number: \"abc\""
        );
        assert_eq!(
            RecordError::DuplicateObjectNumber { first_row: 3 }.to_string(),
            "duplicate object number, first seen at row 3"
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&RecordError::missing("predial_vigant")).unwrap();
        assert_eq!(
            json,
            r#"{"type":"MissingRequiredField","field":"predial_vigant"}"#
        );
    }
}
