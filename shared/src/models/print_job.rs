//! Print Job Model

use serde::{Deserialize, Serialize};

/// Outcome of one received print job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Success,
    ErrorParse,
}

/// Virtual printer status shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrinterStatus {
    Idle,
    Receiving,
    Processing,
    Error,
}

impl std::fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrinterStatus::Idle => write!(f, "IDLE"),
            PrinterStatus::Receiving => write!(f, "RECEIVING"),
            PrinterStatus::Processing => write!(f, "PROCESSING"),
            PrinterStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// One buffered byte stream received by the listener (immutable record)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: String,
    /// Unix milliseconds
    pub timestamp: i64,
    /// Truncated text excerpt
    pub preview: String,
    /// Raw byte length
    pub size: usize,
    pub status: JobStatus,
    /// Set only on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_number: Option<String>,
    /// Parse failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PrintJob {
    pub fn success(preview: String, size: usize, recipe_number: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: crate::util::now_millis(),
            preview,
            size,
            status: JobStatus::Success,
            recipe_number: Some(recipe_number),
            error: None,
        }
    }

    pub fn parse_error(preview: String, size: usize, error: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: crate::util::now_millis(),
            preview,
            size,
            status: JobStatus::ErrorParse,
            recipe_number: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&JobStatus::ErrorParse).unwrap(),
            "\"ERROR_PARSE\""
        );
        assert_eq!(
            serde_json::to_string(&PrinterStatus::Receiving).unwrap(),
            "\"RECEIVING\""
        );
    }

    #[test]
    fn test_parse_error_job_has_no_recipe() {
        let job = PrintJob::parse_error("garbage".into(), 7, "no text".into());
        assert!(!job.is_success());
        assert!(job.recipe_number.is_none());
        assert_eq!(job.size, 7);
    }
}
