//! Task outcome definitions
//!
//! Every search ends in exactly one of these variants; the coordinator
//! decides retry and bookkeeping per variant.

use crate::model::DecisionRecord;
use std::fmt;

/// Result of running one (court, date) search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The results table held at least one decision
    Success(Vec<DecisionRecord>),

    /// The search completed but returned nothing (not-found page, empty
    /// table, or an unrecognised page)
    EmptyResult,

    /// A failure that may succeed if repeated (timeout, connection error,
    /// server error, throttling)
    TransientError(String),

    /// A failure that repeating will not fix
    FatalError(String),
}

impl TaskOutcome {
    /// Builds `Success` or `EmptyResult` from parsed records
    pub fn from_records(records: Vec<DecisionRecord>) -> Self {
        if records.is_empty() {
            Self::EmptyResult
        } else {
            Self::Success(records)
        }
    }

    /// Returns true if the search completed, with or without results
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Success(_) | Self::EmptyResult)
    }

    /// Returns true if the search failed
    pub fn is_error(&self) -> bool {
        matches!(self, Self::TransientError(_) | Self::FatalError(_))
    }

    /// Returns true if another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientError(_))
    }

    pub fn decision_count(&self) -> usize {
        match self {
            Self::Success(records) => records.len(),
            _ => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::EmptyResult => "empty",
            Self::TransientError(_) => "transient-error",
            Self::FatalError(_) => "fatal-error",
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(records) => write!(f, "{} decisions", records.len()),
            Self::EmptyResult => write!(f, "no decisions"),
            Self::TransientError(reason) => write!(f, "transient error: {}", reason),
            Self::FatalError(reason) => write!(f, "fatal error: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_empty_records() {
        assert_eq!(TaskOutcome::from_records(vec![]), TaskOutcome::EmptyResult);
    }

    #[test]
    fn test_classification() {
        let transient = TaskOutcome::TransientError("timeout".into());
        let fatal = TaskOutcome::FatalError("HTTP 403".into());

        assert!(transient.is_error());
        assert!(transient.is_retryable());
        assert!(fatal.is_error());
        assert!(!fatal.is_retryable());
        assert!(TaskOutcome::EmptyResult.is_complete());
        assert!(!TaskOutcome::EmptyResult.is_error());
        assert_eq!(TaskOutcome::EmptyResult.decision_count(), 0);
    }

    #[test]
    fn test_labels_are_distinct() {
        let labels = [
            TaskOutcome::Success(vec![]).label(),
            TaskOutcome::EmptyResult.label(),
            TaskOutcome::TransientError(String::new()).label(),
            TaskOutcome::FatalError(String::new()).label(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), 4);
    }
}
