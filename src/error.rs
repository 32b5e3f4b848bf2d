//! Error taxonomy for the analysis core

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// Rejected before any work is done; fatal to the call
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A single record failed validation; callers skip it and carry on
    #[error("malformed record in session {session}: {reason}")]
    MalformedRecord { session: String, reason: String },
}

impl AnalysisError {
    pub fn malformed(session: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::MalformedRecord {
            session: session.into(),
            reason: reason.into(),
        }
    }
}
