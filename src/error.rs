//! Error types for the ladder service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. The rating engine itself never fails; these
//! errors come from storage, configuration and request validation.

use crate::types::CompetitorId;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Which side of a match a competitor id was supplied for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRole {
    Winner,
    Loser,
}

impl std::fmt::Display for MatchRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchRole::Winner => write!(f, "winner"),
            MatchRole::Loser => write!(f, "loser"),
        }
    }
}

/// Custom error types for specific ladder scenarios
#[derive(Debug, thiserror::Error)]
pub enum LadderError {
    #[error("Competitor not found: {competitor_id}")]
    CompetitorNotFound { competitor_id: CompetitorId },

    #[error("Match {role} not found: {competitor_id}")]
    MatchParticipantNotFound {
        role: MatchRole,
        competitor_id: CompetitorId,
    },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Competitor capacity exceeded: {limit}")]
    CapacityExceeded { limit: usize },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
