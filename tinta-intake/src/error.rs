//! Error types for the intake library

use std::net::SocketAddr;
use thiserror::Error;

/// Listener error types
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Could not bind the listening port (fatal at startup)
    #[error("Bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error on a single connection
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid listener configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Job consumer went away
    #[error("Job channel closed (peer {0})")]
    ChannelClosed(SocketAddr),
}

/// Result type for listener operations
pub type IntakeResult<T> = Result<T, IntakeError>;

/// Job-level parse failure
///
/// Every variant carries a short excerpt of the decoded text for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing in the job decodes to a printable line
    #[error("No printable text in job")]
    NoText { excerpt: String },

    /// Recipe number line not found
    #[error("Recipe number not found")]
    MissingRecipeNumber { excerpt: String },

    /// No line matched the ingredient grammar
    #[error("No ingredient lines recognized")]
    NoIngredients { excerpt: String },
}

impl ParseError {
    pub fn excerpt(&self) -> &str {
        match self {
            ParseError::NoText { excerpt }
            | ParseError::MissingRecipeNumber { excerpt }
            | ParseError::NoIngredients { excerpt } => excerpt,
        }
    }
}

/// Result type for parsing
pub type ParseResult<T> = Result<T, ParseError>;
