//! Errors raised while loading a domain from the parser's JSON output.

use thiserror::Error;

/// Reasons a serialized domain is rejected before analysis.
#[derive(Debug, Error)]
pub enum AstError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed domain: {0}")]
    Malformed(String),
}
