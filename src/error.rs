// 🚨 Error taxonomy for the comparison pipeline
//
// Fetch and normalize failures propagate to the top of the pipeline.
// EmptyResult is the only non-fatal kind: it is collected as a run warning.

use thiserror::Error;

/// Maximum number of payload characters kept inside a MalformedResponse
pub const PAYLOAD_SNIPPET_LEN: usize = 500;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompareError {
    /// Network failure that survived every retry
    #[error("Transient network error after {attempts} attempt(s): {message}")]
    TransientNetwork { attempts: u32, message: String },

    /// Identifier resolves to nothing in the knowledge base
    #[error("Entity not found: {id}")]
    NotFound { id: String },

    /// Response did not match the expected schema
    #[error("Malformed response ({context}): {payload}")]
    MalformedResponse { context: String, payload: String },

    /// Record has no entity-valued statements
    #[error("Entity {id} has no entity-valued statements")]
    EmptyResult { id: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CompareError {
    /// Build a MalformedResponse, truncating the payload to a readable snippet
    pub fn malformed(context: impl Into<String>, payload: &str) -> Self {
        CompareError::MalformedResponse {
            context: context.into(),
            payload: payload.chars().take(PAYLOAD_SNIPPET_LEN).collect(),
        }
    }

    /// Whether the run must abort on this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CompareError::EmptyResult { .. })
    }
}

pub type CompareResult<T> = Result<T, CompareError>;
