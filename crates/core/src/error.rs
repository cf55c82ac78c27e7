//! Error types for the KnowPro engine.
//!
//! This module defines a unified error enum covering every failure mode in
//! the engine: configuration, store I/O, LLM collaborators, and the
//! engine-internal conditions the query pipeline distinguishes (empty
//! results, index consistency violations, cancellation).

use thiserror::Error;

/// Unified error type for the KnowPro engine.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic on user input — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A search produced zero knowledge matches and zero message matches.
    ///
    /// This is a distinguished condition: callers short-circuit to a
    /// structured "no answer" without any store or LLM call.
    #[error("Search produced no knowledge or message matches")]
    EmptySearchResults,

    /// Internal consistency violation between the engine and the backing
    /// index, such as a batched lookup returning the wrong number of rows.
    /// Always fatal, never user-facing.
    #[error("Index consistency error: {0}")]
    Consistency(String),

    /// Errors raised by the backing conversation store. Propagated
    /// unmodified; retry policy belongs to the store client.
    #[error("Store error: {0}")]
    Store(String),

    /// Errors raised by an LLM collaborator (translator or generator).
    /// Propagated unmodified; retry policy belongs to the LLM client.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The request's cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
