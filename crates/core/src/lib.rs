//! KnowPro Core Library
//!
//! This crate provides the foundational utilities for the KnowPro engine:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AnswerConfig, AppConfig, ContextConfig, SearchConfig};
pub use error::{AppError, AppResult};
