//! Configuration management for the KnowPro engine.
//!
//! This module handles loading and merging configuration from multiple
//! sources:
//! - Built-in defaults
//! - Config files (YAML)
//! - Environment variables (`KNOWPRO_*`)
//!
//! Settings are grouped by pipeline stage: query compilation, answer-context
//! assembly, and answer generation. Invalid values fail at load time, not at
//! call time.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Default top-K for merged entities and topics in an answer context.
pub const DEFAULT_KNOWLEDGE_TOP_K: usize = 50;

/// Default number of chunked generation requests in flight at once.
pub const DEFAULT_ANSWER_CONCURRENCY: usize = 2;

/// Default character budget before an answer context is split into chunks.
pub const DEFAULT_MAX_CHARS_IN_BUDGET: usize = 4096 * 4;

/// Query compilation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// Request exact term matching from the index instead of fuzzy matching
    pub exact_match: bool,

    /// Derive scope filters from non-informational action terms
    pub apply_scope: bool,

    /// Include action verbs in derived scope filters
    pub verb_scope: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exact_match: false,
            apply_scope: true,
            verb_scope: true,
        }
    }
}

/// Answer-context assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextConfig {
    /// Maximum merged entities included in a context
    pub entities_top_k: usize,

    /// Maximum merged topics included in a context
    pub topics_top_k: usize,

    /// Maximum messages included in a context (`None` = unlimited)
    pub messages_top_k: Option<usize>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            entities_top_k: DEFAULT_KNOWLEDGE_TOP_K,
            topics_top_k: DEFAULT_KNOWLEDGE_TOP_K,
            messages_top_k: None,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnswerConfig {
    /// Maximum chunked generation requests in flight at once
    pub concurrency: usize,

    /// Character budget for a single generation request; larger contexts are
    /// split into chunks
    pub max_chars_in_budget: usize,

    /// Stop as soon as one chunk produces an answer and cancel the rest
    pub fast_stop: bool,

    /// Extra instructions appended to the generator prompt
    pub answer_instructions: Option<String>,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_ANSWER_CONCURRENCY,
            max_chars_in_budget: DEFAULT_MAX_CHARS_IN_BUDGET,
            fast_stop: true,
            answer_instructions: None,
        }
    }
}

/// Main engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Query compilation settings
    pub search: SearchConfig,

    /// Answer-context assembly settings
    pub context: ContextConfig,

    /// Answer generation settings
    pub answer: AnswerConfig,

    /// Log level override
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Load configuration from defaults, an optional YAML file, and
    /// environment variables, in increasing order of precedence.
    ///
    /// Environment variables:
    /// - `KNOWPRO_CONFIG`: path to a YAML config file
    /// - `KNOWPRO_CONCURRENCY`: answer generation concurrency
    /// - `KNOWPRO_FAST_STOP`: "true"/"false"
    /// - `RUST_LOG`: log level
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("KNOWPRO_CONFIG") {
            config = Self::from_file(Path::new(&path))?;
        }

        if let Ok(concurrency) = std::env::var("KNOWPRO_CONCURRENCY") {
            config.answer.concurrency = concurrency.parse().map_err(|_| {
                AppError::Config(format!("Invalid KNOWPRO_CONCURRENCY: {}", concurrency))
            })?;
        }

        if let Ok(fast_stop) = std::env::var("KNOWPRO_FAST_STOP") {
            config.answer.fast_stop = fast_stop.parse().map_err(|_| {
                AppError::Config(format!("Invalid KNOWPRO_FAST_STOP: {}", fast_stop))
            })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Construction-time validation: nonsense settings fail here, never
    /// mid-request.
    pub fn validate(&self) -> AppResult<()> {
        if self.context.entities_top_k == 0 {
            return Err(AppError::Config(
                "context.entitiesTopK must be at least 1".to_string(),
            ));
        }
        if self.context.topics_top_k == 0 {
            return Err(AppError::Config(
                "context.topicsTopK must be at least 1".to_string(),
            ));
        }
        if self.context.messages_top_k == Some(0) {
            return Err(AppError::Config(
                "context.messagesTopK must be at least 1 when set".to_string(),
            ));
        }
        if self.answer.concurrency == 0 {
            return Err(AppError::Config(
                "answer.concurrency must be at least 1".to_string(),
            ));
        }
        if self.answer.max_chars_in_budget == 0 {
            return Err(AppError::Config(
                "answer.maxCharsInBudget must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
