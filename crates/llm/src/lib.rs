//! KnowPro LLM collaborator boundary.
//!
//! This crate defines the structured wire schema exchanged with the LLM
//! collaborators and the async traits the engine calls them through:
//! - `QueryTranslator`: natural language → `SearchQuery`
//! - `AnswerGenerator`: answer context prompt → `AnswerResponse`

pub mod client;
pub mod schema;

// Re-export commonly used types
pub use client::{AnswerGenerator, QueryTranslator};
pub use schema::{
    ActionTerm, AnswerResponse, AnswerType, DateTimeRange, EntityTerm, EntityTermsOrWildcard,
    FacetTerm, SearchExpr, SearchFilter, SearchQuery, VerbsTerm, WILDCARD,
};
