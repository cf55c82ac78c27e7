//! Structured-RAG retrieval engine: compiles translated search queries into
//! executable expressions, merges the knowledge the index returns, builds a
//! budgeted answer context, and orchestrates answer generation.
//!
//! The engine owns no index and no LLM transport. It talks to the host's
//! index through [`store::ConversationStore`] and to the LLM collaborators
//! through the traits in `knowpro_llm`.

pub mod answer;
pub mod compile;
pub mod context;
pub mod debug;
pub mod merge;
pub mod model;
pub mod store;
pub mod term_group;

#[cfg(test)]
mod tests;

pub use answer::{split_context, AnswerOrchestrator, NO_SEARCH_RESULTS};
pub use compile::{compile_search_query, CompileOptions, TermFilter};
pub use context::{
    AnswerContext, AnswerContextBuilder, RelevantEntity, RelevantMessage, RelevantTopic, TimeRange,
};
pub use debug::LanguageSearchDebugContext;
pub use merge::{
    collect_endpoint_ordinals, merge_scored_entities, merge_scored_topics, top_k, MergedEntity,
    MergedTopic, OrdinalSpan,
};
pub use model::{
    ConversationSearchResult, Knowledge, KnowledgeType, Message, MessageMetadata, MessageOrdinal,
    Scored, ScoredMessageOrdinal, ScoredSemanticRefOrdinal, SemanticRef, SemanticRefOrdinal,
    SemanticRefSearchResult,
};
pub use store::ConversationStore;
pub use term_group::{
    BoolOp, DateRange, PropertyName, PropertySearchTerm, SearchQueryExpr, SearchSelectExpr,
    SearchTerm, SearchTermGroup, TermGroupItem, WhenFilter,
};
