//! Optional debug surface for inspecting a language search.

use knowpro_llm::SearchQuery;
use serde::{Deserialize, Serialize};

use crate::term_group::SearchQueryExpr;

/// What a language search actually did, for logging and diagnostics.
///
/// Filled in as the pipeline runs: the raw translated query, the compiled
/// expressions, and per expression whether the executor fell back to
/// similarity matching instead of exact term matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageSearchDebugContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<SearchQuery>,

    #[serde(default)]
    pub search_query_exprs: Vec<SearchQueryExpr>,

    /// One flag per compiled expression, set by the executor
    #[serde(default)]
    pub used_similarity_fallback: Vec<bool>,
}
