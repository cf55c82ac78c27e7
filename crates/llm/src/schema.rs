//! Structured wire schema exchanged with the LLM collaborators.
//!
//! The query translator returns a [`SearchQuery`]: an ordered list of
//! independently executable search expressions with pre-resolved references.
//! The answer generator returns an [`AnswerResponse`]. These are the only
//! wire contracts the engine owns; field names follow the structured-output
//! JSON the model produces (camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wildcard marker used throughout the schema ("match anything").
pub const WILDCARD: &str = "*";

/// A structured search query produced by the query translator.
///
/// Each expression is independently executable: the translator has already
/// resolved references between them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub search_expressions: Vec<SearchExpr>,
}

/// One executable search expression.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchExpr {
    /// The user's request rewritten as a standalone query
    pub rewritten_query: String,

    /// Filters to apply; an expression may carry several
    #[serde(default)]
    pub filters: Vec<SearchFilter>,
}

/// A single search filter within an expression.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    /// Subject-verb-object action constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_search_term: Option<ActionTerm>,

    /// Entity terms: tangible things only (people, places, products)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_search_terms: Option<Vec<EntityTerm>>,

    /// Plain search terms; an explicit empty array means "summarize"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_terms: Option<Vec<String>>,

    /// Time range constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<DateTimeRange>,
}

impl SearchFilter {
    /// True when the filter carries no action, entity, or time constraint.
    pub fn terms_only(&self) -> bool {
        self.action_search_term.is_none()
            && self
                .entity_search_terms
                .as_ref()
                .map(|e| e.is_empty())
                .unwrap_or(true)
    }
}

/// Subject-verb-object action constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionTerm {
    /// Action verbs, e.g. ["sent", "gave"]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_verbs: Option<VerbsTerm>,

    /// Entities performing the action; `"*"` when any actor matches
    #[serde(default)]
    pub actor_entities: EntityTermsOrWildcard,

    /// Entities the action targets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_entities: Option<Vec<EntityTerm>>,

    /// Other entities involved in the action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_entities: Option<Vec<EntityTerm>>,

    /// True for "tell/describe/explain" style requests, where the action
    /// carries no real subject-verb-object structure
    #[serde(default)]
    pub is_informational: bool,
}

/// Action verbs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerbsTerm {
    pub words: Vec<String>,
}

/// Either a concrete list of entity terms or the `"*"` wildcard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EntityTermsOrWildcard {
    Wildcard(String),
    Entities(Vec<EntityTerm>),
}

impl Default for EntityTermsOrWildcard {
    fn default() -> Self {
        Self::Wildcard(WILDCARD.to_string())
    }
}

impl EntityTermsOrWildcard {
    /// Concrete entity terms, or `None` for the wildcard.
    pub fn entities(&self) -> Option<&[EntityTerm]> {
        match self {
            Self::Wildcard(_) => None,
            Self::Entities(terms) => Some(terms),
        }
    }

    /// True for the wildcard or an empty entity list.
    pub fn is_wildcard(&self) -> bool {
        match self {
            Self::Wildcard(_) => true,
            Self::Entities(terms) => terms.is_empty(),
        }
    }
}

/// An entity term: a tangible thing with optional type and facet constraints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityTerm {
    /// Entity name as the user referred to it
    pub name: String,

    /// True when the name is a pronoun ("he", "them"); pronouns are not
    /// searchable names
    #[serde(default)]
    pub is_name_pronoun: bool,

    /// Entity types, e.g. ["person"], ["book", "document"]
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<Vec<String>>,

    /// Attribute constraints on the entity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<FacetTerm>>,
}

impl EntityTerm {
    /// Create an entity term with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// An attribute constraint; either side may be the `"*"` wildcard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FacetTerm {
    pub facet_name: String,
    pub facet_value: String,
}

impl FacetTerm {
    pub fn name_is_wildcard(&self) -> bool {
        self.facet_name == WILDCARD
    }

    pub fn value_is_wildcard(&self) -> bool {
        self.facet_value == WILDCARD
    }
}

/// A time range constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeRange {
    pub start_date: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_date: Option<DateTime<Utc>>,
}

/// Outcome of an answer generation call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnswerType {
    NoAnswer,
    Answered,
}

/// Structured answer returned by the answer generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    /// Whether the generator could answer from the provided context
    #[serde(rename = "type")]
    pub response_type: AnswerType,

    /// The answer, when `response_type` is `Answered`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// Why no answer could be given, when `response_type` is `NoAnswer`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub why_no_answer: Option<String>,
}

impl AnswerResponse {
    /// Create an answered response.
    pub fn answered(answer: impl Into<String>) -> Self {
        Self {
            response_type: AnswerType::Answered,
            answer: Some(answer.into()),
            why_no_answer: None,
        }
    }

    /// Create a no-answer response with a reason.
    pub fn no_answer(reason: impl Into<String>) -> Self {
        Self {
            response_type: AnswerType::NoAnswer,
            answer: None,
            why_no_answer: Some(reason.into()),
        }
    }

    /// True when the response carries an actual answer.
    pub fn has_answer(&self) -> bool {
        self.response_type == AnswerType::Answered && self.answer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_entities_wildcard_round_trip() {
        let json = r#"{"actorEntities": "*", "isInformational": false}"#;
        let action: ActionTerm = serde_json::from_str(json).unwrap();
        assert!(action.actor_entities.is_wildcard());
        assert!(action.actor_entities.entities().is_none());
    }

    #[test]
    fn test_actor_entities_concrete() {
        let json = r#"{
            "actorEntities": [{"name": "Jane", "isNamePronoun": false}],
            "isInformational": false
        }"#;
        let action: ActionTerm = serde_json::from_str(json).unwrap();
        assert!(!action.actor_entities.is_wildcard());
        assert_eq!(action.actor_entities.entities().unwrap()[0].name, "Jane");
    }

    #[test]
    fn test_entity_term_type_field_rename() {
        let json = r#"{"name": "Bach", "type": ["person", "composer"]}"#;
        let term: EntityTerm = serde_json::from_str(json).unwrap();
        assert_eq!(
            term.entity_type,
            Some(vec!["person".to_string(), "composer".to_string()])
        );
        assert!(!term.is_name_pronoun);
    }

    #[test]
    fn test_facet_wildcards() {
        let facet = FacetTerm {
            facet_name: "*".to_string(),
            facet_value: "blue".to_string(),
        };
        assert!(facet.name_is_wildcard());
        assert!(!facet.value_is_wildcard());
    }

    #[test]
    fn test_answer_response_wire_shape() {
        let response = AnswerResponse::answered("Bach was born in 1685.");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "Answered");
        assert_eq!(json["answer"], "Bach was born in 1685.");
        assert!(json.get("whyNoAnswer").is_none());

        let no = AnswerResponse::no_answer("No search results");
        let json = serde_json::to_value(&no).unwrap();
        assert_eq!(json["type"], "NoAnswer");
        assert_eq!(json["whyNoAnswer"], "No search results");
    }

    #[test]
    fn test_search_query_deserializes_translator_output() {
        let json = r#"{
            "searchExpressions": [{
                "rewrittenQuery": "What did Jane say about Bach?",
                "filters": [{
                    "entitySearchTerms": [{"name": "Bach"}],
                    "searchTerms": ["music"]
                }]
            }]
        }"#;
        let query: SearchQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.search_expressions.len(), 1);
        let filter = &query.search_expressions[0].filters[0];
        assert!(filter.action_search_term.is_none());
        assert_eq!(filter.entity_search_terms.as_ref().unwrap()[0].name, "Bach");
        assert!(!filter.terms_only());
    }
}
