//! Index-side data model.
//!
//! These types describe what the external knowledge index returns: extracted
//! knowledge units (`SemanticRef`), their scored ordinals, and the raw search
//! result the engine merges and materializes. Every object here is created
//! fresh per request and discarded after the answer is produced.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Zero-based index of a message within a conversation.
pub type MessageOrdinal = u32;

/// Zero-based index of a semantic ref within the index.
pub type SemanticRefOrdinal = u32;

/// The kind of knowledge a semantic ref carries.
///
/// A closed set: per-type behavior (merge strategy, relevance building) is
/// dispatched by matching on this enum, never by open subclassing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum KnowledgeType {
    Entity,
    Topic,
    Action,
}

/// An attribute of an entity, e.g. `color: blue`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    pub name: String,
    pub value: String,
}

/// A concrete entity extracted from a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConcreteEntity {
    pub name: String,

    #[serde(rename = "type")]
    pub entity_type: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<Facet>>,
}

/// A topic extracted from a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub text: String,
}

/// An action extracted from a message (subject-verb-object).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub verbs: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_entity_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_entity_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub indirect_object_entity_name: Option<String>,
}

/// An extracted knowledge unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "knowledgeType", rename_all = "camelCase")]
pub enum Knowledge {
    #[serde(rename = "entity")]
    Entity(ConcreteEntity),
    #[serde(rename = "topic")]
    Topic(Topic),
    #[serde(rename = "action")]
    Action(Action),
}

impl Knowledge {
    pub fn knowledge_type(&self) -> KnowledgeType {
        match self {
            Knowledge::Entity(_) => KnowledgeType::Entity,
            Knowledge::Topic(_) => KnowledgeType::Topic,
            Knowledge::Action(_) => KnowledgeType::Action,
        }
    }
}

/// A knowledge unit linked to the ordinal of the message it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SemanticRef {
    pub semantic_ref_ordinal: SemanticRefOrdinal,
    pub message_ordinal: MessageOrdinal,
    pub knowledge: Knowledge,
}

/// A value paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scored<T> {
    pub item: T,
    pub score: f32,
}

impl<T> Scored<T> {
    pub fn new(item: T, score: f32) -> Self {
        Self { item, score }
    }
}

/// A semantic ref ordinal paired with its match score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredSemanticRefOrdinal {
    pub semantic_ref_ordinal: SemanticRefOrdinal,
    pub score: f32,
}

/// A message ordinal paired with its match score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredMessageOrdinal {
    pub message_ordinal: MessageOrdinal,
    pub score: f32,
}

/// Matches for one knowledge type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SemanticRefSearchResult {
    /// Terms that produced the matches
    #[serde(default)]
    pub term_matches: Vec<String>,

    /// Matched semantic refs with scores
    pub semantic_ref_matches: Vec<ScoredSemanticRefOrdinal>,
}

/// The raw result of executing a compiled query against the index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSearchResult {
    /// The query text this result answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_query: Option<String>,

    /// Knowledge matches keyed by knowledge type
    #[serde(default)]
    pub knowledge_matches: HashMap<KnowledgeType, SemanticRefSearchResult>,

    /// Scored message matches
    #[serde(default)]
    pub message_matches: Vec<ScoredMessageOrdinal>,
}

impl ConversationSearchResult {
    /// True when the result has at least one knowledge or message match.
    pub fn has_matches(&self) -> bool {
        !self.message_matches.is_empty()
            || self
                .knowledge_matches
                .values()
                .any(|m| !m.semantic_ref_matches.is_empty())
    }
}

/// Who sent a message and who received it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default)]
    pub dest: Vec<String>,
}

/// A full message as stored in the conversation log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// ISO timestamp; empty when unknown
    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub metadata: MessageMetadata,

    #[serde(default)]
    pub text_chunks: Vec<String>,
}
