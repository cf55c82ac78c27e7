//! Builds the [`AnswerContext`] handed to the answer generator.
//!
//! From a raw [`ConversationSearchResult`], the builder fetches full semantic
//! refs per knowledge type (concurrently), merges and top-K-selects them,
//! then resolves origin/audience/time-range for every selected item with
//! exactly one batched metadata fetch and one batched timestamp fetch over
//! the sorted union of span endpoints. Endpoints are located in that union
//! by binary search.

use knowpro_core::{AppError, AppResult, ContextConfig};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::merge::{
    collect_endpoint_ordinals, merge_scored_entities, merge_scored_topics, top_k, MergedEntity,
    MergedTopic, OrdinalSpan,
};
use crate::model::{
    ConversationSearchResult, Facet, KnowledgeType, Message, MessageMetadata, MessageOrdinal,
    Scored, ScoredSemanticRefOrdinal, SemanticRef,
};
use crate::store::ConversationStore;

/// When a message range starts and ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// An entity relevant to the question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelevantEntity {
    pub name: String,

    #[serde(rename = "type")]
    pub entity_type: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub facets: Vec<Facet>,

    /// Who introduced this knowledge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Vec<String>>,

    /// Who it was said to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
}

/// A topic relevant to the question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelevantTopic {
    pub topic: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
}

/// A message relevant to the question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelevantMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub to: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    pub text: String,
}

/// The budgeted bundle of knowledge handed to the answer generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<RelevantEntity>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<RelevantTopic>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<RelevantMessage>>,
}

impl AnswerContext {
    pub fn is_empty(&self) -> bool {
        self.entities.as_ref().map_or(true, |e| e.is_empty())
            && self.topics.as_ref().map_or(true, |t| t.is_empty())
            && self.messages.as_ref().map_or(true, |m| m.is_empty())
    }

    /// Render the context as prompt text: a `{ ... }` block holding only the
    /// non-empty sections. This is prompt text for the generator, not
    /// guaranteed to be strictly parseable JSON.
    pub fn to_prompt_string(&self) -> String {
        let mut sections: Vec<String> = Vec::new();
        if let Some(entities) = &self.entities {
            if !entities.is_empty() {
                sections.push(format!(
                    "\"entities\": {}",
                    serde_json::to_string(entities).unwrap_or_default()
                ));
            }
        }
        if let Some(topics) = &self.topics {
            if !topics.is_empty() {
                sections.push(format!(
                    "\"topics\": {}",
                    serde_json::to_string(topics).unwrap_or_default()
                ));
            }
        }
        if let Some(messages) = &self.messages {
            if !messages.is_empty() {
                sections.push(format!(
                    "\"messages\": {}",
                    serde_json::to_string(messages).unwrap_or_default()
                ));
            }
        }
        format!("{{\n{}\n}}", sections.join(",\n"))
    }
}

/// Origin, audience, and time range resolved for one ordinal span.
struct Provenance {
    origin: Option<Vec<String>>,
    audience: Option<Vec<String>>,
    time_range: Option<TimeRange>,
}

/// Builds answer contexts from raw search results.
pub struct AnswerContextBuilder<'a> {
    store: &'a dyn ConversationStore,
    options: &'a ContextConfig,
}

impl<'a> AnswerContextBuilder<'a> {
    pub fn new(store: &'a dyn ConversationStore, options: &'a ContextConfig) -> AppResult<Self> {
        if options.entities_top_k == 0 || options.topics_top_k == 0 {
            return Err(AppError::Config(
                "context top-k limits must be greater than zero".to_string(),
            ));
        }
        Ok(Self { store, options })
    }

    /// Materialize a search result into an answer context.
    ///
    /// Fails with [`AppError::EmptySearchResults`] before touching the store
    /// when the result has no matches at all.
    pub async fn from_search_result(
        &self,
        result: &ConversationSearchResult,
        cancel: &CancellationToken,
    ) -> AppResult<AnswerContext> {
        if !result.has_matches() {
            return Err(AppError::EmptySearchResults);
        }

        // Entity refs, topic refs, and message bodies have no mutual data
        // dependency; fetch them concurrently.
        let (entity_refs, topic_refs, messages) = tokio::try_join!(
            self.fetch_refs(result, KnowledgeType::Entity, cancel),
            self.fetch_refs(result, KnowledgeType::Topic, cancel),
            self.fetch_messages(result, cancel),
        )?;

        let entities = top_k(merge_scored_entities(&entity_refs), self.options.entities_top_k);
        let topics = top_k(merge_scored_topics(&topic_refs), self.options.topics_top_k);
        debug!(
            entities = entities.len(),
            topics = topics.len(),
            messages = messages.len(),
            "selected answer context candidates"
        );

        // One batched metadata fetch and one batched timestamp fetch cover
        // every span endpoint of every selected item.
        let spans: Vec<&OrdinalSpan> = entities
            .iter()
            .map(|e| &e.item.span)
            .chain(topics.iter().map(|t| &t.item.span))
            .collect();
        let ordinals = collect_endpoint_ordinals(&spans);
        let (metadata, timestamps) = if ordinals.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            tokio::try_join!(
                self.store.message_metadata(&ordinals, cancel),
                self.store.message_timestamps(&ordinals, cancel),
            )?
        };
        if metadata.len() != ordinals.len() {
            return Err(AppError::Consistency(format!(
                "metadata fetch returned {} entries for {} ordinals",
                metadata.len(),
                ordinals.len()
            )));
        }
        if timestamps.len() != ordinals.len() {
            return Err(AppError::Consistency(format!(
                "timestamp fetch returned {} entries for {} ordinals",
                timestamps.len(),
                ordinals.len()
            )));
        }

        let mut context = AnswerContext::default();
        if !entities.is_empty() {
            let mut relevant = Vec::with_capacity(entities.len());
            for entity in entities {
                let provenance =
                    resolve_provenance(&entity.item.span, &ordinals, &metadata, &timestamps)?;
                relevant.push(relevant_entity(entity.item, provenance));
            }
            context.entities = Some(relevant);
        }
        if !topics.is_empty() {
            let mut relevant = Vec::with_capacity(topics.len());
            for topic in topics {
                let provenance =
                    resolve_provenance(&topic.item.span, &ordinals, &metadata, &timestamps)?;
                relevant.push(relevant_topic(topic.item, provenance));
            }
            context.topics = Some(relevant);
        }
        if !messages.is_empty() {
            context.messages = Some(messages);
        }
        Ok(context)
    }

    async fn fetch_refs(
        &self,
        result: &ConversationSearchResult,
        knowledge_type: KnowledgeType,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Scored<SemanticRef>>> {
        let matches: &[ScoredSemanticRefOrdinal] = result
            .knowledge_matches
            .get(&knowledge_type)
            .map(|m| m.semantic_ref_matches.as_slice())
            .unwrap_or_default();
        if matches.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .scored_semantic_refs(matches, knowledge_type, cancel)
            .await
    }

    async fn fetch_messages(
        &self,
        result: &ConversationSearchResult,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<RelevantMessage>> {
        if result.message_matches.is_empty() {
            return Ok(Vec::new());
        }
        let mut matches = result.message_matches.clone();
        if let Some(limit) = self.options.messages_top_k {
            if matches.len() > limit {
                matches.sort_by(|a, b| b.score.total_cmp(&a.score));
                matches.truncate(limit);
            }
        }
        let ordinals: Vec<MessageOrdinal> = matches.iter().map(|m| m.message_ordinal).collect();
        let messages = self.store.messages(&ordinals, cancel).await?;
        if messages.len() != ordinals.len() {
            return Err(AppError::Consistency(format!(
                "message fetch returned {} entries for {} ordinals",
                messages.len(),
                ordinals.len()
            )));
        }
        Ok(messages.into_iter().map(relevant_message).collect())
    }
}

/// Resolve origin/audience/time-range for a span from the batched endpoint
/// rows. A span endpoint missing from the request list is a consistency bug.
fn resolve_provenance(
    span: &OrdinalSpan,
    ordinals: &[MessageOrdinal],
    metadata: &[MessageMetadata],
    timestamps: &[String],
) -> AppResult<Provenance> {
    let at_min = endpoint_index(ordinals, span.ordinal_min)?;
    let at_max = endpoint_index(ordinals, span.ordinal_max)?;

    let mut origin: Vec<String> = Vec::new();
    let mut audience: Vec<String> = Vec::new();
    for at in [at_min, at_max] {
        if let Some(source) = &metadata[at].source {
            if !source.is_empty() && !origin.contains(source) {
                origin.push(source.clone());
            }
        }
        for dest in &metadata[at].dest {
            if !dest.is_empty() && !audience.contains(dest) {
                audience.push(dest.clone());
            }
        }
    }

    let start = &timestamps[at_min];
    let time_range = if start.is_empty() {
        None
    } else {
        let end = &timestamps[at_max];
        Some(TimeRange {
            start: start.clone(),
            end: (!end.is_empty()).then(|| end.clone()),
        })
    };

    Ok(Provenance {
        origin: (!origin.is_empty()).then_some(origin),
        audience: (!audience.is_empty()).then_some(audience),
        time_range,
    })
}

fn endpoint_index(ordinals: &[MessageOrdinal], ordinal: MessageOrdinal) -> AppResult<usize> {
    ordinals.binary_search(&ordinal).map_err(|_| {
        AppError::Consistency(format!(
            "span endpoint ordinal {ordinal} missing from batched fetch"
        ))
    })
}

fn relevant_entity(entity: MergedEntity, provenance: Provenance) -> RelevantEntity {
    RelevantEntity {
        name: entity.name,
        entity_type: entity.entity_type,
        facets: entity.facets,
        origin: provenance.origin,
        audience: provenance.audience,
        time_range: provenance.time_range,
    }
}

fn relevant_topic(topic: MergedTopic, provenance: Provenance) -> RelevantTopic {
    RelevantTopic {
        topic: topic.text,
        origin: provenance.origin,
        audience: provenance.audience,
        time_range: provenance.time_range,
    }
}

fn relevant_message(message: Message) -> RelevantMessage {
    RelevantMessage {
        from: message.metadata.source.filter(|s| !s.is_empty()),
        to: message.metadata.dest,
        timestamp: (!message.timestamp.is_empty()).then_some(message.timestamp),
        text: message.text_chunks.join(""),
    }
}
