//! In-memory doubles for the conversation store and answer generator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use knowpro_core::{AppError, AppResult};
use knowpro_llm::{AnswerGenerator, AnswerResponse};
use tokio_util::sync::CancellationToken;

use crate::model::{
    ConcreteEntity, ConversationSearchResult, Knowledge, KnowledgeType, Message, MessageMetadata,
    MessageOrdinal, Scored, ScoredSemanticRefOrdinal, SemanticRef, SemanticRefSearchResult, Topic,
};
use crate::store::ConversationStore;

/// Store double backed by plain maps, counting every call.
#[derive(Default)]
pub struct MockStore {
    refs: Vec<SemanticRef>,
    metadata: HashMap<MessageOrdinal, MessageMetadata>,
    timestamps: HashMap<MessageOrdinal, String>,
    messages: HashMap<MessageOrdinal, Message>,
    /// Drop the last metadata row to simulate a broken batch
    pub truncate_metadata: bool,
    pub calls: AtomicUsize,
}

impl MockStore {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn with_entity(
        mut self,
        semantic_ref_ordinal: u32,
        message_ordinal: MessageOrdinal,
        name: &str,
        types: &[&str],
    ) -> Self {
        self.refs.push(SemanticRef {
            semantic_ref_ordinal,
            message_ordinal,
            knowledge: Knowledge::Entity(ConcreteEntity {
                name: name.to_string(),
                entity_type: types.iter().map(|t| t.to_string()).collect(),
                facets: None,
            }),
        });
        self
    }

    pub fn with_topic(
        mut self,
        semantic_ref_ordinal: u32,
        message_ordinal: MessageOrdinal,
        text: &str,
    ) -> Self {
        self.refs.push(SemanticRef {
            semantic_ref_ordinal,
            message_ordinal,
            knowledge: Knowledge::Topic(Topic {
                text: text.to_string(),
            }),
        });
        self
    }

    pub fn with_message_row(
        mut self,
        ordinal: MessageOrdinal,
        source: &str,
        dest: &[&str],
        timestamp: &str,
        text: &str,
    ) -> Self {
        let metadata = MessageMetadata {
            source: (!source.is_empty()).then(|| source.to_string()),
            dest: dest.iter().map(|d| d.to_string()).collect(),
        };
        self.metadata.insert(ordinal, metadata.clone());
        self.timestamps.insert(ordinal, timestamp.to_string());
        self.messages.insert(
            ordinal,
            Message {
                timestamp: timestamp.to_string(),
                metadata,
                text_chunks: vec![text.to_string()],
            },
        );
        self
    }
}

#[async_trait::async_trait]
impl ConversationStore for MockStore {
    async fn scored_semantic_refs(
        &self,
        matches: &[ScoredSemanticRefOrdinal],
        knowledge_type: KnowledgeType,
        _cancel: &CancellationToken,
    ) -> AppResult<Vec<Scored<SemanticRef>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(matches
            .iter()
            .filter_map(|m| {
                self.refs
                    .iter()
                    .find(|r| r.semantic_ref_ordinal == m.semantic_ref_ordinal)
                    .filter(|r| r.knowledge.knowledge_type() == knowledge_type)
                    .map(|r| Scored::new(r.clone(), m.score))
            })
            .collect())
    }

    async fn message_metadata(
        &self,
        ordinals: &[MessageOrdinal],
        _cancel: &CancellationToken,
    ) -> AppResult<Vec<MessageMetadata>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut rows: Vec<MessageMetadata> = ordinals
            .iter()
            .map(|o| self.metadata.get(o).cloned().unwrap_or_default())
            .collect();
        if self.truncate_metadata {
            rows.pop();
        }
        Ok(rows)
    }

    async fn message_timestamps(
        &self,
        ordinals: &[MessageOrdinal],
        _cancel: &CancellationToken,
    ) -> AppResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ordinals
            .iter()
            .map(|o| self.timestamps.get(o).cloned().unwrap_or_default())
            .collect())
    }

    async fn messages(
        &self,
        ordinals: &[MessageOrdinal],
        _cancel: &CancellationToken,
    ) -> AppResult<Vec<Message>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ordinals
            .iter()
            .map(|o| self.messages.get(o).cloned().unwrap_or_default())
            .collect())
    }
}

/// Build a search result with scored ordinals for one knowledge type.
pub fn knowledge_result(
    knowledge_type: KnowledgeType,
    matches: &[(u32, f32)],
) -> ConversationSearchResult {
    let mut result = ConversationSearchResult::default();
    result.knowledge_matches.insert(
        knowledge_type,
        SemanticRefSearchResult {
            term_matches: Vec::new(),
            semantic_ref_matches: matches
                .iter()
                .map(|&(semantic_ref_ordinal, score)| ScoredSemanticRefOrdinal {
                    semantic_ref_ordinal,
                    score,
                })
                .collect(),
        },
    );
    result
}

/// Generator double: answers when the prompt contains a marker, counting
/// every call and keeping the prompts it saw.
pub struct MockGenerator {
    answer_when_contains: Option<String>,
    answer_text: String,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Answers every prompt.
    pub fn always(answer_text: &str) -> Self {
        Self {
            answer_when_contains: None,
            answer_text: answer_text.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answers only prompts containing `marker`.
    pub fn answering_on(marker: &str, answer_text: &str) -> Self {
        Self {
            answer_when_contains: Some(marker.to_string()),
            answer_text: answer_text.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AnswerGenerator for MockGenerator {
    async fn generate(
        &self,
        _question: &str,
        context_prompt: &str,
        cancel: &CancellationToken,
    ) -> AppResult<AnswerResponse> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push(context_prompt.to_string());
        let answers = self
            .answer_when_contains
            .as_ref()
            .map_or(true, |marker| context_prompt.contains(marker));
        if answers {
            Ok(AnswerResponse::answered(&self.answer_text))
        } else {
            Ok(AnswerResponse::no_answer("Not found in this part"))
        }
    }
}
