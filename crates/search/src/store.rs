//! The conversation store seam.
//!
//! The engine never touches the physical index: all reads go through the
//! [`ConversationStore`] trait. Implementations wrap whatever inverted/vector
//! index and message log the host application uses. The store is read-only
//! for the duration of one request; batched lookups must return exactly one
//! row per requested ordinal, in request order.

use knowpro_core::AppResult;
use tokio_util::sync::CancellationToken;

use crate::model::{
    KnowledgeType, Message, MessageMetadata, MessageOrdinal, Scored, ScoredSemanticRefOrdinal,
    SemanticRef,
};

/// Async read access to the knowledge index and message log.
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    /// Resolve scored semantic-ref ordinals into full payloads, restricted to
    /// one knowledge type. Refs of other types are dropped, so the returned
    /// list may be shorter than the request.
    async fn scored_semantic_refs(
        &self,
        matches: &[ScoredSemanticRefOrdinal],
        knowledge_type: KnowledgeType,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Scored<SemanticRef>>>;

    /// Batched metadata lookup: one entry per requested ordinal, in order.
    async fn message_metadata(
        &self,
        ordinals: &[MessageOrdinal],
        cancel: &CancellationToken,
    ) -> AppResult<Vec<MessageMetadata>>;

    /// Batched timestamp lookup: one entry per requested ordinal, in order.
    /// An empty string means the message has no timestamp.
    async fn message_timestamps(
        &self,
        ordinals: &[MessageOrdinal],
        cancel: &CancellationToken,
    ) -> AppResult<Vec<String>>;

    /// Batched message-body lookup: one entry per requested ordinal, in
    /// order.
    async fn messages(
        &self,
        ordinals: &[MessageOrdinal],
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Message>>;
}
