//! Merges scored semantic refs into deduplicated knowledge spanning the
//! ordinal range of all occurrences.
//!
//! Merge maps are allocated per call; nothing survives the call. Scoring
//! policy: a merged item's score is the maximum of its constituents, with
//! ties broken by first-seen order.

use std::collections::{BTreeSet, HashMap};

use crate::model::{Facet, Knowledge, MessageOrdinal, Scored, SemanticRef};

/// The message ordinals a merged knowledge unit spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdinalSpan {
    pub ordinal_min: MessageOrdinal,
    pub ordinal_max: MessageOrdinal,
    pub source_ordinals: BTreeSet<MessageOrdinal>,
}

impl OrdinalSpan {
    pub fn new(ordinal: MessageOrdinal) -> Self {
        Self {
            ordinal_min: ordinal,
            ordinal_max: ordinal,
            source_ordinals: BTreeSet::from([ordinal]),
        }
    }

    pub fn extend(&mut self, ordinal: MessageOrdinal) {
        self.ordinal_min = self.ordinal_min.min(ordinal);
        self.ordinal_max = self.ordinal_max.max(ordinal);
        self.source_ordinals.insert(ordinal);
    }
}

/// An entity merged across all its occurrences.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEntity {
    pub name: String,
    pub entity_type: Vec<String>,
    pub facets: Vec<Facet>,
    pub span: OrdinalSpan,
}

/// A topic merged across all its occurrences.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTopic {
    pub text: String,
    pub span: OrdinalSpan,
}

fn entity_merge_key(name: &str, entity_type: &[String]) -> String {
    let mut types: Vec<String> = entity_type.iter().map(|t| t.to_lowercase()).collect();
    types.sort();
    format!("{}|{}", name.to_lowercase(), types.join(","))
}

fn topic_merge_key(text: &str) -> String {
    text.to_lowercase()
}

/// Merge scored entity refs by case-folded name and sorted type list.
pub fn merge_scored_entities(refs: &[Scored<SemanticRef>]) -> Vec<Scored<MergedEntity>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Scored<MergedEntity>> = Vec::new();
    for scored in refs {
        let entity = match &scored.item.knowledge {
            Knowledge::Entity(entity) => entity,
            _ => continue,
        };
        let key = entity_merge_key(&entity.name, &entity.entity_type);
        let ordinal = scored.item.message_ordinal;
        match index.get(&key) {
            Some(&at) => {
                let existing = &mut merged[at];
                existing.item.span.extend(ordinal);
                if let Some(facets) = &entity.facets {
                    for facet in facets {
                        if !existing.item.facets.contains(facet) {
                            existing.item.facets.push(facet.clone());
                        }
                    }
                }
                // Strictly greater keeps the tie-break first-seen.
                if scored.score > existing.score {
                    existing.score = scored.score;
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(Scored::new(
                    MergedEntity {
                        name: entity.name.clone(),
                        entity_type: entity.entity_type.clone(),
                        facets: entity.facets.clone().unwrap_or_default(),
                        span: OrdinalSpan::new(ordinal),
                    },
                    scored.score,
                ));
            }
        }
    }
    merged
}

/// Merge scored topic refs by case-folded text.
pub fn merge_scored_topics(refs: &[Scored<SemanticRef>]) -> Vec<Scored<MergedTopic>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Scored<MergedTopic>> = Vec::new();
    for scored in refs {
        let topic = match &scored.item.knowledge {
            Knowledge::Topic(topic) => topic,
            _ => continue,
        };
        let key = topic_merge_key(&topic.text);
        let ordinal = scored.item.message_ordinal;
        match index.get(&key) {
            Some(&at) => {
                let existing = &mut merged[at];
                existing.item.span.extend(ordinal);
                if scored.score > existing.score {
                    existing.score = scored.score;
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(Scored::new(
                    MergedTopic {
                        text: topic.text.clone(),
                        span: OrdinalSpan::new(ordinal),
                    },
                    scored.score,
                ));
            }
        }
    }
    merged
}

/// Keep the `k` highest-scoring items.
///
/// Items already within the bound come back unchanged, in their original
/// order. Otherwise a stable descending sort keeps the first-seen tie-break.
pub fn top_k<T>(mut items: Vec<Scored<T>>, k: usize) -> Vec<Scored<T>> {
    if items.len() <= k {
        return items;
    }
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items.truncate(k);
    items
}

/// Union of every span's min and max ordinal, deduplicated and ascending.
///
/// This is the request list for the batched metadata and timestamp fetches.
pub fn collect_endpoint_ordinals(spans: &[&OrdinalSpan]) -> Vec<MessageOrdinal> {
    let mut ordinals = BTreeSet::new();
    for span in spans {
        ordinals.insert(span.ordinal_min);
        ordinals.insert(span.ordinal_max);
    }
    ordinals.into_iter().collect()
}
