//! Compiled query plan types.
//!
//! A compiled query is a list of [`SearchQueryExpr`]s, each holding one or
//! more select expressions: a boolean term-group tree plus an optional
//! [`WhenFilter`] narrowing where the terms may match. The tree is a
//! canonical tagged union (leaf term, property leaf, group) with an explicit
//! [`SearchTermGroup::optimized`] pass collapsing single-child groups.

use chrono::{DateTime, Utc};
use knowpro_llm::DateTimeRange;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::KnowledgeType;

/// Boolean operator of a term group.
///
/// `OrMax` means "match any, rank by best single match".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BoolOp {
    And,
    Or,
    OrMax,
}

/// A single search term.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchTerm {
    pub text: String,

    /// Require an exact index match instead of fuzzy matching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_match: Option<bool>,
}

impl SearchTerm {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exact_match: None,
        }
    }

    pub fn exact(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exact_match: Some(true),
        }
    }
}

/// The property a term matches against.
///
/// Structural names are a closed set; `Facet` carries a concrete
/// user-supplied facet name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyName {
    /// Entity name
    Name,
    /// Entity type
    Type,
    /// Action verb
    Verb,
    /// Action subject
    Subject,
    /// Action object
    Object,
    /// Action indirect object
    IndirectObject,
    /// Topic text
    Topic,
    /// Message tag
    Tag,
    /// Any facet name
    FacetName,
    /// Any facet value
    FacetValue,
    /// A concrete facet, matched by its name
    Facet(String),
}

impl PropertyName {
    pub fn as_str(&self) -> &str {
        match self {
            PropertyName::Name => "name",
            PropertyName::Type => "type",
            PropertyName::Verb => "verb",
            PropertyName::Subject => "subject",
            PropertyName::Object => "object",
            PropertyName::IndirectObject => "indirectObject",
            PropertyName::Topic => "topic",
            PropertyName::Tag => "tag",
            PropertyName::FacetName => "facet.name",
            PropertyName::FacetValue => "facet.value",
            PropertyName::Facet(name) => name,
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "name" => PropertyName::Name,
            "type" => PropertyName::Type,
            "verb" => PropertyName::Verb,
            "subject" => PropertyName::Subject,
            "object" => PropertyName::Object,
            "indirectObject" => PropertyName::IndirectObject,
            "topic" => PropertyName::Topic,
            "tag" => PropertyName::Tag,
            "facet.name" => PropertyName::FacetName,
            "facet.value" => PropertyName::FacetValue,
            other => PropertyName::Facet(other.to_string()),
        }
    }
}

impl Serialize for PropertyName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(PropertyName::from_str(&s))
    }
}

/// A term constrained to a property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertySearchTerm {
    pub property_name: PropertyName,
    pub property_value: SearchTerm,
}

/// One node of the term-group tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TermGroupItem {
    Property(PropertySearchTerm),
    Term(SearchTerm),
    Group(SearchTermGroup),
}

/// Boolean tree of search terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchTermGroup {
    pub op: BoolOp,
    pub terms: Vec<TermGroupItem>,
}

impl SearchTermGroup {
    pub fn new(op: BoolOp) -> Self {
        Self {
            op,
            terms: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Add a plain search term leaf.
    pub fn add_term(&mut self, term: SearchTerm) {
        self.terms.push(TermGroupItem::Term(term));
    }

    /// Add a property-constrained term leaf.
    pub fn add_property(&mut self, property_name: PropertyName, value: SearchTerm) {
        self.terms.push(TermGroupItem::Property(PropertySearchTerm {
            property_name,
            property_value: value,
        }));
    }

    /// Collapse single-child groups, recursively.
    ///
    /// A group whose only child is another group becomes that child; leaf
    /// children stay wrapped so the root is always a group.
    pub fn optimized(self) -> SearchTermGroup {
        let mut group = SearchTermGroup {
            op: self.op,
            terms: self.terms.into_iter().map(optimize_item).collect(),
        };
        while group.terms.len() == 1 {
            match group.terms.pop() {
                Some(TermGroupItem::Group(inner)) => group = inner,
                Some(other) => {
                    group.terms.push(other);
                    break;
                }
                None => break,
            }
        }
        group
    }
}

fn optimize_item(item: TermGroupItem) -> TermGroupItem {
    match item {
        TermGroupItem::Group(group) => {
            let mut optimized = group.optimized();
            if optimized.terms.len() == 1 {
                match optimized.terms.pop() {
                    Some(leaf @ (TermGroupItem::Term(_) | TermGroupItem::Property(_))) => leaf,
                    Some(inner) => inner,
                    None => TermGroupItem::Group(optimized),
                }
            } else {
                TermGroupItem::Group(optimized)
            }
        }
        leaf => leaf,
    }
}

/// A resolved date range used by when-filters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl From<&DateTimeRange> for DateRange {
    fn from(range: &DateTimeRange) -> Self {
        Self {
            start: range.start_date,
            end: range.stop_date,
        }
    }
}

/// Narrows where a select expression's terms may match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WhenFilter {
    /// Restrict matches to one knowledge type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_type: Option<KnowledgeType>,

    /// Restrict matches to a time range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,

    /// Restrict matches to messages whose extracted action matches these
    /// subject/verb terms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_defining_terms: Option<SearchTermGroup>,

    /// Restrict matches to tagged messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Restrict matches to a conversation thread
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_description: Option<String>,
}

impl WhenFilter {
    pub fn is_empty(&self) -> bool {
        self.knowledge_type.is_none()
            && self.date_range.is_none()
            && self.scope_defining_terms.is_none()
            && self.tags.is_none()
            && self.thread_description.is_none()
    }
}

/// One select expression: a term group plus an optional when-filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchSelectExpr {
    pub search_term_group: SearchTermGroup,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<WhenFilter>,
}

/// A compiled, executable search expression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchQueryExpr {
    /// The natural-language query this expression was compiled from
    pub raw_query: String,

    pub select_expressions: Vec<SearchSelectExpr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(text: &str) -> TermGroupItem {
        TermGroupItem::Term(SearchTerm::new(text))
    }

    #[test]
    fn test_optimize_collapses_single_child_group() {
        let mut inner = SearchTermGroup::new(BoolOp::And);
        inner.add_term(SearchTerm::new("a"));
        inner.add_term(SearchTerm::new("b"));

        let mut outer = SearchTermGroup::new(BoolOp::Or);
        outer.terms.push(TermGroupItem::Group(inner.clone()));

        let optimized = outer.optimized();
        assert_eq!(optimized, inner);
    }

    #[test]
    fn test_optimize_keeps_single_leaf_wrapped() {
        let mut group = SearchTermGroup::new(BoolOp::Or);
        group.add_term(SearchTerm::new("Bach"));

        let optimized = group.optimized();
        assert_eq!(optimized.op, BoolOp::Or);
        assert_eq!(optimized.terms, vec![term("Bach")]);
    }

    #[test]
    fn test_optimize_recurses_into_children() {
        let mut innermost = SearchTermGroup::new(BoolOp::OrMax);
        innermost.add_term(SearchTerm::new("x"));

        let mut middle = SearchTermGroup::new(BoolOp::And);
        middle.terms.push(TermGroupItem::Group(innermost));
        middle.add_term(SearchTerm::new("y"));

        let mut root = SearchTermGroup::new(BoolOp::Or);
        root.terms.push(TermGroupItem::Group(middle));
        root.add_term(SearchTerm::new("z"));

        let optimized = root.optimized();
        // The single-leaf innermost group collapses to its leaf inside middle.
        match &optimized.terms[0] {
            TermGroupItem::Group(middle) => {
                assert_eq!(middle.terms[0], term("x"));
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_property_name_round_trip() {
        for name in [
            PropertyName::Name,
            PropertyName::IndirectObject,
            PropertyName::FacetName,
            PropertyName::Facet("color".to_string()),
        ] {
            let json = serde_json::to_string(&name).unwrap();
            let back: PropertyName = serde_json::from_str(&json).unwrap();
            assert_eq!(back, name);
        }
        assert_eq!(PropertyName::IndirectObject.as_str(), "indirectObject");
    }

    #[test]
    fn test_when_filter_is_empty() {
        let mut when = WhenFilter::default();
        assert!(when.is_empty());
        when.tags = Some(vec!["book-club".to_string()]);
        assert!(!when.is_empty());
    }
}
