//! Compiles a translated [`SearchQuery`] into executable [`SearchQueryExpr`]s.
//!
//! Compilation is pure: no I/O, no shared state beyond a per-call dedup set.
//! Malformed filters never fail compilation; they degrade to smaller or empty
//! term groups and the caller decides whether to execute them.

use std::collections::HashSet;

use knowpro_core::SearchConfig;
use knowpro_llm::{ActionTerm, EntityTerm, SearchExpr, SearchFilter, SearchQuery, WILDCARD};
use tracing::debug;

use crate::term_group::{
    BoolOp, DateRange, PropertyName, SearchQueryExpr, SearchSelectExpr, SearchTerm,
    SearchTermGroup, TermGroupItem, WhenFilter,
};

/// Caller-injected predicate restricting which term values are admitted.
pub type TermFilter = dyn Fn(&str) -> bool + Send + Sync;

/// Values that match too broadly to be useful as search terms.
const NOISE_WORDS: &[&str] = &[
    "a", "an", "the", "any", "all", "some", "thing", "things", "stuff", "item", "items", "object",
    "objects", "topic", "topics", "concept", "concepts", "idea", "ideas", "info", "information",
];

/// Options for one compilation call.
pub struct CompileOptions<'a> {
    pub settings: &'a SearchConfig,
    pub term_filter: Option<&'a TermFilter>,
}

impl<'a> CompileOptions<'a> {
    pub fn new(settings: &'a SearchConfig) -> Self {
        Self {
            settings,
            term_filter: None,
        }
    }

    pub fn with_term_filter(mut self, filter: &'a TermFilter) -> Self {
        self.term_filter = Some(filter);
        self
    }
}

/// `(propertyName, lowercased value)` pairs already emitted in this call.
type PropertyTermSet = HashSet<(String, String)>;

/// Compile a translated query into executable search expressions.
///
/// `filter_override` fields, when set, replace the corresponding compiled
/// when-filter fields on every select expression.
pub fn compile_search_query(
    query: &SearchQuery,
    options: &CompileOptions<'_>,
    filter_override: Option<&WhenFilter>,
) -> Vec<SearchQueryExpr> {
    let exprs: Vec<SearchQueryExpr> = query
        .search_expressions
        .iter()
        .map(|expr| compile_search_expr(expr, options, filter_override))
        .collect();
    debug!(
        expressions = exprs.len(),
        "compiled search query into executable expressions"
    );
    exprs
}

fn compile_search_expr(
    expr: &SearchExpr,
    options: &CompileOptions<'_>,
    filter_override: Option<&WhenFilter>,
) -> SearchQueryExpr {
    // Expressions are independently executable, so each gets its own dedup set.
    let mut seen = PropertyTermSet::new();
    let select_expressions = expr
        .filters
        .iter()
        .map(|filter| SearchSelectExpr {
            search_term_group: compile_term_group(filter, options, &mut seen),
            when: compile_when(filter, options, filter_override),
        })
        .collect();
    SearchQueryExpr {
        raw_query: expr.rewritten_query.clone(),
        select_expressions,
    }
}

fn compile_term_group(
    filter: &SearchFilter,
    options: &CompileOptions<'_>,
    seen: &mut PropertyTermSet,
) -> SearchTermGroup {
    let mut group = SearchTermGroup::new(BoolOp::Or);

    if let Some(action) = &filter.action_search_term {
        if let Some(action_group) = compile_action_term(action, options, seen) {
            group
                .terms
                .push(TermGroupItem::Group(action_group));
        }
    }

    if let Some(entities) = &filter.entity_search_terms {
        for entity in entities {
            if let Some(entity_group) = compile_entity_term(entity, options, seen) {
                group
                    .terms
                    .push(TermGroupItem::Group(entity_group));
            }
        }
    }

    if let Some(terms) = &filter.search_terms {
        for text in terms {
            add_search_term(&mut group, text, options, seen, true);
        }
        // An explicit empty searchTerms array with no other constraint is the
        // translator's way of asking for a summary: match every topic.
        if terms.is_empty() && filter.terms_only() && group.is_empty() {
            group.add_property(PropertyName::Topic, make_term(WILDCARD, options));
        }
    }

    group.optimized()
}

/// Build the per-entity group: best single match of name, type, or facets.
fn compile_entity_term(
    entity: &EntityTerm,
    options: &CompileOptions<'_>,
    seen: &mut PropertyTermSet,
) -> Option<SearchTermGroup> {
    let mut group = SearchTermGroup::new(BoolOp::OrMax);
    if !entity.is_name_pronoun {
        add_property_term(&mut group, PropertyName::Name, &entity.name, options, seen, true);
    }
    if let Some(types) = &entity.entity_type {
        for entity_type in types {
            add_property_term(&mut group, PropertyName::Type, entity_type, options, seen, true);
        }
    }
    if let Some(facets) = &entity.facets {
        for facet in facets {
            match (facet.name_is_wildcard(), facet.value_is_wildcard()) {
                (false, false) => add_property_term(
                    &mut group,
                    PropertyName::Facet(facet.facet_name.clone()),
                    &facet.facet_value,
                    options,
                    seen,
                    true,
                ),
                (true, false) => add_property_term(
                    &mut group,
                    PropertyName::FacetValue,
                    &facet.facet_value,
                    options,
                    seen,
                    true,
                ),
                (false, true) => add_property_term(
                    &mut group,
                    PropertyName::FacetName,
                    &facet.facet_name,
                    options,
                    seen,
                    true,
                ),
                (true, true) => {}
            }
        }
    }
    (!group.is_empty()).then_some(group)
}

/// Build the subject-verb-object structure for an action term.
///
/// Sibling per-target groups repeat the subject and verb terms, so dedup is
/// disabled throughout.
fn compile_action_term(
    action: &ActionTerm,
    options: &CompileOptions<'_>,
    seen: &mut PropertyTermSet,
) -> Option<SearchTermGroup> {
    let mut base = SearchTermGroup::new(BoolOp::And);
    if let Some(actors) = action.actor_entities.entities() {
        for actor in actors {
            if !actor.is_name_pronoun {
                add_property_term(&mut base, PropertyName::Subject, &actor.name, options, seen, false);
            }
        }
    }
    if let Some(verbs) = &action.action_verbs {
        for word in &verbs.words {
            add_property_term(&mut base, PropertyName::Verb, word, options, seen, false);
        }
    }
    if let Some(additional) = &action.additional_entities {
        for entity in additional {
            if !entity.is_name_pronoun {
                add_property_term(
                    &mut base,
                    PropertyName::IndirectObject,
                    &entity.name,
                    options,
                    seen,
                    false,
                );
            }
        }
    }

    let targets: Vec<&EntityTerm> = action
        .target_entities
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|t| !t.is_name_pronoun)
        .collect();
    if targets.is_empty() {
        return (!base.is_empty()).then_some(base);
    }

    // Per target: AND(subject+verb, OR(target as object, entity name, topic)).
    let mut group = SearchTermGroup::new(BoolOp::Or);
    for target in targets {
        let mut object_group = SearchTermGroup::new(BoolOp::Or);
        add_property_term(&mut object_group, PropertyName::Object, &target.name, options, seen, false);
        add_property_term(&mut object_group, PropertyName::Name, &target.name, options, seen, false);
        add_property_term(&mut object_group, PropertyName::Topic, &target.name, options, seen, false);
        if object_group.is_empty() {
            continue;
        }
        let mut target_group = base.clone();
        target_group
            .terms
            .push(TermGroupItem::Group(object_group));
        group
            .terms
            .push(TermGroupItem::Group(target_group));
    }
    if group.is_empty() {
        return (!base.is_empty()).then_some(base);
    }
    // A single per-target group stands on its own.
    if group.terms.len() == 1 {
        if let Some(TermGroupItem::Group(only)) = group.terms.pop() {
            return Some(only);
        }
    }
    Some(group)
}

fn compile_when(
    filter: &SearchFilter,
    options: &CompileOptions<'_>,
    filter_override: Option<&WhenFilter>,
) -> Option<WhenFilter> {
    let mut when = WhenFilter::default();

    if options.settings.apply_scope {
        if let Some(action) = &filter.action_search_term {
            if !action.is_informational && !action.actor_entities.is_wildcard() {
                when.scope_defining_terms = compile_scope(action, options);
            }
        }
    }
    if let Some(range) = &filter.time_range {
        when.date_range = Some(DateRange::from(range));
    }

    if let Some(overrides) = filter_override {
        if let Some(kind) = overrides.knowledge_type {
            when.knowledge_type = Some(kind);
        }
        if let Some(range) = &overrides.date_range {
            when.date_range = Some(range.clone());
        }
        if let Some(scope) = &overrides.scope_defining_terms {
            when.scope_defining_terms = Some(scope.clone());
        }
        if let Some(tags) = &overrides.tags {
            when.tags = Some(tags.clone());
        }
        if let Some(thread) = &overrides.thread_description {
            when.thread_description = Some(thread.clone());
        }
    }

    (!when.is_empty()).then_some(when)
}

/// Derive the subject (+ verb) scope group for an action.
///
/// Scope terms are independent of the select terms, so they get a fresh dedup
/// set: a subject named both as actor and additional entity yields one term.
fn compile_scope(action: &ActionTerm, options: &CompileOptions<'_>) -> Option<SearchTermGroup> {
    let mut seen = PropertyTermSet::new();
    let mut group = SearchTermGroup::new(BoolOp::And);
    if let Some(actors) = action.actor_entities.entities() {
        for actor in actors {
            if !actor.is_name_pronoun {
                add_property_term(&mut group, PropertyName::Subject, &actor.name, options, &mut seen, true);
            }
        }
    }
    if let Some(additional) = &action.additional_entities {
        for entity in additional {
            if !entity.is_name_pronoun {
                add_property_term(&mut group, PropertyName::Subject, &entity.name, options, &mut seen, true);
            }
        }
    }
    if options.settings.verb_scope {
        if let Some(verbs) = &action.action_verbs {
            for word in &verbs.words {
                add_property_term(&mut group, PropertyName::Verb, word, options, &mut seen, true);
            }
        }
    }
    (!group.is_empty()).then_some(group)
}

fn add_search_term(
    group: &mut SearchTermGroup,
    text: &str,
    options: &CompileOptions<'_>,
    seen: &mut PropertyTermSet,
    dedupe: bool,
) {
    if !is_admissible(text, options) {
        return;
    }
    if dedupe && !seen.insert((String::new(), text.to_lowercase())) {
        return;
    }
    group.add_term(make_term(text, options));
}

fn add_property_term(
    group: &mut SearchTermGroup,
    property_name: PropertyName,
    value: &str,
    options: &CompileOptions<'_>,
    seen: &mut PropertyTermSet,
    dedupe: bool,
) {
    if !is_admissible(value, options) {
        return;
    }
    // A concrete facet name is free text; the structural names are not.
    if let PropertyName::Facet(name) = &property_name {
        if !is_admissible(name, options) {
            return;
        }
    }
    if dedupe {
        let key = (property_name.as_str().to_string(), value.to_lowercase());
        if !seen.insert(key) {
            return;
        }
    }
    group.add_property(property_name, make_term(value, options));
}

fn make_term(text: &str, options: &CompileOptions<'_>) -> SearchTerm {
    if options.settings.exact_match {
        SearchTerm::exact(text)
    } else {
        SearchTerm::new(text)
    }
}

fn is_admissible(value: &str, options: &CompileOptions<'_>) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    if NOISE_WORDS.iter().any(|w| w.eq_ignore_ascii_case(trimmed)) {
        return false;
    }
    if let Some(filter) = options.term_filter {
        if !filter(trimmed) {
            return false;
        }
    }
    true
}
