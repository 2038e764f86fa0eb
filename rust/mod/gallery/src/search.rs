//! Search merger.
//!
//! There is no search index: a query fans out into several filtered reads
//! of `artwork_cards` (text match, whole-phrase tag, token tags, explicit
//! tag filters, or plain recency) and the rows are merged by artwork id.
//! Each read is windowed on its own, so a merged page can hold more than
//! `limit` rows. A failing read is logged and contributes nothing.

use std::collections::HashMap;
use std::sync::Arc;

use gallery_sql::{Filter, Select};
use tracing::{debug, warn};

use crate::model::{ArtworkCard, SearchQuery};
use crate::relation::RelationStore;
use crate::store::row_to_card;

const CARDS: &str = "artwork_cards";

/// Tag filter values that mean "no tag filter".
const ALL_TAGS: [&str; 2] = ["all", "Все"];

/// One of the reads a search fans out into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubQuery {
    /// Substring of title, author username or author full name.
    Text,
    /// The whole query as one tag.
    Phrase,
    /// Any whitespace token of the query as a tag.
    Tokens,
    /// Explicit single tag filter.
    Tag,
    /// Explicit multi-tag filter.
    Tags,
    /// Unfiltered browse.
    Recent,
}

impl SubQuery {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Phrase => "phrase-tag",
            Self::Tokens => "token-tags",
            Self::Tag => "tag",
            Self::Tags => "tags",
            Self::Recent => "recent",
        }
    }
}

impl std::fmt::Display for SubQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merged search output.
#[derive(Debug, Default)]
pub struct Candidates {
    /// Deduplicated rows, in first-seen order.
    pub cards: Vec<ArtworkCard>,
    /// Reads that failed and contributed nothing.
    pub failed: Vec<SubQuery>,
}

/// Whether a single-tag filter value means "every tag".
pub fn is_all_tags(tag: &str) -> bool {
    let tag = tag.trim();
    ALL_TAGS.iter().any(|all| tag.eq_ignore_ascii_case(all))
}

pub struct SearchMerger {
    relation: Arc<dyn RelationStore>,
    window: usize,
}

impl SearchMerger {
    /// `window` is the per-read row limit used when the query sets none.
    pub fn new(relation: Arc<dyn RelationStore>, window: usize) -> Self {
        Self {
            relation,
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Run every read the query calls for and merge the rows by id.
    pub async fn merge(&self, query: &SearchQuery) -> Candidates {
        let mut merged = Merge::default();
        let mut failed = Vec::new();

        for (kind, select) in self.plan(query) {
            match self.relation.select(&select).await {
                Ok(rows) => {
                    debug!(sub_query = %kind, rows = rows.len(), "search sub-query");
                    for row in &rows {
                        merged.put(row_to_card(row));
                    }
                }
                Err(e) => {
                    warn!(sub_query = %kind, error = %e, "search sub-query failed, skipping");
                    failed.push(kind);
                }
            }
        }

        Candidates {
            cards: merged.into_cards(),
            failed,
        }
    }

    /// The reads for a query, in merge order.
    pub fn plan(&self, query: &SearchQuery) -> Vec<(SubQuery, Select)> {
        let limit = query.limit.unwrap_or(self.window);
        let window = |select: Select| {
            select
                .order_by("created_at", false)
                .order_by("id", true)
                .range(query.offset, limit)
        };

        let mut plan = Vec::new();

        let text = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        if let Some(text) = text {
            plan.push((
                SubQuery::Text,
                window(Select::from(CARDS).or(vec![
                    Filter::ILike("title".into(), text.to_string()),
                    Filter::ILike("author_username".into(), text.to_string()),
                    Filter::ILike("author_full_name".into(), text.to_string()),
                ])),
            ));
            plan.push((
                SubQuery::Phrase,
                window(Select::from(CARDS).contains("tags", vec![text.to_string()])),
            ));
            let tokens: Vec<String> = text.split_whitespace().map(String::from).collect();
            plan.push((
                SubQuery::Tokens,
                window(Select::from(CARDS).overlaps("tags", tokens)),
            ));
        }

        let tag = query
            .tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !is_all_tags(t));
        let tags: Vec<String> = query
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        let mut tag_filtered = true;
        if let Some(tag) = tag {
            plan.push((
                SubQuery::Tag,
                window(Select::from(CARDS).contains("tags", vec![tag.to_string()])),
            ));
        } else if !tags.is_empty() {
            plan.push((
                SubQuery::Tags,
                window(Select::from(CARDS).overlaps("tags", tags)),
            ));
        } else {
            tag_filtered = false;
        }

        if text.is_none() && !tag_filtered {
            plan.push((SubQuery::Recent, window(Select::from(CARDS))));
        }

        plan
    }
}

/// Id-keyed merge. A later row for the same id replaces the earlier value
/// but keeps its position.
#[derive(Default)]
struct Merge {
    index: HashMap<String, usize>,
    cards: Vec<ArtworkCard>,
}

impl Merge {
    fn put(&mut self, card: ArtworkCard) {
        match self.index.get(&card.artwork.id) {
            Some(&i) => self.cards[i] = card,
            None => {
                self.index.insert(card.artwork.id.clone(), self.cards.len());
                self.cards.push(card);
            }
        }
    }

    fn into_cards(self) -> Vec<ArtworkCard> {
        self.cards
    }
}
