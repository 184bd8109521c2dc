//! Query interface of the content store that owns documents and terms.
//!
//! Providers only ever see one page of records at a time, or a page count.
//! Implementations must answer the count queries without materializing the
//! full result set.

use crate::error::Result;
use crate::types::{Document, Taxonomy, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOrder {
    /// Creation order. Stable while documents are edited.
    Id,
    /// Publish date, ties broken by id.
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermFilter {
    pub taxonomy: String,
    pub term_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub object_type: Option<String>,
    pub term: Option<TermFilter>,
    pub order_by: DocumentOrder,
    pub order: SortOrder,
    pub page_size: usize,
    /// 1-indexed.
    pub page: usize,
}

impl DocumentQuery {
    pub fn of_type(object_type: impl Into<String>, page_size: usize, page: usize) -> Self {
        Self {
            object_type: Some(object_type.into()),
            term: None,
            order_by: DocumentOrder::Id,
            order: SortOrder::Asc,
            page_size,
            page,
        }
    }

    /// The single most recently dated document tagged with `term_id`.
    pub fn latest_tagged(taxonomy: impl Into<String>, term_id: u64) -> Self {
        Self {
            object_type: None,
            term: Some(TermFilter {
                taxonomy: taxonomy.into(),
                term_id,
            }),
            order_by: DocumentOrder::Date,
            order: SortOrder::Desc,
            page_size: 1,
            page: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermQuery {
    pub taxonomy: String,
    pub page_size: usize,
    /// 1-indexed.
    pub page: usize,
    /// Skip terms no published document is tagged with.
    pub hide_empty: bool,
}

impl TermQuery {
    pub fn new(taxonomy: impl Into<String>, page_size: usize, page: usize) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            page_size,
            page,
            hide_empty: true,
        }
    }
}

pub trait ContentRepository: Send + Sync {
    /// One page of documents with permalinks resolved into `Document::url`.
    fn documents(&self, query: &DocumentQuery) -> Result<Vec<Document>>;

    /// Total pages for `query`, or `None` when the store cannot report one.
    fn document_pages(&self, query: &DocumentQuery) -> Result<Option<usize>>;

    /// One page of terms ordered by term order, then id, with permalinks
    /// resolved into `Term::url`.
    fn terms(&self, query: &TermQuery) -> Result<Vec<Term>>;

    fn term_pages(&self, query: &TermQuery) -> Result<Option<usize>>;

    /// Every registered taxonomy in registration order.
    fn taxonomies(&self) -> Result<Vec<Taxonomy>>;
}

/// Number of pages needed for `total` rows, `None` for an empty set.
pub fn page_count(total: usize, page_size: usize) -> Option<usize> {
    if total == 0 || page_size == 0 {
        return None;
    }
    Some(total.div_ceil(page_size))
}

/// Row range `[start, end)` of a 1-indexed page, clamped to `total`.
pub fn page_window(total: usize, page_size: usize, page: usize) -> Option<(usize, usize)> {
    if page == 0 || page_size == 0 {
        return None;
    }
    let start = (page - 1).checked_mul(page_size)?;
    if start >= total {
        return None;
    }
    Some((start, (start + page_size).min(total)))
}
