use crate::error::{IoContext, Result, SitemapError};
use crate::repository::{
    ContentRepository, DocumentOrder, DocumentQuery, SortOrder, TermQuery, page_count, page_window,
};
use crate::types::{Document, Taxonomy, Term};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// On-disk shape of a content file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentFile {
    #[serde(default)]
    pub taxonomies: Vec<Taxonomy>,
    #[serde(default)]
    pub terms: Vec<Term>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl ContentFile {
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
        let content = fs::read_to_string(path).io_context("reading content file", path)?;

        match extension {
            "toml" => toml::from_str(&content).map_err(|error| SitemapError::TomlParse {
                path: path.to_path_buf(),
                message: error.to_string(),
            }),
            "yaml" | "yml" => serde_yml::from_str(&content).map_err(|error| SitemapError::YamlParse {
                path: path.to_path_buf(),
                message: error.to_string(),
            }),
            "json" => serde_json::from_str(&content).map_err(|error| SitemapError::JsonParse {
                path: path.to_path_buf(),
                message: error.to_string(),
            }),
            _ => Err(SitemapError::UnsupportedContentFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Content store held entirely in memory. Documents are kept in id order and
/// terms in `(order, id)` order so paging never depends on edit times.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    base_url: String,
    taxonomies: Vec<Taxonomy>,
    terms: Vec<Term>,
    documents: Vec<Document>,
}

impl MemoryRepository {
    pub fn new(base_url: &str, content: ContentFile) -> Self {
        let mut repository = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            taxonomies: content.taxonomies,
            terms: content.terms,
            documents: content.documents,
        };
        repository.documents.sort_by_key(|document| document.id);
        repository
            .terms
            .sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        repository
    }

    pub fn load(path: &Path, base_url: &str) -> Result<Self> {
        let content = ContentFile::load(path)?;
        debug!(
            path = %path.display(),
            documents = content.documents.len(),
            terms = content.terms.len(),
            taxonomies = content.taxonomies.len(),
            "loaded content"
        );
        Ok(Self::new(base_url, content))
    }

    pub fn register_taxonomy(&mut self, taxonomy: Taxonomy) {
        self.taxonomies.retain(|existing| existing.name != taxonomy.name);
        self.taxonomies.push(taxonomy);
    }

    pub fn insert_document(&mut self, document: Document) {
        let position = self
            .documents
            .partition_point(|existing| existing.id < document.id);
        if self
            .documents
            .get(position)
            .is_some_and(|existing| existing.id == document.id)
        {
            self.documents[position] = document;
        } else {
            self.documents.insert(position, document);
        }
    }

    pub fn insert_term(&mut self, term: Term) {
        self.terms.retain(|existing| existing.id != term.id);
        let position = self
            .terms
            .partition_point(|existing| (existing.order, existing.id) < (term.order, term.id));
        self.terms.insert(position, term);
    }

    fn document_permalink(&self, document: &Document) -> String {
        if !document.url.is_empty() {
            return document.url.clone();
        }
        match document.object_type.as_str() {
            "post" => format!("{}/posts/{}/", self.base_url, document.slug),
            "page" => format!("{}/{}/", self.base_url, document.slug),
            other => format!("{}/{}/{}/", self.base_url, other, document.slug),
        }
    }

    fn term_link(&self, term: &Term) -> String {
        if !term.url.is_empty() {
            return term.url.clone();
        }
        format!("{}/{}/{}/", self.base_url, term.taxonomy, term.slug)
    }

    fn matching_documents<'a>(
        &'a self,
        query: &'a DocumentQuery,
    ) -> impl Iterator<Item = &'a Document> + 'a {
        let term_slug = query.term.as_ref().map(|filter| {
            self.terms
                .iter()
                .find(|term| term.id == filter.term_id && term.taxonomy == filter.taxonomy)
                .map(|term| (filter.taxonomy.as_str(), term.slug.as_str()))
        });

        self.documents.iter().filter(move |document| {
            if document.draft {
                return false;
            }
            if let Some(object_type) = &query.object_type {
                if &document.object_type != object_type {
                    return false;
                }
            }
            match term_slug {
                None => true,
                Some(None) => false,
                Some(Some((taxonomy, slug))) => document.has_term(taxonomy, slug),
            }
        })
    }

    fn is_term_used(&self, term: &Term) -> bool {
        self.documents
            .iter()
            .any(|document| !document.draft && document.has_term(&term.taxonomy, &term.slug))
    }

    fn matching_terms<'a>(&'a self, query: &'a TermQuery) -> impl Iterator<Item = &'a Term> + 'a {
        self.terms.iter().filter(move |term| {
            term.taxonomy == query.taxonomy && (!query.hide_empty || self.is_term_used(term))
        })
    }
}

impl ContentRepository for MemoryRepository {
    fn documents(&self, query: &DocumentQuery) -> Result<Vec<Document>> {
        let mut matches: Vec<&Document> = self.matching_documents(query).collect();

        if query.order_by == DocumentOrder::Date {
            matches.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        }
        if query.order == SortOrder::Desc {
            matches.reverse();
        }

        let Some((start, end)) = page_window(matches.len(), query.page_size, query.page) else {
            return Ok(Vec::new());
        };

        Ok(matches[start..end]
            .iter()
            .map(|document| {
                let mut document = (*document).clone();
                document.url = self.document_permalink(&document);
                document
            })
            .collect())
    }

    fn document_pages(&self, query: &DocumentQuery) -> Result<Option<usize>> {
        Ok(page_count(
            self.matching_documents(query).count(),
            query.page_size,
        ))
    }

    fn terms(&self, query: &TermQuery) -> Result<Vec<Term>> {
        let matches: Vec<&Term> = self.matching_terms(query).collect();

        let Some((start, end)) = page_window(matches.len(), query.page_size, query.page) else {
            return Ok(Vec::new());
        };

        Ok(matches[start..end]
            .iter()
            .map(|term| {
                let mut term = (*term).clone();
                term.url = self.term_link(&term);
                term
            })
            .collect())
    }

    fn term_pages(&self, query: &TermQuery) -> Result<Option<usize>> {
        Ok(page_count(self.matching_terms(query).count(), query.page_size))
    }

    fn taxonomies(&self) -> Result<Vec<Taxonomy>> {
        Ok(self.taxonomies.clone())
    }
}

/// A `MemoryRepository` backed by a content file that can be reloaded while
/// readers keep querying. Each query sees one whole snapshot.
#[derive(Debug)]
pub struct LiveRepository {
    path: PathBuf,
    base_url: String,
    current: RwLock<MemoryRepository>,
}

impl LiveRepository {
    pub fn open(path: impl Into<PathBuf>, base_url: &str) -> Result<Self> {
        let path = path.into();
        let repository = MemoryRepository::load(&path, base_url)?;
        Ok(Self {
            path,
            base_url: base_url.to_string(),
            current: RwLock::new(repository),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the content file. On failure the previous snapshot stays live.
    pub fn reload(&self) -> Result<()> {
        let repository = MemoryRepository::load(&self.path, &self.base_url)?;
        self.replace(repository);
        Ok(())
    }

    pub fn replace(&self, repository: MemoryRepository) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = repository;
    }

    fn with_current<T>(&self, query: impl FnOnce(&MemoryRepository) -> T) -> T {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        query(&guard)
    }
}

impl ContentRepository for LiveRepository {
    fn documents(&self, query: &DocumentQuery) -> Result<Vec<Document>> {
        self.with_current(|repository| repository.documents(query))
    }

    fn document_pages(&self, query: &DocumentQuery) -> Result<Option<usize>> {
        self.with_current(|repository| repository.document_pages(query))
    }

    fn terms(&self, query: &TermQuery) -> Result<Vec<Term>> {
        self.with_current(|repository| repository.terms(query))
    }

    fn term_pages(&self, query: &TermQuery) -> Result<Option<usize>> {
        self.with_current(|repository| repository.term_pages(query))
    }

    fn taxonomies(&self) -> Result<Vec<Taxonomy>> {
        self.with_current(|repository| repository.taxonomies())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    pub(crate) fn make_document(id: u64, slug: &str, day: u32) -> Document {
        let date = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        Document {
            id,
            object_type: "post".to_string(),
            slug: slug.to_string(),
            title: slug.to_string(),
            url: String::new(),
            date,
            modified: Some(date + chrono::Duration::hours(1)),
            draft: false,
            terms: HashMap::new(),
        }
    }

    pub(crate) fn tag(mut document: Document, taxonomy: &str, slugs: &[&str]) -> Document {
        document.terms.insert(
            taxonomy.to_string(),
            slugs.iter().map(|slug| slug.to_string()).collect(),
        );
        document
    }

    pub(crate) fn make_term(id: u64, taxonomy: &str, slug: &str) -> Term {
        Term {
            id,
            taxonomy: taxonomy.to_string(),
            slug: slug.to_string(),
            name: slug.to_string(),
            order: 0,
            url: String::new(),
        }
    }

    pub(crate) fn public(name: &str) -> Taxonomy {
        Taxonomy {
            name: name.to_string(),
            label: None,
            public: true,
        }
    }

    fn sample_repository() -> MemoryRepository {
        MemoryRepository::new(
            "https://example.com/",
            ContentFile {
                taxonomies: vec![public("category")],
                terms: vec![make_term(10, "category", "news"), make_term(11, "category", "empty")],
                documents: vec![
                    tag(make_document(3, "third", 3), "category", &["news"]),
                    make_document(1, "first", 5),
                    tag(make_document(2, "second", 1), "category", &["news"]),
                ],
            },
        )
    }

    #[test]
    fn test_documents_are_paged_in_id_order() {
        let repository = sample_repository();
        let first = repository
            .documents(&DocumentQuery::of_type("post", 2, 1))
            .unwrap();
        let second = repository
            .documents(&DocumentQuery::of_type("post", 2, 2))
            .unwrap();
        let ids: Vec<u64> = first.iter().chain(second.iter()).map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(first[0].url, "https://example.com/posts/first/");
    }

    #[test]
    fn test_document_pages_counts_without_fetching() {
        let repository = sample_repository();
        assert_eq!(
            repository
                .document_pages(&DocumentQuery::of_type("post", 2, 1))
                .unwrap(),
            Some(2)
        );
        assert_eq!(
            repository
                .document_pages(&DocumentQuery::of_type("page", 2, 1))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_drafts_are_hidden() {
        let mut repository = sample_repository();
        let mut draft = make_document(4, "draft", 9);
        draft.draft = true;
        repository.insert_document(draft);
        let documents = repository
            .documents(&DocumentQuery::of_type("post", 10, 1))
            .unwrap();
        assert_eq!(documents.len(), 3);
    }

    #[test]
    fn test_latest_tagged_orders_by_date_descending() {
        let repository = sample_repository();
        let latest = repository
            .documents(&DocumentQuery::latest_tagged("category", 10))
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, 3);
    }

    #[test]
    fn test_latest_tagged_unknown_term_is_empty() {
        let repository = sample_repository();
        let latest = repository
            .documents(&DocumentQuery::latest_tagged("category", 99))
            .unwrap();
        assert!(latest.is_empty());
    }

    #[test]
    fn test_terms_hide_empty() {
        let repository = sample_repository();
        let terms = repository
            .terms(&TermQuery::new("category", 10, 1))
            .unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].url, "https://example.com/category/news/");

        let mut query = TermQuery::new("category", 10, 1);
        query.hide_empty = false;
        assert_eq!(repository.terms(&query).unwrap().len(), 2);
        assert_eq!(repository.term_pages(&query).unwrap(), Some(1));
    }

    #[test]
    fn test_explicit_urls_are_kept() {
        let mut repository = sample_repository();
        let mut document = make_document(5, "custom", 2);
        document.url = "https://cdn.example.com/custom".to_string();
        repository.insert_document(document);
        let documents = repository
            .documents(&DocumentQuery::of_type("post", 10, 1))
            .unwrap();
        assert_eq!(documents[3].url, "https://cdn.example.com/custom");
    }

    #[test]
    fn test_insert_document_replaces_same_id() {
        let mut repository = sample_repository();
        repository.insert_document(make_document(2, "renamed", 1));
        let documents = repository
            .documents(&DocumentQuery::of_type("post", 10, 1))
            .unwrap();
        assert_eq!(documents.len(), 3);
        assert_eq!(documents[1].slug, "renamed");
    }

    #[test]
    fn test_load_content_formats() {
        let directory = tempfile::TempDir::new().unwrap();

        let toml_path = directory.path().join("content.toml");
        std::fs::write(
            &toml_path,
            r#"
[[taxonomies]]
name = "category"

[[documents]]
id = 1
slug = "hello"
date = "2024-01-01T00:00:00Z"
modified = "2024-01-02T00:00:00Z"
"#,
        )
        .unwrap();
        let repository = MemoryRepository::load(&toml_path, "https://example.com").unwrap();
        assert_eq!(repository.taxonomies().unwrap()[0].name, "category");
        assert!(repository.taxonomies().unwrap()[0].public);

        let json_path = directory.path().join("content.json");
        std::fs::write(
            &json_path,
            r#"{"documents": [{"id": 1, "slug": "hello", "date": "2024-01-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        let repository = MemoryRepository::load(&json_path, "https://example.com").unwrap();
        assert_eq!(
            repository
                .document_pages(&DocumentQuery::of_type("post", 10, 1))
                .unwrap(),
            Some(1)
        );

        let yaml_path = directory.path().join("content.yaml");
        std::fs::write(
            &yaml_path,
            "terms:\n  - id: 1\n    taxonomy: category\n    slug: news\n",
        )
        .unwrap();
        let content = ContentFile::load(&yaml_path).unwrap();
        assert_eq!(content.terms[0].slug, "news");
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let directory = tempfile::TempDir::new().unwrap();
        let path = directory.path().join("content.xml");
        std::fs::write(&path, "<content/>").unwrap();
        let error = ContentFile::load(&path).unwrap_err();
        assert!(matches!(error, SitemapError::UnsupportedContentFormat { .. }));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let directory = tempfile::TempDir::new().unwrap();
        let path = directory.path().join("content.toml");
        std::fs::write(&path, "documents = [").unwrap();
        let error = ContentFile::load(&path).unwrap_err();
        assert!(matches!(error, SitemapError::TomlParse { .. }));
    }

    #[test]
    fn test_live_repository_reload() {
        let directory = tempfile::TempDir::new().unwrap();
        let path = directory.path().join("content.toml");
        std::fs::write(&path, "[[taxonomies]]\nname = \"category\"\n").unwrap();

        let live = LiveRepository::open(&path, "https://example.com").unwrap();
        assert_eq!(live.taxonomies().unwrap().len(), 1);

        std::fs::write(
            &path,
            "[[taxonomies]]\nname = \"category\"\n\n[[taxonomies]]\nname = \"post_tag\"\n",
        )
        .unwrap();
        live.reload().unwrap();
        assert_eq!(live.taxonomies().unwrap().len(), 2);

        std::fs::write(&path, "taxonomies = [").unwrap();
        assert!(live.reload().is_err());
        assert_eq!(live.taxonomies().unwrap().len(), 2);
    }
}
