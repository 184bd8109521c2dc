//! The contract every sitemap source implements, plus the shared logic the
//! default methods delegate to.
//!
//! A provider enumerates its content as `sub-type × page` combinations. Every
//! call recomputes sub-types and page counts from the repository, so two
//! requests may disagree when content changes between them. Operations that
//! depend on the sub-type being served take it as an argument instead of
//! keeping it on the provider, which keeps one provider shareable across
//! concurrent requests.

use crate::error::Result;
use crate::repository::{ContentRepository, DocumentQuery};
use crate::sitemap::SitemapResponse;
use crate::types::{DEFAULT_PAGE_SIZE, SitemapEntry, SitemapRequest, SubType, SubTypeSelector};
use std::sync::Arc;
use tracing::debug;

pub const SLUG_SEPARATOR: &str = "-";

/// Post-processing hook run over a URL list before it is returned. Receives
/// the entries, the queried type and the page number.
pub type UrlListFilter =
    Arc<dyn Fn(Vec<SitemapEntry>, &str, usize) -> Vec<SitemapEntry> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The requested sitemap belongs to another provider.
    NoMatch,
    Response(SitemapResponse),
}

/// State shared by every provider variant.
#[derive(Clone)]
pub struct ProviderBase {
    pub object_type: String,
    pub slug: String,
    pub route: String,
    pub page_size: usize,
    pub repository: Arc<dyn ContentRepository>,
    url_filters: Vec<UrlListFilter>,
}

impl ProviderBase {
    pub fn new(
        object_type: impl Into<String>,
        slug: impl Into<String>,
        route: impl Into<String>,
        repository: Arc<dyn ContentRepository>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            slug: slug.into(),
            route: route.into(),
            page_size: DEFAULT_PAGE_SIZE,
            repository,
            url_filters: Vec::new(),
        }
    }

    pub fn add_url_filter(&mut self, filter: UrlListFilter) {
        self.url_filters.push(filter);
    }

    /// Runs the registered filters in registration order.
    pub fn apply_url_filters(
        &self,
        entries: Vec<SitemapEntry>,
        queried_type: &str,
        page: usize,
    ) -> Vec<SitemapEntry> {
        self.url_filters
            .iter()
            .fold(entries, |entries, filter| filter(entries, queried_type, page))
    }
}

impl std::fmt::Debug for ProviderBase {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ProviderBase")
            .field("object_type", &self.object_type)
            .field("slug", &self.slug)
            .field("route", &self.route)
            .field("page_size", &self.page_size)
            .field("url_filters", &self.url_filters.len())
            .finish_non_exhaustive()
    }
}

pub trait Provider: Send + Sync {
    fn base(&self) -> &ProviderBase;

    fn object_type(&self) -> &str {
        &self.base().object_type
    }

    fn slug(&self) -> &str {
        &self.base().slug
    }

    /// URL pattern. Its capturing groups line up with the `$matches[N]`
    /// placeholders of [`Provider::rewrite_query`].
    fn route(&self) -> &str {
        &self.base().route
    }

    fn page_size(&self) -> usize {
        self.base().page_size
    }

    /// The sub-type if one is given, otherwise the object type.
    fn queried_type<'a>(&'a self, sub_type: Option<&'a str>) -> &'a str {
        match sub_type {
            Some(name) if !name.is_empty() => name,
            _ => self.object_type(),
        }
    }

    /// Partitions of this provider's content. Without real sub-typing there is
    /// one implicit partition with an empty name.
    fn object_sub_types(&self) -> Result<Vec<SubType>> {
        Ok(vec![SubType::default()])
    }

    /// Pages needed for `sub_type`. Never less than 1.
    fn max_num_pages(&self, sub_type: Option<&str>) -> Result<usize> {
        document_max_num_pages(self, sub_type)
    }

    fn url_list(&self, sub_type: Option<&str>, page: usize) -> Result<Vec<SitemapEntry>> {
        let entries = document_entries(self, sub_type, page)?;
        Ok(self
            .base()
            .apply_url_filters(entries, self.queried_type(sub_type), page))
    }

    /// Slugs of every page this provider contributes to the sitemap index.
    fn sitemaps(&self) -> Result<Vec<String>> {
        Ok(sitemap_pages(self)?
            .into_iter()
            .map(|page| page.slug)
            .collect())
    }

    fn rewrite_query(&self) -> String {
        format!("sitemap={}&paged=$matches[1]", self.slug())
    }

    fn render(&self, request: &SitemapRequest) -> Result<RenderOutcome>;
}

/// Joins the non-empty components with [`SLUG_SEPARATOR`].
pub fn sitemap_slug(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(SLUG_SEPARATOR)
}

/// Converts a requested page to an in-range 1-indexed page, if it is one.
pub fn validate_page(page: i64, max_num_pages: usize) -> Option<usize> {
    let page = usize::try_from(page).ok()?;
    (1..=max_num_pages).contains(&page).then_some(page)
}

/// Resolves a selector against the sub-types as they are right now.
pub fn resolve_sub_type(sub_types: Vec<SubType>, selector: &SubTypeSelector) -> Option<SubType> {
    match selector {
        SubTypeSelector::Position(position) => sub_types.into_iter().nth(*position),
        SubTypeSelector::Name(name) => sub_types.into_iter().find(|sub_type| &sub_type.name == name),
    }
}

/// One page of one sub-type, as listed in the sitemap index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapPage {
    pub provider: String,
    pub sub_type: String,
    pub page: usize,
    pub slug: String,
}

impl SitemapPage {
    pub fn file_name(&self) -> String {
        format!("sitemap-{}.xml", self.slug)
    }

    pub fn request(&self) -> SitemapRequest {
        let page = i64::try_from(self.page).unwrap_or(i64::MAX);
        let request = SitemapRequest::new(self.provider.clone()).with_page(page);
        if self.sub_type.is_empty() {
            request
        } else {
            request.with_sub_type(SubTypeSelector::Name(self.sub_type.clone()))
        }
    }
}

/// Every `sub-type × page` combination, in sub-type order then page order.
/// The page index is always part of the slug.
pub fn sitemap_pages<P: Provider + ?Sized>(provider: &P) -> Result<Vec<SitemapPage>> {
    let mut pages = Vec::new();

    for sub_type in provider.object_sub_types()? {
        let total = provider.max_num_pages(Some(&sub_type.name))?;
        for page in 1..=total {
            pages.push(SitemapPage {
                provider: provider.slug().to_string(),
                sub_type: sub_type.name.clone(),
                page,
                slug: sitemap_slug(&[provider.slug(), &sub_type.name, &page.to_string()]),
            });
        }
    }

    Ok(pages)
}

/// Count-only document query for the queried type.
pub fn document_max_num_pages<P: Provider + ?Sized>(
    provider: &P,
    sub_type: Option<&str>,
) -> Result<usize> {
    let queried_type = provider.queried_type(sub_type);
    let query = DocumentQuery::of_type(queried_type, provider.page_size(), 1);
    let pages = provider.base().repository.document_pages(&query)?;
    Ok(pages.unwrap_or(1).max(1))
}

/// One page of documents for the queried type in id order, mapped to entries
/// carrying `loc` and `lastmod`. Filters are not applied here.
pub fn document_entries<P: Provider + ?Sized>(
    provider: &P,
    sub_type: Option<&str>,
    page: usize,
) -> Result<Vec<SitemapEntry>> {
    let queried_type = provider.queried_type(sub_type);
    let query = DocumentQuery::of_type(queried_type, provider.page_size(), page);
    let documents = provider.base().repository.documents(&query)?;

    debug!(
        sitemap = provider.slug(),
        queried_type,
        page,
        count = documents.len(),
        "fetched documents"
    );

    Ok(documents
        .into_iter()
        .map(|document| {
            let lastmod = document.modified.unwrap_or(document.date);
            SitemapEntry::new(document.url, Some(lastmod))
        })
        .collect())
}
