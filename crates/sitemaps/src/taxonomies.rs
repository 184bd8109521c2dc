use crate::error::Result;
use crate::provider::{
    Provider, ProviderBase, RenderOutcome, UrlListFilter, resolve_sub_type, validate_page,
};
use crate::repository::{ContentRepository, DocumentQuery, TermQuery};
use crate::sitemap::{SitemapResponse, render_sitemap};
use crate::types::{SitemapEntry, SitemapRequest, SubType};
use std::sync::Arc;
use tracing::{debug, warn};

pub const TAXONOMIES_OBJECT_TYPE: &str = "taxonomy";
pub const TAXONOMIES_SLUG: &str = "taxonomies";

/// Hook over the taxonomy sub-types before they are used for listing or
/// request resolution.
pub type SubTypeFilter = Arc<dyn Fn(Vec<SubType>) -> Vec<SubType> + Send + Sync>;

/// One sitemap per public taxonomy, listing that taxonomy's non-empty terms.
#[derive(Clone)]
pub struct TaxonomiesProvider {
    base: ProviderBase,
    sub_type_filters: Vec<SubTypeFilter>,
}

fn taxonomies_route(slug: &str) -> String {
    format!(
        r"^sitemap-{}-([A-Za-z0-9_-]+?)(?:-([0-9]+))?\.xml$",
        regex::escape(slug)
    )
}

impl TaxonomiesProvider {
    pub fn new(repository: Arc<dyn ContentRepository>) -> Self {
        Self {
            base: ProviderBase::new(
                TAXONOMIES_OBJECT_TYPE,
                TAXONOMIES_SLUG,
                taxonomies_route(TAXONOMIES_SLUG),
                repository,
            ),
            sub_type_filters: Vec::new(),
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.base.slug = slug.into();
        self.base.route = taxonomies_route(&self.base.slug);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.base.page_size = page_size;
        self
    }

    pub fn with_url_filter(mut self, filter: UrlListFilter) -> Self {
        self.base.add_url_filter(filter);
        self
    }

    pub fn with_sub_type_filter(mut self, filter: SubTypeFilter) -> Self {
        self.sub_type_filters.push(filter);
        self
    }

    fn term_query(&self, taxonomy: &str, page: usize) -> TermQuery {
        TermQuery::new(taxonomy, self.base.page_size, page)
    }
}

impl std::fmt::Debug for TaxonomiesProvider {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TaxonomiesProvider")
            .field("base", &self.base)
            .field("sub_type_filters", &self.sub_type_filters.len())
            .finish()
    }
}

impl Provider for TaxonomiesProvider {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    /// Public taxonomies in registration order, after the sub-type filters.
    fn object_sub_types(&self) -> Result<Vec<SubType>> {
        let sub_types = self
            .base
            .repository
            .taxonomies()?
            .into_iter()
            .filter(|taxonomy| taxonomy.public)
            .map(|taxonomy| SubType::new(taxonomy.name))
            .collect();

        Ok(self
            .sub_type_filters
            .iter()
            .fold(sub_types, |sub_types, filter| filter(sub_types)))
    }

    fn max_num_pages(&self, sub_type: Option<&str>) -> Result<usize> {
        let taxonomy = self.queried_type(sub_type);
        let pages = self
            .base
            .repository
            .term_pages(&self.term_query(taxonomy, 1))?;
        Ok(pages.unwrap_or(1).max(1))
    }

    /// Each term's `lastmod` is the modification time of the most recently
    /// dated document tagged with it, one lookup per term.
    fn url_list(&self, sub_type: Option<&str>, page: usize) -> Result<Vec<SitemapEntry>> {
        let Some(taxonomy) = sub_type.filter(|name| !name.is_empty()) else {
            return Ok(Vec::new());
        };

        let terms = self
            .base
            .repository
            .terms(&self.term_query(taxonomy, page))?;

        let mut entries = Vec::with_capacity(terms.len());
        for term in terms {
            let latest = self
                .base
                .repository
                .documents(&DocumentQuery::latest_tagged(taxonomy, term.id))?;
            let lastmod = latest
                .first()
                .map(|document| document.modified.unwrap_or(document.date));
            entries.push(SitemapEntry::new(term.url, lastmod));
        }

        debug!(
            sitemap = self.slug(),
            taxonomy,
            page,
            count = entries.len(),
            "fetched terms"
        );

        Ok(self.base.apply_url_filters(entries, taxonomy, page))
    }

    fn rewrite_query(&self) -> String {
        format!(
            "sitemap={}&sub_type_name=$matches[1]&paged=$matches[2]",
            self.slug()
        )
    }

    /// Unknown sub-types and out-of-range pages are answered with a 404.
    fn render(&self, request: &SitemapRequest) -> Result<RenderOutcome> {
        if request.sitemap != self.slug() {
            return Ok(RenderOutcome::NoMatch);
        }

        let sub_type = match &request.sub_type {
            Some(selector) => resolve_sub_type(self.object_sub_types()?, selector),
            None => None,
        };
        let Some(sub_type) = sub_type else {
            warn!(sitemap = self.slug(), selector = ?request.sub_type, "unknown sub-type");
            return Ok(RenderOutcome::Response(SitemapResponse::not_found()));
        };

        let max_num_pages = self.max_num_pages(Some(&sub_type.name))?;
        let Some(page) = validate_page(request.page_number(), max_num_pages) else {
            warn!(
                sitemap = self.slug(),
                taxonomy = %sub_type.name,
                page = request.page_number(),
                max_num_pages,
                "page out of range"
            );
            return Ok(RenderOutcome::Response(SitemapResponse::not_found()));
        };

        let entries = self.url_list(Some(&sub_type.name), page)?;
        Ok(RenderOutcome::Response(render_sitemap(&entries)))
    }
}
