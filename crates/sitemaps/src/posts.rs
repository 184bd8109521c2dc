use crate::error::Result;
use crate::provider::{
    Provider, ProviderBase, RenderOutcome, UrlListFilter, document_entries, validate_page,
};
use crate::repository::ContentRepository;
use crate::sitemap::render_sitemap;
use crate::types::{ChangeFreq, SitemapEntry, SitemapRequest};
use std::sync::Arc;
use tracing::debug;

pub const POSTS_OBJECT_TYPE: &str = "post";
pub const POSTS_SLUG: &str = "posts";
pub const POSTS_PRIORITY: f32 = 0.5;
pub const POSTS_CHANGEFREQ: ChangeFreq = ChangeFreq::Monthly;

/// Flat document sitemap: one partition, one sitemap slug.
#[derive(Debug, Clone)]
pub struct PostsProvider {
    base: ProviderBase,
}

fn posts_route(slug: &str) -> String {
    format!(r"^sitemap-{}(?:-([0-9]+))?\.xml$", regex::escape(slug))
}

impl PostsProvider {
    pub fn new(repository: Arc<dyn ContentRepository>) -> Self {
        Self {
            base: ProviderBase::new(
                POSTS_OBJECT_TYPE,
                POSTS_SLUG,
                posts_route(POSTS_SLUG),
                repository,
            ),
        }
    }

    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.base.object_type = object_type.into();
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.base.slug = slug.into();
        self.base.route = posts_route(&self.base.slug);
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
}

impl Provider for PostsProvider {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    /// Every entry carries the same priority and change frequency.
    fn url_list(&self, sub_type: Option<&str>, page: usize) -> Result<Vec<SitemapEntry>> {
        let entries = document_entries(self, sub_type, page)?
            .into_iter()
            .map(|entry| {
                entry
                    .with_priority(POSTS_PRIORITY)
                    .with_changefreq(POSTS_CHANGEFREQ)
            })
            .collect();
        Ok(self
            .base
            .apply_url_filters(entries, self.queried_type(sub_type), page))
    }

    /// Out-of-range pages render as an empty sitemap rather than a 404.
    fn render(&self, request: &SitemapRequest) -> Result<RenderOutcome> {
        if request.sitemap != self.slug() {
            return Ok(RenderOutcome::NoMatch);
        }

        let max_num_pages = self.max_num_pages(None)?;
        let entries = match validate_page(request.page_number(), max_num_pages) {
            Some(page) => self.url_list(None, page)?,
            None => {
                debug!(
                    sitemap = self.slug(),
                    page = request.page_number(),
                    max_num_pages,
                    "page out of range, rendering empty sitemap"
                );
                Vec::new()
            }
        };

        Ok(RenderOutcome::Response(render_sitemap(&entries)))
    }
}
