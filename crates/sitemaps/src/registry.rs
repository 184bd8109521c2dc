use crate::config::SitemapConfig;
use crate::error::{Result, SitemapError};
use crate::posts::PostsProvider;
use crate::provider::{Provider, RenderOutcome, SitemapPage, sitemap_pages};
use crate::repository::ContentRepository;
use crate::sitemap::{SitemapResponse, render_index};
use crate::taxonomies::TaxonomiesProvider;
use crate::types::{SitemapRequest, SubType};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

pub const INDEX_FILE_NAME: &str = "sitemap.xml";

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub file_name: String,
    pub response: SitemapResponse,
}

/// The registered providers, in the order their sitemaps are listed.
#[derive(Default, Clone)]
pub struct SitemapRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl SitemapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SitemapConfig, repository: Arc<dyn ContentRepository>) -> Result<Self> {
        let mut registry = Self::new();

        if config.posts.enabled {
            let provider = PostsProvider::new(Arc::clone(&repository))
                .with_object_type(config.posts.object_type.clone())
                .with_slug(config.posts.slug.clone())
                .with_page_size(config.page_size);
            registry.register(Arc::new(provider))?;
        }

        if config.taxonomies.enabled {
            let mut provider = TaxonomiesProvider::new(repository).with_page_size(config.page_size);
            if let Some(include) = config.taxonomies.include.clone() {
                provider = provider.with_sub_type_filter(Arc::new(move |sub_types: Vec<SubType>| {
                    sub_types
                        .into_iter()
                        .filter(|sub_type| include.contains(&sub_type.name))
                        .collect()
                }));
            }
            registry.register(Arc::new(provider))?;
        }

        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) -> Result<()> {
        if self.get(provider.slug()).is_some() {
            return Err(SitemapError::DuplicateSlug {
                slug: provider.slug().to_string(),
            });
        }
        debug!(sitemap = provider.slug(), route = provider.route(), "registered provider");
        self.providers.push(provider);
        Ok(())
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    pub fn get(&self, slug: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|provider| provider.slug() == slug)
    }

    pub fn sitemaps(&self) -> Result<Vec<String>> {
        let mut slugs = Vec::new();
        for provider in &self.providers {
            slugs.extend(provider.sitemaps()?);
        }
        Ok(slugs)
    }

    pub fn pages(&self) -> Result<Vec<SitemapPage>> {
        let mut pages = Vec::new();
        for provider in &self.providers {
            pages.extend(sitemap_pages(provider.as_ref())?);
        }
        Ok(pages)
    }

    pub fn index_locations(&self, base_url: &str) -> Result<Vec<String>> {
        let base_url = base_url.trim_end_matches('/');
        Ok(self
            .sitemaps()?
            .into_iter()
            .map(|slug| format!("{base_url}/sitemap-{slug}.xml"))
            .collect())
    }

    pub fn render_index(&self, base_url: &str) -> Result<SitemapResponse> {
        Ok(render_index(&self.index_locations(base_url)?))
    }

    /// First provider claiming the request answers it; nobody claiming it is
    /// a 404.
    pub fn dispatch(&self, request: &SitemapRequest) -> Result<SitemapResponse> {
        for provider in &self.providers {
            if let RenderOutcome::Response(response) = provider.render(request)? {
                return Ok(response);
            }
        }
        debug!(sitemap = %request.sitemap, "no provider matched");
        Ok(SitemapResponse::not_found())
    }

    /// Renders every listed page in parallel. Pages that stopped existing
    /// since they were listed are skipped.
    pub fn render_all(&self) -> Result<Vec<RenderedPage>> {
        let pages = self.pages()?;
        let rendered: Vec<RenderedPage> = pages
            .par_iter()
            .map(|page| -> Result<RenderedPage> {
                Ok(RenderedPage {
                    file_name: page.file_name(),
                    response: self.dispatch(&page.request())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(rendered
            .into_iter()
            .filter(|page| {
                if !page.response.is_ok() {
                    warn!(file = %page.file_name, "sitemap page disappeared while rendering");
                }
                page.response.is_ok()
            })
            .collect())
    }
}

impl std::fmt::Debug for SitemapRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_list()
            .entries(self.providers.iter().map(|provider| provider.slug()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PostsConfig, TaxonomiesConfig};
    use crate::memory::tests::{make_document, make_term, public, tag};
    use crate::memory::{ContentFile, MemoryRepository};
    use crate::sitemap::Status;
    use crate::types::SubTypeSelector;
    use std::path::PathBuf;

    fn config(page_size: usize) -> SitemapConfig {
        SitemapConfig {
            base_url: "https://example.com".to_string(),
            content: PathBuf::from("content.toml"),
            page_size,
            posts: PostsConfig::default(),
            taxonomies: TaxonomiesConfig::default(),
        }
    }

    fn repository() -> Arc<dyn ContentRepository> {
        Arc::new(MemoryRepository::new(
            "https://example.com",
            ContentFile {
                taxonomies: vec![public("category"), public("post_tag")],
                terms: vec![
                    make_term(1, "category", "news"),
                    make_term(2, "post_tag", "rust"),
                ],
                documents: vec![
                    tag(make_document(1, "a", 1), "category", &["news"]),
                    tag(make_document(2, "b", 2), "post_tag", &["rust"]),
                    make_document(3, "c", 3),
                ],
            },
        ))
    }

    #[test]
    fn test_from_config_registers_both_providers() {
        let registry = SitemapRegistry::from_config(&config(2), repository()).unwrap();
        let slugs: Vec<&str> = registry
            .providers()
            .iter()
            .map(|provider| provider.slug())
            .collect();
        assert_eq!(slugs, vec!["posts", "taxonomies"]);
        assert_eq!(
            registry.sitemaps().unwrap(),
            vec![
                "posts-1",
                "posts-2",
                "taxonomies-category-1",
                "taxonomies-post_tag-1"
            ]
        );
    }

    #[test]
    fn test_disabled_providers_are_skipped() {
        let mut config = config(2);
        config.posts.enabled = false;
        let registry = SitemapRegistry::from_config(&config, repository()).unwrap();
        assert!(registry.get("posts").is_none());
        assert!(registry.get("taxonomies").is_some());
    }

    #[test]
    fn test_include_filters_taxonomies() {
        let mut config = config(2);
        config.taxonomies.include = Some(vec!["post_tag".to_string()]);
        let registry = SitemapRegistry::from_config(&config, repository()).unwrap();
        assert_eq!(
            registry.get("taxonomies").unwrap().sitemaps().unwrap(),
            vec!["taxonomies-post_tag-1"]
        );
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let mut registry = SitemapRegistry::new();
        registry
            .register(Arc::new(PostsProvider::new(repository())))
            .unwrap();
        let error = registry
            .register(Arc::new(PostsProvider::new(repository())))
            .unwrap_err();
        assert!(matches!(error, SitemapError::DuplicateSlug { slug } if slug == "posts"));
    }

    #[test]
    fn test_index_locations() {
        let registry = SitemapRegistry::from_config(&config(10), repository()).unwrap();
        assert_eq!(
            registry.index_locations("https://example.com/").unwrap(),
            vec![
                "https://example.com/sitemap-posts-1.xml",
                "https://example.com/sitemap-taxonomies-category-1.xml",
                "https://example.com/sitemap-taxonomies-post_tag-1.xml",
            ]
        );
        let index = registry.render_index("https://example.com").unwrap();
        assert!(index.body.contains("<sitemapindex"));
        assert_eq!(index.body.matches("<sitemap>").count(), 3);
    }

    #[test]
    fn test_dispatch_routes_to_matching_provider() {
        let registry = SitemapRegistry::from_config(&config(10), repository()).unwrap();

        let posts = registry.dispatch(&SitemapRequest::new("posts")).unwrap();
        assert_eq!(posts.body.matches("<url>").count(), 3);

        let tags = registry
            .dispatch(
                &SitemapRequest::new("taxonomies")
                    .with_sub_type(SubTypeSelector::Name("post_tag".to_string())),
            )
            .unwrap();
        assert!(tags.body.contains("https://example.com/post_tag/rust/"));

        let unknown = registry.dispatch(&SitemapRequest::new("users")).unwrap();
        assert_eq!(unknown.status, Status::NotFound);
    }

    #[test]
    fn test_render_all_covers_every_listed_page() {
        let registry = SitemapRegistry::from_config(&config(2), repository()).unwrap();
        let rendered = registry.render_all().unwrap();
        let files: Vec<&str> = rendered.iter().map(|page| page.file_name.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "sitemap-posts-1.xml",
                "sitemap-posts-2.xml",
                "sitemap-taxonomies-category-1.xml",
                "sitemap-taxonomies-post_tag-1.xml",
            ]
        );
        let total_urls: usize = rendered
            .iter()
            .filter(|page| page.file_name.starts_with("sitemap-posts"))
            .map(|page| page.response.body.matches("<url>").count())
            .sum();
        assert_eq!(total_urls, 3);
    }
}
