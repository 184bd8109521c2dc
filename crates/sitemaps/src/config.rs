use crate::error::{IoContext, Result, SitemapError};
use crate::types::default_page_size;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "sitemaps.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    pub base_url: String,
    #[serde(default = "default_content_path")]
    pub content: PathBuf,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub posts: PostsConfig,
    #[serde(default)]
    pub taxonomies: TaxonomiesConfig,
}

fn default_content_path() -> PathBuf {
    PathBuf::from("content.toml")
}

fn default_true() -> bool {
    true
}

fn default_posts_object_type() -> String {
    crate::posts::POSTS_OBJECT_TYPE.to_string()
}

fn default_posts_slug() -> String {
    crate::posts::POSTS_SLUG.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_posts_object_type")]
    pub object_type: String,
    #[serde(default = "default_posts_slug")]
    pub slug: String,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            object_type: default_posts_object_type(),
            slug: default_posts_slug(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomiesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allow-list of taxonomy names. Everything public when unset.
    #[serde(default)]
    pub include: Option<Vec<String>>,
}

impl Default for TaxonomiesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include: None,
        }
    }
}

impl SitemapConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Err(SitemapError::ConfigNotFound {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path).io_context("reading config", config_path)?;
        let mut config: SitemapConfig =
            toml::from_str(&content).map_err(|error| SitemapError::TomlParse {
                path: config_path.to_path_buf(),
                message: error.to_string(),
            })?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();
        if config.page_size == 0 {
            config.page_size = default_page_size();
        }

        Ok(config)
    }

    /// Content file location, relative paths resolved against `config_dir`.
    pub fn content_path(&self, config_dir: &Path) -> PathBuf {
        if self.content.is_absolute() {
            self.content.clone()
        } else {
            config_dir.join(&self.content)
        }
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.trim_end_matches('/').to_string();
    }
}
