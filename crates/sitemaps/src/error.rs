use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error in {path}: {message}")]
    TomlParse { path: PathBuf, message: String },

    #[error("YAML parse error in {path}: {message}")]
    YamlParse { path: PathBuf, message: String },

    #[error("JSON parse error in {path}: {message}")]
    JsonParse { path: PathBuf, message: String },

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Unsupported content format for {path}, expected .toml, .yaml, .yml or .json")]
    UnsupportedContentFormat { path: PathBuf },

    /// For `ContentRepository` implementations backed by external stores.
    #[error("Content repository error: {message}")]
    Repository { message: String },

    #[error("Invalid route for sitemap '{slug}': {message}")]
    InvalidRoute { slug: String, message: String },

    #[error(
        "Route for sitemap '{slug}' has {groups} capturing groups but its rewrite query expects {placeholders}"
    )]
    RouteGroupMismatch {
        slug: String,
        groups: usize,
        placeholders: usize,
    },

    #[error("Duplicate sitemap slug '{slug}'")]
    DuplicateSlug { slug: String },
}

pub trait IoContext<T> {
    fn io_context(self, action: &str, path: &std::path::Path) -> Result<T>;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn io_context(self, action: &str, path: &std::path::Path) -> Result<T> {
        self.map_err(|error| {
            SitemapError::Io(std::io::Error::new(
                error.kind(),
                format!("{action} {}: {error}", path.display()),
            ))
        })
    }
}

pub type Result<T> = std::result::Result<T, SitemapError>;
