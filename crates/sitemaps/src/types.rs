use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: usize = 2000;

pub fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

/// One `<url>` row of a rendered sitemap. Built per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub loc: String,
    #[serde(default)]
    pub lastmod: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<f32>,
    #[serde(default)]
    pub changefreq: Option<ChangeFreq>,
}

impl SitemapEntry {
    pub fn new(loc: impl Into<String>, lastmod: Option<DateTime<Utc>>) -> Self {
        Self {
            loc: loc.into(),
            lastmod,
            priority: None,
            changefreq: None,
        }
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = Some(priority.clamp(0.0, 1.0));
        self
    }

    pub fn with_changefreq(mut self, changefreq: ChangeFreq) -> Self {
        self.changefreq = Some(changefreq);
        self
    }
}

/// W3C datetime in UTC with an explicit `+00:00` offset.
pub fn w3c_datetime(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// A named partition of a provider's content. The empty name is the implicit
/// single partition of providers without real sub-typing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubType {
    pub name: String,
}

impl SubType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

fn default_object_type() -> String {
    "post".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    #[serde(default = "default_object_type")]
    pub object_type: String,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub draft: bool,
    /// Term slugs keyed by taxonomy name.
    #[serde(default)]
    pub terms: HashMap<String, Vec<String>>,
}

impl Document {
    pub fn has_term(&self, taxonomy: &str, term_slug: &str) -> bool {
        self.terms
            .get(taxonomy)
            .is_some_and(|slugs| slugs.iter().any(|slug| slug == term_slug))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    pub taxonomy: String,
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub public: bool,
}

/// How a request names a sub-type: by position in the provider's current
/// sub-type enumeration, or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubTypeSelector {
    Position(usize),
    Name(String),
}

impl SubTypeSelector {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<usize>() {
            Ok(position) => Some(Self::Position(position)),
            Err(_) => Some(Self::Name(raw.to_string())),
        }
    }
}

/// Routing parameters for one sitemap request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapRequest {
    pub sitemap: String,
    pub sub_type: Option<SubTypeSelector>,
    pub page: Option<i64>,
}

impl SitemapRequest {
    pub fn new(sitemap: impl Into<String>) -> Self {
        Self {
            sitemap: sitemap.into(),
            sub_type: None,
            page: None,
        }
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_sub_type(mut self, sub_type: SubTypeSelector) -> Self {
        self.sub_type = Some(sub_type);
        self
    }

    /// The requested page, defaulting to 1 when the route left it out.
    pub fn page_number(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    /// Parses a rewrite target such as `sitemap=taxonomies&sub_type=category&paged=2`.
    /// `sub_type` holds a position or a name; `sub_type_name` is always a name,
    /// so names made of digits still resolve by name. Unparseable page values
    /// become page 0 so they fail validation downstream.
    pub fn from_query(query: &str) -> Option<Self> {
        let mut sitemap = None;
        let mut sub_type = None;
        let mut page = None;

        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "sitemap" if !value.is_empty() => sitemap = Some(value.to_string()),
                "sub_type" => sub_type = SubTypeSelector::parse(value),
                "sub_type_name" => {
                    sub_type = (!value.is_empty()).then(|| SubTypeSelector::Name(value.to_string()))
                }
                "paged" if !value.is_empty() => page = Some(value.parse::<i64>().unwrap_or(0)),
                _ => {}
            }
        }

        Some(Self {
            sitemap: sitemap?,
            sub_type,
            page,
        })
    }
}
