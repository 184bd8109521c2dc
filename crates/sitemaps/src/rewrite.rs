//! Maps request file names to sitemap requests using each provider's route
//! pattern and rewrite query.

use crate::error::{Result, SitemapError};
use crate::provider::Provider;
use crate::registry::SitemapRegistry;
use crate::types::SitemapRequest;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$matches\[([0-9]+)\]").unwrap());

#[derive(Debug, Clone)]
struct RewriteRule {
    pattern: Regex,
    query: String,
}

#[derive(Debug, Clone, Default)]
pub struct RewriteRules {
    rules: Vec<RewriteRule>,
}

impl RewriteRules {
    pub fn new(registry: &SitemapRegistry) -> Result<Self> {
        let mut rules = Self::default();
        for provider in registry.providers() {
            rules.add(provider.as_ref())?;
        }
        Ok(rules)
    }

    /// Compiles the provider's route. Its capturing groups must match the
    /// placeholders of its rewrite query one for one.
    pub fn add(&mut self, provider: &dyn Provider) -> Result<()> {
        let pattern = Regex::new(provider.route()).map_err(|error| SitemapError::InvalidRoute {
            slug: provider.slug().to_string(),
            message: error.to_string(),
        })?;
        let query = provider.rewrite_query();

        let groups = pattern.captures_len() - 1;
        let placeholders = PLACEHOLDER.find_iter(&query).count();
        if groups != placeholders {
            return Err(SitemapError::RouteGroupMismatch {
                slug: provider.slug().to_string(),
                groups,
                placeholders,
            });
        }

        self.rules.push(RewriteRule { pattern, query });
        Ok(())
    }

    /// The request for `path`, or `None` if no route matches.
    pub fn resolve(&self, path: &str) -> Option<SitemapRequest> {
        let file_name = path.trim_start_matches('/');
        self.rules.iter().find_map(|rule| {
            let captures = rule.pattern.captures(file_name)?;
            SitemapRequest::from_query(&substitute(&rule.query, &captures))
        })
    }
}

/// Replaces `$matches[N]` with capture N, or nothing when it did not match.
fn substitute(query: &str, captures: &Captures<'_>) -> String {
    PLACEHOLDER
        .replace_all(query, |placeholder: &Captures<'_>| {
            placeholder[1]
                .parse::<usize>()
                .ok()
                .and_then(|group| captures.get(group))
                .map_or(String::new(), |matched| matched.as_str().to_string())
        })
        .into_owned()
}
