//! Serialization of URL lists to the sitemaps.org schema.

use crate::types::{SitemapEntry, w3c_datetime};
use crate::xml::{SITEMAP_NAMESPACE, XML_DECLARATION, escape, push_element};

pub const XML_CONTENT_TYPE: &str = "application/xml; charset=UTF-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NotFound => 404,
        }
    }
}

/// A finished response. Once a provider hands one back it does no further
/// work for that request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapResponse {
    pub status: Status,
    pub content_type: &'static str,
    pub body: String,
}

impl SitemapResponse {
    pub fn xml(body: String) -> Self {
        Self {
            status: Status::Ok,
            content_type: XML_CONTENT_TYPE,
            body,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            content_type: TEXT_CONTENT_TYPE,
            body: "Not Found".to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

pub fn sitemap_xml(entries: &[SitemapEntry]) -> String {
    let mut xml = String::with_capacity(128 + entries.len() * 160);
    xml.push_str(XML_DECLARATION);
    xml.push('\n');
    xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NAMESPACE}">"#));
    xml.push('\n');

    for entry in entries {
        xml.push_str("<url>");
        push_element(&mut xml, "loc", &entry.loc);
        if let Some(lastmod) = &entry.lastmod {
            push_element(&mut xml, "lastmod", &w3c_datetime(lastmod));
        }
        if let Some(changefreq) = entry.changefreq {
            push_element(&mut xml, "changefreq", changefreq.as_str());
        }
        if let Some(priority) = entry.priority {
            push_element(&mut xml, "priority", &priority.to_string());
        }
        xml.push_str("</url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

pub fn render_sitemap(entries: &[SitemapEntry]) -> SitemapResponse {
    SitemapResponse::xml(sitemap_xml(entries))
}

pub fn index_xml(locations: &[String]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push('\n');
    xml.push_str(&format!(r#"<sitemapindex xmlns="{SITEMAP_NAMESPACE}">"#));
    xml.push('\n');

    for location in locations {
        xml.push_str(&format!(
            "<sitemap><loc>{}</loc></sitemap>\n",
            escape(location)
        ));
    }

    xml.push_str("</sitemapindex>\n");
    xml
}

pub fn render_index(locations: &[String]) -> SitemapResponse {
    SitemapResponse::xml(index_xml(locations))
}
