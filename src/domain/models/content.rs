//! Scraped page content.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hyperlink found on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// An image found on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

/// Cheap performance signals derived from markup alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceHints {
    pub has_ssl: bool,
    pub has_responsive_meta: bool,
    pub has_large_images: bool,
    pub has_minified_assets: bool,
}

/// Immutable snapshot of one fetched page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedContent {
    pub url: String,
    pub title: String,
    pub description: String,
    /// Raw markup, truncated by the fetcher.
    pub html: String,
    /// Headings in document order, formatted as `"H2: text"`.
    pub headings: Vec<String>,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
    pub scripts: Vec<String>,
    pub css_classes: Vec<String>,
    pub meta_tags: BTreeMap<String, String>,
    pub structured_data: Vec<serde_json::Value>,
    pub performance_hints: PerformanceHints,
    pub fetched_at: DateTime<Utc>,
}

impl ScrapedContent {
    /// Minimal content for a URL, used by fakes and tests.
    pub fn empty(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            performance_hints: PerformanceHints {
                has_ssl: url.starts_with("https://"),
                ..PerformanceHints::default()
            },
            url,
            title: String::new(),
            description: String::new(),
            html: String::new(),
            headings: Vec::new(),
            links: Vec::new(),
            images: Vec::new(),
            scripts: Vec::new(),
            css_classes: Vec::new(),
            meta_tags: BTreeMap::new(),
            structured_data: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}
