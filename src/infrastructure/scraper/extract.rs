//! Regex-based extraction of content facts from raw markup.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use regex::Regex;

use crate::domain::models::{Image, Link, PerformanceHints, ScrapedContent};

pub const MAX_LINKS: usize = 100;
pub const MAX_IMAGES: usize = 50;
pub const MAX_SCRIPTS: usize = 30;
pub const MAX_CSS_CLASSES: usize = 200;
const MAX_TEXT_CHARS: usize = 200;
const MAX_META_CONTENT_CHARS: usize = 500;
const LARGE_IMAGE_PX: u32 = 1200;

/// Compiled patterns for pulling facts out of an HTML document.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    title: Regex,
    meta: Regex,
    heading: Regex,
    anchor: Regex,
    img: Regex,
    script: Regex,
    link_tag: Regex,
    class_attr: Regex,
    attr: Regex,
    tag: Regex,
    whitespace: Regex,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            title: Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>")?,
            meta: Regex::new(r"(?is)<meta\b([^>]*)>")?,
            heading: Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>")?,
            anchor: Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>")?,
            img: Regex::new(r"(?is)<img\b([^>]*)>")?,
            script: Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>")?,
            link_tag: Regex::new(r"(?is)<link\b([^>]*)>")?,
            class_attr: Regex::new(r#"(?is)<[a-z][a-z0-9-]*\b[^>]*?\sclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            attr: Regex::new(
                r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            )?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Extract content facts from `html` fetched from `url`.
    ///
    /// The stored markup is truncated to `max_html_chars`; extraction itself
    /// always sees the full document.
    pub fn extract(&self, url: &str, html: &str, max_html_chars: usize) -> ScrapedContent {
        let meta_tags = self.meta_tags(html);
        let description = meta_tags
            .get("description")
            .or_else(|| meta_tags.get("og:description"))
            .cloned()
            .unwrap_or_default();
        let images = self.images(html);
        let scripts = self.scripts(html);

        let performance_hints = PerformanceHints {
            has_ssl: url.starts_with("https://"),
            has_responsive_meta: meta_tags.contains_key("viewport"),
            has_large_images: self.has_large_images(html),
            has_minified_assets: scripts.iter().any(|s| s.contains(".min."))
                || self.stylesheets(html).iter().any(|s| s.contains(".min.")),
        };

        ScrapedContent {
            url: url.to_string(),
            title: self.title(html),
            description,
            html: truncate_chars(html, max_html_chars).to_string(),
            headings: self.headings(html),
            links: self.links(html),
            images,
            scripts,
            css_classes: self.css_classes(html),
            meta_tags,
            structured_data: self.structured_data(html),
            performance_hints,
            fetched_at: Utc::now(),
        }
    }

    fn title(&self, html: &str) -> String {
        self.title
            .captures(html)
            .map(|c| self.text(&c[1]))
            .unwrap_or_default()
    }

    fn meta_tags(&self, html: &str) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        for caps in self.meta.captures_iter(html) {
            let attrs = self.attrs(&caps[1]);
            let key = attrs
                .get("name")
                .or_else(|| attrs.get("property"))
                .or_else(|| attrs.get("http-equiv"));
            if let (Some(key), Some(content)) = (key, attrs.get("content")) {
                if key.is_empty() {
                    continue;
                }
                tags.insert(
                    key.to_ascii_lowercase(),
                    truncate_chars(content, MAX_META_CONTENT_CHARS).to_string(),
                );
            }
        }
        tags
    }

    fn headings(&self, html: &str) -> Vec<String> {
        self.heading
            .captures_iter(html)
            .filter_map(|caps| {
                let text = self.text(&caps[2]);
                (!text.is_empty()).then(|| format!("H{}: {text}", &caps[1]))
            })
            .collect()
    }

    fn links(&self, html: &str) -> Vec<Link> {
        self.anchor
            .captures_iter(html)
            .filter_map(|caps| {
                let href = self.attrs(&caps[1]).remove("href")?;
                let lowered = href.trim().to_ascii_lowercase();
                if lowered.is_empty() || lowered.starts_with("javascript:") || lowered.starts_with('#') {
                    return None;
                }
                let text = self.text(&caps[2]);
                Some(Link {
                    href,
                    text: truncate_chars(&text, MAX_TEXT_CHARS).to_string(),
                })
            })
            .take(MAX_LINKS)
            .collect()
    }

    fn images(&self, html: &str) -> Vec<Image> {
        self.img
            .captures_iter(html)
            .filter_map(|caps| {
                let mut attrs = self.attrs(&caps[1]);
                let src = attrs.remove("src").filter(|s| !s.is_empty())?;
                let alt = attrs.remove("alt").unwrap_or_default();
                Some(Image {
                    src,
                    alt: truncate_chars(&alt, MAX_TEXT_CHARS).to_string(),
                })
            })
            .take(MAX_IMAGES)
            .collect()
    }

    fn has_large_images(&self, html: &str) -> bool {
        self.img.captures_iter(html).any(|caps| {
            let attrs = self.attrs(&caps[1]);
            ["width", "height"].iter().any(|dim| {
                attrs
                    .get(*dim)
                    .and_then(|v| leading_number(v))
                    .is_some_and(|px| px > LARGE_IMAGE_PX)
            })
        })
    }

    fn scripts(&self, html: &str) -> Vec<String> {
        self.script
            .captures_iter(html)
            .filter_map(|caps| self.attrs(&caps[1]).remove("src").filter(|s| !s.is_empty()))
            .take(MAX_SCRIPTS)
            .collect()
    }

    fn stylesheets(&self, html: &str) -> Vec<String> {
        self.link_tag
            .captures_iter(html)
            .filter_map(|caps| {
                let mut attrs = self.attrs(&caps[1]);
                let is_stylesheet = attrs
                    .get("rel")
                    .is_some_and(|rel| rel.to_ascii_lowercase().contains("stylesheet"));
                if is_stylesheet {
                    attrs.remove("href")
                } else {
                    None
                }
            })
            .collect()
    }

    fn structured_data(&self, html: &str) -> Vec<serde_json::Value> {
        self.script
            .captures_iter(html)
            .filter(|caps| {
                self.attrs(&caps[1])
                    .get("type")
                    .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
            })
            // Unparseable blocks are skipped.
            .filter_map(|caps| serde_json::from_str(caps[2].trim()).ok())
            .collect()
    }

    fn css_classes(&self, html: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut classes = Vec::new();
        'outer: for caps in self.class_attr.captures_iter(html) {
            let value = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            for class in value.split_whitespace() {
                if seen.insert(class.to_string()) {
                    classes.push(class.to_string());
                    if classes.len() >= MAX_CSS_CLASSES {
                        break 'outer;
                    }
                }
            }
        }
        classes
    }

    /// Attribute map of a tag body; names are lowercased and values decoded.
    fn attrs(&self, tag_body: &str) -> BTreeMap<String, String> {
        self.attr
            .captures_iter(tag_body)
            .map(|caps| {
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map_or("", |m| m.as_str());
                (caps[1].to_ascii_lowercase(), decode_entities(value))
            })
            .collect()
    }

    /// Visible text of a fragment with tags stripped and whitespace collapsed.
    fn text(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, " ");
        let collapsed = self.whitespace.replace_all(&stripped, " ");
        decode_entities(collapsed.trim())
    }
}

fn leading_number(value: &str) -> Option<u32> {
    let digits: String = value.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
