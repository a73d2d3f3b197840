//! `url()` discovery and rewriting for stylesheets and inline CSS.
//!
//! `@import` rules are not followed and `data:` URLs are never queued.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use url::Url;

use crate::html_parser::ResourceKind;
use crate::resolver;
use crate::scheduler::WorkItem;

fn css_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^"')\s]*))\s*\)"#)
            .expect("css url regex")
    })
}

fn charset_rule_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(\s*)@charset\s+(?:"[^"]*"|'[^']*')\s*;"#).expect("charset rule regex")
    })
}

/// Point a leading `@charset` rule at UTF-8. Stylesheets without one are
/// returned unchanged.
pub fn declare_utf8(css: &str) -> Cow<'_, str> {
    charset_rule_regex().replace(css, "${1}@charset \"UTF-8\";")
}

#[derive(Debug, Default)]
pub struct StylesheetRewrite {
    /// The stylesheet text with every resolvable reference rewritten.
    pub css: String,
    /// One item per resolvable web reference, in discovery order. May contain
    /// duplicates; the scheduler deduplicates.
    pub items: Vec<WorkItem>,
    /// References that failed to parse as URLs.
    pub skipped: usize,
}

/// Find every `url(...)` in `css`, resolve it against `css_url` and rewrite it
/// to a path relative to `css_local_path`, the stylesheet's own location under
/// the output root.
pub fn rewrite_stylesheet(css: &str, css_url: &Url, css_local_path: &str) -> StylesheetRewrite {
    let mut items = Vec::new();
    let mut skipped = 0;

    let rewritten = css_url_regex().replace_all(css, |caps: &Captures| {
        let original = caps[0].to_string();
        let (raw, quote) = match (caps.get(1), caps.get(2), caps.get(3)) {
            (Some(m), _, _) => (m.as_str(), "\""),
            (_, Some(m), _) => (m.as_str(), "'"),
            (_, _, Some(m)) => (m.as_str(), ""),
            _ => return original,
        };

        let raw = raw.trim();
        // Empty values and SVG fragment references (`url(#gradient)`) stay as they are.
        if raw.is_empty() || raw.starts_with('#') {
            return original;
        }

        let url = match resolver::resolve_reference(css_url, raw) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Skipping reference in {}: {}", css_url, e);
                skipped += 1;
                return original;
            }
        };
        if !resolver::is_fetchable(&url) {
            return original;
        }

        let fragment = resolver::fragment_suffix(&url);
        let item = WorkItem::new(url, ResourceKind::CssUrl);
        let relative = resolver::relative_to(css_local_path, &item.local_path);
        items.push(item);
        format!("url({quote}{relative}{fragment}{quote})")
    });

    StylesheetRewrite {
        css: rewritten.into_owned(),
        items,
        skipped,
    }
}
