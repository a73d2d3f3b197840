//! Points every reference in the entry page at its local copy.

use url::Url;

use crate::css;
use crate::html_parser::{PageDocument, ResourceReference};
use crate::resolver;
use crate::scheduler::WorkItem;

#[derive(Debug, Default)]
pub struct PageRewrite {
    pub html: String,
    /// Assets to download, in discovery order, possibly with duplicates.
    pub items: Vec<WorkItem>,
    pub links_rewritten: usize,
    /// References that could not be parsed as URLs.
    pub skipped: usize,
}

pub struct Rewriter {
    page_url: Url,
    entry_file: String,
}

impl Rewriter {
    /// `page_url` is the canonical URL of the entry page; `entry_file` is where
    /// it will be written, at the output root.
    pub fn new(page_url: Url, entry_file: &str) -> Self {
        Self {
            page_url: resolver::canonicalize(page_url),
            entry_file: entry_file.to_string(),
        }
    }

    /// Rewrite assets, same-origin hyperlinks and inline CSS of a page.
    ///
    /// Hyperlinks are rewritten but never queued. Other-origin hyperlinks and
    /// non-web URLs are left untouched. The result is UTF-8 and says so.
    pub fn rewrite_page(&self, html: &str) -> std::io::Result<PageRewrite> {
        let mut doc = PageDocument::parse(html);
        let mut out = PageRewrite::default();

        for reference in doc.asset_references() {
            let Some(url) = self.resolve(&reference, &mut out.skipped) else {
                continue;
            };
            if !resolver::is_fetchable(&url) {
                continue;
            }
            let fragment = resolver::fragment_suffix(&url);
            let item = WorkItem::new(url, reference.kind);
            if item.url == self.page_url {
                reference.rewrite(&format!("{}{}", resolver::root_relative(&self.entry_file), fragment));
                continue;
            }
            if item.local_path == self.entry_file {
                log::warn!(
                    "Leaving {} remote: its local path {} is taken by the entry page",
                    item.url,
                    item.local_path
                );
                continue;
            }
            reference.rewrite(&format!("{}{}", resolver::root_relative(&item.local_path), fragment));
            log::debug!("{} {} -> {}", item.kind, item.url, item.local_path);
            out.items.push(item);
        }

        for link in doc.hyperlinks() {
            let Some(url) = self.resolve(&link, &mut out.skipped) else {
                continue;
            };
            if !resolver::is_fetchable(&url) || url.origin() != self.page_url.origin() {
                continue;
            }
            link.rewrite(&self.link_target(&url));
            out.links_rewritten += 1;
        }

        for style in doc.inline_styles() {
            let rewritten = css::rewrite_stylesheet(&style.css, &self.page_url, &self.entry_file);
            if rewritten.css != style.css {
                style.replace(&rewritten.css);
            }
            out.items.extend(rewritten.items);
            out.skipped += rewritten.skipped;
        }

        doc.declare_utf8();
        out.html = doc.to_html()?;
        Ok(out)
    }

    fn resolve(&self, reference: &ResourceReference, skipped: &mut usize) -> Option<Url> {
        match resolver::resolve_reference(&self.page_url, &reference.raw_url) {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("Skipping {} reference: {}", reference.kind, e);
                *skipped += 1;
                None
            }
        }
    }

    fn link_target(&self, url: &Url) -> String {
        let fragment = resolver::fragment_suffix(url);
        let canonical = resolver::canonicalize(url.clone());
        // A link back to the entry page points at the file it was saved as.
        let target = if canonical == self.page_url {
            self.entry_file.clone()
        } else {
            resolver::local_path(&canonical)
        };
        format!("{}{}", resolver::root_relative(&target), fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html_parser::ResourceKind;

    fn rewriter(url: &str) -> Rewriter {
        Rewriter::new(Url::parse(url).unwrap(), "index.html")
    }

    #[test]
    fn test_assets_are_rewritten_and_queued() {
        let html = r#"<link rel="stylesheet" href="/s.css"><img src="pic.png"><script src="https://cdn.test/lib/app.js"></script>"#;
        let out = rewriter("https://ex.test/").rewrite_page(html).unwrap();

        assert!(out.html.contains(r#"href="./s.css""#), "{}", out.html);
        assert!(out.html.contains(r#"src="./pic.png""#), "{}", out.html);
        assert!(out.html.contains(r#"src="./lib/app.js""#), "{}", out.html);

        let queued: Vec<(&str, ResourceKind)> =
            out.items.iter().map(|i| (i.url.as_str(), i.kind)).collect();
        assert_eq!(
            queued,
            vec![
                ("https://ex.test/s.css", ResourceKind::Stylesheet),
                ("https://ex.test/pic.png", ResourceKind::Image),
                ("https://cdn.test/lib/app.js", ResourceKind::Script),
            ]
        );
    }

    #[test]
    fn test_relative_references_resolve_against_page() {
        let html = r#"<img src="img/a.png">"#;
        let out = rewriter("https://ex.test/blog/post.html").rewrite_page(html).unwrap();
        assert_eq!(out.items[0].url.as_str(), "https://ex.test/blog/img/a.png");
        assert!(out.html.contains(r#"src="./blog/img/a.png""#), "{}", out.html);
    }

    #[test]
    fn test_same_origin_links_are_rewritten_not_queued() {
        let html = r##"
            <a href="/about">About</a>
            <a href="/docs/#install">Docs</a>
            <a href="/">Home</a>
            <a href="https://other.test/x">Elsewhere</a>
            <a href="#top">Top</a>
            <a href="mailto:a@ex.test">Mail</a>
        "##;
        let out = rewriter("https://ex.test/").rewrite_page(html).unwrap();

        assert!(out.items.is_empty());
        assert_eq!(out.links_rewritten, 3);
        assert!(out.html.contains(r#"href="./about.html""#), "{}", out.html);
        assert!(out.html.contains(r#"href="./docs/index.html#install""#), "{}", out.html);
        assert!(out.html.contains(r#"href="./index.html""#), "{}", out.html);
        assert!(out.html.contains(r#"href="https://other.test/x""#), "{}", out.html);
        assert!(out.html.contains(r##"href="#top""##), "{}", out.html);
        assert!(out.html.contains(r#"href="mailto:a@ex.test""#), "{}", out.html);
    }

    #[test]
    fn test_link_to_non_root_entry_page_points_at_entry_file() {
        let html = r#"<a href="page">Self</a>"#;
        let out = rewriter("https://ex.test/docs/page").rewrite_page(html).unwrap();
        assert!(out.html.contains(r#"href="./index.html""#), "{}", out.html);
    }

    #[test]
    fn test_assets_mapping_onto_entry_file_stay_remote() {
        let html = r#"<img src="/"><link rel="icon" href="/index.html"><img src="page"><img src="ok.png">"#;
        let out = rewriter("https://ex.test/docs/page").rewrite_page(html).unwrap();

        let urls: Vec<&str> = out.items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://ex.test/docs/ok.png"]);
        assert!(out.html.contains(r#"<img src="/">"#), "{}", out.html);
        assert!(out.html.contains(r#"href="/index.html""#), "{}", out.html);
        // The entry page itself is already on disk as the entry file.
        assert!(out.html.contains(r#"<img src="./index.html">"#), "{}", out.html);
        assert!(out.html.contains(r#"src="./docs/ok.png""#), "{}", out.html);
    }

    #[test]
    fn test_output_declares_utf8() {
        let html = r#"<html><head><meta charset="iso-8859-1"></head><body><p>café</p></body></html>"#;
        let out = rewriter("https://ex.test/").rewrite_page(html).unwrap();
        assert!(out.html.contains(r#"<meta charset="utf-8">"#), "{}", out.html);
        assert!(out.html.contains("<p>café</p>"), "{}", out.html);
    }

    #[test]
    fn test_invalid_reference_is_skipped_and_rest_continue() {
        let html = r#"<img src="http://[oops/a.png"><img src="b.png">"#;
        let out = rewriter("https://ex.test/").rewrite_page(html).unwrap();
        assert_eq!(out.skipped, 1);
        assert_eq!(out.items.len(), 1);
        assert!(out.html.contains(r#"src="http://[oops/a.png""#), "{}", out.html);
        assert!(out.html.contains(r#"src="./b.png""#), "{}", out.html);
    }

    #[test]
    fn test_data_urls_are_left_alone() {
        let html = r#"<img src="data:image/gif;base64,R0lGOD==">"#;
        let out = rewriter("https://ex.test/").rewrite_page(html).unwrap();
        assert!(out.items.is_empty());
        assert!(out.html.contains("data:image/gif;base64,R0lGOD=="));
    }

    #[test]
    fn test_srcset_candidates_keep_descriptors() {
        let html = r#"<img srcset="/s.jpg 480w, /l.jpg 1080w" src="/l.jpg">"#;
        let out = rewriter("https://ex.test/").rewrite_page(html).unwrap();
        assert!(out.html.contains(r#"srcset="./s.jpg 480w, ./l.jpg 1080w""#), "{}", out.html);
        assert_eq!(out.items.len(), 3);
    }

    #[test]
    fn test_inline_css_is_rewritten_relative_to_entry_file() {
        let html = r#"<style>.hero { background: url(/img/hero.jpg) }</style><p style="background:url('dots.png')"></p>"#;
        let out = rewriter("https://ex.test/").rewrite_page(html).unwrap();
        assert!(out.html.contains("url(img/hero.jpg)"), "{}", out.html);
        assert!(out.html.contains("url('dots.png')"), "{}", out.html);
        let urls: Vec<&str> = out.items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://ex.test/img/hero.jpg", "https://ex.test/dots.png"]);
        assert!(out.items.iter().all(|i| i.kind == ResourceKind::CssUrl));
    }

    #[test]
    fn test_rewriting_twice_is_stable() {
        let html = r#"<link rel="stylesheet" href="/s.css"><img src="pic.png"><a href="/about">a</a>"#;
        let rewriter = rewriter("https://ex.test/");
        let first = rewriter.rewrite_page(html).unwrap();
        let second = rewriter.rewrite_page(&first.html).unwrap();
        assert_eq!(first.html, second.html);
        assert_eq!(first.items, second.items);
    }
}
