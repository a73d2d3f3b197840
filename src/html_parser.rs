use std::fmt;

use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{create_element, NodeOrText, TreeSink};
use html5ever::{parse_document, Attribute, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Stylesheet,
    Script,
    Image,
    Hyperlink,
    CssUrl,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Stylesheet => write!(f, "stylesheet"),
            ResourceKind::Script => write!(f, "script"),
            ResourceKind::Image => write!(f, "image"),
            ResourceKind::Hyperlink => write!(f, "hyperlink"),
            ResourceKind::CssUrl => write!(f, "css url"),
        }
    }
}

/// Where a reference lives in the document: an element attribute, or one
/// candidate inside a `srcset` list.
#[derive(Clone)]
pub struct SourceLocation {
    node: Handle,
    attribute: &'static str,
    candidate: Option<usize>,
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceLocation")
            .field("element", &element_name(&self.node))
            .field("attribute", &self.attribute)
            .field("candidate", &self.candidate)
            .finish()
    }
}

/// A URL-bearing attribute value found during one extraction pass.
#[derive(Debug, Clone)]
pub struct ResourceReference {
    pub location: SourceLocation,
    pub kind: ResourceKind,
    pub raw_url: String,
}

impl ResourceReference {
    /// Replace the referenced URL in place. For `srcset` only this reference's
    /// candidate changes; its descriptor is kept.
    pub fn rewrite(&self, new_url: &str) {
        let loc = &self.location;
        let value = match loc.candidate {
            Some(index) => {
                let current = attr_value(&loc.node, loc.attribute).unwrap_or_default();
                replace_srcset_candidate(&current, index, new_url)
            }
            None => new_url.to_string(),
        };
        set_attr_value(&loc.node, loc.attribute, &value);
    }
}

/// CSS embedded in the page, either a `style` attribute or a `<style>` element.
#[derive(Clone)]
pub struct InlineStyle {
    node: Handle,
    is_attribute: bool,
    pub css: String,
}

impl InlineStyle {
    pub fn replace(&self, css: &str) {
        if self.is_attribute {
            set_attr_value(&self.node, "style", css);
            return;
        }

        let children = self.node.children.borrow();
        let mut first = true;
        for child in children.iter() {
            if let NodeData::Text { ref contents } = child.data {
                let text = if first { css } else { "" };
                *contents.borrow_mut() = StrTendril::from_slice(text);
                first = false;
            }
        }
    }
}

/// A parsed HTML page whose attributes can be rewritten before serializing it again.
pub struct PageDocument {
    dom: RcDom,
}

impl PageDocument {
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        Self { dom }
    }

    pub fn to_html(&self) -> std::io::Result<String> {
        let mut out = Vec::new();
        let document: SerializableHandle = self.dom.document.clone().into();
        serialize(&mut out, &document, SerializeOpts::default())?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Point every charset declaration at UTF-8, the encoding `to_html`
    /// produces. A page that declares nothing gets `<meta charset="utf-8">`
    /// at the top of its `<head>`.
    pub fn declare_utf8(&mut self) {
        let mut declared = false;
        let mut head = None;

        for node in self.elements() {
            match element_name(&node).as_deref() {
                Some("head") if head.is_none() => head = Some(node.clone()),
                Some("meta") => {
                    if attr_value(&node, "charset").is_some() {
                        set_attr_value(&node, "charset", "utf-8");
                        declared = true;
                    } else if attr_value(&node, "http-equiv")
                        .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-type"))
                    {
                        set_attr_value(&node, "content", "text/html; charset=utf-8");
                        declared = true;
                    }
                }
                _ => {}
            }
        }

        if declared {
            return;
        }
        let Some(head) = head else {
            return;
        };
        let ns = match head.data {
            NodeData::Element { ref name, .. } => name.ns.clone(),
            _ => return,
        };
        let charset = Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from("charset")),
            value: StrTendril::from_slice("utf-8"),
        };
        let meta = create_element(
            &mut self.dom,
            QualName::new(None, ns, LocalName::from("meta")),
            vec![charset],
        );
        let first = head.children.borrow().first().cloned();
        match first {
            Some(first) => self.dom.append_before_sibling(&first, NodeOrText::AppendNode(meta)),
            None => self.dom.append(&head, NodeOrText::AppendNode(meta)),
        }
    }

    /// Stylesheets, icons, scripts, images and every `srcset` candidate, in
    /// document order.
    pub fn asset_references(&self) -> Vec<ResourceReference> {
        let mut resources = Vec::new();

        for node in self.elements() {
            let Some(tag) = element_name(&node) else {
                continue;
            };
            match tag.as_str() {
                "link" => {
                    let rel = attr_value(&node, "rel").unwrap_or_default().to_ascii_lowercase();
                    if rel.split_ascii_whitespace().any(|t| t == "stylesheet") {
                        push_attr(&mut resources, &node, "href", ResourceKind::Stylesheet);
                    } else if rel.split_ascii_whitespace().any(|t| t.contains("icon")) {
                        push_attr(&mut resources, &node, "href", ResourceKind::Image);
                    }
                }
                "script" => push_attr(&mut resources, &node, "src", ResourceKind::Script),
                "img" | "source" => {
                    push_attr(&mut resources, &node, "src", ResourceKind::Image);
                    if let Some(srcset) = attr_value(&node, "srcset") {
                        for (index, url) in parse_srcset_urls(&srcset).into_iter().enumerate() {
                            resources.push(ResourceReference {
                                location: SourceLocation {
                                    node: node.clone(),
                                    attribute: "srcset",
                                    candidate: Some(index),
                                },
                                kind: ResourceKind::Image,
                                raw_url: url,
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        resources
    }

    /// `<a>` and `<area>` targets, minus in-page anchors, `mailto:` and `tel:`.
    pub fn hyperlinks(&self) -> Vec<ResourceReference> {
        let mut links = Vec::new();

        for node in self.elements() {
            if !matches!(element_name(&node).as_deref(), Some("a") | Some("area")) {
                continue;
            }
            let Some(href) = attr_value(&node, "href") else {
                continue;
            };
            let trimmed = href.trim();
            let lower = trimmed.to_ascii_lowercase();
            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || lower.starts_with("mailto:")
                || lower.starts_with("tel:")
            {
                continue;
            }
            links.push(ResourceReference {
                location: SourceLocation {
                    node: node.clone(),
                    attribute: "href",
                    candidate: None,
                },
                kind: ResourceKind::Hyperlink,
                raw_url: href,
            });
        }

        links
    }

    pub fn inline_styles(&self) -> Vec<InlineStyle> {
        let mut styles = Vec::new();

        for node in self.elements() {
            if let Some(css) = attr_value(&node, "style") {
                styles.push(InlineStyle {
                    node: node.clone(),
                    is_attribute: true,
                    css,
                });
            }
            if element_name(&node).as_deref() == Some("style") {
                let css = text_content(&node);
                if !css.is_empty() {
                    styles.push(InlineStyle {
                        node: node.clone(),
                        is_attribute: false,
                        css,
                    });
                }
            }
        }

        styles
    }

    fn elements(&self) -> Vec<Handle> {
        let mut out = Vec::new();
        let mut stack = vec![self.dom.document.clone()];
        while let Some(node) = stack.pop() {
            if let NodeData::Element { .. } = node.data {
                out.push(node.clone());
            }
            for child in node.children.borrow().iter().rev() {
                stack.push(child.clone());
            }
        }
        out
    }
}

/// URLs of a `srcset` list, without width/density descriptors.
pub fn parse_srcset_urls(srcset: &str) -> Vec<String> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

fn replace_srcset_candidate(srcset: &str, index: usize, new_url: &str) -> String {
    srcset
        .split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .enumerate()
        .map(|(i, candidate)| {
            let mut parts = candidate.splitn(2, char::is_whitespace);
            let url = parts.next().unwrap_or_default();
            let descriptor = parts.next().map(str::trim).unwrap_or_default();
            let url = if i == index { new_url } else { url };
            if descriptor.is_empty() {
                url.to_string()
            } else {
                format!("{} {}", url, descriptor)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_attr(
    resources: &mut Vec<ResourceReference>,
    node: &Handle,
    attribute: &'static str,
    kind: ResourceKind,
) {
    if let Some(raw_url) = attr_value(node, attribute) {
        if raw_url.trim().is_empty() {
            return;
        }
        resources.push(ResourceReference {
            location: SourceLocation {
                node: node.clone(),
                attribute,
                candidate: None,
            },
            kind,
            raw_url,
        });
    }
}

fn element_name(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attr_value(node: &Handle, attribute: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attribute)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn set_attr_value(node: &Handle, attribute: &str, value: &str) {
    if let NodeData::Element { ref attrs, .. } = node.data {
        if let Some(attr) = attrs
            .borrow_mut()
            .iter_mut()
            .find(|a| &*a.name.local == attribute)
        {
            attr.value = StrTendril::from_slice(value);
        }
    }
}

fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    for child in node.children.borrow().iter() {
        if let NodeData::Text { ref contents } = child.data {
            text.push_str(&contents.borrow());
        }
    }
    text
}
