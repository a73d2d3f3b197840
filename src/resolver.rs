//! Mapping from remote URLs to the on-disk layout of a clone.
//!
//! Everything here is pure: the same URL always yields the same path and no
//! function touches the filesystem or the network.

use std::path::{Component, Path};

use url::Url;

use crate::error::InvalidReference;

/// File name used when a URL path names a directory.
pub const DEFAULT_DOCUMENT: &str = "index.html";
/// Extension appended to extensionless names.
pub const DEFAULT_EXTENSION: &str = "html";

/// Map an absolute URL to a relative path under the output root.
///
/// Only the path component is used. Query strings and fragments are dropped,
/// so `/a.png?v=1` and `/a.png?v=2` land on the same file and the last
/// write wins.
pub fn local_path(url: &Url) -> String {
    let raw = url.path();
    let mut path = raw.strip_prefix('/').unwrap_or(raw).to_string();

    if path.is_empty() || path.ends_with('/') {
        path.push_str(DEFAULT_DOCUMENT);
        return path;
    }

    let name = path.rsplit('/').next().unwrap_or(&path);
    if Path::new(name).extension().is_none() {
        path.push('.');
        path.push_str(DEFAULT_EXTENSION);
    }

    path
}

/// The dedup key for a URL: the same URL without its fragment.
pub fn canonicalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// Resolve a raw attribute or `url()` value against the document it came from.
pub fn resolve_reference(base: &Url, raw: &str) -> Result<Url, InvalidReference> {
    base.join(raw.trim()).map_err(|source| InvalidReference {
        raw: raw.to_string(),
        source,
    })
}

/// `#fragment` of `url`, or an empty string, for re-attaching to a rewritten
/// reference.
pub fn fragment_suffix(url: &Url) -> String {
    url.fragment().map(|f| format!("#{}", f)).unwrap_or_default()
}

/// Only plain web URLs are ever downloaded; `data:`, `javascript:`, `blob:`
/// and friends are left alone.
pub fn is_fetchable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Reference to `target` from a document stored at the output root.
pub fn root_relative(target: &str) -> String {
    format!("./{}", target)
}

/// Reference to `target` from a file stored at `from_file`, both given as
/// paths relative to the output root.
pub fn relative_to(from_file: &str, target: &str) -> String {
    let base = Path::new(from_file).parent().unwrap_or_else(|| Path::new(""));
    match pathdiff::diff_paths(target, base) {
        Some(diff) => diff
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        None => target.to_string(),
    }
}
