use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// A single HTTP fetch that did not produce a usable body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
}

#[derive(Debug, Error)]
#[error("failed to write {path:?}: {source}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A reference found in a document that could not be turned into a URL.
#[derive(Debug, Error)]
#[error("invalid reference {raw:?}: {source}")]
pub struct InvalidReference {
    pub raw: String,
    #[source]
    pub source: url::ParseError,
}

/// Failure of a single asset download. Recovered: logged and dropped.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Failure that aborts the whole clone.
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] FetchError),
    #[error("invalid entry URL {url:?}: {source}")]
    InvalidEntryUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to fetch entry page {url}: {source}")]
    EntryFetch {
        url: Url,
        #[source]
        source: FetchError,
    },
    #[error("failed to write entry page: {0}")]
    EntryWrite(#[source] WriteError),
}
