use std::sync::OnceLock;

use encoding_rs::{Encoding, UTF_8};
use futures::future::BoxFuture;
use regex::bytes::Regex;
use reqwest::{Client, ClientBuilder};
use url::Url;

use crate::config::MirrorConfig;
use crate::error::FetchError;

/// A successful (2xx) response body.
#[derive(Debug, Clone, Default)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

fn meta_charset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i-u)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#)
            .expect("meta charset regex")
    })
}

/// Bytes of an HTML body searched for a `<meta charset>` declaration.
const META_PRESCAN_BYTES: usize = 1024;

impl Fetched {
    /// Character encoding declared for the body: the `charset` parameter of
    /// the Content-Type, then a `<meta>` declaration for HTML, then UTF-8.
    pub fn declared_encoding(&self) -> &'static Encoding {
        let from_header = self
            .mime()
            .and_then(|m| m.get_param(mime::CHARSET).map(|c| c.as_str().to_string()))
            .and_then(|label| Encoding::for_label(label.as_bytes()));
        if let Some(encoding) = from_header {
            return encoding;
        }

        if self.looks_like_html() {
            let head = &self.bytes[..self.bytes.len().min(META_PRESCAN_BYTES)];
            if let Some(encoding) = meta_charset_regex()
                .captures(head)
                .and_then(|caps| Encoding::for_label(&caps[1]))
            {
                return encoding;
            }
        }

        UTF_8
    }

    /// The body decoded as text, for HTML and CSS, along with the encoding
    /// actually used. A byte order mark wins over any declaration.
    pub fn decode(&self) -> (String, &'static Encoding) {
        let (text, encoding, had_errors) = self.declared_encoding().decode(&self.bytes);
        if had_errors {
            log::debug!("Body is not valid {}, malformed bytes replaced", encoding.name());
        }
        (text.into_owned(), encoding)
    }

    pub fn text(&self) -> String {
        self.decode().0
    }

    pub fn mime(&self) -> Option<mime::Mime> {
        self.content_type.as_deref().and_then(|ct| ct.parse().ok())
    }

    /// True when the server says HTML, or says nothing at all.
    pub fn looks_like_html(&self) -> bool {
        match self.mime() {
            Some(m) => m.type_() == mime::TEXT && m.subtype() == mime::HTML,
            None => true,
        }
    }
}

/// Network side of the pipeline: one GET per call.
#[cfg_attr(test, mockall::automock)]
pub trait Fetcher {
    fn fetch(&self, url: Url) -> BoxFuture<'static, Result<Fetched, FetchError>>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &MirrorConfig) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: Url) -> BoxFuture<'static, Result<Fetched, FetchError>> {
        let client = self.client.clone();
        Box::pin(async move {
            log::debug!("GET {}", url);
            let response = client.get(url).send().await?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status));
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let bytes = response.bytes().await?.to_vec();

            Ok(Fetched {
                bytes,
                content_type,
            })
        })
    }
}
