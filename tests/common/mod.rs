//! An in-memory web for driving the pipeline without a network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use page_mirror::{FetchError, Fetched, Fetcher};
use reqwest::StatusCode;
use url::Url;

enum Route {
    Body { bytes: Vec<u8>, content_type: String },
    Status(StatusCode),
}

#[derive(Default)]
struct Inner {
    routes: Mutex<HashMap<String, Route>>,
    hits: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Mutex<Duration>,
}

#[derive(Clone, Default)]
pub struct FakeWeb {
    inner: Arc<Inner>,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every response takes at least `delay`, so fetches overlap.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.inner.delay.lock().unwrap() = delay;
        self
    }

    pub fn serve(&self, url: &str, content_type: &str, body: &[u8]) -> &Self {
        self.inner.routes.lock().unwrap().insert(
            url.to_string(),
            Route::Body {
                bytes: body.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        self
    }

    pub fn html(&self, url: &str, body: &str) -> &Self {
        self.serve(url, "text/html; charset=utf-8", body.as_bytes())
    }

    pub fn css(&self, url: &str, body: &str) -> &Self {
        self.serve(url, "text/css", body.as_bytes())
    }

    pub fn png(&self, url: &str, body: &[u8]) -> &Self {
        self.serve(url, "image/png", body)
    }

    pub fn status(&self, url: &str, status: StatusCode) -> &Self {
        self.inner
            .routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Status(status));
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.inner.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.inner.hits.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

impl Fetcher for FakeWeb {
    fn fetch(&self, url: Url) -> BoxFuture<'static, Result<Fetched, FetchError>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let key = url.to_string();
            *inner.hits.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

            let now = inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            inner.peak.fetch_max(now, Ordering::SeqCst);

            let delay = *inner.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            } else {
                tokio::task::yield_now().await;
            }
            inner.in_flight.fetch_sub(1, Ordering::SeqCst);

            match inner.routes.lock().unwrap().get(&key) {
                Some(Route::Body {
                    bytes,
                    content_type,
                }) => Ok(Fetched {
                    bytes: bytes.clone(),
                    content_type: Some(content_type.clone()),
                }),
                Some(Route::Status(status)) => Err(FetchError::Status(*status)),
                None => Err(FetchError::Status(StatusCode::NOT_FOUND)),
            }
        })
    }
}
