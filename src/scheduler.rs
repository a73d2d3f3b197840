//! Bounded-concurrency download queue.
//!
//! The set of known URLs and the FIFO queue sit behind one mutex so that the
//! "seen before?" check and the insert are a single step. Admission is gated
//! by a semaphore with one permit per allowed in-flight fetch, and draining
//! waits on task completion instead of polling.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use encoding_rs::UTF_8;
use indicatif::ProgressBar;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use crate::css;
use crate::error::AssetError;
use crate::fetcher::{Fetched, Fetcher};
use crate::file_manager::FileManager;
use crate::html_parser::ResourceKind;
use crate::resolver;

/// A queued asset download. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Canonical URL, fragment removed.
    pub url: Url,
    pub local_path: String,
    pub kind: ResourceKind,
}

impl WorkItem {
    pub fn new(url: Url, kind: ResourceKind) -> Self {
        let url = resolver::canonicalize(url);
        let local_path = resolver::local_path(&url);
        Self {
            url,
            local_path,
            kind,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedAsset {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Default, Clone)]
pub struct DrainReport {
    /// URLs fetched and written, in completion order.
    pub fetched: Vec<String>,
    pub failed: Vec<FailedAsset>,
}

#[derive(Default)]
struct QueueState {
    downloaded: HashSet<String>,
    /// Local paths no download may write to.
    reserved: HashSet<String>,
    queue: VecDeque<WorkItem>,
}

/// Cheap to clone; every clone shares the same queue and dedup set.
#[derive(Clone)]
pub struct Scheduler {
    state: Arc<Mutex<QueueState>>,
    semaphore: Arc<Semaphore>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    file_manager: FileManager,
    progress: ProgressBar,
}

impl Scheduler {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        file_manager: FileManager,
        max_concurrent: usize,
        progress: ProgressBar,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            fetcher,
            file_manager,
            progress,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `url` as handled without queueing it. Returns false if it was
    /// already known.
    pub fn mark_downloaded(&self, url: &Url) -> bool {
        let key = resolver::canonicalize(url.clone()).to_string();
        self.lock().downloaded.insert(key)
    }

    /// Keep downloads away from `local_path`, e.g. the saved entry page.
    pub fn reserve_path(&self, local_path: &str) {
        self.lock().reserved.insert(local_path.to_string());
    }

    /// Queue `item` unless its URL has been seen before or its local path is
    /// reserved. The URL is recorded now, not when the fetch completes.
    pub fn enqueue(&self, item: WorkItem) -> bool {
        let mut state = self.lock();
        if state.reserved.contains(&item.local_path) {
            log::warn!(
                "Not downloading {}: {} is already taken by the entry page",
                item.url,
                item.local_path
            );
            return false;
        }
        if !state.downloaded.insert(item.url.to_string()) {
            return false;
        }
        log::debug!("Queued {} {}", item.kind, item.url);
        state.queue.push_back(item);
        true
    }

    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Number of distinct URLs fetched or queued so far, the entry page included.
    pub fn known_urls(&self) -> usize {
        self.lock().downloaded.len()
    }

    /// Run until the queue is empty and nothing is in flight.
    ///
    /// Stylesheets fetched along the way can queue more work, so the empty
    /// check is only trusted once every in-flight task has finished.
    pub async fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        let mut in_flight = JoinSet::new();

        loop {
            let next = self.lock().queue.pop_front();
            match next {
                Some(item) => {
                    let permit = match self.semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            log::error!("Admission closed, dropping remaining work: {}", e);
                            break;
                        }
                    };
                    let scheduler = self.clone();
                    in_flight.spawn(async move {
                        let url = item.url.to_string();
                        let result = scheduler.process(item).await;
                        drop(permit);
                        (url, result)
                    });
                }
                None => match in_flight.join_next().await {
                    Some(Ok((url, Ok(())))) => report.fetched.push(url),
                    Some(Ok((url, Err(e)))) => {
                        log::warn!("Failed to download {}: {}", url, e);
                        report.failed.push(FailedAsset {
                            url,
                            reason: e.to_string(),
                        });
                    }
                    Some(Err(e)) => log::warn!("Download task aborted: {}", e),
                    None => break,
                },
            }
        }

        report
    }

    async fn process(&self, item: WorkItem) -> Result<(), AssetError> {
        self.progress.set_message(format!("Downloading: {}", item.url));

        let fetched = self.fetcher.fetch(item.url.clone()).await?;
        if item.kind == ResourceKind::Stylesheet {
            self.save_stylesheet(&item, &fetched).await?;
        } else {
            self.file_manager.save_file(&item.local_path, &fetched.bytes).await?;
        }

        self.progress.inc(1);
        log::info!("Downloaded {} -> {}", item.url, item.local_path);
        Ok(())
    }

    /// Write a stylesheet with its `url()` references rewritten, then queue
    /// what it references. Rewritten stylesheets are stored as UTF-8.
    async fn save_stylesheet(&self, item: &WorkItem, fetched: &Fetched) -> Result<(), AssetError> {
        let (css, encoding) = fetched.decode();
        let rewrite = css::rewrite_stylesheet(&css, &item.url, &item.local_path);

        if rewrite.css == css && encoding == UTF_8 {
            self.file_manager.save_file(&item.local_path, &fetched.bytes).await?;
        } else {
            let out = css::declare_utf8(&rewrite.css);
            self.file_manager.save_file(&item.local_path, out.as_bytes()).await?;
        }

        let queued = rewrite
            .items
            .into_iter()
            .map(|found| self.enqueue(found))
            .filter(|&added| added)
            .count();
        if queued > 0 {
            log::debug!("{} queued {} more asset(s)", item.url, queued);
        }
        Ok(())
    }
}
