use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use url::Url;

use crate::config::MirrorConfig;
use crate::error::{CloneError, WriteError};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::file_manager::FileManager;
use crate::resolver;
use crate::rewriter::Rewriter;
use crate::scheduler::{FailedAsset, Scheduler};

/// Progress of a single clone. `Failed` is only entered while the entry page
/// is being fetched or saved; asset failures never abort a clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneState {
    Init,
    FetchingEntryPage,
    ExtractingAndRewriting,
    Draining,
    Done,
    Failed,
}

/// Outcome of a successful clone. Missing assets are listed in `failed`; a
/// clone with failures is still a success.
#[derive(Debug, Clone, Serialize)]
pub struct CloneReport {
    pub entry_url: String,
    pub output_dir: PathBuf,
    pub entry_file: String,
    pub fetched: Vec<String>,
    pub failed: Vec<FailedAsset>,
    pub links_rewritten: usize,
    pub skipped_references: usize,
}

pub struct WebsiteMirror {
    config: MirrorConfig,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    file_manager: FileManager,
    state: CloneState,
}

impl WebsiteMirror {
    pub fn new(output_dir: &Path, config: MirrorConfig) -> Result<Self, CloneError> {
        let fetcher = HttpFetcher::new(&config).map_err(CloneError::Client)?;
        Ok(Self::with_fetcher(output_dir, config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(
        output_dir: &Path,
        config: MirrorConfig,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
    ) -> Self {
        Self {
            config,
            fetcher,
            file_manager: FileManager::new(output_dir),
            state: CloneState::Init,
        }
    }

    pub fn state(&self) -> CloneState {
        self.state
    }

    fn transition(&mut self, next: CloneState) {
        log::debug!("Clone state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: CloneError) -> CloneError {
        log::error!("Clone failed: {}", error);
        self.transition(CloneState::Failed);
        error
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} [{pos}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress_bar.enable_steady_tick(Duration::from_millis(120));
        progress_bar
    }

    /// Fetch `entry_url`, write it as the entry file with every reference
    /// rewritten, then download its assets until no work is left.
    pub async fn clone_site(&mut self, entry_url: &str) -> Result<CloneReport, CloneError> {
        let entry_file = self.config.entry_file.clone();
        log::info!("Cloning {} into {:?}", entry_url, self.file_manager.base_dir());
        log::info!("Max concurrent downloads: {}", self.config.max_concurrent);

        self.transition(CloneState::FetchingEntryPage);
        let entry = match Url::parse(entry_url) {
            Ok(url) => resolver::canonicalize(url),
            Err(source) => {
                return Err(self.fail(CloneError::InvalidEntryUrl {
                    url: entry_url.to_string(),
                    source,
                }))
            }
        };

        let fetched = match self.fetcher.fetch(entry.clone()).await {
            Ok(fetched) => fetched,
            Err(source) => return Err(self.fail(CloneError::EntryFetch { url: entry, source })),
        };
        if !fetched.looks_like_html() {
            log::warn!(
                "Entry page {} is served as {:?}, treating it as HTML anyway",
                entry,
                fetched.content_type
            );
        }

        self.transition(CloneState::ExtractingAndRewriting);
        let rewriter = Rewriter::new(entry.clone(), &entry_file);
        let page = match rewriter.rewrite_page(&fetched.text()) {
            Ok(page) => page,
            Err(source) => {
                let path = self.file_manager.path_for(&entry_file);
                return Err(self.fail(CloneError::EntryWrite(WriteError { path, source })));
            }
        };
        if let Err(e) = self
            .file_manager
            .save_file(&entry_file, page.html.as_bytes())
            .await
        {
            return Err(self.fail(CloneError::EntryWrite(e)));
        }

        let progress_bar = self.progress_bar();
        let scheduler = Scheduler::new(
            self.fetcher.clone(),
            self.file_manager.clone(),
            self.config.max_concurrent,
            progress_bar.clone(),
        );
        scheduler.mark_downloaded(&entry);
        scheduler.reserve_path(&entry_file);
        let discovered = page.items.len();
        let queued = page
            .items
            .into_iter()
            .map(|item| scheduler.enqueue(item))
            .filter(|&added| added)
            .count();
        log::info!(
            "Found {} asset reference(s), {} unique; rewrote {} link(s)",
            discovered,
            queued,
            page.links_rewritten
        );

        self.transition(CloneState::Draining);
        let drained = scheduler.drain().await;
        progress_bar.finish_with_message("All downloads completed");

        self.transition(CloneState::Done);
        log::info!(
            "Downloaded {} asset(s), {} failed, {} distinct URL(s) seen",
            drained.fetched.len(),
            drained.failed.len(),
            scheduler.known_urls()
        );

        Ok(CloneReport {
            entry_url: entry.to_string(),
            output_dir: self.file_manager.base_dir().to_path_buf(),
            entry_file,
            fetched: drained.fetched,
            failed: drained.failed,
            links_rewritten: page.links_rewritten,
            skipped_references: page.skipped,
        })
    }
}

/// Clone `entry_url` into `output_dir` with the default configuration.
pub async fn clone_site(entry_url: &str, output_dir: &Path) -> Result<CloneReport, CloneError> {
    WebsiteMirror::new(output_dir, MirrorConfig::default())?
        .clone_site(entry_url)
        .await
}
