use std::time::Duration;

/// Looks like a regular desktop browser so servers hand out the same markup
/// a visitor would get.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_MAX_CONCURRENT: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_ENTRY_FILE: &str = "index.html";

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Ceiling on in-flight asset fetches.
    pub max_concurrent: usize,
    /// Per-request timeout, the only timeout in the pipeline.
    pub timeout: Duration,
    pub user_agent: String,
    /// File name the entry page is always written to, at the output root.
    pub entry_file: String,
    pub show_progress: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            show_progress: false,
        }
    }
}

impl MirrorConfig {
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        // A ceiling of zero would never admit anything.
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}
