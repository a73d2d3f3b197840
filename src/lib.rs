pub mod cli;
pub mod config;
pub mod css;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod file_manager;
pub mod html_parser;
pub mod resolver;
pub mod rewriter;
pub mod scheduler;

// Re-export main types for convenience
pub use cli::MirrorCommand;
pub use config::MirrorConfig;
pub use downloader::{clone_site, CloneReport, CloneState, WebsiteMirror};
pub use error::{AssetError, CloneError, FetchError, InvalidReference, WriteError};
pub use fetcher::{Fetched, Fetcher, HttpFetcher};
pub use file_manager::FileManager;
pub use html_parser::{PageDocument, ResourceKind, ResourceReference};
pub use rewriter::{PageRewrite, Rewriter};
pub use scheduler::{DrainReport, FailedAsset, Scheduler, WorkItem};
