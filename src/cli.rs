use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{MirrorConfig, DEFAULT_USER_AGENT};

#[derive(Parser, Debug)]
#[command(
    name = "page-mirror",
    about = "Clone a single web page and its assets for offline viewing",
    version,
    long_about = "Downloads one HTML page together with the stylesheets, scripts and images it references (and the assets those stylesheets reference), rewriting every reference so the copy can be browsed without a network connection."
)]
pub struct MirrorCommand {
    /// The URL of the page to clone
    #[arg(required = true)]
    pub url: String,

    /// Output directory for the cloned page
    #[arg(short, long, default_value = "./mirrored_site")]
    pub output_dir: PathBuf,

    /// Maximum concurrent asset downloads
    #[arg(short = 'c', long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_concurrent: u32,

    /// Timeout for each request in seconds
    #[arg(long, default_value = "60")]
    pub timeout: u64,

    /// User agent string to use for requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Print the clone report as JSON
    #[arg(long)]
    pub json: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl MirrorCommand {
    pub fn to_config(&self) -> MirrorConfig {
        MirrorConfig {
            user_agent: self.user_agent.clone(),
            ..MirrorConfig::default()
        }
        .with_max_concurrent(self.max_concurrent as usize)
        .with_timeout(Duration::from_secs(self.timeout))
        .with_progress(!self.quiet && !self.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_args() {
        let args = MirrorCommand::try_parse_from([
            "page-mirror",
            "https://example.com",
            "-o", "./output",
        ]).unwrap();

        assert_eq!(args.url, "https://example.com");
        assert_eq!(args.output_dir, PathBuf::from("./output"));
        assert_eq!(args.max_concurrent, 5);
        assert_eq!(args.timeout, 60);
        assert_eq!(args.user_agent, DEFAULT_USER_AGENT);
        assert!(!args.json);
        assert!(!args.quiet);
    }

    #[test]
    fn test_parse_all_args() {
        let args = MirrorCommand::try_parse_from([
            "page-mirror",
            "https://example.com",
            "-o", "./output",
            "-c", "20",
            "--timeout", "10",
            "--user-agent", "TestAgent/1.0",
            "--json",
            "--quiet",
        ]).unwrap();

        assert_eq!(args.max_concurrent, 20);
        assert_eq!(args.timeout, 10);
        assert_eq!(args.user_agent, "TestAgent/1.0");
        assert!(args.json);
        assert!(args.quiet);
    }

    #[test]
    fn test_to_config() {
        let args = MirrorCommand::try_parse_from([
            "page-mirror",
            "https://example.com",
            "-c", "3",
            "--timeout", "15",
        ]).unwrap();

        let config = args.to_config();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.entry_file, "index.html");
        assert!(config.show_progress);
    }

    #[test]
    fn test_json_output_hides_progress() {
        let args = MirrorCommand::try_parse_from(["page-mirror", "https://example.com", "--json"])
            .unwrap();
        assert!(!args.to_config().show_progress);
    }

    #[test]
    fn test_parse_missing_url() {
        let result = MirrorCommand::try_parse_from(["page-mirror", "-o", "./output"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_invalid_concurrent() {
        let result = MirrorCommand::try_parse_from([
            "page-mirror",
            "https://example.com",
            "-c", "0",
        ]);
        assert!(result.is_err());
    }
}
