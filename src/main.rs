use anyhow::Result;
use clap::Parser;
use colored::*;

use page_mirror::{MirrorCommand, WebsiteMirror};

#[tokio::main]
async fn main() -> Result<()> {
    let args = MirrorCommand::parse();

    let default_filter = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut mirror = WebsiteMirror::new(&args.output_dir, args.to_config())?;
    let report = mirror.clone_site(&args.url).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "✅ Cloned {} into {}",
        report.entry_url.blue(),
        report.output_dir.join(&report.entry_file).display()
    );
    println!("📊 Assets downloaded: {}", report.fetched.len());
    if !report.failed.is_empty() {
        println!(
            "{}",
            format!("⚠️  {} asset(s) could not be downloaded:", report.failed.len()).yellow()
        );
        for failed in &report.failed {
            println!("   {} ({})", failed.url, failed.reason);
        }
    }
    Ok(())
}
