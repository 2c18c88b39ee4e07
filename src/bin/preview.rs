//! Preview binary - prints SEO documents or a tracking report without
//! starting the server
//!
//! Usage:
//!   cargo run --bin preview -- sitemap                # Full sitemap.xml
//!   cargo run --bin preview -- sitemap --locale ko    # Korean entries only
//!   cargo run --bin preview -- links /ko/pricing      # hreflang <link> tags
//!   cargo run --bin preview -- report --days 30       # Stats from the event log
//!
//! Optional environment variables:
//! - BASE_URL (defaults to https://example-agency.com)
//! - EVENTS_FILE (defaults to data/events.json)

use agency_site::config::{DEFAULT_BASE_URL, DEFAULT_MAX_EVENTS};
use agency_site::i18n::{resolve_locale, Locale};
use agency_site::sitemap::{
    build_hreflang_links, build_sitemap, render_sitemap_xml, sitemap_for_locale, PAGES,
};
use agency_site::tracking::{parse_days, summarize, JsonFileStore};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::info;

const USAGE: &str = "Usage: preview <sitemap [--locale CODE] | links PATH | report [--days N]>";

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn base_url() -> String {
    std::env::var("BASE_URL")
        .ok()
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

fn print_sitemap(args: &[String]) -> Result<()> {
    let entries = build_sitemap(&base_url(), PAGES, Utc::now());
    let entries = match flag_value(args, "--locale") {
        Some(code) => sitemap_for_locale(&entries, Locale::from_code(code)?),
        None => entries,
    };
    print!("{}", render_sitemap_xml(&entries));
    Ok(())
}

fn print_links(args: &[String]) -> Result<()> {
    let Some(path) = args.get(2) else {
        bail!("{}", USAGE);
    };
    let links = build_hreflang_links(&base_url(), resolve_locale(path), path);
    println!("{}", links.to_html());
    Ok(())
}

async fn print_report(args: &[String]) -> Result<()> {
    let events_file =
        std::env::var("EVENTS_FILE").unwrap_or_else(|_| "data/events.json".to_string());
    let days = parse_days(flag_value(args, "--days"));

    info!("Reading events from {}", events_file);
    let events = JsonFileStore::new(&events_file, DEFAULT_MAX_EVENTS)
        .load()
        .await
        .with_context(|| format!("Failed to read {}", events_file))?;

    let report = summarize(&events, Utc::now(), days);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agency_site=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("sitemap") => print_sitemap(&args),
        Some("links") => print_links(&args),
        Some("report") => print_report(&args).await,
        _ => bail!("{}", USAGE),
    }
}
