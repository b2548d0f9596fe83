//! Run the fetch pipeline once and print the result as JSON.
//!
//! Handy for checking provider keys: the "source" field tells which provider answered.

use clap::Parser;
use common::Config;
use std::path::PathBuf;

use newspaper::article::Category;
use newspaper::geocoding::{LocationData, ReverseGeocoder};
use newspaper::llm;
use newspaper::orchestrator::FetchOrchestrator;

#[derive(Parser, Debug)]
#[command(name = "fetch_articles", about = "Fetch articles once and print them as JSON")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Category filter (e.g. technology, sports); omit for all
    #[arg(long)]
    category: Option<String>,

    /// "lat,lng" or "City, Region, Country"
    #[arg(long)]
    location: Option<String>,

    /// Free-text search instead of headlines
    #[arg(long)]
    search: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let default_path = PathBuf::from("config.default.toml");
    let config = Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        Some(args.config.as_path()),
    )
    .await?;

    let summarizer = llm::provider_from_config(config.llm.as_ref()).unwrap_or_else(|e| {
        eprintln!("summarization disabled: {:#}", e);
        None
    });
    let orchestrator = FetchOrchestrator::from_config(&config, summarizer)?;

    let result = if let Some(query) = args.search.as_deref() {
        orchestrator.search(query).await
    } else {
        let location = match args.location.as_deref().and_then(LocationData::parse) {
            Some(loc) => {
                let geocoder = ReverseGeocoder::from_config(&config.geocoding)?;
                Some(geocoder.resolve(loc).await)
            }
            None => None,
        };
        let category = Category::parse_filter(args.category.as_deref());
        orchestrator.fetch_articles(category, location.as_ref()).await
    };

    eprintln!("{} articles from {}", result.articles.len(), result.source);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
