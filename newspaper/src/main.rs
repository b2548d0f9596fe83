/*
newspaper - single-binary main.rs
This binary starts the Rocket HTTP server: JSON API plus the static front-end.
With --static-only it serves the front-end bundle alone, without touching the database.
*/

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use common::{init_db_pool, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newspaper::auth::AuthService;
use newspaper::db;
use newspaper::geocoding::ReverseGeocoder;
use newspaper::llm;
use newspaper::orchestrator::FetchOrchestrator;
use newspaper::preferences::PreferencesStore;
use newspaper::server::{self, AppState};
use newspaper::static_site::{self, StaticSite};

#[derive(Parser, Debug)]
#[command(name = "newspaper", about = "Newspaper.AI article API and front-end server")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Serve only the static front-end (no API, no database)
    #[arg(long)]
    static_only: bool,

    /// Directory holding the built front-end (overrides [server] static_dir)
    #[arg(long, value_name = "DIR")]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    // Load configuration with defaults
    let mut config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    if let Some(dir) = args.static_dir {
        config.server.static_dir = Some(dir.to_string_lossy().to_string());
    }

    if args.static_only {
        let site = StaticSite::new(config.server.static_dir());
        info!(static_dir = %site.root.display(), "starting static-only server");
        static_site::build_rocket(site, server::figment_from_config(&config))
            .launch()
            .await
            .map_err(|e| anyhow::anyhow!("Rocket failed: {}", e))?;
        info!("Shutdown complete");
        return Ok(());
    }

    // Initialize DB pool - resolve and log the absolute DB path before connecting
    let db_path_abs = match tokio::fs::canonicalize(&config.database.path).await {
        Ok(p) => p.to_string_lossy().to_string(),
        Err(_) => config.database.path.clone(),
    };
    info!(db_path = %db_path_abs, "resolved DB path");

    let db_pool = match init_db_pool(&db_path_abs).await {
        Ok(p) => p,
        Err(e) => {
            error!(%e, db_path = %db_path_abs, "failed to initialize database pool");
            return Err(e);
        }
    };
    db::ensure_schema(&db_pool).await?;

    // Summarization is optional: articles get templated summaries without it
    let summarizer = match llm::provider_from_config(config.llm.as_ref()) {
        Ok(Some(provider)) => {
            info!("Summarization LLM provider initialized");
            Some(provider)
        }
        Ok(None) => {
            info!("No summarization LLM configured, using templated summaries");
            None
        }
        Err(e) => {
            warn!("Failed to initialize summarization LLM provider: {:#}", e);
            None
        }
    };

    let orchestrator = FetchOrchestrator::from_config(&config, summarizer)?;
    let geocoder = ReverseGeocoder::from_config(&config.geocoding)?;
    let auth = AuthService::from_config(db_pool.clone(), &config.auth)?;

    let state = AppState {
        started_at: Utc::now(),
        config: Arc::new(config),
        orchestrator: Arc::new(orchestrator),
        preferences: PreferencesStore::new(db_pool.clone()),
        auth: Arc::new(auth),
        geocoder: Arc::new(geocoder),
    };

    info!("Launching Rocket HTTP server");
    if let Err(e) = server::launch_rocket(state).await {
        error!(%e, "Rocket server failed");
        return Err(e);
    }

    db_pool.close().await;
    info!("Shutdown complete");
    Ok(())
}
