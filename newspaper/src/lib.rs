// Library interface for the newspaper modules
// This allows tests and the binaries to import modules

pub mod article;
pub mod auth;
pub mod db;
pub mod enrichment;
pub mod freshness;
pub mod geocoding;
pub mod llm;
pub mod orchestrator;
pub mod preferences;
pub mod providers;
pub mod server;
pub mod static_site;
