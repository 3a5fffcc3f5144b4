use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use edge_router::config::{load_config, RouterConfig};
use edge_router::lifecycle::startup::seed_route_store;
use edge_router::routing::{normalize, wildcard_candidates, RouteResolver};
use edge_router::security::{validate_object_key, validate_target_url};

#[derive(Parser)]
#[command(name = "edge-router-cli")]
#[command(about = "Offline tooling for the edge router", long_about = None)]
struct Cli {
    /// Configuration file providing domains and seed routes.
    #[arg(short, long, default_value = "edge-router.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a proxy target against the SSRF guard
    CheckUrl { url: String },
    /// Check an object key against the key guard
    CheckKey { key: String },
    /// Print the canonical form of a path and its wildcard candidates
    Normalize { path: String },
    /// Resolve a request against the configured seed routes
    Resolve { domain: String, path: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckUrl { url } => match validate_target_url(&url) {
            Ok(parsed) => print_json(&json!({ "ok": true, "url": parsed.as_str() })),
            Err(e) => {
                print_json(&json!({ "ok": false, "error": e.to_string() }));
                std::process::exit(1);
            }
        },
        Commands::CheckKey { key } => match validate_object_key(&key) {
            Ok(key) => print_json(&json!({ "ok": true, "key": key })),
            Err(e) => {
                print_json(&json!({ "ok": false, "error": e.to_string() }));
                std::process::exit(1);
            }
        },
        Commands::Normalize { path } => {
            let canonical = normalize(&path);
            let candidates = wildcard_candidates(&canonical);
            print_json(&json!({ "path": canonical, "candidates": candidates }));
        }
        Commands::Resolve { domain, path } => {
            let config = if cli.config.exists() {
                load_config(&cli.config)?
            } else {
                eprintln!("Config file {} not found, using defaults", cli.config.display());
                RouterConfig::default()
            };
            let store = seed_route_store(&config)?;
            let resolver = RouteResolver::new(Arc::new(store), config.domains.iter().cloned());

            match resolver.resolve(&domain.to_ascii_lowercase(), &path).await? {
                Some(route) => print_json(&json!({
                    "matched": route.key.path(),
                    "wildcard": route.is_wildcard(),
                    "requestPath": route.request_path,
                    "record": route.record,
                })),
                None => {
                    print_json(&json!({ "matched": null, "requestPath": normalize(&path) }));
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Failed to encode output: {e}"),
    }
}
