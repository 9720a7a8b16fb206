//! # Invigil - Exam Staff Assignment Server
//!
//! The main binary for the Invigil assignment engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for dataset operations
//! - Debounced snapshot persistence (file or redb backend)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    apps/invigil (THE BINARY)                 │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐  │
//! │  │    CLI      │    │  HTTP API   │    │ Snapshot Writer │  │
//! │  │   (clap)    │    │   (axum)    │    │     (tokio)     │  │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬────────┘  │
//! │         │                  │                    │           │
//! │         └──────────────────┼────────────────────┘           │
//! │                            ▼                                │
//! │                    ┌───────────────┐                        │
//! │                    │ invigil-core  │                        │
//! │                    │  (THE LOGIC)  │                        │
//! │                    └───────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! invigil server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! invigil status
//! invigil available --date 2025-02-10 --time 09:00 --role proctor
//! invigil export -o snapshot.json
//! ```

use clap::Parser;
use invigil::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // INVIGIL_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("INVIGIL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "invigil=debug,tower_http=debug"
    } else {
        "invigil=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    if !cli.quiet {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗███╗   ██╗██╗   ██╗██╗ ██████╗ ██╗██╗
  ██║████╗  ██║██║   ██║██║██╔════╝ ██║██║
  ██║██╔██╗ ██║██║   ██║██║██║  ███╗██║██║
  ██║██║╚██╗██║╚██╗ ██╔╝██║██║   ██║██║██║
  ██║██║ ╚████║ ╚████╔╝ ██║╚██████╔╝██║███████╗
  ╚═╝╚═╝  ╚═══╝  ╚═══╝  ╚═╝ ╚═════╝ ╚═╝╚══════╝

  Exam Staff Assignment v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
