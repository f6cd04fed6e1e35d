//! Online-services front-end server.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                 FESL FRONT-END                   │
//!                          │                                                  │
//!     Game client          │  ┌─────────┐   ┌─────────┐   ┌───────────────┐  │
//!     ─────────────────────┼─▶│   net   │──▶│ session │──▶│ transactions  │  │
//!                          │  │listener │   │  loop   │   │  dispatcher   │  │
//!                          │  │ + tls   │   │(ticket) │   └───────┬───────┘  │
//!                          │  └─────────┘   └────▲────┘           │          │
//!                          │                     │                ▼          │
//!     Replies              │                ┌────┴────┐   ┌───────────────┐  │
//!     ◀────────────────────┼────────────────│protocol │◀──│   handlers    │  │
//!                          │                │  codec  │   │ fsys / acct   │  │
//!                          │                └─────────┘   └───────────────┘  │
//!                          │                                                  │
//!                          │  config · observability · lifecycle              │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use fesl_frontend::lifecycle::startup::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "fesl-frontend")]
#[command(about = "Online-services front-end for legacy console clients", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Reload the configuration file when it changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    startup::run(StartupOptions {
        config_path: cli.config,
        bind_override: cli.bind,
        watch: cli.watch,
    })
    .await?;

    Ok(())
}
