///
/// This module implements the CLI interface for attachment-sync: command parsing,
/// argument validation and the async entrypoint shared by `main` and tests.
///
/// All sync logic (listing, crawling, transfer, merging) lives in the
/// [`attachment-sync-core`] crate. This module is strictly CLI glue.
///
/// ## Commands
/// - `serve`: run the HTTP server (push endpoint and page webhook).
/// - `push`: one-shot board item → page sync, same flow as `POST /api/push`.
/// - `pull`: one-shot page → board sync, same flow as the webhook.
///
/// `push` and `pull` print their report as JSON on stdout.
///
/// [`attachment-sync-core`]: ../../attachment-sync-core/
use crate::load_config::load_config;
use crate::server::{serve, AppState};
use anyhow::Result;
use attachment_sync_core::synchronise::{pull_page_to_board, push_item_to_page};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for attachment-sync: keep board item files and page files in step.
#[derive(Parser)]
#[clap(
    name = "attachment-sync",
    version,
    about = "Sync file attachments between a monday.com board and a Notion database"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the push endpoint and the page webhook
    Serve {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Copy a board item's files onto a page, creating the page if none is given
    Push {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Board item id
        #[clap(long)]
        item_id: u64,
        /// Target page id
        #[clap(long)]
        page_id: Option<String>,
    },
    /// Copy media blocks newly added to a page into its board item's files column
    Pull {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Page id
        #[clap(long)]
        page_id: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Serve { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "serve", bind = %config.server.bind, "Starting server");
            serve(&config).await
        }
        Commands::Push {
            config,
            item_id,
            page_id,
        } => {
            let config = load_config(config)?;
            let state = AppState::from_config(&config)?;
            tracing::info!(command = "push", item_id, page_id = ?page_id, "Starting push");
            let report = push_item_to_page(
                state.board.as_ref(),
                state.pages.as_ref(),
                state.fetcher.as_ref(),
                state.ledger.as_ref(),
                &state.settings,
                item_id,
                page_id.as_deref(),
            )
            .await
            .map_err(|e| {
                tracing::error!(command = "push", error = %e, "Push failed");
                anyhow::Error::new(e)
            })?;
            tracing::info!(command = "push", attachments = report.attachments, "Push complete");
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Pull { config, page_id } => {
            let config = load_config(config)?;
            let state = AppState::from_config(&config)?;
            tracing::info!(command = "pull", page_id = %page_id, "Starting pull");
            let outcome = pull_page_to_board(
                state.board.as_ref(),
                state.pages.as_ref(),
                state.fetcher.as_ref(),
                state.ledger.as_ref(),
                &state.settings,
                &page_id,
            )
            .await
            .map_err(|e| {
                tracing::error!(command = "pull", error = %e, "Pull failed");
                anyhow::Error::new(e)
            })?;
            tracing::info!(command = "pull", ?outcome, "Pull complete");
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
    }
}
