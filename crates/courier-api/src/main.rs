//! Courier bot entry point.
//!
//! Binary name: `courier`
//!
//! Parses CLI arguments, initializes the database and engine components,
//! then either runs the bot under the connection supervisor or executes a
//! one-shot command against the store.

mod cli;
mod handlers;
mod session;
mod state;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use courier_core::session::{MaintenanceCallback, Supervisor, SupervisorConfig};
use courier_infra::config::resolve_bot_token;

use cli::{Cli, Commands};
use handlers::Handlers;
use session::{BotConnector, BotSession};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,courier=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run => run_bot().await,
        Commands::Stats => show_stats(cli.json).await,
    }
}

/// Run the bot until interrupted, reconnecting across transient failures.
async fn run_bot() -> anyhow::Result<()> {
    let state = AppState::init().await?;

    let Some(token) = resolve_bot_token(&state.config) else {
        // fatal startup condition: no credential, no bot
        error!("COURIER_BOT_TOKEN is not set and config.toml has no bot_token");
        anyhow::bail!("bot token is not configured");
    };

    // the polling loop and handlers report transport errors here; the
    // supervisor's observer classifies them
    let (error_tx, mut error_rx) = mpsc::unbounded_channel();

    let handlers = Arc::new(
        Handlers::new(
            Arc::clone(&state.users),
            Arc::clone(&state.window),
            Arc::clone(&state.flows),
            Arc::clone(&state.dispatcher),
            Arc::clone(&state.orders),
        )
        .with_error_sink(error_tx.clone()),
    );

    let connector = BotConnector::new(handlers, state.config.poll_timeout_secs, error_tx);

    let window = Arc::clone(&state.window);
    let maintenance: MaintenanceCallback<BotSession> = Arc::new(move |session| {
        let window = Arc::clone(&window);
        Box::pin(async move {
            window.sweep_all(session.client().as_ref()).await;
        })
    });

    let supervisor = Supervisor::new(
        connector,
        token,
        SupervisorConfig::from_config(&state.config),
        maintenance,
    );

    tokio::spawn({
        let supervisor = Arc::clone(&supervisor);
        async move {
            while let Some(err) = error_rx.recv().await {
                supervisor.handle_error(&err);
            }
        }
    });

    // a failed first start arms the reconnect loop; no need to bail here
    supervisor.start().await;

    tokio::signal::ctrl_c().await?;
    supervisor.stop().await;
    Ok(())
}

/// Print user-base statistics from the store.
async fn show_stats(json: bool) -> anyhow::Result<()> {
    use courier_core::repository::UserRepository;

    let state = AppState::init().await?;
    let stats = state.users.stats().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Visits today:     {}", stats.visits_today);
        println!("Total users:      {}", stats.total_users);
        println!("Total VIP users:  {}", stats.total_vip);
        println!("New users today:  {}", stats.new_users_today);
        println!("New VIP today:    {}", stats.new_vip_today);
    }
    Ok(())
}
