//! Control server for the invitation accept agent.
//!
//! Binds the WebSocket bridge, then drives an [`AcceptAgent`] backed by a
//! [`RemoteEngine`] from the start/stop commands the bridge relays. The
//! in-page helper connects to the same socket and services DOM evals.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use acceptall::{
    AcceptAgent, AgentConfig, Command, ControlBridge, InvitationStore, RemoteEngine, RunOutcome,
    DEFAULT_WS_ADDR,
};

#[derive(Parser, Debug)]
#[command(name = "acceptall-server")]
#[command(about = "WebSocket control server for the LinkedIn invitation accept agent")]
struct Args {
    /// Address the control bridge listens on
    #[arg(long, default_value = DEFAULT_WS_ADDR)]
    listen: String,

    /// Path of the invitation log and resume checkpoint
    #[arg(long, default_value = "acceptall-data.json")]
    storage: PathBuf,

    /// Skip the resume check on startup
    #[arg(long)]
    no_resume: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("starting acceptall-server v{}", env!("CARGO_PKG_VERSION"));
    info!("storage: {}", args.storage.display());

    let (bridge, mut commands) = ControlBridge::start(&args.listen).await?;
    let engine = Arc::new(RemoteEngine::new(bridge.clone()));
    let store = InvitationStore::new(&args.storage);
    let (agent, mut events) = AcceptAgent::new(engine, store, AgentConfig::default());
    let agent = Arc::new(agent);

    // Forward agent notifications to whichever control clients are attached.
    {
        let bridge = bridge.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                bridge.notify(&event).await;
            }
        });
    }

    // A live checkpoint means a prior run forced a reload; pick it back up
    // once the page helper has had a moment to reconnect. The resumed run
    // may itself checkpoint and reload again, so keep chasing until the
    // session is exhausted.
    if !args.no_resume {
        let agent = agent.clone();
        tokio::spawn(async move {
            loop {
                match agent.resume_if_pending().await {
                    Ok(Some(RunOutcome::Reloading { accepted })) => {
                        info!(accepted, "page reloaded again, resuming");
                    }
                    Ok(Some(outcome)) => {
                        info!(?outcome, "resume run finished");
                        break;
                    }
                    Ok(None) => {
                        info!("no resume session pending");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "resume check failed");
                        break;
                    }
                }
            }
        });
    }

    info!("ready, waiting for control commands on ws://{}", bridge.local_addr());

    while let Some(command) = commands.recv().await {
        match command {
            Command::Start { resume_from } => {
                let agent = agent.clone();
                tokio::spawn(async move {
                    // Follows the run through any checkpoint reloads it
                    // forces along the way.
                    let outcome = agent.run_to_completion(resume_from.unwrap_or(0)).await;
                    info!(?outcome, "run finished");
                });
            }
            Command::Stop => {
                info!("stop requested");
                agent.handle().stop();
            }
            // Acked at the bridge, never forwarded.
            Command::Ping => {}
        }
    }

    Ok(())
}
