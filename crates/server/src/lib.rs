//! Battle server: loads content, hosts the runtime and serves observers over
//! TCP.
pub mod config;
pub mod logging;
pub mod lobby;
pub mod transport;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use battle_content::{Content, ContentFactory};
use runtime::{Event, Runtime, RuntimeHandle, Topic, WorldEvent};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

pub use config::ServerConfig;
pub use lobby::{EncounterDef, EncounterRegistry, Lobby};

/// Load content, start the runtime and serve until `shutdown` resolves.
pub async fn run(config: ServerConfig, shutdown: impl Future<Output = ()>) -> Result<()> {
    let content = ContentFactory::new(&config.content_dir).load()?;
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    serve(config, content, listener, shutdown).await
}

/// Same as [`run`] with content and listener prepared by the caller.
pub async fn serve(
    config: ServerConfig,
    content: Content,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let Content {
        config: battle_config,
        tables,
        executor,
    } = content;
    let tables = Arc::new(tables);

    let lobby = Arc::new(Lobby::new(
        tables.clone(),
        EncounterRegistry::demo(),
        config.demo_encounter.clone(),
        config.seed,
    )?);

    let runtime = Runtime::builder()
        .config(config.runtime.clone())
        .battle_config(battle_config)
        .tables(tables)
        .executor(executor)
        .build()
        .await?;
    let handle = runtime.handle();

    let world_log = tokio::spawn(log_world_events(handle.clone()));
    let served = transport::serve(listener, handle, lobby, shutdown).await;

    runtime.shutdown().await?;
    // The bus closes with the runtime, which ends the world log.
    if let Err(err) = world_log.await {
        warn!(target: "server", error = %err, "world log task failed");
    }
    info!(target: "server", "shutdown complete");
    served
}

/// Stand-in for persistence: every world notification is logged.
async fn log_world_events(handle: RuntimeHandle) {
    let mut world = handle.subscribe(Topic::World);
    drop(handle);
    loop {
        match world.recv().await {
            Ok(Event::World(event)) => match event {
                WorldEvent::Rewarded {
                    network_id,
                    summary,
                } => info!(
                    target: "server::world",
                    %network_id,
                    experience = summary.experience,
                    gold = summary.gold,
                    gold_lost = summary.gold_lost,
                    drops = summary.drops.len(),
                    "rewarded"
                ),
                WorldEvent::LeveledUp {
                    network_id,
                    previous,
                    level,
                } => info!(target: "server::world", %network_id, previous, level, "level up"),
                WorldEvent::Released {
                    encounter,
                    combatant,
                } => debug!(
                    target: "server::world",
                    %encounter,
                    network_id = %combatant.network_id,
                    "released"
                ),
                other => debug!(target: "server::world", event = ?other, "world event"),
            },
            Ok(Event::Replication(_)) => {}
            Err(RecvError::Lagged(missed)) => {
                warn!(target: "server::world", missed, "world log lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
