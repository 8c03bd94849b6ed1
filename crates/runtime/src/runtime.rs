//! High-level runtime orchestrator.
//!
//! The runtime owns the simulation worker, wires up command/event channels,
//! and exposes a builder-based API for hosts to drive encounters.

use std::sync::Arc;
use std::time::Duration;

use battle_core::{BattleConfig, EffectExecutor, StatsTables};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::events::EventBus;
use crate::workers::SimulationWorker;

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Simulation steps per wall-clock second.
    pub tick_rate: u32,
    /// Simulated seconds per wall-clock second.
    pub time_scale: f64,
    /// Ticks between two position batches; zero disables them.
    pub position_batch_interval: u32,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            time_scale: 1.0,
            position_batch_interval: 6,
            event_buffer_size: 256,
            command_buffer_size: 32,
        }
    }
}

impl RuntimeConfig {
    /// Wall-clock time between two ticks.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    /// Simulated seconds advanced by each tick.
    pub fn simulated_dt(&self) -> f64 {
        self.time_scale.max(0.0) / f64::from(self.tick_rate.max(1))
    }
}

/// Main runtime that hosts encounters
///
/// Design: Runtime owns the worker task and coordinates shutdown.
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    sim_worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    ///
    /// The handle can be shared across clients and async tasks.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Shutdown the runtime gracefully
    ///
    /// Every open encounter is closed and its combatants released before the
    /// worker exits.
    pub async fn shutdown(self) -> Result<()> {
        // The worker also stops on its own once every handle is gone.
        let _ = self.handle.shutdown().await;
        drop(self.handle);

        self.sim_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    battle_config: BattleConfig,
    tables: Option<Arc<StatsTables>>,
    executor: Option<Arc<dyn EffectExecutor>>,
    event_bus: Option<EventBus>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            battle_config: BattleConfig::default(),
            tables: None,
            executor: None,
            event_bus: None,
        }
    }

    /// Override the runtime configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Battle tunables shared by every encounter.
    pub fn battle_config(mut self, battle_config: BattleConfig) -> Self {
        self.battle_config = battle_config;
        self
    }

    pub fn tables(mut self, tables: impl Into<Arc<StatsTables>>) -> Self {
        self.tables = Some(tables.into());
        self
    }

    pub fn executor(mut self, executor: impl EffectExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Share an existing bus instead of creating one.
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Build the runtime and spawn the simulation worker
    pub async fn build(self) -> Result<Runtime> {
        let tables = self.tables.ok_or(RuntimeError::MissingContent)?;
        let executor = self.executor.ok_or(RuntimeError::MissingContent)?;

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer_size.max(1));
        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::with_capacity(self.config.event_buffer_size));

        let handle = RuntimeHandle::new(command_tx, event_bus.clone());

        info!(
            target: "runtime",
            tick_rate = self.config.tick_rate,
            time_scale = self.config.time_scale,
            "starting runtime"
        );

        let worker = SimulationWorker::new(
            self.config,
            tables,
            self.battle_config,
            executor,
            command_rx,
            event_bus,
        );
        let sim_worker_handle = tokio::spawn(worker.run());

        Ok(Runtime {
            handle,
            sim_worker_handle,
        })
    }
}
