//! Simulation worker that owns every authoritative [`Encounter`].
//!
//! Receives commands from [`RuntimeHandle`](crate::RuntimeHandle), advances
//! encounters at a fixed tick rate, and publishes replication and world events
//! to the [`EventBus`].

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use battle_core::{
    BattleConfig, BattleEnv, Combatant, EffectExecutor, Encounter, EncounterError, EncounterId,
    EncounterPhase, EncounterSetup, NetworkId, Outbound, Recipient, ServerMessage, Side,
    StatsTables,
};
use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::{Result, RuntimeError};
use crate::events::{Envelope, Event, EventBus, WorldEvent};
use crate::runtime::RuntimeConfig;
use crate::world::EventWorld;

/// Commands that can be sent to the simulation worker
pub enum Command {
    /// Create an encounter from an initial roster and start it
    CreateEncounter {
        setup: EncounterSetup,
        roster: Vec<(Combatant, Side)>,
        reply: oneshot::Sender<Result<EncounterId>>,
    },
    /// Late join into an active encounter
    Join {
        encounter: EncounterId,
        combatant: Box<Combatant>,
        side: Side,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Remove a combatant and hand it back to the world
    Leave {
        encounter: EncounterId,
        network_id: NetworkId,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Commit an action on behalf of a remote controller
    UseAction {
        encounter: EncounterId,
        network_id: NetworkId,
        slot: u8,
        targets: Vec<NetworkId>,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Query the phase of an encounter (`None` once it is gone)
    Phase {
        encounter: EncounterId,
        reply: oneshot::Sender<Option<EncounterPhase>>,
    },
    /// Find the encounter a combatant is fighting in
    Locate {
        network_id: NetworkId,
        reply: oneshot::Sender<Option<EncounterId>>,
    },
    /// Full resync for a peer that missed replication
    Resync {
        peer: NetworkId,
        reply: oneshot::Sender<bool>,
    },
    /// Stop the worker after closing every encounter
    Shutdown,
}

/// Immutable content and collaborators shared by every encounter.
struct Shared {
    tables: Arc<StatsTables>,
    battle_config: BattleConfig,
    executor: Arc<dyn EffectExecutor>,
    world: EventWorld,
}

impl Shared {
    fn env(&self) -> BattleEnv<'_> {
        BattleEnv::new(
            &self.tables,
            &self.battle_config,
            self.executor.as_ref(),
            &self.world,
        )
    }
}

/// Background worker that drives encounters.
pub struct SimulationWorker {
    config: RuntimeConfig,
    shared: Shared,
    encounters: BTreeMap<EncounterId, Encounter>,
    /// Last `BattleEnd` of every player whose encounter is over.
    finished: BTreeMap<NetworkId, Envelope>,
    next_id: u32,
    ticks: u64,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
}

impl SimulationWorker {
    pub fn new(
        config: RuntimeConfig,
        tables: Arc<StatsTables>,
        battle_config: BattleConfig,
        executor: Arc<dyn EffectExecutor>,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            config,
            shared: Shared {
                tables,
                battle_config,
                executor,
                world: EventWorld::new(event_bus.clone()),
            },
            encounters: BTreeMap::new(),
            finished: BTreeMap::new(),
            next_id: 1,
            ticks: 0,
            command_rx,
            event_bus,
        }
    }

    /// Main worker loop.
    ///
    /// Commands queued between two ticks are applied at the start of the next
    /// tick, before any encounter advances.
    pub async fn run(mut self) {
        let mut ticker = time::interval(self.config.tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let dt = self.config.simulated_dt();

        info!(
            target: "runtime::worker",
            tick_rate = self.config.tick_rate,
            dt,
            "simulation worker started"
        );

        loop {
            ticker.tick().await;
            if self.drain_commands().is_break() {
                break;
            }
            self.step(dt);
        }

        self.close_all();
        info!(target: "runtime::worker", ticks = self.ticks, "simulation worker stopped");
    }

    fn drain_commands(&mut self) -> ControlFlow<()> {
        loop {
            match self.command_rx.try_recv() {
                Ok(Command::Shutdown) => return ControlFlow::Break(()),
                Ok(command) => self.handle_command(command),
                Err(TryRecvError::Empty) => return ControlFlow::Continue(()),
                Err(TryRecvError::Disconnected) => return ControlFlow::Break(()),
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::CreateEncounter {
                setup,
                roster,
                reply,
            } => {
                let _ = reply.send(self.create_encounter(setup, roster));
            }
            Command::Join {
                encounter,
                combatant,
                side,
                reply,
            } => {
                let _ = reply.send(self.join(encounter, *combatant, side));
            }
            Command::Leave {
                encounter,
                network_id,
                reply,
            } => {
                let _ = reply.send(self.leave(encounter, network_id));
            }
            Command::UseAction {
                encounter,
                network_id,
                slot,
                targets,
                reply,
            } => {
                let env = self.shared.env();
                let result = match self.encounters.get_mut(&encounter) {
                    Some(active) => active
                        .use_action(&env, network_id, slot, &targets)
                        .map_err(RuntimeError::from),
                    None => Err(RuntimeError::UnknownEncounter(encounter)),
                };
                let _ = reply.send(result);
            }
            Command::Phase { encounter, reply } => {
                let _ = reply.send(self.encounters.get(&encounter).map(Encounter::phase));
            }
            Command::Locate { network_id, reply } => {
                let found = self
                    .encounters
                    .iter()
                    .find(|(_, e)| e.contains(network_id))
                    .map(|(id, _)| *id);
                let _ = reply.send(found);
            }
            Command::Resync { peer, reply } => {
                let _ = reply.send(self.resync(peer));
            }
            Command::Shutdown => {}
        }
    }

    fn create_encounter(
        &mut self,
        mut setup: EncounterSetup,
        roster: Vec<(Combatant, Side)>,
    ) -> Result<EncounterId> {
        if setup.seed == 0 {
            setup.seed = rand::random();
        }
        let id = EncounterId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);

        for (combatant, _) in &roster {
            self.finished.remove(&combatant.network_id);
        }

        let env = self.shared.env();
        let mut encounter = Encounter::new(id, setup);
        let mut added = Ok(());
        for (combatant, side) in roster {
            if let Err(err) = encounter.add_combatant(&env, combatant, side) {
                added = Err(err);
                break;
            }
        }
        if let Err(err) = added.and_then(|()| encounter.start(&env)) {
            warn!(
                target: "runtime::worker",
                encounter = %id,
                error = %err,
                "encounter failed to start"
            );
            self.release(id, encounter.close());
            return Err(err.into());
        }

        self.encounters.insert(id, encounter);
        Ok(id)
    }

    fn join(&mut self, id: EncounterId, combatant: Combatant, side: Side) -> Result<()> {
        self.finished.remove(&combatant.network_id);
        let env = self.shared.env();
        let encounter = self
            .encounters
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownEncounter(id))?;
        encounter.add_combatant(&env, combatant, side)?;
        Ok(())
    }

    fn leave(&mut self, id: EncounterId, network_id: NetworkId) -> Result<()> {
        let encounter = self
            .encounters
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownEncounter(id))?;
        let combatant = encounter.remove_combatant(network_id)?;
        self.release(id, vec![combatant]);
        Ok(())
    }

    /// Re-send what `peer` needs to rebuild its view: the whole live
    /// encounter, or the summary of the one that just ended. `false` when
    /// there is nothing to send.
    fn resync(&mut self, peer: NetworkId) -> bool {
        if let Some(encounter) = self.encounters.values_mut().find(|e| e.contains(peer)) {
            encounter.resync(peer);
            return true;
        }
        match self.finished.get(&peer) {
            Some(envelope) => {
                self.event_bus.publish(Event::Replication(envelope.clone()));
                true
            }
            None => false,
        }
    }

    /// One fixed step over every encounter, in id order.
    fn step(&mut self, dt: f64) {
        self.ticks += 1;
        let batch_due = self.config.position_batch_interval > 0
            && self.ticks % u64::from(self.config.position_batch_interval) == 0;

        let ids: Vec<EncounterId> = self.encounters.keys().copied().collect();
        for id in ids {
            let env = self.shared.env();
            let Some(encounter) = self.encounters.get_mut(&id) else {
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| encounter.tick(&env, dt)));
            let failed = match outcome {
                Ok(Ok(())) => false,
                Ok(Err(err)) => {
                    log_tick_failure(id, &err);
                    true
                }
                Err(payload) => {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_owned())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_owned());
                    error!(
                        target: "runtime::worker",
                        encounter = %id,
                        reason,
                        "encounter tick panicked"
                    );
                    true
                }
            };

            let outbox = encounter.drain_outbox();
            let audience = encounter.players();
            publish_outbox(&self.event_bus, &mut self.finished, id, &audience, outbox);

            if batch_due && !failed && encounter.phase() == EncounterPhase::Active {
                let batch = encounter.position_batch();
                publish_outbox(
                    &self.event_bus,
                    &mut self.finished,
                    id,
                    &audience,
                    vec![Outbound {
                        recipient: Recipient::All,
                        message: ServerMessage::PositionBatch(batch),
                    }],
                );
            }

            if failed || encounter.phase() == EncounterPhase::Ending {
                self.close(id);
            }
        }
    }

    fn close(&mut self, id: EncounterId) {
        let Some(mut encounter) = self.encounters.remove(&id) else {
            return;
        };
        let released = encounter.close();
        debug!(
            target: "runtime::worker",
            encounter = %id,
            released = released.len(),
            "encounter removed"
        );
        self.release(id, released);
    }

    fn close_all(&mut self) {
        let ids: Vec<EncounterId> = self.encounters.keys().copied().collect();
        for id in ids {
            self.close(id);
        }
    }

    fn release(&self, encounter: EncounterId, combatants: Vec<Combatant>) {
        for combatant in combatants {
            self.event_bus.publish(Event::World(WorldEvent::Released {
                encounter,
                combatant: Box::new(combatant),
            }));
        }
    }
}

fn log_tick_failure(id: EncounterId, err: &EncounterError) {
    error!(
        target: "runtime::worker",
        encounter = %id,
        error = %err,
        "encounter tick failed"
    );
}

fn publish_outbox(
    bus: &EventBus,
    finished: &mut BTreeMap<NetworkId, Envelope>,
    encounter: EncounterId,
    players: &[NetworkId],
    outbox: Vec<Outbound>,
) {
    for Outbound { recipient, message } in outbox {
        let audience = match recipient {
            Recipient::All => players.to_vec(),
            Recipient::Peer(peer) => vec![peer],
        };
        let envelope = Envelope {
            encounter,
            recipient,
            audience,
            message,
        };
        if let (Recipient::Peer(peer), ServerMessage::BattleEnd(_)) =
            (envelope.recipient, &envelope.message)
        {
            finished.insert(peer, envelope.clone());
        }
        bus.publish(Event::Replication(envelope));
    }
}
