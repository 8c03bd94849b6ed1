//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! managing encounters or streaming events from specific topics.
use std::collections::HashMap;

use battle_core::{Combatant, EncounterId, EncounterPhase, EncounterSetup, NetworkId, Side};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Create and start an encounter with its initial roster.
    ///
    /// A zero `setup.seed` is replaced with a random one.
    pub async fn create_encounter(
        &self,
        setup: EncounterSetup,
        roster: Vec<(Combatant, Side)>,
    ) -> Result<EncounterId> {
        self.request(|reply| Command::CreateEncounter {
            setup,
            roster,
            reply,
        })
        .await?
    }

    /// Late join into an active encounter.
    pub async fn join(&self, encounter: EncounterId, combatant: Combatant, side: Side) -> Result<()> {
        self.request(|reply| Command::Join {
            encounter,
            combatant: Box::new(combatant),
            side,
            reply,
        })
        .await?
    }

    /// Remove a combatant. It comes back as
    /// [`WorldEvent::Released`](crate::WorldEvent::Released).
    pub async fn leave(&self, encounter: EncounterId, network_id: NetworkId) -> Result<()> {
        self.request(|reply| Command::Leave {
            encounter,
            network_id,
            reply,
        })
        .await?
    }

    pub async fn use_action(
        &self,
        encounter: EncounterId,
        network_id: NetworkId,
        slot: u8,
        targets: Vec<NetworkId>,
    ) -> Result<()> {
        self.request(|reply| Command::UseAction {
            encounter,
            network_id,
            slot,
            targets,
            reply,
        })
        .await?
    }

    /// Phase of an encounter, or `None` once it has been closed and removed.
    pub async fn encounter_phase(&self, encounter: EncounterId) -> Result<Option<EncounterPhase>> {
        self.request(|reply| Command::Phase { encounter, reply }).await
    }

    /// Encounter `network_id` is currently fighting in.
    pub async fn locate(&self, network_id: NetworkId) -> Result<Option<EncounterId>> {
        self.request(|reply| Command::Locate { network_id, reply })
            .await
    }

    /// Full resync for a peer that reconnected or fell behind on
    /// replication.
    ///
    /// A peer in a live encounter gets a fresh `BattleStart` and every status
    /// effect. A peer whose encounter already ended gets its `BattleEnd`
    /// again. Returns `false` when there was nothing to send.
    pub async fn resync(&self, peer: NetworkId) -> Result<bool> {
        self.request(|reply| Command::Resync { peer, reply }).await
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Replication` - Server messages with their resolved audience
    /// - `Topic::World` - Deaths, rewards, inventory changes, released combatants
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use runtime::Topic;
    ///
    /// let mut world_rx = handle.subscribe(Topic::World);
    /// while let Ok(event) = world_rx.recv().await {
    ///     // Persist rewards
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    ///
    /// Returns a map of topic to receiver for each requested topic.
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
