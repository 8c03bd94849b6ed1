//! Encounters.
//!
//! An [`Encounter`] owns its combatants for the length of a fight. The
//! authoritative host ticks it at a fixed rate: turn timers advance, status
//! effects update, monsters pick actions, ready combatants resolve, and the end
//! condition is watched. Everything observers must see is queued in the
//! outbox as [`ServerMessage`]s.
//!
//! Observers keep an [`Authority::Observer`] encounter fed by
//! [`Encounter::apply_message`] (see `mirror.rs`). Their ticks only drive
//! presentation timers.

mod ai;
mod error;
mod mirror;
mod rewards;
mod roster;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use error::EncounterError;
pub use mirror::{PresentationEvent, PresentedResult};
pub use roster::Roster;

use crate::BattleEnv;
use crate::action::{self, CycleStep, IntentError, Resolution};
use crate::combatant::{Combatant, CombatantFlags, IntentState};
use crate::config::BattleConfig;
use crate::effects::EffectSnapshot;
use crate::ids::{CombatantHandle, EncounterId, NetworkId, Side, ZoneId};
use crate::protocol::{CombatantSnapshot, PositionBatch, PositionEntry, ServerMessage};
use crate::rng::BattleRng;
use crate::stats::{Attribute, AttributeValue, StatChange};

/// Parameters fixed when the encounter is created.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EncounterSetup {
    pub zone: Option<ZoneId>,
    pub pvp: bool,
    /// Drops come from the zone table instead of individual monsters.
    pub boss: bool,
    pub seed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authority {
    /// Owns the truth: resolves actions and distributes rewards.
    Server,
    /// Shadow copy rebuilt from replicated messages.
    Observer,
}

/// `Forming → Active → Ending → Closed`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncounterPhase {
    Forming,
    Active,
    Ending,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recipient {
    /// Every observer of the encounter.
    All,
    /// The controller of one combatant.
    Peer(NetworkId),
}

/// A message waiting to be sent.
#[derive(Clone, Debug, PartialEq)]
pub struct Outbound {
    pub recipient: Recipient,
    pub message: ServerMessage,
}

#[derive(Clone, Debug)]
pub struct Encounter {
    id: EncounterId,
    setup: EncounterSetup,
    authority: Authority,
    phase: EncounterPhase,
    roster: Roster,
    /// Seconds one side has continuously had nobody alive.
    dead_timer: f64,
    rng: BattleRng,
    outbox: Vec<Outbound>,
    /// Server: last position batch sent. Observer: last batch applied.
    batch_sequence: u32,
    presented: Vec<PresentedResult>,
    presentation: Vec<PresentationEvent>,
}

impl Encounter {
    /// Authoritative encounter in the `Forming` phase.
    pub fn new(id: EncounterId, setup: EncounterSetup) -> Self {
        Self::with_authority(id, setup, Authority::Server)
    }

    /// Observer mirror waiting for `BattleStart`.
    pub fn observer() -> Self {
        Self::with_authority(EncounterId::default(), EncounterSetup::default(), Authority::Observer)
    }

    fn with_authority(id: EncounterId, setup: EncounterSetup, authority: Authority) -> Self {
        Self {
            id,
            rng: BattleRng::seeded(setup.seed),
            setup,
            authority,
            phase: EncounterPhase::Forming,
            roster: Roster::default(),
            dead_timer: 0.0,
            outbox: Vec::new(),
            batch_sequence: 0,
            presented: Vec::new(),
            presentation: Vec::new(),
        }
    }

    // ===== accessors =====

    pub fn id(&self) -> EncounterId {
        self.id
    }

    pub fn setup(&self) -> &EncounterSetup {
        &self.setup
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn phase(&self) -> EncounterPhase {
        self.phase
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn dead_timer(&self) -> f64 {
        self.dead_timer
    }

    pub fn combatant(&self, network_id: NetworkId) -> Option<&Combatant> {
        self.roster.find(network_id).and_then(|h| self.roster.get(h))
    }

    pub fn combatant_mut(&mut self, network_id: NetworkId) -> Option<&mut Combatant> {
        let handle = self.roster.find(network_id)?;
        self.roster.get_mut(handle)
    }

    pub fn contains(&self, network_id: NetworkId) -> bool {
        self.roster.find(network_id).is_some()
    }

    pub fn alive_count(&self, side: Side) -> usize {
        self.roster
            .iter()
            .filter(|(_, c)| c.side == side && c.is_alive())
            .count()
    }

    /// Network ids of every player, in roster order.
    pub fn players(&self) -> Vec<NetworkId> {
        self.roster
            .iter()
            .filter(|(_, c)| !c.is_monster())
            .map(|(_, c)| c.network_id)
            .collect()
    }

    pub fn snapshot(&self, network_id: NetworkId) -> Option<CombatantSnapshot> {
        self.combatant(network_id).map(CombatantSnapshot::of)
    }

    pub fn snapshots(&self) -> Vec<CombatantSnapshot> {
        self.roster.iter().map(|(_, c)| CombatantSnapshot::of(c)).collect()
    }

    /// Take every queued message.
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    fn broadcast(&mut self, message: ServerMessage) {
        self.outbox.push(Outbound {
            recipient: Recipient::All,
            message,
        });
    }

    fn send_to(&mut self, network_id: NetworkId, message: ServerMessage) {
        self.outbox.push(Outbound {
            recipient: Recipient::Peer(network_id),
            message,
        });
    }

    fn handle_of(&self, network_id: NetworkId) -> Result<CombatantHandle, EncounterError> {
        self.roster
            .find(network_id)
            .ok_or(EncounterError::UnknownCombatant(network_id))
    }

    // ===== lifecycle =====

    /// Add a combatant on `side`.
    ///
    /// During `Forming` the combatant is part of the initial roster. During
    /// `Active` it joins late: its timer starts at zero and observers receive
    /// a `BattleJoin`, while the joiner itself gets the full `BattleStart`.
    pub fn add_combatant(
        &mut self,
        env: &BattleEnv<'_>,
        mut combatant: Combatant,
        side: Side,
    ) -> Result<CombatantHandle, EncounterError> {
        match self.phase {
            EncounterPhase::Forming | EncounterPhase::Active => {}
            EncounterPhase::Ending | EncounterPhase::Closed => return Err(EncounterError::Closed),
        }
        if self.roster.len() >= BattleConfig::MAX_COMBATANTS {
            return Err(EncounterError::RosterFull);
        }
        if self.contains(combatant.network_id) {
            return Err(EncounterError::DuplicateCombatant(combatant.network_id));
        }

        combatant.side = side;
        combatant.clear_action();
        combatant.turn_timer = 0.0;
        combatant.gold_stolen = 0;
        env.recompute(&mut combatant)?;

        let late = self.phase == EncounterPhase::Active;
        if late {
            combatant.flags |= CombatantFlags::JOINED_LATE;
        }
        let network_id = combatant.network_id;
        let is_player = !combatant.is_monster();
        let handle = self.roster.insert(combatant);

        info!(
            target: "battle::encounter",
            encounter = %self.id,
            %network_id,
            side = side.index(),
            late,
            "combatant joined"
        );

        if late {
            if let Some(snapshot) = self.snapshot(network_id) {
                self.broadcast(ServerMessage::BattleJoin(snapshot));
            }
            if is_player {
                let start = self.start_message();
                self.send_to(network_id, start);
            }
        }
        Ok(handle)
    }

    fn start_message(&self) -> ServerMessage {
        ServerMessage::BattleStart {
            encounter: self.id,
            zone: self.setup.zone,
            pvp: self.setup.pvp,
            boss: self.setup.boss,
            combatants: self.snapshots(),
        }
    }

    /// `Forming → Active`. Randomizes initial turn timers and announces the
    /// roster.
    pub fn start(&mut self, env: &BattleEnv<'_>) -> Result<(), EncounterError> {
        if self.phase != EncounterPhase::Forming {
            return Err(EncounterError::NotActive);
        }
        let max_start = env.config.max_start_turn_timer.max(0.0);
        for handle in self.roster.handles() {
            let timer = self.rng.unit() * max_start;
            if let Some(combatant) = self.roster.get_mut(handle) {
                combatant.turn_timer = timer;
                env.recompute(combatant)?;
            }
        }
        self.phase = EncounterPhase::Active;
        info!(
            target: "battle::encounter",
            encounter = %self.id,
            combatants = self.roster.len(),
            zone = ?self.setup.zone,
            pvp = self.setup.pvp,
            "encounter started"
        );
        let start = self.start_message();
        self.broadcast(start);
        Ok(())
    }

    /// Remove a combatant (disconnect, map change, death cleanup).
    ///
    /// Every reference other combatants hold to it is dropped, pending
    /// presentation of its results is stripped, and the server announces the
    /// departure.
    pub fn remove_combatant(&mut self, network_id: NetworkId) -> Result<Combatant, EncounterError> {
        let handle = self.handle_of(network_id)?;
        let combatant = self
            .roster
            .remove(handle)
            .ok_or(EncounterError::UnknownCombatant(network_id))?;

        for other in self.roster.handles() {
            if let Some(other) = self.roster.get_mut(other) {
                other.forget(handle);
            }
        }
        self.presented.retain(|p| p.source != network_id);

        info!(
            target: "battle::encounter",
            encounter = %self.id,
            %network_id,
            "combatant left"
        );
        if self.authority == Authority::Server {
            self.broadcast(ServerMessage::BattleLeave { network_id });
        }
        Ok(combatant)
    }

    /// `→ Closed`. Returns every combatant, in roster order, to the caller.
    pub fn close(&mut self) -> Vec<Combatant> {
        self.phase = EncounterPhase::Closed;
        let mut combatants = self.roster.drain();
        for combatant in &mut combatants {
            combatant.clear_action();
            combatant.flags.remove(CombatantFlags::JOINED_LATE);
        }
        debug!(
            target: "battle::encounter",
            encounter = %self.id,
            released = combatants.len(),
            "encounter closed"
        );
        combatants
    }

    // ===== intents =====

    /// Action-bar press by `network_id`. See [`action::select_action`].
    pub fn select_action(
        &mut self,
        env: &BattleEnv<'_>,
        network_id: NetworkId,
        slot: u8,
    ) -> Result<IntentState, EncounterError> {
        self.require_active()?;
        let handle = self.handle_of(network_id)?;
        Ok(action::select_action(env, &mut self.roster, handle, slot)?)
    }

    /// Directional re-targeting. See [`action::change_target`].
    pub fn change_target(
        &mut self,
        env: &BattleEnv<'_>,
        network_id: NetworkId,
        step: CycleStep,
        swap_side: bool,
    ) -> Result<bool, EncounterError> {
        self.require_active()?;
        let handle = self.handle_of(network_id)?;
        Ok(action::change_target(env, &mut self.roster, handle, step, swap_side)?)
    }

    /// Commit an action received over the network.
    ///
    /// A rejected intent is answered with `ActionClear` so the sender stops
    /// waiting on it. The exception is `AlreadyCommitted`: the earlier action
    /// still resolves and its `ActionResults` clears the sender.
    pub fn use_action(
        &mut self,
        env: &BattleEnv<'_>,
        network_id: NetworkId,
        slot: u8,
        targets: &[NetworkId],
    ) -> Result<(), EncounterError> {
        self.require_active()?;
        let handle = self.handle_of(network_id)?;
        let result = action::commit_action(env, &mut self.roster, handle, slot, targets);
        if let Err(err) = &result {
            debug!(
                target: "battle::encounter",
                encounter = %self.id,
                %network_id,
                slot,
                error = %err,
                "intent rejected"
            );
            if self.authority == Authority::Server && *err != IntentError::AlreadyCommitted {
                self.send_to(network_id, ServerMessage::ActionClear { network_id });
            }
        }
        Ok(result?)
    }

    fn require_active(&self) -> Result<(), EncounterError> {
        match self.phase {
            EncounterPhase::Active => Ok(()),
            EncounterPhase::Closed => Err(EncounterError::Closed),
            _ => Err(EncounterError::NotActive),
        }
    }

    // ===== simulation =====

    /// Advance the encounter by `dt` seconds.
    pub fn tick(&mut self, env: &BattleEnv<'_>, dt: f64) -> Result<(), EncounterError> {
        if self.phase != EncounterPhase::Active {
            return Ok(());
        }
        match self.authority {
            Authority::Server => self.tick_server(env, dt),
            Authority::Observer => {
                self.tick_presentation(env, dt);
                Ok(())
            }
        }
    }

    fn tick_server(&mut self, env: &BattleEnv<'_>, dt: f64) -> Result<(), EncounterError> {
        for handle in self.roster.handles() {
            if let Some(combatant) = self.roster.get_mut(handle) {
                advance_timer(env, combatant, dt);
                combatant.tick_cooldowns(dt);
            }
            self.tick_effects(env, handle, dt)?;
            self.tick_regen(env, handle, dt)?;
        }

        ai::plan(env, &mut self.roster, &mut self.rng)?;

        for handle in self.roster.handles() {
            let ready = self
                .roster
                .get(handle)
                .is_some_and(|c| c.turn_timer >= 1.0 && c.intent == IntentState::Committed);
            if !ready {
                continue;
            }
            match action::resolve(env, &mut self.roster, &mut self.rng, handle)? {
                Resolution::Resolved(result) => {
                    self.broadcast(ServerMessage::ActionResults(result));
                }
                Resolution::Cleared { network_id } => {
                    self.send_to(network_id, ServerMessage::ActionClear { network_id });
                }
                Resolution::Idle => {}
            }
        }

        self.check_end(env, dt)
    }

    fn tick_effects(
        &mut self,
        env: &BattleEnv<'_>,
        handle: CombatantHandle,
        dt: f64,
    ) -> Result<(), EncounterError> {
        let Some(combatant) = self.roster.get_mut(handle) else {
            return Ok(());
        };
        if combatant.effects.is_empty() {
            return Ok(());
        }
        let schema = env.tables.schema();
        let alive = combatant.is_alive();
        let ledger = combatant.effects.tick(dt, alive, true, env.tables)?;
        if ledger.is_empty() {
            return Ok(());
        }

        let mut change = StatChange::new();
        for (buff, level) in &ledger.updates {
            let def = env.tables.buff(*buff)?;
            let update = env.executor.update(&def.effect, *level, combatant);
            combatant.attributes.apply_change(schema, &update);
            for (attribute, value) in update.iter() {
                change.add(attribute, value);
            }
        }
        env.recompute(combatant)?;

        let network_id = combatant.network_id;
        let (health, mana) = (combatant.health(), combatant.mana());
        if alive && !combatant.is_alive() {
            env.world.on_death(combatant);
        }
        for expired in &ledger.expired {
            self.broadcast(ServerMessage::BuffUpdate {
                network_id,
                buff: expired.buff,
                deleted: true,
                infinite: expired.infinite,
                level: expired.level,
                duration: 0.0,
            });
        }
        if !change.is_empty() {
            self.broadcast(ServerMessage::StatChange {
                network_id,
                change,
                health,
                mana,
            });
        }
        Ok(())
    }

    /// Health and mana regeneration once per simulated second.
    fn tick_regen(
        &mut self,
        env: &BattleEnv<'_>,
        handle: CombatantHandle,
        dt: f64,
    ) -> Result<(), EncounterError> {
        let Some(combatant) = self.roster.get_mut(handle) else {
            return Ok(());
        };
        if !combatant.is_alive() {
            combatant.regen_timer = 0.0;
            return Ok(());
        }
        combatant.regen_timer += dt;
        let mut change = StatChange::new();
        while combatant.regen_timer >= 1.0 {
            combatant.regen_timer -= 1.0;
            for (current, max, regen) in [
                (Attribute::Health, Attribute::MaxHealth, Attribute::HealthRegen),
                (Attribute::Mana, Attribute::MaxMana, Attribute::ManaRegen),
            ] {
                let amount = combatant.attributes.int(regen);
                let missing = combatant.attributes.int(max) - combatant.attributes.int(current);
                if amount > 0 && missing > 0 {
                    let gained = amount.min(missing);
                    let value = combatant.attributes.int(current) + gained;
                    combatant.attributes.set_int(current, value);
                    change.add(current, AttributeValue::Int(gained));
                }
            }
        }
        if change.is_empty() {
            return Ok(());
        }
        let message = ServerMessage::StatChange {
            network_id: combatant.network_id,
            change,
            health: combatant.health(),
            mana: combatant.mana(),
        };
        self.broadcast(message);
        Ok(())
    }

    fn check_end(&mut self, env: &BattleEnv<'_>, dt: f64) -> Result<(), EncounterError> {
        let wiped = self.alive_count(Side::Left) == 0 || self.alive_count(Side::Right) == 0;
        if !wiped {
            self.dead_timer = 0.0;
            return Ok(());
        }
        self.dead_timer += dt;
        if self.dead_timer < env.config.grace_period {
            return Ok(());
        }

        self.phase = EncounterPhase::Ending;
        let summaries = rewards::distribute(env, &self.setup, &mut self.roster, &mut self.rng)?;
        info!(
            target: "battle::encounter",
            encounter = %self.id,
            left_alive = self.alive_count(Side::Left),
            right_alive = self.alive_count(Side::Right),
            "encounter ending"
        );
        for (network_id, summary) in summaries {
            self.send_to(network_id, ServerMessage::BattleEnd(summary));
        }
        Ok(())
    }

    // ===== replication helpers =====

    /// Queue a full resync for one peer: a fresh `BattleStart` with the
    /// current roster, then every combatant's status effects.
    pub fn resync(&mut self, peer: NetworkId) {
        let start = self.start_message();
        self.send_to(peer, start);
        let messages: Vec<_> = self
            .roster
            .iter()
            .map(|(_, c)| ServerMessage::StatusEffects {
                network_id: c.network_id,
                effects: c.effects.iter().map(EffectSnapshot::from).collect(),
            })
            .collect();
        for message in messages {
            self.send_to(peer, message);
        }
    }

    /// Next unsequenced snapshot of every combatant.
    pub fn position_batch(&mut self) -> PositionBatch {
        self.batch_sequence = self.batch_sequence.wrapping_add(1);
        PositionBatch {
            update_id: self.id,
            sequence: self.batch_sequence,
            entries: self
                .roster
                .iter()
                .map(|(_, c)| PositionEntry {
                    network_id: c.network_id,
                    position: c.position,
                    turn_timer: c.turn_timer,
                    health: c.health(),
                    mana: c.mana(),
                    stunned: c.is_stunned(),
                })
                .collect(),
        }
    }
}

/// Advance one combatant's turn timer, clamped to 1.
///
/// Stunned combatants gain a fixed rate regardless of their speed.
pub(crate) fn advance_timer(env: &BattleEnv<'_>, combatant: &mut Combatant, dt: f64) {
    if !combatant.is_alive() || combatant.turn_timer >= 1.0 {
        return;
    }
    let rate = if combatant.is_stunned() {
        env.config.stunned_timer_rate
    } else {
        let period = env.aggregator().attack_period(combatant);
        let speed = f64::from(combatant.attributes.int(Attribute::BattleSpeed)) / 100.0;
        speed / period
    };
    combatant.turn_timer = (combatant.turn_timer + dt * rate).min(1.0);
}
