//! Callbacks into the world that owns persistent character data.
//!
//! The battle core never persists anything. It reports deaths, level-ups,
//! rewards and inventory changes through [`WorldHooks`] and lets the host
//! decide what to save or log.

use crate::combatant::Combatant;
use crate::ids::{ItemId, NetworkId};
use crate::protocol::BattleEnd;

pub trait WorldHooks: Send + Sync {
    fn on_death(&self, combatant: &Combatant) {
        let _ = combatant;
    }

    fn on_level_up(&self, combatant: &Combatant, previous_level: i32) {
        let _ = (combatant, previous_level);
    }

    /// Called once per player with the summary that is about to be sent.
    fn on_rewarded(&self, combatant: &Combatant, summary: &BattleEnd) {
        let _ = (combatant, summary);
    }

    fn add_item(&self, owner: NetworkId, item: ItemId, upgrades: u32, count: u32) {
        let _ = (owner, item, upgrades, count);
    }

    fn update_item_count(&self, owner: NetworkId, item: ItemId, delta: i32) {
        let _ = (owner, item, delta);
    }
}

/// Hooks that ignore every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullWorld;

impl WorldHooks for NullWorld {}
