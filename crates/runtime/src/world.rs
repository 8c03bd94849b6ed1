//! World hooks that forward battle callbacks onto the event bus.

use battle_core::{BattleEnd, Combatant, ItemId, NetworkId, WorldHooks};
use tracing::debug;

use crate::events::{Event, EventBus, WorldEvent};

/// [`WorldHooks`] implementation publishing every callback as a
/// [`WorldEvent`] on [`Topic::World`](crate::Topic::World).
#[derive(Clone, Default)]
pub struct EventWorld {
    bus: EventBus,
}

impl EventWorld {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    fn publish(&self, event: WorldEvent) {
        self.bus.publish(Event::World(event));
    }
}

impl WorldHooks for EventWorld {
    fn on_death(&self, combatant: &Combatant) {
        debug!(target: "runtime::world", network_id = %combatant.network_id, "died");
        self.publish(WorldEvent::Died {
            network_id: combatant.network_id,
        });
    }

    fn on_level_up(&self, combatant: &Combatant, previous_level: i32) {
        self.publish(WorldEvent::LeveledUp {
            network_id: combatant.network_id,
            previous: previous_level,
            level: combatant.level(),
        });
    }

    fn on_rewarded(&self, combatant: &Combatant, summary: &BattleEnd) {
        self.publish(WorldEvent::Rewarded {
            network_id: combatant.network_id,
            summary: summary.clone(),
        });
    }

    fn add_item(&self, owner: NetworkId, item: ItemId, upgrades: u32, count: u32) {
        self.publish(WorldEvent::ItemAdded {
            owner,
            item,
            upgrades,
            count,
        });
    }

    fn update_item_count(&self, owner: NetworkId, item: ItemId, delta: i32) {
        self.publish(WorldEvent::ItemCountChanged { owner, item, delta });
    }
}
