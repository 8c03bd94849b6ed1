//! Event payloads for each topic.

use battle_core::{
    BattleEnd, Combatant, EncounterId, ItemId, NetworkId, Recipient, ServerMessage,
};

/// One replicated message on its way to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub encounter: EncounterId,
    pub recipient: Recipient,
    /// Network ids that should receive the message, resolved when it was
    /// published.
    pub audience: Vec<NetworkId>,
    pub message: ServerMessage,
}

impl Envelope {
    pub fn is_for(&self, network_id: NetworkId) -> bool {
        self.audience.contains(&network_id)
    }
}

/// Notifications for the world that owns persistent character data.
#[derive(Debug, Clone)]
pub enum WorldEvent {
    Died {
        network_id: NetworkId,
    },
    LeveledUp {
        network_id: NetworkId,
        previous: i32,
        level: i32,
    },
    Rewarded {
        network_id: NetworkId,
        summary: BattleEnd,
    },
    ItemAdded {
        owner: NetworkId,
        item: ItemId,
        upgrades: u32,
        count: u32,
    },
    ItemCountChanged {
        owner: NetworkId,
        item: ItemId,
        delta: i32,
    },
    /// A combatant left its encounter and is handed back with its
    /// persistent attributes and record.
    Released {
        encounter: EncounterId,
        combatant: Box<Combatant>,
    },
}
