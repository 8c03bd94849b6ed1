//! Generational slot storage for an encounter's combatants.

use crate::combatant::Combatant;
use crate::ids::{CombatantHandle, NetworkId, Side};

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    combatant: Option<Combatant>,
}

/// Combatants in join order, addressed by [`CombatantHandle`].
///
/// Removing a combatant bumps its slot generation, so every handle that still
/// points at it stops resolving.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    slots: Vec<Slot>,
    order: Vec<CombatantHandle>,
    free: Vec<u32>,
}

impl Roster {
    pub fn insert(&mut self, combatant: Combatant) -> CombatantHandle {
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.combatant = Some(combatant);
                CombatantHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    combatant: Some(combatant),
                });
                CombatantHandle {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.order.push(handle);
        handle
    }

    pub fn remove(&mut self, handle: CombatantHandle) -> Option<Combatant> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let combatant = slot.combatant.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.order.retain(|h| *h != handle);
        Some(combatant)
    }

    pub fn get(&self, handle: CombatantHandle) -> Option<&Combatant> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.combatant.as_ref()
    }

    pub fn get_mut(&mut self, handle: CombatantHandle) -> Option<&mut Combatant> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.combatant.as_mut()
    }

    pub fn find(&self, network_id: NetworkId) -> Option<CombatantHandle> {
        self.order
            .iter()
            .copied()
            .find(|&h| self.get(h).is_some_and(|c| c.network_id == network_id))
    }

    /// Handles in join order.
    pub fn handles(&self) -> Vec<CombatantHandle> {
        self.order.clone()
    }

    /// Handles on one side, in join order.
    pub fn side_handles(&self, side: Side) -> Vec<CombatantHandle> {
        self.order
            .iter()
            .copied()
            .filter(|&h| self.get(h).is_some_and(|c| c.side == side))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CombatantHandle, &Combatant)> {
        self.order
            .iter()
            .filter_map(|&h| self.get(h).map(|c| (h, c)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drain every combatant in join order.
    pub fn drain(&mut self) -> Vec<Combatant> {
        let order = std::mem::take(&mut self.order);
        let out = order
            .into_iter()
            .filter_map(|h| {
                let slot = self.slots.get_mut(h.index())?;
                slot.generation = slot.generation.wrapping_add(1);
                slot.combatant.take()
            })
            .collect();
        self.slots.clear();
        self.free.clear();
        out
    }
}
