//! End-of-battle reward pass.
//!
//! Runs once, on the authoritative side, when an encounter enters `Ending`.
//! The losing side's experience and gold are split across the winners who are
//! still standing, drops are rolled, dead players pay their death penalty, and
//! every player's persistent counters are updated exactly once. A lookup
//! failure while rolling drops only cancels the drops.

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::{EncounterSetup, Roster};
use crate::BattleEnv;
use crate::combatant::CombatantKind;
use crate::ids::{CombatantHandle, ItemId, NetworkId, Side};
use crate::protocol::BattleEnd;
use crate::rng::BattleRng;
use crate::stats::{Attribute, AttributeValue};
use crate::tables::DataError;

/// Split `total` across `recipients` without ever handing out more than
/// `total`.
///
/// Every recipient gets `total / recipients`. When that rounds to zero the
/// first `total` recipients get one unit each. Any remainder is absorbed.
pub fn split(total: i64, recipients: usize) -> Vec<i64> {
    if recipients == 0 || total <= 0 {
        return vec![0; recipients];
    }
    let per = total / recipients as i64;
    if per > 0 {
        return vec![per; recipients];
    }
    (0..recipients as i64).map(|i| i64::from(i < total)).collect()
}

/// Winning side: the one whose opponents are all down. `None` is a draw.
pub fn winner(left_alive: usize, right_alive: usize) -> Option<Side> {
    match (left_alive > 0, right_alive > 0) {
        (true, false) => Some(Side::Left),
        (false, true) => Some(Side::Right),
        _ => None,
    }
}

struct Pass<'r, 'e> {
    env: &'r BattleEnv<'e>,
    setup: &'r EncounterSetup,
    roster: &'r mut Roster,
    rng: &'r mut BattleRng,
    summaries: BTreeMap<NetworkId, BattleEnd>,
}

impl Pass<'_, '_> {
    fn handles(&self, side: Side, filter: impl Fn(bool, bool) -> bool) -> Vec<CombatantHandle> {
        self.roster
            .side_handles(side)
            .into_iter()
            .filter(|&h| {
                self.roster
                    .get(h)
                    .is_some_and(|c| filter(c.is_monster(), c.is_alive()))
            })
            .collect()
    }

    fn summary(&mut self, handle: CombatantHandle) -> Option<&mut BattleEnd> {
        let id = self.roster.get(handle)?.network_id;
        self.summaries.get_mut(&id)
    }

    fn add(&mut self, handle: CombatantHandle, attribute: Attribute, value: AttributeValue) {
        let env = self.env;
        if let Some(c) = self.roster.get_mut(handle) {
            c.attributes.apply(env.tables.schema(), attribute, value);
        }
    }

    fn give_drop(&mut self, handle: CombatantHandle, item: ItemId) {
        let Some(owner) = self.roster.get(handle).map(|c| c.network_id) else {
            return;
        };
        self.env.world.add_item(owner, item, 0, 1);
        if let Some(summary) = self.summaries.get_mut(&owner) {
            summary.push_drop(item, 0);
        }
    }

    fn award(&mut self, winners: &[CombatantHandle], losers: &[CombatantHandle]) {
        let mut experience = 0i64;
        let mut gold = 0i64;
        for &h in losers {
            let Some(c) = self.roster.get(h) else {
                continue;
            };
            experience += c.worth.experience.max(0);
            gold += c.worth.gold.max(0);
            if !c.is_monster() && c.gold_stolen > 0 {
                let forfeited = c.gold_stolen.min(c.gold());
                gold += forfeited;
                self.add(h, Attribute::Gold, AttributeValue::Int64(-forfeited));
                if let Some(summary) = self.summary(h) {
                    summary.gold_lost += forfeited;
                }
            }
        }

        let exp_shares = split(experience, winners.len());
        let gold_shares = split(gold, winners.len());
        for ((&h, exp), gold) in winners.iter().zip(exp_shares).zip(gold_shares) {
            self.add(h, Attribute::Experience, AttributeValue::Int64(exp));
            self.add(h, Attribute::Gold, AttributeValue::Int64(gold));
            if let Some(summary) = self.summary(h) {
                summary.experience += exp;
                summary.gold += gold;
            }
        }
        info!(
            target: "battle::rewards",
            experience,
            gold,
            recipients = winners.len(),
            "rewards split"
        );
    }

    fn boss_drops(&mut self, winners: &[CombatantHandle]) {
        let env = self.env;
        let Some(zone_id) = self.setup.zone else {
            return;
        };
        let zone = match env.tables.zone(zone_id) {
            Ok(zone) => zone,
            Err(err) => {
                warn!(target: "battle::rewards", zone = %zone_id, error = %err, "boss drops skipped");
                return;
            }
        };
        for &h in winners {
            let remaining = self
                .roster
                .get(h)
                .and_then(|c| c.record.boss_cooldowns.get(&zone_id).copied());
            if let Some(remaining) = remaining {
                if let Some(summary) = self.summary(h) {
                    summary.boss_cooldown = remaining;
                }
                continue;
            }
            for _ in 0..zone.drop_rolls {
                if let Some(item) = env.tables.roll_drop(&zone.drops, &mut *self.rng) {
                    self.give_drop(h, item);
                }
            }
            if let Some(c) = self.roster.get_mut(h) {
                c.record.boss_cooldowns.insert(zone_id, zone.cooldown);
            }
            if let Some(summary) = self.summary(h) {
                summary.boss_cooldown = zone.cooldown;
            }
        }
    }

    fn monster_drops(&mut self, winners: &[CombatantHandle], losers: &[CombatantHandle]) {
        let env = self.env;
        let mut eligible = winners.to_vec();
        self.rng.shuffle(&mut eligible);
        let mut next = 0usize;
        for &h in losers {
            let Some(CombatantKind::Monster(id)) = self.roster.get(h).map(|c| c.kind) else {
                continue;
            };
            let def = match env.tables.monster(id) {
                Ok(def) => def,
                Err(err) => {
                    warn!(target: "battle::rewards", monster = %id, error = %err, "drops skipped");
                    continue;
                }
            };
            if let Some(item) = env.tables.roll_drop(&def.drops, &mut *self.rng) {
                let recipient = eligible[next % eligible.len()];
                next += 1;
                self.give_drop(recipient, item);
            }
        }
    }

    fn count_kills(&mut self, winners: &[CombatantHandle], losers: &[CombatantHandle]) {
        let (mut players, mut monsters) = (0, 0);
        for &h in losers {
            match self.roster.get(h).map(|c| c.is_monster()) {
                Some(true) => monsters += 1,
                Some(false) => players += 1,
                None => {}
            }
        }
        for &h in winners {
            self.add(h, Attribute::PlayerKills, AttributeValue::Int(players));
            self.add(h, Attribute::MonsterKills, AttributeValue::Int(monsters));
        }
    }

    /// Gold penalty for a dead player; in PVP its bounty goes to `collectors`.
    fn death_penalty(&mut self, victim: CombatantHandle, collectors: &[CombatantHandle]) {
        let config = self.env.config;
        let Some(c) = self.roster.get(victim) else {
            return;
        };
        let gold = c.gold();
        let bounty = c.attributes.int64(Attribute::Bounty);
        let fraction = match (self.setup.pvp, bounty > 0) {
            (false, _) => config.death_gold_penalty,
            (true, false) => config.pvp_death_gold_penalty,
            (true, true) => config.pvp_bounty_gold_penalty,
        };
        let lost = ((gold as f64) * fraction).floor() as i64;

        self.add(victim, Attribute::Gold, AttributeValue::Int64(-lost));
        self.add(victim, Attribute::Deaths, AttributeValue::Int(1));
        if let Some(summary) = self.summary(victim) {
            summary.gold_lost += lost;
        }

        if self.setup.pvp && bounty > 0 && !collectors.is_empty() {
            self.add(victim, Attribute::Bounty, AttributeValue::Int64(-bounty));
            if let Some(summary) = self.summary(victim) {
                summary.bounty -= bounty;
            }
            for (&h, share) in collectors.iter().zip(split(bounty, collectors.len())) {
                self.add(h, Attribute::Gold, AttributeValue::Int64(share));
                if let Some(summary) = self.summary(h) {
                    summary.bounty += share;
                }
            }
        }
    }
}

/// Run the reward pass and return one summary per player, in roster order.
pub(super) fn distribute(
    env: &BattleEnv<'_>,
    setup: &EncounterSetup,
    roster: &mut Roster,
    rng: &mut BattleRng,
) -> Result<Vec<(NetworkId, BattleEnd)>, DataError> {
    let mut levels = BTreeMap::new();
    let mut summaries = BTreeMap::new();
    for (_, c) in roster.iter() {
        if !c.is_monster() {
            levels.insert(c.network_id, c.level());
            summaries.insert(c.network_id, BattleEnd::default());
        }
    }

    let mut pass = Pass {
        env,
        setup,
        roster,
        rng,
        summaries,
    };

    let winner = winner(
        pass.handles(Side::Left, |_, alive| alive).len(),
        pass.handles(Side::Right, |_, alive| alive).len(),
    );

    match winner {
        Some(side) => {
            let losers = pass.handles(side.opposite(), |_, _| true);
            let recipients = pass.handles(side, |monster, alive| !monster && alive);
            let winner_players = pass.handles(side, |monster, _| !monster);

            if !recipients.is_empty() {
                pass.award(&recipients, &losers);
                if setup.boss {
                    pass.boss_drops(&recipients);
                } else {
                    pass.monster_drops(&recipients, &losers);
                }
            }
            pass.count_kills(&winner_players, &losers);

            for h in pass.handles(side, |_, alive| !alive) {
                if let Some(c) = pass.roster.get_mut(h) {
                    c.attributes.set_int(Attribute::Health, 1);
                }
            }

            for victim in pass.handles(side.opposite(), |monster, alive| !monster && !alive) {
                pass.death_penalty(victim, &recipients);
            }
        }
        None => {
            for side in [Side::Left, Side::Right] {
                let collectors = pass.handles(side.opposite(), |monster, _| !monster);
                for victim in pass.handles(side, |monster, alive| !monster && !alive) {
                    pass.death_penalty(victim, &collectors);
                }
            }
        }
    }

    let Pass {
        roster, summaries, ..
    } = pass;
    let mut out = Vec::with_capacity(summaries.len());
    for handle in roster.handles() {
        let Some(c) = roster.get_mut(handle) else {
            continue;
        };
        env.recompute(c)?;
        let Some(mut summary) = summaries.get(&c.network_id).cloned() else {
            continue;
        };
        summary.player_kills = c.attributes.int(Attribute::PlayerKills);
        summary.monster_kills = c.attributes.int(Attribute::MonsterKills);

        let before = levels.get(&c.network_id).copied().unwrap_or_default();
        if c.level() > before {
            info!(
                target: "battle::rewards",
                network_id = %c.network_id,
                level = c.level(),
                "level up"
            );
            env.world.on_level_up(c, before);
        }
        env.world.on_rewarded(c, &summary);
        out.push((c.network_id, summary));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_never_exceeds_total() {
        for total in 0..40 {
            for recipients in 1..7 {
                let shares = split(total, recipients);
                assert_eq!(shares.len(), recipients);
                assert!(shares.iter().sum::<i64>() <= total);
                if total > 0 && recipients as i64 <= total {
                    assert!(shares.iter().all(|&s| s >= 1));
                }
            }
        }
        assert_eq!(split(10, 3), vec![3, 3, 3]);
        assert_eq!(split(2, 3), vec![1, 1, 0]);
        assert!(split(5, 0).is_empty());
    }

    #[test]
    fn winner_needs_exactly_one_side_standing() {
        assert_eq!(winner(2, 0), Some(Side::Left));
        assert_eq!(winner(0, 1), Some(Side::Right));
        assert_eq!(winner(0, 0), None);
        assert_eq!(winner(1, 1), None);
    }
}
