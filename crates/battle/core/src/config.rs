use serde::{Deserialize, Serialize};

/// Battle constants and tunable parameters.
///
/// Loaded once at startup (usually from `battle.toml`) and passed by reference
/// through [`crate::BattleEnv`]. Every field has a default so partial files are
/// accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Seconds one side must stay fully dead before the encounter ends.
    pub grace_period: f64,
    /// Seconds for an unmodified combatant to fill its turn timer.
    pub base_attack_period: f64,
    /// Turn timer gain per second while stunned, regardless of speed.
    pub stunned_timer_rate: f64,
    /// Upper bound (exclusive) for randomized turn timers at battle start.
    pub max_start_turn_timer: f64,

    pub min_battle_speed: i32,
    pub min_move_speed: i32,
    pub max_evasion: i32,
    pub max_resistance: i32,
    /// Flat item stats gain this percentage per upgrade level.
    pub upgrade_bonus_percent: i32,
    pub max_gold: i64,

    /// Fraction of gold lost by a player who dies in a PVE encounter.
    pub death_gold_penalty: f64,
    /// Fraction of gold lost by a player who dies in a PVP encounter.
    pub pvp_death_gold_penalty: f64,
    /// Fraction of gold lost in PVP when the victim carries a bounty.
    pub pvp_bounty_gold_penalty: f64,

    /// Presentation hints attached to every action result.
    pub result_timeout: f64,
    pub result_speed: f64,
    pub miss_result_timeout: f64,
    pub miss_result_speed: f64,
}

impl BattleConfig {
    // ===== compile-time limits =====
    pub const MAX_COMBATANTS: usize = 16;
    pub const MAX_ACTION_BAR: usize = 8;
    /// Whole-side actions must reach every other roster member.
    pub const MAX_TARGETS: usize = Self::MAX_COMBATANTS;
    pub const MAX_SIDES: usize = 2;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_GRACE_PERIOD: f64 = 2.5;
    pub const DEFAULT_ATTACK_PERIOD: f64 = 3.0;
    pub const DEFAULT_STUNNED_RATE: f64 = 0.1;
    pub const DEFAULT_MAX_START_TIMER: f64 = 0.4;

    pub fn new() -> Self {
        Self {
            grace_period: Self::DEFAULT_GRACE_PERIOD,
            base_attack_period: Self::DEFAULT_ATTACK_PERIOD,
            stunned_timer_rate: Self::DEFAULT_STUNNED_RATE,
            max_start_turn_timer: Self::DEFAULT_MAX_START_TIMER,
            min_battle_speed: 10,
            min_move_speed: 50,
            max_evasion: 95,
            max_resistance: 90,
            upgrade_bonus_percent: 10,
            max_gold: 1_000_000_000,
            death_gold_penalty: 0.10,
            pvp_death_gold_penalty: 0.25,
            pvp_bounty_gold_penalty: 0.50,
            result_timeout: 1.5,
            result_speed: 1.0,
            miss_result_timeout: 1.0,
            miss_result_speed: 1.5,
        }
    }

    /// Value of an item stat after `upgrades` upgrade levels.
    pub fn upgraded(&self, base: i32, upgrades: u32) -> i32 {
        let bonus = i64::from(base) * i64::from(upgrades) * i64::from(self.upgrade_bonus_percent);
        (i64::from(base) + bonus / 100) as i32
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self::new()
    }
}
