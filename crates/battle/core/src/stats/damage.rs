use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter};

use super::Attribute;

/// Damage type for resistances and power multipliers.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumCount, EnumIter,
)]
pub enum DamageType {
    #[default]
    Physical,
    Fire,
    Cold,
    Lightning,
    Poison,
    Bleed,
}

impl DamageType {
    pub const fn power(self) -> Attribute {
        match self {
            DamageType::Physical => Attribute::PhysicalPower,
            DamageType::Fire => Attribute::FirePower,
            DamageType::Cold => Attribute::ColdPower,
            DamageType::Lightning => Attribute::LightningPower,
            DamageType::Poison => Attribute::PoisonPower,
            DamageType::Bleed => Attribute::BleedPower,
        }
    }

    pub const fn resistance(self) -> Attribute {
        match self {
            DamageType::Physical => Attribute::PhysicalResist,
            DamageType::Fire => Attribute::FireResist,
            DamageType::Cold => Attribute::ColdResist,
            DamageType::Lightning => Attribute::LightningResist,
            DamageType::Poison => Attribute::PoisonResist,
            DamageType::Bleed => Attribute::BleedResist,
        }
    }
}

/// Weapon damage accumulated for one damage type during a recompute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DamageBucket {
    pub min: i32,
    pub max: i32,
}

impl DamageBucket {
    pub fn is_empty(&self) -> bool {
        self.min == 0 && self.max == 0
    }
}
