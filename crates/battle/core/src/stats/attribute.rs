//! Closed attribute schema.
//!
//! Every combatant carries one [`AttributeMap`] with a slot per [`Attribute`].
//! The value kind of each slot is intrinsic to the attribute; the update rule,
//! default and "calculated" flag come from the [`AttributeSchema`], which
//! content may adjust at load time.

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::tables::DataError;

use super::StatChange;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum Attribute {
    // resources
    Health,
    MaxHealth,
    Mana,
    MaxMana,
    HealthRegen,
    ManaRegen,

    // offence
    MinDamage,
    MaxDamage,
    Pierce,
    HitChance,
    AttackPower,
    HealPower,
    PhysicalPower,
    FirePower,
    ColdPower,
    LightningPower,
    PoisonPower,
    BleedPower,
    ElementalPower,

    // defence
    Armor,
    DamageBlock,
    Evasion,
    PhysicalResist,
    FireResist,
    ColdResist,
    LightningResist,
    PoisonResist,
    BleedResist,
    AllResist,

    // timing
    BattleSpeed,
    AttackPeriod,
    MoveSpeed,
    Stunned,

    // misc
    DropRate,
    Invisible,
    Level,
    SkillPoints,

    // persistent record
    Experience,
    Gold,
    Bounty,
    PlayerKills,
    MonsterKills,
    Deaths,
}

/// Storage kind of an attribute slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    Int64,
    Float,
    Bool,
}

/// How a [`StatChange`] entry folds into the existing value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateKind {
    Add,
    Set,
    Multiply,
}

impl Attribute {
    pub const fn kind(self) -> ValueKind {
        use Attribute::*;
        match self {
            Experience | Gold | Bounty => ValueKind::Int64,
            AttackPower | HealPower | PhysicalPower | FirePower | ColdPower | LightningPower
            | PoisonPower | BleedPower | ElementalPower | AttackPeriod => ValueKind::Float,
            Stunned | Invisible => ValueKind::Bool,
            _ => ValueKind::Int,
        }
    }

    /// Attributes that exist only to fan a bonus out to several others.
    pub const fn family(self) -> &'static [Attribute] {
        use Attribute::*;
        match self {
            AllResist => &[
                PhysicalResist,
                FireResist,
                ColdResist,
                LightningResist,
                PoisonResist,
                BleedResist,
            ],
            ElementalPower => &[FirePower, ColdPower, LightningPower],
            _ => &[],
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Resolve a content-facing attribute name.
    pub fn parse(name: &str) -> Result<Self, DataError> {
        name.parse()
            .map_err(|_| DataError::UnknownAttribute(name.to_string()))
    }
}

/// A single attribute value tagged with its storage kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Int(i32),
    Int64(i64),
    Float(f64),
    Bool(bool),
}

impl AttributeValue {
    pub const fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int => Self::Int(0),
            ValueKind::Int64 => Self::Int64(0),
            ValueKind::Float => Self::Float(0.0),
            ValueKind::Bool => Self::Bool(false),
        }
    }

    /// Convert a loosely-typed number into the given kind.
    pub fn from_f64(kind: ValueKind, value: f64) -> Self {
        match kind {
            ValueKind::Int => Self::Int(value.round() as i32),
            ValueKind::Int64 => Self::Int64(value.round() as i64),
            ValueKind::Float => Self::Float(value),
            ValueKind::Bool => Self::Bool(value != 0.0),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Int64(_) => ValueKind::Int64,
            Self::Float(_) => ValueKind::Float,
            Self::Bool(_) => ValueKind::Bool,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => f64::from(v),
            Self::Int64(v) => v as f64,
            Self::Float(v) => v,
            Self::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::Int(v) => i64::from(v),
            Self::Int64(v) => v,
            Self::Float(v) => v.round() as i64,
            Self::Bool(v) => i64::from(v),
        }
    }

    pub fn coerce(self, kind: ValueKind) -> Self {
        if self.kind() == kind {
            return self;
        }
        match kind {
            ValueKind::Int => Self::Int(self.as_i64().clamp(i32::MIN as i64, i32::MAX as i64) as i32),
            ValueKind::Int64 => Self::Int64(self.as_i64()),
            ValueKind::Float => Self::Float(self.as_f64()),
            ValueKind::Bool => Self::Bool(self.as_f64() != 0.0),
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Self::Int(v) => v == 0,
            Self::Int64(v) => v == 0,
            Self::Float(v) => v == 0.0,
            Self::Bool(v) => !v,
        }
    }

    fn combine(self, delta: AttributeValue, update: UpdateKind) -> Self {
        let delta = delta.coerce(self.kind());
        match (update, self, delta) {
            (UpdateKind::Set, _, delta) => delta,
            (UpdateKind::Add, Self::Int(a), Self::Int(b)) => Self::Int(a.saturating_add(b)),
            (UpdateKind::Add, Self::Int64(a), Self::Int64(b)) => Self::Int64(a.saturating_add(b)),
            (UpdateKind::Add, Self::Float(a), Self::Float(b)) => Self::Float(a + b),
            (UpdateKind::Add, Self::Bool(a), Self::Bool(b)) => Self::Bool(a || b),
            (UpdateKind::Multiply, Self::Int(a), factor) => {
                Self::Int((f64::from(a) * factor.as_f64()).round() as i32)
            }
            (UpdateKind::Multiply, Self::Int64(a), factor) => {
                Self::Int64((a as f64 * factor.as_f64()).round() as i64)
            }
            (UpdateKind::Multiply, Self::Float(a), factor) => Self::Float(a * factor.as_f64()),
            (_, current, _) => current,
        }
    }
}

/// Per-attribute schema row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub update: UpdateKind,
    pub default: AttributeValue,
    /// Calculated attributes are reset to `default` at the start of every
    /// recompute; the others (current health, gold, ...) persist.
    pub calculated: bool,
}

/// Attribute → slot mapping decided at content load time.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeSchema {
    specs: Vec<AttributeSpec>,
}

impl AttributeSchema {
    pub fn standard() -> Self {
        let specs = Attribute::iter().map(standard_spec).collect();
        Self { specs }
    }

    pub fn spec(&self, attribute: Attribute) -> &AttributeSpec {
        &self.specs[attribute as usize]
    }

    /// Override the default of one attribute. The value must match its kind.
    pub fn set_default(
        &mut self,
        attribute: Attribute,
        value: AttributeValue,
    ) -> Result<(), DataError> {
        if value.kind() != attribute.kind() {
            return Err(DataError::AttributeKind {
                attribute: attribute.name(),
                expected: attribute.kind(),
                found: value.kind(),
            });
        }
        self.specs[attribute as usize].default = value;
        Ok(())
    }

    /// A fresh map holding every default.
    pub fn defaults(&self) -> AttributeMap {
        AttributeMap {
            values: self.specs.iter().map(|spec| spec.default).collect(),
        }
    }
}

impl Default for AttributeSchema {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_spec(attribute: Attribute) -> AttributeSpec {
    use Attribute::*;
    let kind = attribute.kind();
    let update = match attribute {
        AttackPeriod | Stunned | Invisible => UpdateKind::Set,
        AttackPower | HealPower => UpdateKind::Multiply,
        _ => UpdateKind::Add,
    };
    let default = match attribute {
        AttackPower | HealPower | PhysicalPower | FirePower | ColdPower | LightningPower
        | PoisonPower | BleedPower => AttributeValue::Float(1.0),
        HitChance => AttributeValue::Int(95),
        BattleSpeed | MoveSpeed => AttributeValue::Int(100),
        Level => AttributeValue::Int(1),
        _ => AttributeValue::zero(kind),
    };
    let calculated = !matches!(
        attribute,
        Health | Mana | Experience | Gold | Bounty | PlayerKills | MonsterKills | Deaths
    );
    AttributeSpec {
        update,
        default,
        calculated,
    }
}

/// Dense attribute storage, one slot per [`Attribute`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeMap {
    values: Vec<AttributeValue>,
}

impl AttributeMap {
    pub fn get(&self, attribute: Attribute) -> AttributeValue {
        self.values[attribute as usize]
    }

    pub fn int(&self, attribute: Attribute) -> i32 {
        self.get(attribute).coerce(ValueKind::Int).as_i64() as i32
    }

    pub fn int64(&self, attribute: Attribute) -> i64 {
        self.get(attribute).as_i64()
    }

    pub fn float(&self, attribute: Attribute) -> f64 {
        self.get(attribute).as_f64()
    }

    pub fn flag(&self, attribute: Attribute) -> bool {
        !self.get(attribute).is_zero()
    }

    /// Overwrite a slot, coercing to the attribute's kind.
    pub fn set(&mut self, attribute: Attribute, value: AttributeValue) {
        self.values[attribute as usize] = value.coerce(attribute.kind());
    }

    pub fn set_int(&mut self, attribute: Attribute, value: i32) {
        self.set(attribute, AttributeValue::Int(value));
    }

    pub fn set_int64(&mut self, attribute: Attribute, value: i64) {
        self.set(attribute, AttributeValue::Int64(value));
    }

    pub fn set_float(&mut self, attribute: Attribute, value: f64) {
        self.set(attribute, AttributeValue::Float(value));
    }

    /// Fold one value in using the schema's update rule for `attribute`.
    ///
    /// Family attributes fan out to their members.
    pub fn apply(&mut self, schema: &AttributeSchema, attribute: Attribute, delta: AttributeValue) {
        let family = attribute.family();
        if !family.is_empty() {
            for &member in family {
                self.apply(schema, member, delta);
            }
            return;
        }
        let update = schema.spec(attribute).update;
        let slot = &mut self.values[attribute as usize];
        *slot = slot.combine(delta, update);
    }

    /// Fold a whole stat change in, in attribute order.
    pub fn apply_change(&mut self, schema: &AttributeSchema, change: &StatChange) {
        for (attribute, value) in change.iter() {
            self.apply(schema, attribute, value);
        }
    }

    pub(crate) fn reset_calculated(&mut self, schema: &AttributeSchema) {
        for attribute in Attribute::iter() {
            let spec = schema.spec(attribute);
            if spec.calculated {
                self.values[attribute as usize] = spec.default;
            }
        }
    }
}

impl Default for AttributeMap {
    fn default() -> Self {
        AttributeSchema::standard().defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_covers_every_attribute() {
        let schema = AttributeSchema::standard();
        for attribute in Attribute::iter() {
            assert_eq!(schema.spec(attribute).default.kind(), attribute.kind());
        }
        assert_eq!(Attribute::COUNT, schema.defaults().values.len());
    }

    #[test]
    fn unknown_attribute_name_is_rejected() {
        assert_eq!(Attribute::parse("MaxHealth").ok(), Some(Attribute::MaxHealth));
        let err = Attribute::parse("Charisma").unwrap_err();
        assert!(matches!(err, DataError::UnknownAttribute(name) if name == "Charisma"));
    }

    #[test]
    fn update_rules_follow_schema() {
        let schema = AttributeSchema::standard();
        let mut map = schema.defaults();

        map.apply(&schema, Attribute::Armor, AttributeValue::Int(3));
        map.apply(&schema, Attribute::Armor, AttributeValue::Int(4));
        assert_eq!(map.int(Attribute::Armor), 7);

        map.apply(&schema, Attribute::AttackPeriod, AttributeValue::Float(2.0));
        map.apply(&schema, Attribute::AttackPeriod, AttributeValue::Float(1.5));
        assert_eq!(map.float(Attribute::AttackPeriod), 1.5);

        // 1.0 * 1.5 * 2.0
        map.apply(&schema, Attribute::AttackPower, AttributeValue::Float(1.5));
        map.apply(&schema, Attribute::AttackPower, AttributeValue::Float(2.0));
        assert_eq!(map.float(Attribute::AttackPower), 3.0);
    }

    #[test]
    fn family_attributes_fan_out() {
        let schema = AttributeSchema::standard();
        let mut map = schema.defaults();
        map.apply(&schema, Attribute::AllResist, AttributeValue::Int(5));
        assert_eq!(map.int(Attribute::FireResist), 5);
        assert_eq!(map.int(Attribute::BleedResist), 5);
        assert_eq!(map.int(Attribute::AllResist), 0);
    }

    #[test]
    fn mismatched_default_kind_is_rejected() {
        let mut schema = AttributeSchema::standard();
        assert!(schema
            .set_default(Attribute::HitChance, AttributeValue::Float(0.5))
            .is_err());
        schema
            .set_default(Attribute::HitChance, AttributeValue::Int(90))
            .unwrap();
        assert_eq!(schema.defaults().int(Attribute::HitChance), 90);
    }

    #[test]
    fn reset_keeps_persistent_slots() {
        let schema = AttributeSchema::standard();
        let mut map = schema.defaults();
        map.set_int(Attribute::Health, 40);
        map.set_int(Attribute::MaxHealth, 80);
        map.reset_calculated(&schema);
        assert_eq!(map.int(Attribute::Health), 40);
        assert_eq!(map.int(Attribute::MaxHealth), 0);
    }
}
