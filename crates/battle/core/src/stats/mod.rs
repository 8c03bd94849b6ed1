//! Attribute model and the stat aggregation pass.

mod aggregate;
mod attribute;
mod change;
mod damage;

pub use aggregate::StatAggregator;
pub use attribute::{
    Attribute, AttributeMap, AttributeSchema, AttributeSpec, AttributeValue, UpdateKind, ValueKind,
};
pub use change::StatChange;
pub use damage::{DamageBucket, DamageType};
