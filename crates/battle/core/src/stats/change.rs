use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Attribute, AttributeValue};

/// Sparse attribute → value map.
///
/// Produced by the effect executor and replicated verbatim. How each entry
/// folds into a combatant is decided by the receiving [`super::AttributeSchema`]
/// (additive, overwrite or multiplicative).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatChange {
    values: BTreeMap<Attribute, AttributeValue>,
}

impl StatChange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, attribute: Attribute, value: AttributeValue) -> Self {
        self.set(attribute, value);
        self
    }

    #[must_use]
    pub fn with_int(self, attribute: Attribute, value: i32) -> Self {
        self.with(attribute, AttributeValue::Int(value))
    }

    pub fn set(&mut self, attribute: Attribute, value: AttributeValue) {
        self.values.insert(attribute, value.coerce(attribute.kind()));
    }

    /// Accumulate an additive delta into this change.
    pub fn add(&mut self, attribute: Attribute, value: AttributeValue) {
        let kind = attribute.kind();
        let next = match self.values.get(&attribute) {
            Some(existing) => AttributeValue::from_f64(kind, existing.as_f64() + value.as_f64()),
            None => value.coerce(kind),
        };
        self.values.insert(attribute, next);
    }

    pub fn get(&self, attribute: Attribute) -> Option<AttributeValue> {
        self.values.get(&attribute).copied()
    }

    pub fn int(&self, attribute: Attribute) -> i32 {
        self.get(attribute).map_or(0, |v| v.as_i64() as i32)
    }

    pub fn remove(&mut self, attribute: Attribute) -> Option<AttributeValue> {
        self.values.remove(&attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, AttributeValue)> + '_ {
        self.values.iter().map(|(a, v)| (*a, *v))
    }

    /// True when every entry is zero, i.e. applying it as a delta is a no-op.
    pub fn is_noop(&self) -> bool {
        self.values.values().all(AttributeValue::is_zero)
    }
}

impl FromIterator<(Attribute, AttributeValue)> for StatChange {
    fn from_iter<T: IntoIterator<Item = (Attribute, AttributeValue)>>(iter: T) -> Self {
        let mut change = StatChange::new();
        for (attribute, value) in iter {
            change.set(attribute, value);
        }
        change
    }
}
