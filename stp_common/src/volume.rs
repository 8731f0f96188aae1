use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A quantity of fuel offered, bid for, or contracted.
///
/// Units are free-form strings ("gallons", "liters", "tonnes"); the platform never converts
/// between units. Bids and contracts carry the unit of the lot they refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub amount: f64,
    pub unit: String,
}

impl Volume {
    pub fn new<S: Into<String>>(amount: f64, unit: S) -> Self {
        Self { amount, unit: unit.into() }
    }
}

impl Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}
