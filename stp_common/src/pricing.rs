use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Relative tolerance used when checking the `price == price_per_unit * amount` invariant.
pub const PRICE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Error)]
pub enum PricingError {
    #[error("Neither a total price nor a per-unit price was supplied")]
    NoPriceSupplied,
    #[error("Prices may not be negative ({0})")]
    NegativePrice(f64),
    #[error("Volume amount must be positive to derive a per-unit price ({0})")]
    NonPositiveAmount(f64),
}

/// The price attached to a lot, bid or contract.
///
/// `price` and `price_per_unit` are always kept consistent with the volume they were
/// normalised against. Use [`Pricing::derive`] to build one from a partially specified
/// [`PricingUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub price: f64,
    pub price_per_unit: f64,
    pub currency: String,
}

impl Pricing {
    /// Applies the platform-wide derivation rule to a partially specified price.
    ///
    /// If `price_per_unit` is supplied it is authoritative and the total is recomputed
    /// from the volume amount. Otherwise the total is authoritative and the per-unit
    /// price is derived. Supplying neither is an error.
    pub fn derive(update: &PricingUpdate, amount: f64) -> Result<Self, PricingError> {
        let currency = update.currency.clone().unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        match (update.price_per_unit, update.price) {
            (Some(ppu), _) => {
                if ppu < 0.0 {
                    return Err(PricingError::NegativePrice(ppu));
                }
                Ok(Self { price: ppu * amount, price_per_unit: ppu, currency })
            },
            (None, Some(price)) => {
                if price < 0.0 {
                    return Err(PricingError::NegativePrice(price));
                }
                if amount <= 0.0 {
                    return Err(PricingError::NonPositiveAmount(amount));
                }
                Ok(Self { price, price_per_unit: price / amount, currency })
            },
            (None, None) => Err(PricingError::NoPriceSupplied),
        }
    }

    /// Checks the pricing invariant against the given volume amount.
    pub fn is_consistent_with(&self, amount: f64) -> bool {
        let expected = self.price_per_unit * amount;
        let scale = expected.abs().max(self.price.abs()).max(1.0);
        (self.price - expected).abs() <= PRICE_TOLERANCE * scale
    }
}

impl Display for Pricing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {} ({:.4}/unit)", self.price, self.currency, self.price_per_unit)
    }
}

/// A partially specified price as it arrives on the wire. Whichever of the two price
/// fields is present determines the other (per-unit price wins when both are given).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl PricingUpdate {
    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.price_per_unit.is_none() && self.currency.is_none()
    }
}
