mod pricing;
mod secret;
mod volume;

pub use pricing::{Pricing, PricingError, PricingUpdate};
pub use secret::Secret;
pub use volume::Volume;
