use chrono::{Datelike, Utc};
use rand::Rng;

/// How many fresh random suffixes we try before giving up on a unique contract number.
pub const CONTRACT_NUMBER_ATTEMPTS: usize = 10;

/// Generates a candidate contract number of the form `CNT-<year>-<4 digits>`.
///
/// The 4-digit suffix is a small space, so callers must treat a unique-constraint
/// violation on insert as "try again with a new number" rather than a hard failure.
pub fn new_contract_number() -> String {
    let year = Utc::now().year();
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("CNT-{year}-{suffix:04}")
}
