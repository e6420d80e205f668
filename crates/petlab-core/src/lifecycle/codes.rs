//! Specimen code generation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Build a sample code: `<prefix>-<last 6 digits of epoch millis>-<8 hex chars>`.
///
/// The random part makes collisions unlikely, not impossible; the
/// `sample_code` UNIQUE constraint is the real guarantee.
pub fn generate_sample_code(prefix: &str, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{:06}-{}", prefix, millis, random[..8].to_uppercase())
}
