//! ID generation utilities for mapstyle
//!
//! Provides timestamps and identifiers for sessions and transcript entries.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique session ID
///
/// Format: `session-{timestamp_ms}-{random_hex}`
/// Example: `session-1738300800123-a1b2`
pub fn generate_session_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("session-{}-{:04x}", timestamp, random)
}

/// Artifact tag for a review iteration
///
/// Format: `R{iteration}`; iteration 0 is the untouched base style (`origin`).
pub fn artifact_tag(iteration: u32) -> String {
    if iteration == 0 {
        "origin".to_string()
    } else {
        format!("R{}", iteration)
    }
}
