//! User-agent selection

use rand::Rng;

/// User-agent strings rotated across fetch calls
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)",
    "Mozilla/5.0 (X11; Linux x86_64)",
    "Fetchmark/0.1 (Resilient Fetch Agent)",
];

/// Pick a user agent from the static table
///
/// The random source is an explicit parameter so callers (and tests) control
/// determinism; the table itself is immutable.
pub fn select_user_agent<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    USER_AGENTS[rng.random_range(0..USER_AGENTS.len())]
}
