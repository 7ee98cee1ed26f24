use serde::{Deserialize, Serialize};

/// The default number of geometry reads before stabilization gives up.
pub const DEFAULT_STABILIZE_ATTEMPTS: u32 = 150;

/// Tunables for capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How many times geometry is read while waiting for two consecutive reads to agree.
    ///
    /// Reads are back-to-back with no sleep in between, a single read costs microseconds.
    /// Values below 2 can never stabilize.
    pub stabilize_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stabilize_attempts: DEFAULT_STABILIZE_ATTEMPTS,
        }
    }
}
