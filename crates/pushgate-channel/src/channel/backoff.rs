//! Reconnect delay policy.

use std::time::Duration;

/// Delay policy for scheduling reconnect attempts.
///
/// The first attempt of a dial (retry count 0) draws its delay uniformly
/// from a bounded jitter window, `base + spread * random()`, 3-5 seconds
/// by default. The window keeps a fleet of clients that lost the gateway
/// at the same moment from stampeding it with simultaneous reconnects.
///
/// Every later retry waits `e^retry_count` seconds, with no cap and no
/// further jitter: retry 5 waits ~2.5 minutes, retry 10 over six hours.
/// The uncapped growth matches the deployed gateway clients; treat it as
/// an open question, not a tuning knob (see DESIGN.md).
#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
    /// Lower edge of the initial jitter window.
    pub initial_base: Duration,
    /// Width of the initial jitter window.
    pub initial_spread: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_base: Duration::from_secs(3),
            initial_spread: Duration::from_secs(2),
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with the default 3-5 s initial window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial jitter window to `base + [0, spread)`.
    pub fn initial_window(mut self, base: Duration, spread: Duration) -> Self {
        self.initial_base = base;
        self.initial_spread = spread;
        self
    }

    /// Calculate the delay for a given retry count.
    ///
    /// The delay is computed at attempt entry: it is how long to wait
    /// before the *next* attempt, should this one fail.
    pub fn delay_for_attempt(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            self.initial_base + self.initial_spread.mul_f64(rand::random::<f64>())
        } else {
            // Saturates once the exponent outgrows what Duration can hold
            // (around retry 44).
            Duration::try_from_secs_f64(f64::from(retry_count).exp()).unwrap_or(Duration::MAX)
        }
    }
}
