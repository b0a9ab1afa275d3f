//! Simulator configuration.
//!
//! Serializable (camelCase JSON) so a developer panel can show and edit it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// DelayRange
// ---------------------------------------------------------------------------

/// Inclusive range of injected latency, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Maps a uniform sample `unit ∈ [0, 1)` onto the range.
    /// Reversed bounds are read as the same range.
    pub fn sample(&self, unit: f64) -> Duration {
        let lo = self.min_ms.min(self.max_ms);
        let span = self.min_ms.max(self.max_ms) - lo;
        let offset = (span as f64 * unit.clamp(0.0, 1.0)).round() as u64;
        Duration::from_millis(lo + offset.min(span))
    }
}

// ---------------------------------------------------------------------------
// NetworkConfig
// ---------------------------------------------------------------------------

/// Full configuration for the network simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkConfig {
    /// When `false`, wrapped operations run untouched.
    /// Default: on in debug builds, off in release builds.
    pub enabled: bool,
    /// Probability in `0.0..=1.0` of injecting one of the eight fault kinds.
    pub error_rate: f64,
    /// Latency added before every wrapped operation.
    pub delay_range: DelayRange,
    /// Probability in `0.0..=1.0` of a hung request ending in `Timeout`.
    pub timeout_rate: f64,
    /// How long a hung request hangs before failing.
    pub timeout_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
            error_rate: 0.1,
            delay_range: DelayRange::new(300, 1500),
            timeout_rate: 0.05,
            timeout_delay_ms: 10_000,
        }
    }
}

impl NetworkConfig {
    /// Simulation switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Simulation on, but with no latency and no faults.
    pub fn reliable() -> Self {
        Self {
            enabled: true,
            error_rate: 0.0,
            delay_range: DelayRange::new(0, 0),
            timeout_rate: 0.0,
            timeout_delay_ms: 0,
        }
    }

    pub fn timeout_delay(&self) -> Duration {
        Duration::from_millis(self.timeout_delay_ms)
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - rates clamped to `0.0..=1.0` (NaN becomes 0.0)
    /// - `delay_range` bounds swapped if reversed
    pub fn validated(mut self) -> Self {
        self.error_rate = clamp_rate("error_rate", self.error_rate);
        self.timeout_rate = clamp_rate("timeout_rate", self.timeout_rate);
        if self.delay_range.min_ms > self.delay_range.max_ms {
            warn!(
                min_ms = self.delay_range.min_ms,
                max_ms = self.delay_range.max_ms,
                "delay range reversed, swapping bounds"
            );
            self.delay_range = DelayRange::new(self.delay_range.max_ms, self.delay_range.min_ms);
        }
        self
    }
}

fn clamp_rate(name: &str, rate: f64) -> f64 {
    if rate.is_nan() {
        warn!(name, "rate is NaN, using 0.0");
        return 0.0;
    }
    let clamped = rate.clamp(0.0, 1.0);
    if clamped != rate {
        warn!(name, rate, "rate outside 0.0..=1.0, clamping");
    }
    clamped
}

// ---------------------------------------------------------------------------
// NetworkConfigPatch
// ---------------------------------------------------------------------------

/// A partial update to a [`NetworkConfig`]. `None` fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkConfigPatch {
    pub enabled: Option<bool>,
    pub error_rate: Option<f64>,
    pub delay_range: Option<DelayRange>,
    pub timeout_rate: Option<f64>,
    pub timeout_delay_ms: Option<u64>,
}

impl NetworkConfigPatch {
    /// Returns `config` with this patch applied and validated.
    pub fn apply(self, mut config: NetworkConfig) -> NetworkConfig {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(rate) = self.error_rate {
            config.error_rate = rate;
        }
        if let Some(range) = self.delay_range {
            config.delay_range = range;
        }
        if let Some(rate) = self.timeout_rate {
            config.timeout_rate = rate;
        }
        if let Some(ms) = self.timeout_delay_ms {
            config.timeout_delay_ms = ms;
        }
        config.validated()
    }
}
