//! The network simulator: latency and fault injection around async work.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::time;

use crate::{
    AlwaysOnline, Connectivity, FaultAware, FaultKind, NetworkConfig, NetworkConfigPatch,
    NetworkFault, RandomSource, ThreadRandom,
};

/// Counters for the developer panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorStats {
    /// Calls made through [`NetworkSimulator::wrap`].
    pub calls: u64,
    /// Calls that reached the wrapped operation.
    pub completed: u64,
    /// Calls failed by the simulator itself (offline, timeout, injected).
    pub injected_faults: u64,
}

#[derive(Default)]
struct Counters {
    calls: AtomicU64,
    completed: AtomicU64,
    injected_faults: AtomicU64,
}

/// Wraps async operations with simulated network behaviour.
///
/// Cheap to clone; clones share configuration, randomness and counters.
/// Configuration changes apply to the next step of any in-flight call.
#[derive(Clone)]
pub struct NetworkSimulator {
    config: Arc<RwLock<NetworkConfig>>,
    random: Arc<dyn RandomSource>,
    connectivity: Arc<dyn Connectivity>,
    counters: Arc<Counters>,
}

impl NetworkSimulator {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config.validated())),
            random: Arc::new(ThreadRandom),
            connectivity: Arc::new(AlwaysOnline),
            counters: Arc::default(),
        }
    }

    pub fn with_random(mut self, random: impl RandomSource) -> Self {
        self.random = Arc::new(random);
        self
    }

    pub fn with_connectivity(mut self, connectivity: impl Connectivity) -> Self {
        self.connectivity = Arc::new(connectivity);
        self
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> NetworkConfig {
        self.read(|c| c.clone())
    }

    /// Applies a partial update and returns the resulting configuration.
    pub fn update_config(&self, patch: NetworkConfigPatch) -> NetworkConfig {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *guard = patch.apply(guard.clone());
        tracing::info!(
            enabled = guard.enabled,
            error_rate = guard.error_rate,
            timeout_rate = guard.timeout_rate,
            "network simulation config updated"
        );
        guard.clone()
    }

    /// Replaces the whole configuration.
    pub fn set_config(&self, config: NetworkConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config.validated();
    }

    pub fn set_enabled(&self, enabled: bool) -> NetworkConfig {
        self.update_config(NetworkConfigPatch {
            enabled: Some(enabled),
            ..NetworkConfigPatch::default()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.read(|c| c.enabled)
    }

    pub fn stats(&self) -> SimulatorStats {
        SimulatorStats {
            calls: self.counters.calls.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            injected_faults: self.counters.injected_faults.load(Ordering::Relaxed),
        }
    }

    /// Runs `operation` as if it were a network call.
    ///
    /// When simulation is enabled, in order:
    /// 1. offline → `Offline`, operation not invoked
    /// 2. sleep a delay sampled from `delay_range`
    /// 3. with `timeout_rate`, sleep `timeout_delay` then `Timeout`
    /// 4. with `error_rate`, one of [`FaultKind::INJECTABLE`]
    /// 5. otherwise invoke the operation; a non-fault error becomes
    ///    `UnknownNetworkError` carrying its message
    ///
    /// When disabled, the operation runs and its result is returned as is.
    pub async fn wrap<T, E, F, Fut>(&self, label: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: FaultAware,
    {
        if !self.is_enabled() {
            return operation().await;
        }
        self.counters.calls.fetch_add(1, Ordering::Relaxed);

        if !self.connectivity.is_online() {
            return Err(self.inject(FaultKind::Offline, label).into());
        }

        let delay = self.read(|c| c.delay_range).sample(self.random.next_unit());
        tracing::trace!(label, delay_ms = delay.as_millis() as u64, "simulated latency");
        time::sleep(delay).await;

        if self.random.next_unit() < self.read(|c| c.timeout_rate) {
            time::sleep(self.read(NetworkConfig::timeout_delay)).await;
            return Err(self.inject(FaultKind::Timeout, label).into());
        }

        if self.random.next_unit() < self.read(|c| c.error_rate) {
            let kind = pick_fault(self.random.next_unit());
            return Err(self.inject(kind, label).into());
        }

        let outcome = operation().await;
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        outcome.map_err(|err| {
            if err.as_network_fault().is_some() {
                err
            } else {
                tracing::debug!(label, error = %err, "operation failed, wrapping as network error");
                NetworkFault::with_message(FaultKind::UnknownNetworkError, label, err.to_string())
                    .into()
            }
        })
    }

    fn inject(&self, kind: FaultKind, label: &str) -> NetworkFault {
        self.counters.injected_faults.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(label, %kind, "injecting network fault");
        NetworkFault::new(kind, label)
    }

    fn read<R>(&self, f: impl FnOnce(&NetworkConfig) -> R) -> R {
        f(&self.config.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for NetworkSimulator {
    fn default() -> Self {
        Self::new(NetworkConfig::default())
    }
}

impl fmt::Debug for NetworkSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkSimulator")
            .field("config", &self.config())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Maps a uniform sample onto one of the eight injectable kinds.
fn pick_fault(unit: f64) -> FaultKind {
    let len = FaultKind::INJECTABLE.len();
    let index = ((unit * len as f64) as usize).min(len - 1);
    FaultKind::INJECTABLE[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_fault_covers_every_kind() {
        for (i, kind) in FaultKind::INJECTABLE.iter().enumerate() {
            let unit = (i as f64 + 0.5) / 8.0;
            assert_eq!(pick_fault(unit), *kind);
        }
    }

    #[test]
    fn test_pick_fault_edges() {
        assert_eq!(pick_fault(0.0), FaultKind::ConnectionError);
        assert_eq!(pick_fault(0.999_999), FaultKind::ServiceUnavailable);
        assert_eq!(pick_fault(1.0), FaultKind::ServiceUnavailable);
    }

    #[test]
    fn test_update_config_validates() {
        let sim = NetworkSimulator::new(NetworkConfig::reliable());
        let config = sim.update_config(NetworkConfigPatch {
            error_rate: Some(7.0),
            ..NetworkConfigPatch::default()
        });
        assert_eq!(config.error_rate, 1.0);
        assert_eq!(sim.config().error_rate, 1.0);
    }

    #[test]
    fn test_clones_share_config() {
        let sim = NetworkSimulator::new(NetworkConfig::reliable());
        let panel = sim.clone();
        panel.set_enabled(false);
        assert!(!sim.is_enabled());
    }
}
