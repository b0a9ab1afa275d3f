//! Simulated network conditions for a backend-less Ticketdesk.
//!
//! There is no server: every "network" call is local work. Wrapping it with
//! [`NetworkSimulator::wrap`] adds latency and random failures so the
//! application's loading and error paths get exercised during development.
//!
//! ```text
//! wrap(label, op)
//!   ├─ disabled?        → op()
//!   ├─ offline?         → Err(Offline)
//!   ├─ sleep(delay)
//!   ├─ timeout draw     → sleep(timeout_delay), Err(Timeout)
//!   ├─ error draw       → Err(one of 8 kinds)
//!   └─ op()             → Ok | fault passes | other error → UnknownNetworkError
//! ```

mod config;
mod connectivity;
mod fault;
mod random;
mod simulator;

pub use config::{DelayRange, NetworkConfig, NetworkConfigPatch};
pub use connectivity::{AlwaysOnline, Connectivity, ConnectivityFlag};
pub use fault::{FaultAware, FaultKind, NetworkFault};
pub use random::{RandomSource, SeededRandom, SequenceRandom, ThreadRandom};
pub use simulator::{NetworkSimulator, SimulatorStats};
