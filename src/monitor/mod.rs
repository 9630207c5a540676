//! Live traffic monitoring.
//!
//! - `log` - the keyed activity log of incoming messages and replies
//! - `simulator` - fabricates incoming traffic and resolves replies

pub mod log;
pub mod simulator;

pub use self::log::{ActivityLog, ActivityLogEntry, LogSource, PENDING_REPLY};
pub use simulator::{Simulator, SimulatorError, SCENARIOS, SIMULATION_INTERVAL};
