pub mod cycle;
pub mod error;
pub mod state;
pub mod thresholds;
pub mod throttle;

pub use cycle::{run_cycle, CycleOutcome};
pub use error::{MonitorError, Result};
pub use state::{unix_now, StateStore, ViolationState};
pub use thresholds::evaluate_all;
pub use throttle::{decide, reconcile};
