pub mod snapshot;
pub mod status;
pub mod violation;

pub use snapshot::{CpuReading, MemoryReading, MetricsSnapshot, PartitionUsage};
pub use status::Status;
pub use violation::{Severity, SeverityParseError, Violation};
