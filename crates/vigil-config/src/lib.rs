pub mod loader;
pub mod model;

pub use loader::load_config;
pub use model::{
    ActionConfig, AlertLevel, ExcludeConfig, MetricConfig, MonitorConfig, ThrottleConfig,
};
