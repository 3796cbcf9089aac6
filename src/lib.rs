pub mod audio;
pub mod calibration;
pub mod config;
mod lock;
pub mod pipeline;
pub mod shutdown;
pub mod signal;
mod telemetry;

pub(crate) use lock::lock_or_recover;
pub use calibration::Calibration;
pub use config::{AgentConfig, EmitPolicy, LogFormat};
pub use pipeline::{Outbound, Pipeline, PipelineStats, SendOutcome, SpectrumRecord};
pub use telemetry::init_tracing;
