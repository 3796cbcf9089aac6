//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::{Parser, ValueEnum};

pub use defaults::{
    DEFAULT_FRAME_CHANNEL_CAPACITY, DEFAULT_LOG_LEVEL, MAX_FRAME_CHANNEL_CAPACITY,
    MIN_FRAME_CHANNEL_CAPACITY,
};

/// CLI options for the telemetry agent.
///
/// The calibration offset is deliberately absent: it is read from
/// `DB_OFFSET` once when the pipeline starts.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "soundwatch",
    about = "Soundwatch acoustic telemetry agent",
    author,
    version
)]
pub struct AgentConfig {
    /// Device id stamped on every outbound envelope
    #[arg(long = "device-id", env = "DEVICE_ID", default_value = "")]
    pub device_id: String,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Frame channel capacity between the audio callback and the analysis worker
    #[arg(
        long = "frame-channel-capacity",
        default_value_t = DEFAULT_FRAME_CHANNEL_CAPACITY
    )]
    pub frame_channel_capacity: usize,

    /// What to do when the record consumer is not keeping up
    #[arg(long = "emit-policy", value_enum, default_value_t = EmitPolicy::DropOldest)]
    pub emit_policy: EmitPolicy,

    /// Samples shared between consecutive Welch segments
    #[arg(long = "welch-overlap", default_value_t = 0)]
    pub welch_overlap: usize,

    /// Write bare spectrum records instead of signaling envelopes
    #[arg(long = "raw-records", default_value_t = false)]
    pub raw_records: bool,

    /// Log level filter (e.g. info, debug, soundwatch=trace)
    #[arg(long = "log-level", env = "SOUNDWATCH_LOG", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Disable all logging
    #[arg(long = "no-logs", default_value_t = false)]
    pub no_logs: bool,
}

/// Outbound behavior when the previous record has not been consumed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmitPolicy {
    /// Rendezvous hand-off: the analysis worker waits for the consumer.
    Block,
    /// Single-slot mailbox: a pending record is replaced by the newer one.
    DropOldest,
}

impl EmitPolicy {
    pub fn label(self) -> &'static str {
        match self {
            EmitPolicy::Block => "block",
            EmitPolicy::DropOldest => "drop-oldest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
