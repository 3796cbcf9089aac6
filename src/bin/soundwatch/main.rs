//! Soundwatch agent entrypoint.
//!
//! Captures the microphone, emits one spectrum record per analysis window as
//! a JSON line on stdout, and reads call-control envelopes from stdin until
//! SIGINT or SIGTERM arrives.

mod devices;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use soundwatch::audio::Microphone;
use soundwatch::signal::{spawn_control_reader, Forwarder, ForwarderOptions, LoggingCallHandler};
use soundwatch::{init_tracing, shutdown, AgentConfig, Calibration, Outbound, Pipeline};
use tracing::{error, info, warn};

use crate::devices::list_input_devices;

const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    let config = AgentConfig::parse_args()?;
    if config.list_input_devices {
        list_input_devices()?;
        return Ok(());
    }

    init_tracing(&config);
    shutdown::install_handlers()?;

    let calibration = Calibration::from_env();
    info!(
        db_offset = calibration.offset(),
        emit_policy = config.emit_policy.label(),
        welch_overlap = config.welch_overlap,
        "soundwatch starting"
    );

    let (outbound, records) = Outbound::channel(config.emit_policy);
    let pipeline = Arc::new(Pipeline::new(calibration, config.welch_config(), outbound));

    let forwarder = Forwarder::spawn(
        records,
        io::stdout(),
        ForwarderOptions {
            device_id: config.device_id.clone(),
            raw_records: config.raw_records,
        },
    )?;
    // The reader blocks on stdin; it is left running and ends with the process.
    if let Err(err) = spawn_control_reader(LoggingCallHandler::default()) {
        warn!(error = %err, "call control disabled");
    }

    let microphone = match Microphone::new(config.input_device.as_deref()) {
        Ok(microphone) => microphone,
        Err(err) => {
            error!(error = %err, "failed to open input device");
            pipeline.halt();
            forwarder.stop();
            return Err(err);
        }
    };
    let mut session = match microphone.start(pipeline.clone(), config.frame_channel_capacity) {
        Ok(session) => session,
        Err(err) => {
            error!(error = %err, "failed to start capture");
            pipeline.halt();
            forwarder.stop();
            return Err(err);
        }
    };

    info!(device = %session.device_name(), "Capturing audio...");
    shutdown::wait(SHUTDOWN_POLL);
    info!("shutdown requested");

    let metrics = session.stop();
    info!(
        frames_captured = metrics.frames_captured,
        frames_dropped = metrics.frames_dropped,
        records_emitted = metrics.records_emitted,
        records_evicted = metrics.records_evicted,
        records_dropped = metrics.records_dropped,
        "capture stopped"
    );

    // Last handle to the outbound sender; the forwarder drains and exits.
    drop(session);
    drop(pipeline);
    forwarder.join();
    Ok(())
}
