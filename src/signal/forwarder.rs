use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, error, info};

use super::protocol::Message;

const STOP_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default)]
pub struct ForwarderOptions {
    pub device_id: String,
    /// Write records as-is instead of wrapping them in `log` envelopes.
    pub raw_records: bool,
}

/// Drain `records` into `sink`, one JSON line each, until the channel
/// disconnects or `stop` is set. Returns the number of records written.
pub fn forward_records<W: Write>(
    records: &Receiver<Vec<u8>>,
    sink: &mut W,
    options: &ForwarderOptions,
    stop: &AtomicBool,
) -> Result<usize> {
    if !options.raw_records {
        write_line(sink, &serde_json::to_vec(&Message::register(&options.device_id))?)?;
    }

    let mut written = 0usize;
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let record = match records.recv_timeout(STOP_POLL) {
            Ok(record) => record,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if options.raw_records {
            write_line(sink, &record)?;
        } else {
            let data = match String::from_utf8(record) {
                Ok(data) => data,
                Err(err) => {
                    error!(error = %err, "record is not valid UTF-8; dropping it");
                    continue;
                }
            };
            let envelope = serde_json::to_vec(&Message::log(&options.device_id, data))
                .context("failed to encode log envelope")?;
            write_line(sink, &envelope)?;
        }
        written += 1;
    }
    Ok(written)
}

fn write_line<W: Write>(sink: &mut W, line: &[u8]) -> Result<()> {
    sink.write_all(line).context("failed to write record")?;
    sink.write_all(b"\n").context("failed to write record")?;
    sink.flush().context("failed to flush record sink")
}

/// Background consumer of the pipeline's record stream.
pub struct Forwarder {
    handle: Option<JoinHandle<usize>>,
    stop: Arc<AtomicBool>,
}

impl Forwarder {
    pub fn spawn<W>(records: Receiver<Vec<u8>>, mut sink: W, options: ForwarderOptions) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = thread::Builder::new()
            .name("soundwatch-forwarder".to_string())
            .spawn(move || {
                match forward_records(&records, &mut sink, &options, &stop_flag) {
                    Ok(written) => {
                        debug!(written, "forwarder finished");
                        written
                    }
                    Err(err) => {
                        error!(error = %err, "forwarder stopped");
                        0
                    }
                }
            })
            .context("failed to spawn forwarder")?;
        Ok(Self {
            handle: Some(handle),
            stop,
        })
    }

    /// Stop after the record in flight and wait for the thread.
    pub fn stop(mut self) -> usize {
        self.stop.store(true, Ordering::Relaxed);
        self.join_inner()
    }

    /// Wait for the record stream to disconnect, then return the count.
    pub fn join(mut self) -> usize {
        self.join_inner()
    }

    fn join_inner(&mut self) -> usize {
        let written = self
            .handle
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or(0);
        info!(written, "records forwarded");
        written
    }
}
