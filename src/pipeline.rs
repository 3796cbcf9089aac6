//! Window accumulation, analysis, and record emission.
//!
//! A [`Pipeline`] owns the window buffer behind a single mutex. Every frame
//! pushed in is appended under that lock; once the buffer reaches
//! [`WINDOW_SAMPLES`] the whole buffer is analysed, one JSON record is handed
//! to the [`Outbound`] mailbox, and the buffer is cleared, all without
//! releasing the lock. Records therefore leave in capture order.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::audio::{
    frame_loudness, reduce_bands, welch_psd, BandSummary, WelchConfig, BAND_EDGES, WINDOW_SAMPLES,
};
use crate::calibration::Calibration;
use crate::config::EmitPolicy;
use crate::lock_or_recover;

/// One emitted summary. Loudness fields are omitted when the frame was
/// digital silence (`-inf` dB).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumRecord {
    pub spectrum: BandSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_peak: Option<f64>,
    /// Wall-clock milliseconds since the Unix epoch.
    pub ts: u64,
}

/// Result of handing a record to the outbound mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Delivered after evicting the older, still-pending record.
    Evicted,
    Disconnected,
    Halted,
}

/// Producer side of the record stream.
pub struct Outbound {
    sender: Sender<Vec<u8>>,
    // Held only for drop-oldest, so the pipeline can evict the pending record.
    evict: Option<Receiver<Vec<u8>>>,
    // Wakes a blocked rendezvous when the pipeline halts.
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Outbound {
    /// Create the mailbox and the receiver the consumer drains.
    pub fn channel(policy: EmitPolicy) -> (Self, Receiver<Vec<u8>>) {
        let (sender, receiver) = match policy {
            EmitPolicy::Block => bounded(0),
            EmitPolicy::DropOldest => bounded(1),
        };
        let evict = match policy {
            EmitPolicy::Block => None,
            EmitPolicy::DropOldest => Some(receiver.clone()),
        };
        let (wake_tx, wake_rx) = bounded(1);
        (
            Self {
                sender,
                evict,
                wake_tx,
                wake_rx,
            },
            receiver,
        )
    }

    fn wake(&self) {
        let _ = self.wake_tx.try_send(());
    }

    fn send(&self, mut payload: Vec<u8>, halted: &AtomicBool) -> SendOutcome {
        let Some(evict) = &self.evict else {
            if halted.load(Ordering::Acquire) {
                return SendOutcome::Halted;
            }
            return select! {
                send(self.sender, payload) -> sent => {
                    if sent.is_ok() {
                        SendOutcome::Delivered
                    } else {
                        SendOutcome::Disconnected
                    }
                }
                recv(self.wake_rx) -> _ => SendOutcome::Halted,
            };
        };

        // Our eviction handle keeps the channel connected; only it is left
        // once the consumer is gone.
        if self.sender.receiver_count() <= 1 {
            return SendOutcome::Disconnected;
        }
        let mut evicted = false;
        loop {
            match self.sender.try_send(payload) {
                Ok(()) if evicted => return SendOutcome::Evicted,
                Ok(()) => return SendOutcome::Delivered,
                Err(TrySendError::Full(pending)) => {
                    if evict.try_recv().is_ok() {
                        evicted = true;
                    }
                    payload = pending;
                }
                Err(TrySendError::Disconnected(_)) => return SendOutcome::Disconnected,
            }
        }
    }
}

#[derive(Default)]
struct WindowState {
    samples: Vec<f32>,
    last_ts: u64,
}

/// Counters reported at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub records_emitted: usize,
    pub records_evicted: usize,
    pub records_dropped: usize,
}

/// Analysis context shared between the capture side and the caller.
pub struct Pipeline {
    window: Mutex<WindowState>,
    calibration: Calibration,
    welch: WelchConfig,
    edges: &'static [f64],
    outbound: Outbound,
    halted: AtomicBool,
    disconnect_logged: AtomicBool,
    records_emitted: AtomicUsize,
    records_evicted: AtomicUsize,
    records_dropped: AtomicUsize,
}

impl Pipeline {
    pub fn new(calibration: Calibration, welch: WelchConfig, outbound: Outbound) -> Self {
        Self {
            window: Mutex::new(WindowState {
                samples: Vec::with_capacity(WINDOW_SAMPLES * 2),
                last_ts: 0,
            }),
            calibration,
            welch,
            edges: &BAND_EDGES,
            outbound,
            halted: AtomicBool::new(false),
            disconnect_logged: AtomicBool::new(false),
            records_emitted: AtomicUsize::new(0),
            records_evicted: AtomicUsize::new(0),
            records_dropped: AtomicUsize::new(0),
        }
    }

    /// Append one capture frame; analyse and emit when a window is ready.
    ///
    /// Returns the hand-off outcome when a record was produced, `None` while
    /// the window is still filling or after [`Pipeline::halt`].
    pub fn push_frame(&self, frame: &[f32]) -> Option<SendOutcome> {
        let mut state = lock_or_recover(&self.window, "pipeline window");
        if self.is_halted() {
            return None;
        }

        state.samples.extend_from_slice(frame);
        if state.samples.len() < WINDOW_SAMPLES {
            return None;
        }

        let mut record = self.analyze(&state.samples, frame);
        // Never step backwards even if the wall clock does.
        record.ts = record.ts.max(state.last_ts);

        let payload = match serde_json::to_vec(&record) {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "failed to encode spectrum record; dropping it");
                self.records_dropped.fetch_add(1, Ordering::Relaxed);
                state.samples.clear();
                return None;
            }
        };

        let outcome = self.outbound.send(payload, &self.halted);
        match outcome {
            SendOutcome::Delivered => {
                self.records_emitted.fetch_add(1, Ordering::Relaxed);
            }
            SendOutcome::Evicted => {
                self.records_emitted.fetch_add(1, Ordering::Relaxed);
                self.records_evicted.fetch_add(1, Ordering::Relaxed);
                debug!("consumer lagging; replaced pending record");
            }
            SendOutcome::Disconnected => {
                self.records_dropped.fetch_add(1, Ordering::Relaxed);
                if !self.disconnect_logged.swap(true, Ordering::Relaxed) {
                    warn!("record consumer disconnected; dropping records");
                }
            }
            SendOutcome::Halted => {
                self.records_dropped.fetch_add(1, Ordering::Relaxed);
                return Some(outcome);
            }
        }
        state.last_ts = record.ts;
        state.samples.clear();
        Some(outcome)
    }

    /// Build the record for `window`, with loudness taken from `last_frame`.
    pub fn analyze(&self, window: &[f32], last_frame: &[f32]) -> SpectrumRecord {
        let psd = welch_psd(window, &self.welch);
        let calibration = self.calibration;
        let spectrum = reduce_bands(&psd, self.edges, |db| calibration.band_level(db));
        let loudness = frame_loudness(last_frame, &self.calibration);
        SpectrumRecord {
            spectrum,
            db_avg: loudness.db_avg,
            db_peak: loudness.db_peak,
            ts: now_millis(),
        }
    }

    /// Stop producing records. Frames pushed afterwards are ignored and a
    /// blocked hand-off gives up.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::Release);
        self.outbound.wake();
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Samples currently waiting for the next window.
    pub fn buffered_samples(&self) -> usize {
        lock_or_recover(&self.window, "pipeline window").samples.len()
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            records_evicted: self.records_evicted.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
