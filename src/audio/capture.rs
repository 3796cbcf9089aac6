//! Microphone capture via CPAL.
//!
//! The cpal callback only converts, down-mixes and re-chunks samples into
//! [`FRAME_SAMPLES`] frames; a dedicated worker thread feeds those frames to
//! the [`Pipeline`]. The callback never waits on the analysis or on the
//! record consumer.

use super::dispatch::FrameDispatcher;
use super::{FRAME_SAMPLES, SAMPLE_RATE};
use crate::pipeline::{Pipeline, PipelineStats};
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, SampleFormat, SampleRate, SizedSample, StreamConfig, SupportedBufferSize,
    SupportedStreamConfig, SupportedStreamConfigRange,
};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Counters collected over a capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureMetrics {
    pub frames_captured: usize,
    pub frames_dropped: usize,
    pub records_emitted: usize,
    pub records_evicted: usize,
    pub records_dropped: usize,
}

impl CaptureMetrics {
    fn new(frames_captured: usize, frames_dropped: usize, stats: PipelineStats) -> Self {
        Self {
            frames_captured,
            frames_dropped,
            records_emitted: stats.records_emitted,
            records_evicted: stats.records_evicted,
            records_dropped: stats.records_dropped,
        }
    }
}

/// Audio input device wrapper.
pub struct Microphone {
    device: cpal::Device,
}

impl Microphone {
    /// List microphone names so operators can pick one with `--input-device`.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Open the named input device, or the host default when `None`.
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        Ok(Self { device })
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Open and start a 44.1 kHz stream feeding `pipeline`.
    ///
    /// `frame_capacity` bounds the frames queued between the callback and the
    /// analysis worker. Fails if the device cannot run at [`SAMPLE_RATE`].
    pub fn start(&self, pipeline: Arc<Pipeline>, frame_capacity: usize) -> Result<CaptureSession> {
        let device_name = self.device_name();
        let ranges: Vec<SupportedStreamConfigRange> = self
            .device
            .supported_input_configs()
            .with_context(|| format!("failed to query input configs for '{device_name}'"))?
            .collect();
        let supported = choose_stream_config(&ranges).ok_or_else(|| {
            anyhow!(
                "input device '{device_name}' cannot capture at {SAMPLE_RATE} Hz in a supported sample format. {}",
                mic_permission_hint()
            )
        })?;
        let format = supported.sample_format();
        let config = stream_config(&supported);
        let channels = usize::from(config.channels.max(1));

        info!(
            device = %device_name,
            format = ?format,
            channels,
            sample_rate = SAMPLE_RATE,
            buffer = ?config.buffer_size,
            "opening audio stream"
        );

        let (sender, receiver) = bounded::<Vec<f32>>(frame_capacity.max(1));
        let dropped = Arc::new(AtomicUsize::new(0));
        let dispatcher = FrameDispatcher::new(FRAME_SAMPLES, sender, dropped.clone());

        let stream = match format {
            SampleFormat::F32 => {
                self.build_stream::<f32>(&config, dispatcher, channels, |sample| sample)?
            }
            SampleFormat::I16 => self.build_stream::<i16>(&config, dispatcher, channels, |sample| {
                sample as f32 / 32_768.0
            })?,
            SampleFormat::U16 => self.build_stream::<u16>(&config, dispatcher, channels, |sample| {
                (sample as f32 - 32_768.0) / 32_768.0
            })?,
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        let captured = Arc::new(AtomicUsize::new(0));
        let worker = spawn_analysis_worker(receiver, pipeline.clone(), captured.clone())?;

        if let Err(err) = stream.play() {
            drop(stream);
            let _ = worker.join();
            return Err(anyhow!("failed to start audio stream on '{device_name}': {err}"));
        }

        Ok(CaptureSession {
            stream: Some(stream),
            worker: Some(worker),
            pipeline,
            frames_captured: captured,
            frames_dropped: dropped,
            device_name,
        })
    }

    fn build_stream<T>(
        &self,
        config: &StreamConfig,
        mut dispatcher: FrameDispatcher,
        channels: usize,
        convert: fn(T) -> f32,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + Send + 'static,
    {
        let err_fn = |err| warn!(error = %err, "audio stream error");
        self.device
            .build_input_stream(
                config,
                move |data: &[T], _| dispatcher.push(data, channels, convert),
                err_fn,
                None,
            )
            .context("failed to open audio stream")
    }
}

/// Pick a capture format that runs at [`SAMPLE_RATE`]: f32 first, then
/// i16/u16, preferring the fewest channels.
pub(super) fn choose_stream_config(
    ranges: &[SupportedStreamConfigRange],
) -> Option<SupportedStreamConfig> {
    let rank = |format: SampleFormat| match format {
        SampleFormat::F32 => Some(0),
        SampleFormat::I16 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    };
    ranges
        .iter()
        .filter(|range| {
            range.min_sample_rate().0 <= SAMPLE_RATE && range.max_sample_rate().0 >= SAMPLE_RATE
        })
        .filter_map(|range| rank(range.sample_format()).map(|r| (r, range)))
        .min_by_key(|(r, range)| (*r, range.channels()))
        .map(|(_, range)| range.clone().with_sample_rate(SampleRate(SAMPLE_RATE)))
}

/// Request [`FRAME_SAMPLES`]-sized driver buffers when the device allows it.
pub(super) fn stream_config(supported: &SupportedStreamConfig) -> StreamConfig {
    let mut config = supported.config();
    let frame = FRAME_SAMPLES as u32;
    config.buffer_size = match supported.buffer_size() {
        SupportedBufferSize::Range { min, max } if *min <= frame && frame <= *max => {
            BufferSize::Fixed(frame)
        }
        _ => BufferSize::Default,
    };
    config
}

fn spawn_analysis_worker(
    receiver: Receiver<Vec<f32>>,
    pipeline: Arc<Pipeline>,
    captured: Arc<AtomicUsize>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("soundwatch-analysis".to_string())
        .spawn(move || {
            for frame in receiver.iter() {
                captured.fetch_add(1, Ordering::Relaxed);
                if pipeline.is_halted() {
                    continue;
                }
                pipeline.push_frame(&frame);
            }
            debug!("analysis worker exiting");
        })
        .context("failed to spawn analysis worker")
}

/// A running capture stream plus its analysis worker.
///
/// Dropping the session stops it; call [`CaptureSession::stop`] to get the
/// final metrics.
pub struct CaptureSession {
    stream: Option<cpal::Stream>,
    worker: Option<JoinHandle<()>>,
    pipeline: Arc<Pipeline>,
    frames_captured: Arc<AtomicUsize>,
    frames_dropped: Arc<AtomicUsize>,
    device_name: String,
}

impl CaptureSession {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn metrics(&self) -> CaptureMetrics {
        CaptureMetrics::new(
            self.frames_captured.load(Ordering::Relaxed),
            self.frames_dropped.load(Ordering::Relaxed),
            self.pipeline.stats(),
        )
    }

    /// Halt the pipeline, stop and close the stream, and join the worker.
    /// No record is emitted once this returns. Safe to call twice.
    pub fn stop(&mut self) -> CaptureMetrics {
        self.pipeline.halt();
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                warn!(error = %err, "failed to stop audio stream");
            }
            // Dropping the stream closes the device and the frame sender.
            drop(stream);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("analysis worker panicked");
            }
        }
        self.metrics()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check ALSA/PipeWire permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for this app)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}
