//! Microphone capture and the acoustic analysis building blocks.
//!
//! Audio is captured via CPAL as 44.1 kHz mono f32, re-chunked into fixed
//! frames, and handed to the analysis worker. The spectral and loudness math
//! lives here too so it can be exercised without a device.

/// Capture sample rate (Hz). Not negotiated; devices that cannot run at this
/// rate are rejected.
pub const SAMPLE_RATE: u32 = 44_100;

/// Samples per callback frame (`F`).
pub const FRAME_SAMPLES: usize = 1024;

/// Samples needed before a window is analysed (`W`, 0.5 s at 44.1 kHz).
pub const WINDOW_SAMPLES: usize = 22_050;

/// FFT length used by the Welch estimator (`N`).
pub const FFT_SIZE: usize = 1024;

/// Reference pressure for SPL conversion (20 µPa).
pub const P_REF: f64 = 0.000_02;

mod bands;
mod capture;
mod dispatch;
mod loudness;
mod welch;

pub use bands::{band_key, reduce_bands, BandSummary, BAND_EDGES};
pub use capture::{CaptureMetrics, CaptureSession, Microphone};
pub use loudness::{frame_loudness, Loudness};
pub use welch::{hann_window, welch_psd, Psd, WelchConfig};
