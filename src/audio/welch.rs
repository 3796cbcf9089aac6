//! Welch power-spectral-density estimate.
//!
//! The window is split into `fft_size` segments (stepping by
//! `fft_size - overlap`), each segment is Hann-weighted and transformed, and
//! the one-sided periodograms are averaged. Output power is linear, scaled
//! to a density (per Hz) so a pure tone reads the same regardless of segment
//! count.

use rustfft::{num_complex::Complex, FftPlanner};

use super::{FFT_SIZE, SAMPLE_RATE};

/// Parameters for [`welch_psd`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchConfig {
    pub sample_rate: f64,
    pub fft_size: usize,
    /// Samples shared between consecutive segments. Must be below `fft_size`.
    pub overlap: usize,
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self {
            sample_rate: f64::from(SAMPLE_RATE),
            fft_size: FFT_SIZE,
            overlap: 0,
        }
    }
}

impl WelchConfig {
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    fn step(&self) -> usize {
        self.fft_size.saturating_sub(self.overlap).max(1)
    }

    /// Number of one-sided bins (`N/2 + 1`).
    pub fn bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}

/// Power spectral density: `power[k]` is the density at `freqs[k]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Psd {
    pub freqs: Vec<f64>,
    pub power: Vec<f64>,
}

impl Psd {
    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    /// Bins in increasing frequency order as `(freq, power)`.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.freqs.iter().copied().zip(self.power.iter().copied())
    }
}

/// Symmetric Hann window of length `len`.
pub fn hann_window(len: usize) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let denom = (len - 1) as f64;
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / denom).cos()))
        .collect()
}

/// Split `samples` into full segments of `fft_size`; a short input is
/// zero-padded into a single segment.
fn segments<'a>(samples: &'a [f32], cfg: &WelchConfig) -> Vec<std::borrow::Cow<'a, [f32]>> {
    use std::borrow::Cow;

    if samples.len() < cfg.fft_size {
        let mut padded = samples.to_vec();
        padded.resize(cfg.fft_size, 0.0);
        return vec![Cow::Owned(padded)];
    }
    let step = cfg.step();
    let mut out = Vec::with_capacity((samples.len() - cfg.fft_size) / step + 1);
    let mut start = 0;
    while start + cfg.fft_size <= samples.len() {
        out.push(Cow::Borrowed(&samples[start..start + cfg.fft_size]));
        start += step;
    }
    out
}

/// Estimate the one-sided PSD of `samples`.
///
/// Returns an empty [`Psd`] for empty input. `freqs` runs from 0 to Nyquist
/// in steps of `sample_rate / fft_size`.
pub fn welch_psd(samples: &[f32], cfg: &WelchConfig) -> Psd {
    if samples.is_empty() || cfg.fft_size == 0 {
        return Psd::default();
    }

    let nfft = cfg.fft_size;
    let bins = cfg.bins();
    let window = hann_window(nfft);
    let segs = segments(samples, cfg);
    let seg_count = segs.len() as f64;

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nfft);
    let mut buffer = vec![Complex::new(0.0, 0.0); nfft];
    let mut power = vec![0.0f64; bins];

    for seg in &segs {
        for (slot, (&sample, &w)) in buffer.iter_mut().zip(seg.iter().zip(window.iter())) {
            *slot = Complex::new(f64::from(sample) * w, 0.0);
        }
        fft.process(&mut buffer);
        for (k, acc) in power.iter_mut().enumerate() {
            let mut d = buffer[k].norm_sqr() / seg_count;
            // One-sided: fold the negative frequencies into every bin except DC and Nyquist.
            if k > 0 && k < bins - 1 {
                d *= 2.0;
            }
            *acc += d;
        }
    }

    let norm: f64 = window.iter().map(|w| w * w).sum::<f64>() * cfg.sample_rate;
    if norm > 0.0 {
        for p in power.iter_mut() {
            *p /= norm;
        }
    }

    let resolution = cfg.sample_rate / nfft as f64;
    let freqs = (0..bins).map(|k| k as f64 * resolution).collect();

    Psd { freqs, power }
}
