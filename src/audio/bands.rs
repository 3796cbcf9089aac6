//! Collapse PSD bins into fixed frequency bands.
//!
//! Each band is the interval `(B[e-1], B[e]]` keyed by its upper edge. The
//! reducer walks bins once and advances at most one edge per bin, so a bin
//! that skips past several narrow bands only seeds the next one. The wire
//! output depends on this walk; do not "fix" it into a binary search.

use std::collections::BTreeMap;

use super::Psd;

/// Band key (shortest decimal form of the upper edge) to calibrated level.
pub type BandSummary = BTreeMap<String, f64>;

/// Canonical 60-edge layout: third-octave centers up to 630 Hz, sixth-octave
/// steps to 5 kHz, twelfth-octave steps to 20 kHz, then the top of the range
/// up to Nyquist. Every band from 800 Hz up spans at least two FFT bins, so
/// the one-edge-per-bin walk stays in step from there on.
#[cfg(not(feature = "legacy-bands"))]
pub const BAND_EDGES: [f64; 60] = [
    20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, //
    200.0, 250.0, 315.0, 400.0, 500.0, 630.0, 800.0, 900.0, 1000.0, 1120.0, //
    1250.0, 1400.0, 1600.0, 1800.0, 2000.0, 2240.0, 2500.0, 2800.0, 3150.0, 3550.0, //
    4000.0, 4500.0, 5000.0, 5300.0, 5600.0, 6000.0, 6300.0, 6700.0, 7100.0, 7500.0, //
    8000.0, 8500.0, 9000.0, 9500.0, 10000.0, 10600.0, 11200.0, 11800.0, 12500.0, 13200.0, //
    14000.0, 15000.0, 16000.0, 17000.0, 18000.0, 19000.0, 20000.0, 21000.0, 22000.0, 22050.0,
];

/// Legacy 32-edge layout shipped by older agents.
#[cfg(feature = "legacy-bands")]
pub const BAND_EDGES: [f64; 32] = [
    20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0,
    500.0, 630.0, 800.0, 1000.0, 1250.0, 1500.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0,
    8000.0, 12000.0, 16000.0, 20000.0, 22000.0, 22050.0,
];

/// Wire key for a band edge: `31.5` -> `"31.5"`, `1000.0` -> `"1000"`.
pub fn band_key(edge: f64) -> String {
    format!("{edge}")
}

/// `10·log10(power)`, with zero, negative and NaN powers mapped to `-inf`.
fn power_db(power: f64) -> f64 {
    if power > 0.0 {
        10.0 * power.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// Reduce `psd` to per-band maxima over `edges`, applying `calibrate` to each
/// recorded dB value. Bands that never see a finite bin are omitted, and bins
/// above the last edge are dropped.
pub fn reduce_bands<F>(psd: &Psd, edges: &[f64], calibrate: F) -> BandSummary
where
    F: Fn(f64) -> f64,
{
    let mut out = BandSummary::new();
    if edges.is_empty() {
        return out;
    }

    let mut e = 0usize;
    let mut max_db = f64::NEG_INFINITY;

    for (freq, power) in psd.bins() {
        let d = power_db(power);
        if freq <= edges[e] {
            if d > max_db {
                max_db = d;
            }
            continue;
        }

        record(&mut out, edges[e], max_db, &calibrate);
        max_db = f64::NEG_INFINITY;
        e += 1;
        if e == edges.len() {
            // Past the last edge: everything from here on is dropped.
            return out;
        }
        if freq <= edges[e] {
            max_db = d;
        }
    }

    record(&mut out, edges[e], max_db, &calibrate);
    out
}

fn record<F>(out: &mut BandSummary, edge: f64, max_db: f64, calibrate: &F)
where
    F: Fn(f64) -> f64,
{
    if max_db > f64::NEG_INFINITY {
        out.insert(band_key(edge), calibrate(max_db));
    }
}
