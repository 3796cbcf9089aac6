use crate::calibration::Calibration;

/// Calibrated SPL of a single frame. `None` means the level was `-inf`
/// (digital silence); such fields are left out of the emitted record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Loudness {
    pub db_avg: Option<f64>,
    pub db_peak: Option<f64>,
}

/// RMS and peak of `frame` converted to calibrated SPL.
pub fn frame_loudness(frame: &[f32], calibration: &Calibration) -> Loudness {
    if frame.is_empty() {
        return Loudness::default();
    }
    let energy = frame
        .iter()
        .map(|&s| f64::from(s) * f64::from(s))
        .sum::<f64>()
        / frame.len() as f64;
    let rms = energy.sqrt();
    let peak = frame
        .iter()
        .map(|&s| f64::from(s).abs())
        .fold(0.0f64, f64::max);

    Loudness {
        db_avg: finite(calibration.spl(rms)),
        db_peak: finite(calibration.spl(peak)),
    }
}

fn finite(db: f64) -> Option<f64> {
    db.is_finite().then_some(db)
}
