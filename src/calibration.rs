//! Operator calibration offset (`DB_OFFSET`).

use std::env;

use tracing::warn;

use crate::audio::P_REF;

/// Environment variable holding the calibration offset in dB.
pub const DB_OFFSET_ENV: &str = "DB_OFFSET";

/// Offset applied when `DB_OFFSET` is unset or unparseable.
pub const DEFAULT_DB_OFFSET: f64 = 10.0;

/// Maps uncalibrated device levels to physical SPL.
///
/// Band levels and loudness levels use different conventions, carried over
/// from the deployed fleet: bands report `offset - dBFS`, loudness reports
/// `dB re 20 µPa + offset`. Consumers are calibrated against both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    offset: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(DEFAULT_DB_OFFSET)
    }
}

impl Calibration {
    pub fn new(offset: f64) -> Self {
        Self { offset }
    }

    /// Read `DB_OFFSET` from the process environment. Call once at startup.
    pub fn from_env() -> Self {
        Self::parse(env::var(DB_OFFSET_ENV).ok().as_deref())
    }

    /// Resolve a raw `DB_OFFSET` value, falling back to the default with a
    /// warning when it is missing, unparseable or not finite.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) => match value.parse::<f64>() {
                Ok(offset) if offset.is_finite() => Self::new(offset),
                _ => {
                    warn!(
                        value,
                        default = DEFAULT_DB_OFFSET,
                        "{DB_OFFSET_ENV} is not a number; using default"
                    );
                    Self::default()
                }
            },
            None => {
                warn!(
                    default = DEFAULT_DB_OFFSET,
                    "{DB_OFFSET_ENV} not set; using default"
                );
                Self::default()
            }
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Band convention: `offset - dBFS`.
    pub fn band_level(&self, dbfs: f64) -> f64 {
        self.offset - dbfs
    }

    /// Loudness convention: `20·log10(amplitude / 20 µPa) + offset`.
    /// Zero amplitude yields `-inf`.
    pub fn spl(&self, amplitude: f64) -> f64 {
        20.0 * (amplitude / P_REF).log10() + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        (out, text)
    }

    // Sole writer of DB_OFFSET in the test suite.
    #[test]
    fn from_env_reads_offset_and_warns_on_fallback() {
        env::set_var(DB_OFFSET_ENV, "4.5");
        let (cal, logs) = with_captured_logs(Calibration::from_env);
        assert_eq!(cal.offset(), 4.5);
        assert!(!logs.contains("WARN"), "unexpected warning: {logs}");

        env::remove_var(DB_OFFSET_ENV);
        let (cal, logs) = with_captured_logs(Calibration::from_env);
        assert_eq!(cal.offset(), DEFAULT_DB_OFFSET);
        assert!(logs.contains("WARN"));
        assert!(logs.contains("DB_OFFSET not set; using default"));

        env::set_var(DB_OFFSET_ENV, "abc");
        let (cal, logs) = with_captured_logs(Calibration::from_env);
        assert_eq!(cal.offset(), DEFAULT_DB_OFFSET);
        assert!(logs.contains("DB_OFFSET is not a number; using default"));
        assert!(logs.contains("abc"));

        env::remove_var(DB_OFFSET_ENV);
    }

    #[test]
    fn parse_accepts_decimal_offsets() {
        assert_eq!(Calibration::parse(Some("3.5")).offset(), 3.5);
        assert_eq!(Calibration::parse(Some(" -12 ")).offset(), -12.0);
    }

    #[test]
    fn parse_falls_back_when_unset_or_malformed() {
        assert_eq!(Calibration::parse(None).offset(), DEFAULT_DB_OFFSET);
        assert_eq!(Calibration::parse(Some("abc")).offset(), DEFAULT_DB_OFFSET);
        assert_eq!(Calibration::parse(Some("")).offset(), DEFAULT_DB_OFFSET);
        assert_eq!(Calibration::parse(Some("NaN")).offset(), DEFAULT_DB_OFFSET);
    }

    #[test]
    fn band_level_subtracts_dbfs_from_offset() {
        let cal = Calibration::new(160.0);
        assert_eq!(cal.band_level(-180.0), 340.0);
        assert_eq!(Calibration::new(0.0).band_level(-20.0), 20.0);
    }

    #[test]
    fn spl_adds_offset() {
        let base = Calibration::new(0.0).spl(0.5);
        let shifted = Calibration::new(7.25).spl(0.5);
        assert!((shifted - base - 7.25).abs() < 1e-9);
        assert!((base - 20.0 * (0.5f64 / 2e-5).log10()).abs() < 1e-9);
    }

    #[test]
    fn spl_of_silence_is_negative_infinity() {
        assert_eq!(Calibration::default().spl(0.0), f64::NEG_INFINITY);
    }
}
