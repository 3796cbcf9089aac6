use super::defaults::{FORBIDDEN_ID_CHARS, MAX_DEVICE_ID_BYTES, MAX_DEVICE_NAME_BYTES};
use super::{AgentConfig, MAX_FRAME_CHANNEL_CAPACITY, MIN_FRAME_CHANNEL_CAPACITY};
use crate::audio::{WelchConfig, FFT_SIZE};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

impl AgentConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize free-form strings.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_FRAME_CHANNEL_CAPACITY..=MAX_FRAME_CHANNEL_CAPACITY)
            .contains(&self.frame_channel_capacity)
        {
            bail!(
                "--frame-channel-capacity must be between {MIN_FRAME_CHANNEL_CAPACITY} and {MAX_FRAME_CHANNEL_CAPACITY}, got {}",
                self.frame_channel_capacity
            );
        }

        if self.welch_overlap >= FFT_SIZE {
            bail!(
                "--welch-overlap must be below the FFT size ({FFT_SIZE}), got {}",
                self.welch_overlap
            );
        }

        self.device_id = self.device_id.trim().to_string();
        if self.device_id.len() > MAX_DEVICE_ID_BYTES
            || self.device_id.chars().any(char::is_control)
            || self.device_id.chars().any(|ch| FORBIDDEN_ID_CHARS.contains(&ch))
        {
            bail!(
                "--device-id must be <={MAX_DEVICE_ID_BYTES} bytes with no control or shell metacharacters"
            );
        }

        if let Some(device) = &self.input_device {
            let trimmed = device.trim();
            if trimmed.is_empty() {
                bail!("--input-device must not be empty");
            }
            if trimmed.len() > MAX_DEVICE_NAME_BYTES || trimmed.chars().any(char::is_control) {
                bail!(
                    "--input-device must be <={MAX_DEVICE_NAME_BYTES} bytes with no control characters"
                );
            }
            self.input_device = Some(trimmed.to_string());
        }

        self.log_level = self.log_level.trim().to_string();
        EnvFilter::try_new(&self.log_level)
            .with_context(|| format!("invalid --log-level '{}'", self.log_level))?;

        Ok(())
    }

    /// Welch settings derived from the CLI.
    pub fn welch_config(&self) -> WelchConfig {
        WelchConfig::default().with_overlap(self.welch_overlap)
    }
}
