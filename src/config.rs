//! Audio format and pipeline configuration.
//!
//! Defaults are tuned for 16 kHz mono PCM (the sample rate every ASR/TTS
//! service in this codebase speaks); individual fields can be overridden
//! through environment variables for local experimentation, the way the
//! original let the engine run standalone without an operator bringing up
//! a full config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub format: AudioFormat,
    /// Frames per audio buffer passed along a port.
    pub buffer_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            buffer_frames: 2048,
        }
    }
}

impl AudioConfig {
    /// Starts from [`AudioConfig::default`] and applies any of
    /// `VPIPE_SAMPLE_RATE`, `VPIPE_CHANNELS`, `VPIPE_BUFFER_FRAMES` found in
    /// the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("VPIPE_SAMPLE_RATE") {
            if let Ok(parsed) = v.parse() {
                config.format.sample_rate = parsed;
            }
        }
        if let Ok(v) = std::env::var("VPIPE_CHANNELS") {
            if let Ok(parsed) = v.parse() {
                config.format.channels = parsed;
            }
        }
        if let Ok(v) = std::env::var("VPIPE_BUFFER_FRAMES") {
            if let Ok(parsed) = v.parse() {
                config.buffer_frames = parsed;
            }
        }
        config
    }

    /// Wall-clock duration one `buffer_frames`-sample block represents at
    /// this config's sample rate — the rate-pacing interval for a
    /// pull-driven source built against this config.
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.buffer_frames as f64 / self.format.sample_rate.max(1) as f64)
    }
}
