//! Audio capsules: mixing, metering, volume, resampling, variable-speed
//! playback, and the file/mic/speaker/virtual-device endpoints.

pub mod cache_resampler;
pub mod devices;
pub mod file_source;
pub mod mic_source;
pub mod mixer;
pub mod queue_player;
pub mod rms;
pub mod speaker_sink;
pub mod virtual_device;
pub mod volume;

use std::sync::Arc;

/// A chunk of mono, `f32`-normalized PCM samples. `Arc`-wrapped so fan-out
/// through a port or a mixer's per-input buffering never copies sample
/// data.
pub type AudioFrame = Arc<Vec<f32>>;

pub fn silence(len: usize) -> AudioFrame {
    Arc::new(vec![0.0; len])
}
