//! Reads a WAV file frame by frame as a `Source<AudioFrame>`, paced to the
//! file's own sample rate so it reproduces real-time cadence instead of
//! draining as fast as it is polled.

use std::sync::Mutex;
use std::time::Duration;

use hound::WavReader;

use super::AudioFrame;
use crate::capsules::source::Source;
use crate::error::{VpError, VpResult};

pub struct FileSource {
    samples: Mutex<std::vec::IntoIter<f32>>,
    frame_len: usize,
    block_duration: Duration,
}

impl FileSource {
    pub fn open(path: &str, frame_len: usize) -> VpResult<Self> {
        let mut reader =
            WavReader::open(path).map_err(|e| VpError::DeviceError(format!("open {path}: {e}")))?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .filter_map(Result::ok)
                .collect(),
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .filter_map(Result::ok)
                    .map(|s| s as f32 / max)
                    .collect()
            }
        };
        let sample_rate = spec.sample_rate.max(1);
        let block_duration = Duration::from_secs_f64(frame_len as f64 / sample_rate as f64);
        Ok(Self {
            samples: Mutex::new(samples.into_iter()),
            frame_len,
            block_duration,
        })
    }
}

impl Source<AudioFrame> for FileSource {
    fn pull(&self) -> Option<AudioFrame> {
        let mut iter = self.samples.lock().unwrap();
        let frame: Vec<f32> = iter.by_ref().take(self.frame_len).collect();
        if frame.is_empty() {
            None
        } else {
            Some(std::sync::Arc::new(frame))
        }
    }

    fn block_duration(&self) -> Option<Duration> {
        Some(self.block_duration)
    }
}
