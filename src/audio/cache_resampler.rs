//! Streaming polyphase resampler with a sample cache so input frames don't
//! need to line up with the resampler's fixed chunk size, and with
//! transient cropping on the first chunk a freshly constructed instance
//! produces (the filter's own warm-up tail, not real signal).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rubato::{FftFixedIn, Resampler};

use super::AudioFrame;
use crate::error::{VpError, VpResult};

const WARMUP_CROP_SAMPLES: usize = 32;

pub struct CacheResampler {
    resampler: Mutex<FftFixedIn<f32>>,
    cache: Mutex<VecDeque<f32>>,
    chunk_size: usize,
    warmed_up: AtomicBool,
}

impl CacheResampler {
    pub fn new(sample_rate_in: usize, sample_rate_out: usize, chunk_size: usize) -> VpResult<Self> {
        let resampler = FftFixedIn::<f32>::new(sample_rate_in, sample_rate_out, chunk_size, 2, 1)
            .map_err(|e| VpError::DeviceError(e.to_string()))?;
        Ok(Self {
            resampler: Mutex::new(resampler),
            cache: Mutex::new(VecDeque::new()),
            chunk_size,
            warmed_up: AtomicBool::new(false),
        })
    }

    /// Feeds `frame` into the sample cache and returns however many output
    /// samples the resampler could produce from complete chunks. Leftover
    /// input samples stay cached for the next call.
    pub fn process(&self, frame: &AudioFrame) -> VpResult<AudioFrame> {
        let mut cache = self.cache.lock().unwrap();
        cache.extend(frame.iter().copied());

        let mut resampler = self.resampler.lock().unwrap();
        let mut output = Vec::new();
        while cache.len() >= self.chunk_size {
            let chunk: Vec<f32> = cache.drain(..self.chunk_size).collect();
            let waves_out = resampler
                .process(&[chunk], None)
                .map_err(|e| VpError::DeviceError(e.to_string()))?;
            let mut channel0 = waves_out.into_iter().next().unwrap_or_default();
            if !self.warmed_up.swap(true, Ordering::AcqRel) {
                let crop = channel0.len().min(WARMUP_CROP_SAMPLES);
                channel0.drain(0..crop);
            }
            output.extend(channel0);
        }
        Ok(Arc::new(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_rate_keeps_roughly_same_sample_count() {
        let resampler = CacheResampler::new(16_000, 16_000, 512).unwrap();
        let frame: AudioFrame = Arc::new(vec![0.0; 512]);
        let out = resampler.process(&frame).unwrap();
        // First chunk loses its cropped warm-up tail.
        assert!(out.len() <= 512);
        assert!(out.len() >= 512 - WARMUP_CROP_SAMPLES);
    }
}
