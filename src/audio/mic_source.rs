//! Captures from a `cpal` input device into a lock-free ring buffer that
//! `pull` drains from. The stream is built (but left paused) at `open`; it
//! only starts producing once the capsule's output port activates, and
//! pauses again on deactivation rather than running for the device's whole
//! lifetime.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;

use super::AudioFrame;
use crate::capsules::source::Source;
use crate::error::{VpError, VpResult};

pub struct MicSource {
    consumer: std::sync::Mutex<ringbuf::HeapCons<f32>>,
    frame_len: usize,
    stream: Stream,
}

impl MicSource {
    pub fn open(device_name: Option<&str>, sample_rate: u32, frame_len: usize) -> VpResult<Self> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| VpError::DeviceError(e.to_string()))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| VpError::DeviceError(format!("input device not found: {name}")))?,
            None => host
                .default_input_device()
                .ok_or_else(|| VpError::DeviceError("no default input device".into()))?,
        };

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let ring = HeapRb::<f32>::new(sample_rate as usize * 4);
        let (mut producer, consumer) = ring.split();

        let default_format = device
            .default_input_config()
            .map_err(|e| VpError::DeviceError(e.to_string()))?
            .sample_format();

        let stream = match default_format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| {
                    let _ = producer.push_slice(data);
                },
                move |err| tracing::error!(%err, "mic input stream error"),
                None,
            ),
            _ => {
                return Err(VpError::DeviceError(
                    "only f32 input sample format is supported".into(),
                ))
            }
        }
        .map_err(|e| VpError::DeviceError(e.to_string()))?;

        Ok(Self {
            consumer: std::sync::Mutex::new(consumer),
            frame_len,
            stream,
        })
    }
}

impl Source<AudioFrame> for MicSource {
    fn pull(&self) -> Option<AudioFrame> {
        let mut consumer = self.consumer.lock().unwrap();
        if consumer.occupied_len() < self.frame_len {
            return None;
        }
        let mut frame = vec![0.0f32; self.frame_len];
        let popped = consumer.pop_slice(&mut frame);
        frame.truncate(popped);
        Some(std::sync::Arc::new(frame))
    }

    fn start(&self) -> VpResult<()> {
        self.stream.play().map_err(|e| VpError::DeviceError(e.to_string()))
    }

    fn stop(&self) -> VpResult<()> {
        self.stream.pause().map_err(|e| VpError::DeviceError(e.to_string()))
    }
}
