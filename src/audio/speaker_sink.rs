//! Plays `AudioFrame`s to a `cpal` output device via a ring buffer. The
//! stream is built (but left paused) at `open`; it only starts playing once
//! the capsule's input port activates, and pauses again on deactivation.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Stream;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;

use super::AudioFrame;
use crate::capsules::sink::Sink;
use crate::error::{VpError, VpResult};

pub struct SpeakerSink {
    producer: std::sync::Mutex<ringbuf::HeapProd<f32>>,
    stream: Stream,
}

impl SpeakerSink {
    pub fn open(device_name: Option<&str>, sample_rate: u32) -> VpResult<Self> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .output_devices()
                .map_err(|e| VpError::DeviceError(e.to_string()))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| VpError::DeviceError(format!("output device not found: {name}")))?,
            None => host
                .default_output_device()
                .ok_or_else(|| VpError::DeviceError("no default output device".into()))?,
        };

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let ring = HeapRb::<f32>::new(sample_rate as usize * 4);
        let (producer, mut consumer) = ring.split();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| {
                    let popped = consumer.pop_slice(data);
                    for sample in &mut data[popped..] {
                        *sample = 0.0;
                    }
                },
                move |err| tracing::error!(%err, "speaker output stream error"),
                None,
            )
            .map_err(|e| VpError::DeviceError(e.to_string()))?;

        Ok(Self {
            producer: std::sync::Mutex::new(producer),
            stream,
        })
    }
}

impl Sink<AudioFrame> for SpeakerSink {
    fn consume(&self, data: AudioFrame) {
        let mut producer = self.producer.lock().unwrap();
        let _ = producer.push_slice(&data);
    }

    fn open(&self) -> VpResult<()> {
        self.stream.play().map_err(|e| VpError::DeviceError(e.to_string()))
    }

    fn close(&self) -> VpResult<()> {
        self.stream.pause().map_err(|e| VpError::DeviceError(e.to_string()))
    }
}
