//! Virtual audio device abstraction used by `virtual_mic_sink` and
//! `virtual_speaker_src` to route a pipeline's audio to/from a loopback
//! device instead of a physical one.
//!
//! A real virtual device is only wired up on Windows, where it talks to the
//! driver through an `ioctl`-style handle; elsewhere `NullVirtualDevice`
//! keeps the capsule wiring valid (reads come back empty, writes are
//! discarded) so the rest of the graph still builds and runs in tests.

use std::sync::Arc;
use std::time::Duration;

use super::AudioFrame;
use crate::capsules::sink::Sink;
use crate::capsules::source::Source;
use crate::error::VpResult;

pub trait VirtualAudioDevice: Send + Sync {
    fn write(&self, frame: &AudioFrame) -> VpResult<()>;
    fn read(&self) -> VpResult<Option<AudioFrame>>;
}

/// Wraps a virtual device as a pull source, for pipelines that read audio
/// back out of the loopback device (e.g. a downstream leg playing whatever a
/// peer call leg wrote in). Paced like [`crate::audio::file_source::FileSource`]
/// since a loopback device has no hardware clock of its own to pace reads.
pub struct VirtualDeviceSource {
    device: Arc<dyn VirtualAudioDevice>,
    block_duration: Duration,
}

impl VirtualDeviceSource {
    pub fn new(device: Arc<dyn VirtualAudioDevice>, block_duration: Duration) -> Self {
        Self {
            device,
            block_duration,
        }
    }
}

impl Source<AudioFrame> for VirtualDeviceSource {
    fn pull(&self) -> Option<AudioFrame> {
        match self.device.read() {
            Ok(frame) => frame,
            Err(error) => {
                tracing::error!(%error, "virtual device read failed");
                None
            }
        }
    }

    fn block_duration(&self) -> Option<Duration> {
        Some(self.block_duration)
    }
}

/// Wraps a virtual device as a push sink, for routing synthesized audio out
/// to a loopback device another application reads as a microphone.
pub struct VirtualDeviceSink {
    device: Arc<dyn VirtualAudioDevice>,
}

impl VirtualDeviceSink {
    pub fn new(device: Arc<dyn VirtualAudioDevice>) -> Self {
        Self { device }
    }
}

impl Sink<AudioFrame> for VirtualDeviceSink {
    fn consume(&self, data: AudioFrame) {
        if let Err(error) = self.device.write(&data) {
            tracing::error!(%error, "virtual device write failed");
        }
    }
}

pub struct NullVirtualDevice;

impl VirtualAudioDevice for NullVirtualDevice {
    fn write(&self, _frame: &AudioFrame) -> VpResult<()> {
        Ok(())
    }

    fn read(&self) -> VpResult<Option<AudioFrame>> {
        Ok(None)
    }
}

#[cfg(windows)]
pub mod windows_device {
    use super::*;
    use std::sync::Mutex;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Storage::FileSystem::{
        CreateFileW, FILE_GENERIC_READ, FILE_GENERIC_WRITE, FILE_SHARE_READ, FILE_SHARE_WRITE,
        OPEN_EXISTING,
    };

    /// Talks to the virtual audio cable driver through a device handle
    /// opened by its symbolic link name.
    pub struct WindowsVirtualDevice {
        handle: Mutex<HANDLE>,
    }

    impl WindowsVirtualDevice {
        pub fn open(device_path: &str) -> VpResult<Self> {
            let wide: Vec<u16> = device_path.encode_utf16().chain(std::iter::once(0)).collect();
            let handle = unsafe {
                CreateFileW(
                    windows::core::PCWSTR(wide.as_ptr()),
                    (FILE_GENERIC_READ | FILE_GENERIC_WRITE).0,
                    FILE_SHARE_READ | FILE_SHARE_WRITE,
                    None,
                    OPEN_EXISTING,
                    Default::default(),
                    None,
                )
            }
            .map_err(|e| crate::error::VpError::DeviceError(e.to_string()))?;
            Ok(Self {
                handle: Mutex::new(handle),
            })
        }
    }

    impl Drop for WindowsVirtualDevice {
        fn drop(&mut self) {
            let handle = *self.handle.lock().unwrap();
            unsafe {
                let _ = CloseHandle(handle);
            }
        }
    }

    impl VirtualAudioDevice for WindowsVirtualDevice {
        fn write(&self, frame: &AudioFrame) -> VpResult<()> {
            use windows::Win32::System::IO::DeviceIoControl;
            let handle = *self.handle.lock().unwrap();
            let bytes: Vec<u8> = frame.iter().flat_map(|s| s.to_le_bytes()).collect();
            unsafe {
                DeviceIoControl(handle, 0, Some(bytes.as_ptr() as *const _), bytes.len() as u32, None, 0, None, None)
            }
            .map_err(|e| crate::error::VpError::DeviceError(e.to_string()))
        }

        fn read(&self) -> VpResult<Option<AudioFrame>> {
            // TODO: wire up the driver's read-back ioctl once the downstream
            // pipeline needs to consume real loopback audio on Windows; until
            // then this always reports end-of-stream.
            Ok(None)
        }
    }
}

#[cfg(windows)]
pub use windows_device::WindowsVirtualDevice;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn null_device_write_is_a_noop_and_read_is_empty() {
        let device = NullVirtualDevice;
        device.write(&super::super::silence(4)).unwrap();
        assert!(device.read().unwrap().is_none());
    }

    #[test]
    fn sink_forwards_frames_to_the_device() {
        struct Recording(Mutex<Vec<AudioFrame>>);
        impl VirtualAudioDevice for Recording {
            fn write(&self, frame: &AudioFrame) -> VpResult<()> {
                self.0.lock().unwrap().push(frame.clone());
                Ok(())
            }
            fn read(&self) -> VpResult<Option<AudioFrame>> {
                Ok(None)
            }
        }
        let device = Arc::new(Recording(Mutex::new(Vec::new())));
        let sink = VirtualDeviceSink::new(device.clone());
        sink.consume(super::super::silence(3));
        assert_eq!(device.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn source_pulls_whatever_the_device_returns() {
        struct Fixed(AudioFrame);
        impl VirtualAudioDevice for Fixed {
            fn write(&self, _frame: &AudioFrame) -> VpResult<()> {
                Ok(())
            }
            fn read(&self) -> VpResult<Option<AudioFrame>> {
                Ok(Some(self.0.clone()))
            }
        }
        let device = Arc::new(Fixed(super::super::silence(2)));
        let source = VirtualDeviceSource::new(device, Duration::from_millis(10));
        assert_eq!(source.pull().unwrap().len(), 2);
    }
}
