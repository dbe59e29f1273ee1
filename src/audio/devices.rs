//! Device enumeration helpers over `cpal`'s default host.

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use crate::error::{VpError, VpResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

pub fn list_input_devices() -> VpResult<Vec<AudioDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    let devices = host
        .input_devices()
        .map_err(|e| VpError::DeviceError(e.to_string()))?;
    Ok(devices
        .filter_map(|d| d.name().ok())
        .map(|name| AudioDeviceInfo {
            is_default: Some(&name) == default_name.as_ref(),
            name,
        })
        .collect())
}

pub fn list_output_devices() -> VpResult<Vec<AudioDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());
    let devices = host
        .output_devices()
        .map_err(|e| VpError::DeviceError(e.to_string()))?;
    Ok(devices
        .filter_map(|d| d.name().ok())
        .map(|name| AudioDeviceInfo {
            is_default: Some(&name) == default_name.as_ref(),
            name,
        })
        .collect())
}
