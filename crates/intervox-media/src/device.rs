use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, SupportedStreamConfig};
use intervox_foundation::MediaError;

pub struct DeviceManager {
    host: Host,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Resolve an input device: the named one if requested, otherwise the
    /// host default. A missing default device means the platform refused us
    /// microphone access.
    pub fn input_device(&self, preferred: Option<&str>) -> Result<Device, MediaError> {
        if let Some(name) = preferred {
            let mut devices = self
                .host
                .input_devices()
                .map_err(|e| MediaError::PermissionDenied {
                    reason: e.to_string(),
                })?;
            return devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or(MediaError::DeviceNotFound {
                    name: Some(name.to_string()),
                });
        }

        self.host
            .default_input_device()
            .ok_or(MediaError::PermissionDenied {
                reason: "no input device available".into(),
            })
    }

    pub fn input_config(&self, device: &Device) -> Result<SupportedStreamConfig, MediaError> {
        Ok(device.default_input_config()?)
    }

    pub fn candidate_device_names(&self) -> Vec<String> {
        match self.host.input_devices() {
            Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
