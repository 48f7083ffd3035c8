//! Output device selection (spec §6 `--device`), inverted from
//! `coldvox-audio::device::DeviceManager` (which enumerates/selects *input*
//! devices for capture) to select an *output* device for playback.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use snapsync_foundation::error::{ClientError, RecoveryStrategy};

pub struct DeviceManager {
    host: Host,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn enumerate_names(&self) -> Vec<String> {
        self.host
            .output_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }

    /// Opens a specific device by exact name, falling back to a
    /// case-insensitive substring match; with no name, falls back to the
    /// host's default output device. Mirrors
    /// `coldvox-audio::device::DeviceManager::open_device`'s
    /// exact-then-fuzzy-then-default precedence. When neither an exact nor a
    /// fuzzy match exists, the miss is routed through
    /// `ClientError::DeviceNotFound`/`RecoveryStrategy::Fallback` the same
    /// way `ColdVoxError::Audio(AudioError::DeviceNotFound)` drives a
    /// fallback to the default device, rather than failing the caller ad hoc.
    pub fn open_device(&self, name: Option<&str>) -> Result<Device, ClientError> {
        if let Some(preferred) = name {
            if let Some(device) = self.find_by_name(preferred) {
                return Ok(device);
            }
            if let Some(device) = self.find_by_predicate(|n| {
                n.to_lowercase().contains(&preferred.to_lowercase())
            }) {
                tracing::warn!(
                    requested = preferred,
                    found = %device.name().unwrap_or_default(),
                    "exact output device not found; using closest match"
                );
                return Ok(device);
            }

            let err = ClientError::DeviceNotFound {
                name: Some(preferred.to_string()),
            };
            return match err.recovery_strategy() {
                RecoveryStrategy::Fallback { to } => {
                    tracing::warn!(
                        requested = preferred,
                        fallback = %to,
                        "output device not found; falling back to default device"
                    );
                    self.default_device()
                }
                _ => Err(err),
            };
        }

        self.default_device()
    }

    fn default_device(&self) -> Result<Device, ClientError> {
        self.host.default_output_device().ok_or_else(|| {
            ClientError::AudioDevice("no default output device available".to_string())
        })
    }

    fn find_by_name(&self, name: &str) -> Option<Device> {
        self.find_by_predicate(|n| n == name)
    }

    fn find_by_predicate<F: Fn(&str) -> bool>(&self, pred: F) -> Option<Device> {
        self.host.output_devices().ok()?.find(|d| {
            d.name().map(|n| pred(&n)).unwrap_or(false)
        })
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
