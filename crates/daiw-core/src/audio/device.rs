//! Audio device enumeration
//!
//! Lists input and output devices from ALL available audio hosts (ALSA, JACK,
//! WASAPI, CoreAudio...). Results are concatenated host by host in the order
//! the platform reports them, and each host's devices keep their enumeration
//! order. Nothing is sorted, cached or deduplicated: a device exposed by two
//! hosts appears once per host.
//!
//! Every function here is a pure query and is safe to call while a stream is
//! running.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::HostId;

use super::error::{AudioError, AudioResult};
use crate::types::Direction;

/// One hardware device in one direction
///
/// Produced fresh by each query; the name is the only identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceDescriptor {
    /// Device name as reported by the host
    pub name: String,
    /// Host backend name (e.g. "ALSA", "JACK")
    pub host: String,
    pub direction: Direction,
}

impl DeviceDescriptor {
    pub fn new(name: impl Into<String>, host: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            direction,
        }
    }
}

impl std::fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show host prefix for clarity, e.g., "[ALSA] hw:0,0"
        write!(f, "[{}] {}", self.host, self.name)
    }
}

/// Get a human-readable name for a host ID
pub(crate) fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        "Asio" => "ASIO".to_string(),
        _ => name,
    }
}

/// Names of every audio host compiled in and available, in platform order
pub fn available_host_names() -> Vec<String> {
    cpal::available_hosts().into_iter().map(host_name).collect()
}

fn device_list(host: &cpal::Host, direction: Direction) -> Result<Vec<cpal::Device>, String> {
    match direction {
        Direction::Input => host
            .input_devices()
            .map(|d| d.collect())
            .map_err(|e| e.to_string()),
        Direction::Output => host
            .output_devices()
            .map(|d| d.collect())
            .map_err(|e| e.to_string()),
    }
}

/// Every device in one direction across all hosts
pub fn enumerate_devices(direction: Direction) -> Vec<DeviceDescriptor> {
    let mut descriptors = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(h) => h,
            Err(e) => {
                log::debug!("Could not initialize host {:?}: {}", host_id, e);
                continue;
            }
        };

        let devices = match device_list(&host, direction) {
            Ok(d) => d,
            Err(e) => {
                log::debug!("Could not enumerate {} devices for {:?}: {}", direction, host_id, e);
                continue;
            }
        };

        let host_name_str = host_name(host_id);
        descriptors.extend(
            devices
                .iter()
                .filter_map(|device| device.name().ok())
                .map(|name| DeviceDescriptor::new(name, host_name_str.clone(), direction)),
        );
    }

    log::debug!("Enumerated {} {} devices", descriptors.len(), direction);
    descriptors
}

/// Every input device across all hosts
pub fn list_input_devices() -> Vec<DeviceDescriptor> {
    enumerate_devices(Direction::Input)
}

/// Every output device across all hosts
pub fn list_output_devices() -> Vec<DeviceDescriptor> {
    enumerate_devices(Direction::Output)
}

/// Input device names only, for list-style pickers
pub fn input_device_names() -> Vec<String> {
    list_input_devices().into_iter().map(|d| d.name).collect()
}

/// Output device names only, for list-style pickers
pub fn output_device_names() -> Vec<String> {
    list_output_devices().into_iter().map(|d| d.name).collect()
}

/// Default device of the default host
pub fn default_device(direction: Direction) -> Option<cpal::Device> {
    let host = cpal::default_host();
    match direction {
        Direction::Input => host.default_input_device(),
        Direction::Output => host.default_output_device(),
    }
}

/// Name of the default device of the default host
pub fn default_device_name(direction: Direction) -> Option<String> {
    default_device(direction).and_then(|d| d.name().ok())
}

/// Find a device by name, searching the default host first and then every
/// other host in platform order
pub fn find_device(name: &str, direction: Direction) -> AudioResult<cpal::Device> {
    let default_id = cpal::default_host().id();
    let mut host_ids = cpal::available_hosts();
    host_ids.sort_by_key(|id| *id != default_id);

    for host_id in host_ids {
        let Ok(host) = cpal::host_from_id(host_id) else {
            continue;
        };
        let Ok(devices) = device_list(&host, direction) else {
            continue;
        };
        if let Some(device) = devices
            .into_iter()
            .find(|d| d.name().ok().as_deref() == Some(name))
        {
            return Ok(device);
        }
    }

    Err(AudioError::DeviceNotFound(format!("{} ({})", name, direction)))
}
