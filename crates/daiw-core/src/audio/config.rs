//! Audio session configuration
//!
//! Request ([`DeviceSetup`]) and result ([`StreamConfiguration`]) types for
//! the device session, the capability sets a device reports, and the
//! serializable [`EngineConfig`] that front ends persist between runs.

use serde::{Deserialize, Serialize};

/// Preferred buffer size requested at open time (frames)
/// 256 frames @ 48kHz = ~5.3ms
pub const PREFERRED_BUFFER_SIZE: u32 = 256;

/// Fallback buffer size when the device has no opinion (frames)
/// 512 frames is a safe default that works on most systems
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Channels requested per direction when a device is (re)selected
pub const DEFAULT_CHANNELS: u16 = 2;

/// Sample rates offered to the user when the device reports a range
pub const COMMON_SAMPLE_RATES: [u32; 11] = [
    8000, 11025, 16000, 22050, 32000, 44100, 48000, 88200, 96000, 176400, 192000,
];

/// Buffer sizes offered to the user when the device reports a range (frames)
pub const CANDIDATE_BUFFER_SIZES: [u32; 8] = [32, 64, 128, 256, 512, 1024, 2048, 4096];

/// Default UI meter refresh rate (polls per second)
pub const DEFAULT_METER_REFRESH_HZ: u32 = 30;

/// Requested device configuration
///
/// `None` for a device disables that direction. `None` for rate or buffer
/// size keeps the current value when the target device supports it and
/// otherwise takes the device default. Channel counts are clamped to what
/// the device offers.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSetup {
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate_hz: Option<f64>,
    pub buffer_size_frames: Option<u32>,
    pub input_channels: u16,
    pub output_channels: u16,
}

impl DeviceSetup {
    pub fn new(input_device: Option<String>, output_device: Option<String>) -> Self {
        Self {
            input_device,
            output_device,
            sample_rate_hz: None,
            buffer_size_frames: None,
            input_channels: DEFAULT_CHANNELS,
            output_channels: DEFAULT_CHANNELS,
        }
    }

    pub fn with_sample_rate(mut self, hz: f64) -> Self {
        self.sample_rate_hz = Some(hz);
        self
    }

    pub fn with_buffer_size(mut self, frames: u32) -> Self {
        self.buffer_size_frames = Some(frames);
        self
    }

    pub fn with_channels(mut self, input: u16, output: u16) -> Self {
        self.input_channels = input;
        self.output_channels = output;
        self
    }

    /// Whether neither direction has a device
    pub fn is_empty(&self) -> bool {
        self.input_device.is_none() && self.output_device.is_none()
    }
}

/// Configuration of the currently open stream
///
/// Device names are empty when that direction is disabled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamConfiguration {
    pub sample_rate_hz: f64,
    pub buffer_size_frames: u32,
    pub input_channel_count: u16,
    pub output_channel_count: u16,
    pub input_device_name: String,
    pub output_device_name: String,
}

impl StreamConfiguration {
    /// One-way latency of a single block in milliseconds
    pub fn latency_ms(&self) -> f64 {
        if self.sample_rate_hz > 0.0 {
            self.buffer_size_frames as f64 / self.sample_rate_hz * 1000.0
        } else {
            0.0
        }
    }

    /// Rebuild the request that produced this configuration
    pub fn to_setup(&self) -> DeviceSetup {
        let name = |s: &String| (!s.is_empty()).then(|| s.clone());
        DeviceSetup {
            input_device: name(&self.input_device_name),
            output_device: name(&self.output_device_name),
            sample_rate_hz: Some(self.sample_rate_hz),
            buffer_size_frames: Some(self.buffer_size_frames),
            input_channels: self.input_channel_count,
            output_channels: self.output_channel_count,
        }
    }
}

/// What a prospective input/output device pair supports
///
/// For a duplex pair the rate and buffer size sets are the intersection of
/// both sides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceCapabilities {
    pub sample_rates: Vec<f64>,
    pub buffer_sizes: Vec<u32>,
    pub max_input_channels: u16,
    pub max_output_channels: u16,
    pub default_sample_rate: f64,
    pub default_buffer_size: u32,
}

impl DeviceCapabilities {
    pub fn supports_sample_rate(&self, hz: f64) -> bool {
        self.sample_rates.iter().any(|&r| (r - hz).abs() < 0.5)
    }

    pub fn supports_buffer_size(&self, frames: u32) -> bool {
        self.buffer_sizes.contains(&frames)
    }
}

/// Persistent engine preferences
///
/// Saved by front ends so the last device selection is restored on launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Channels requested per direction when opening
    pub input_channels: u16,
    pub output_channels: u16,

    /// Low-latency buffer size requested at open time (frames)
    pub preferred_buffer_size: u32,

    /// Sample rate to restore (None = device default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_sample_rate: Option<f64>,

    /// Last selected devices (None = platform default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,

    /// How often the UI polls the level bridge
    pub meter_refresh_hz: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_channels: DEFAULT_CHANNELS,
            output_channels: DEFAULT_CHANNELS,
            preferred_buffer_size: PREFERRED_BUFFER_SIZE,
            preferred_sample_rate: None,
            input_device: None,
            output_device: None,
            meter_refresh_hz: DEFAULT_METER_REFRESH_HZ,
        }
    }
}

impl EngineConfig {
    /// Record the devices and format of an applied configuration
    pub fn remember(&mut self, config: &StreamConfiguration) {
        let name = |s: &String| (!s.is_empty()).then(|| s.clone());
        self.input_device = name(&config.input_device_name);
        self.output_device = name(&config.output_device_name);
        self.preferred_sample_rate = Some(config.sample_rate_hz);
        self.preferred_buffer_size = config.buffer_size_frames;
    }
}
