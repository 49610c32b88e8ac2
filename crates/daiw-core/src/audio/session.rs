//! Device session
//!
//! Owns the one open input/output device pair and mediates every change to
//! it. All mutators funnel into [`DeviceSession::apply`]:
//!
//! 1. Probe the target pair without opening it
//! 2. Resolve rate, buffer size and channel counts against what it supports
//! 3. Skip the restart entirely if nothing would change
//! 4. Close the running stream, open the new one
//! 5. On failure, reopen the previous configuration
//!
//! Callers therefore see either the new configuration or the old one, never
//! a mixture. The stream is only ever reconfigured from the control thread,
//! with the old stream fully stopped before the new one starts.

use std::sync::Arc;

use crossbeam::channel::Receiver;

use super::backend::{AudioPlatform, PlatformDevice};
use super::config::{
    DeviceCapabilities, DeviceSetup, StreamConfiguration, DEFAULT_CHANNELS, PREFERRED_BUFFER_SIZE,
};
use super::device::DeviceDescriptor;
use super::error::{AudioError, AudioResult};
use super::notify::{ChangeNotifier, ConfigurationChange};
use crate::engine::CallbackGate;
use crate::types::{ActiveChannels, Direction};

/// Soft condition reported by an otherwise successful open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionWarning {
    /// The low-latency buffer size was not offered; the device default was used
    BufferSizePreferenceUnmet { requested: u32, granted: u32 },
}

impl std::fmt::Display for SessionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionWarning::BufferSizePreferenceUnmet { requested, granted } => write!(
                f,
                "Could not set preferred buffer size of {} frames, using {} frames",
                requested, granted
            ),
        }
    }
}

/// Outcome of a successful open
#[derive(Debug, Clone, PartialEq)]
pub struct OpenReport {
    pub configuration: StreamConfiguration,
    pub warnings: Vec<SessionWarning>,
}

/// The open device pair and its configuration
pub struct DeviceSession {
    platform: Box<dyn AudioPlatform>,
    device: Option<Box<dyn PlatformDevice>>,
    gate: Arc<CallbackGate>,
    notifier: Arc<ChangeNotifier>,
    last_warning: Option<SessionWarning>,
    /// Channel counts asked for by the most recent open (input, output).
    /// Device switches fall back to these.
    requested_channels: (u16, u16),
}

impl DeviceSession {
    /// Create a session with no device open
    ///
    /// Every stream the session opens renders through `gate`.
    pub fn new(platform: Box<dyn AudioPlatform>, gate: Arc<CallbackGate>) -> Self {
        Self {
            platform,
            device: None,
            gate,
            notifier: Arc::new(ChangeNotifier::new()),
            last_warning: None,
            requested_channels: (DEFAULT_CHANNELS, DEFAULT_CHANNELS),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Opening
    // ─────────────────────────────────────────────────────────────────────

    /// Open the platform's default devices at the preferred low-latency size
    pub fn open(&mut self, input_channels: u16, output_channels: u16) -> AudioResult<OpenReport> {
        self.open_preferring(input_channels, output_channels, PREFERRED_BUFFER_SIZE)
    }

    /// Open the platform's default devices, preferring `preferred_buffer_size`
    pub fn open_preferring(
        &mut self,
        input_channels: u16,
        output_channels: u16,
        preferred_buffer_size: u32,
    ) -> AudioResult<OpenReport> {
        self.requested_channels = (input_channels, output_channels);
        let input = (input_channels > 0)
            .then(|| self.platform.default_device_name(Direction::Input))
            .flatten();
        let output = (output_channels > 0)
            .then(|| self.platform.default_device_name(Direction::Output))
            .flatten();

        if input.is_none() && output.is_none() {
            let err = AudioError::DeviceOpenFailure("No default audio devices available".to_string());
            log::warn!("{}", err);
            return Err(err);
        }

        let setup = DeviceSetup::new(input, output).with_channels(input_channels, output_channels);
        self.open_with(setup, preferred_buffer_size)
    }

    /// Open a specific setup
    ///
    /// An explicit buffer size in `setup` must be supported. Otherwise
    /// `preferred_buffer_size` is used when offered, falling back to the
    /// device default with a [`SessionWarning`].
    pub fn open_with(
        &mut self,
        mut setup: DeviceSetup,
        preferred_buffer_size: u32,
    ) -> AudioResult<OpenReport> {
        self.requested_channels = (setup.input_channels, setup.output_channels);
        let caps = self
            .probe(&setup)
            .map_err(|e| {
                log::warn!("Failed to initialize audio devices: {}", e);
                e
            })?;

        let mut warnings = Vec::new();
        if setup.buffer_size_frames.is_none() {
            let granted = if caps.supports_buffer_size(preferred_buffer_size) {
                preferred_buffer_size
            } else {
                let warning = SessionWarning::BufferSizePreferenceUnmet {
                    requested: preferred_buffer_size,
                    granted: caps.default_buffer_size,
                };
                log::warn!("{}", warning);
                warnings.push(warning);
                caps.default_buffer_size
            };
            setup.buffer_size_frames = Some(granted);
        }

        self.apply_probed(&setup, &caps)?;
        self.last_warning = warnings.last().cloned();

        Ok(OpenReport {
            configuration: self.current_configuration().unwrap_or_default(),
            warnings,
        })
    }

    /// Close the device. No-op when nothing is open.
    pub fn close(&mut self) {
        if self.device.take().is_some() {
            log::info!("Audio device closed");
            self.notifier.notify(ConfigurationChange::Closed);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reconfiguration
    // ─────────────────────────────────────────────────────────────────────

    /// Apply a new setup atomically
    ///
    /// On error the previous configuration is still active (or, if even the
    /// rollback failed, no device is open and subscribers got `Closed`).
    pub fn apply(&mut self, setup: &DeviceSetup) -> AudioResult<()> {
        let caps = self.probe(setup)?;
        self.apply_probed(setup, &caps)
    }

    /// Switch the input device, keeping the output side
    ///
    /// Input channels revert to the count requested at open. An empty name
    /// disables input.
    pub fn set_input_device(&mut self, name: &str) -> AudioResult<()> {
        log::debug!("set_input_device: '{}'", name);
        let mut setup = self.base_setup();
        setup.input_device = (!name.is_empty()).then(|| name.to_string());
        setup.input_channels = self.requested_channels.0;
        self.apply(&setup).map_err(|e| {
            log::warn!("set_input_device failed: {}", e);
            e
        })
    }

    /// Switch the output device, keeping the input side
    ///
    /// Output channels revert to the count requested at open. An empty name
    /// disables output.
    pub fn set_output_device(&mut self, name: &str) -> AudioResult<()> {
        log::debug!("set_output_device: '{}'", name);
        let mut setup = self.base_setup();
        setup.output_device = (!name.is_empty()).then(|| name.to_string());
        setup.output_channels = self.requested_channels.1;
        self.apply(&setup).map_err(|e| {
            log::warn!("set_output_device failed: {}", e);
            e
        })
    }

    /// Change the sample rate of the open device
    pub fn set_sample_rate(&mut self, hz: f64) -> AudioResult<()> {
        let device = self.device.as_ref().ok_or(AudioError::NoDeviceOpen)?;
        if !device.capabilities().supports_sample_rate(hz) {
            return Err(AudioError::UnsupportedConfiguration(format!(
                "{}Hz is not supported by the current device (available: {:?})",
                hz,
                device.capabilities().sample_rates
            )));
        }
        let mut setup = device.configuration().to_setup();
        setup.sample_rate_hz = Some(hz);
        self.apply(&setup)
    }

    /// Change the buffer size of the open device
    pub fn set_buffer_size(&mut self, frames: u32) -> AudioResult<()> {
        let device = self.device.as_ref().ok_or(AudioError::NoDeviceOpen)?;
        if !device.capabilities().supports_buffer_size(frames) {
            return Err(AudioError::UnsupportedConfiguration(format!(
                "{} frames is not supported by the current device (available: {:?})",
                frames,
                device.capabilities().buffer_sizes
            )));
        }
        let mut setup = device.configuration().to_setup();
        setup.buffer_size_frames = Some(frames);
        self.apply(&setup)
    }

    /// Current setup with rate and buffer size left implicit, or an empty one
    fn base_setup(&self) -> DeviceSetup {
        match self.current_configuration() {
            Some(config) => DeviceSetup {
                sample_rate_hz: None,
                buffer_size_frames: None,
                ..config.to_setup()
            },
            None => DeviceSetup::new(None, None),
        }
    }

    fn probe(&self, setup: &DeviceSetup) -> AudioResult<DeviceCapabilities> {
        if setup.is_empty() {
            return Err(AudioError::DeviceOpenFailure(
                "No input or output device selected".to_string(),
            ));
        }
        self.platform
            .probe(setup.input_device.as_deref(), setup.output_device.as_deref())
    }

    fn apply_probed(&mut self, setup: &DeviceSetup, caps: &DeviceCapabilities) -> AudioResult<()> {
        let resolved = self.resolve(setup, caps)?;
        if self.current_configuration().as_ref() == Some(&resolved) {
            log::debug!("Configuration unchanged, stream left running");
            return Ok(());
        }
        self.restart(resolved)
    }

    /// Turn a request into a concrete configuration the pair supports
    fn resolve(&self, setup: &DeviceSetup, caps: &DeviceCapabilities) -> AudioResult<StreamConfiguration> {
        let current = self.current_configuration();

        let sample_rate_hz = match setup.sample_rate_hz {
            Some(hz) if caps.supports_sample_rate(hz) => hz,
            Some(hz) => {
                return Err(AudioError::UnsupportedConfiguration(format!(
                    "{}Hz is not supported (available: {:?})",
                    hz, caps.sample_rates
                )))
            }
            None => current
                .as_ref()
                .map(|c| c.sample_rate_hz)
                .filter(|&hz| caps.supports_sample_rate(hz))
                .unwrap_or(caps.default_sample_rate),
        };

        let buffer_size_frames = match setup.buffer_size_frames {
            Some(frames) if caps.supports_buffer_size(frames) => frames,
            Some(frames) => {
                return Err(AudioError::UnsupportedConfiguration(format!(
                    "{} frames is not supported (available: {:?})",
                    frames, caps.buffer_sizes
                )))
            }
            None => current
                .as_ref()
                .map(|c| c.buffer_size_frames)
                .filter(|&frames| caps.supports_buffer_size(frames))
                .unwrap_or(caps.default_buffer_size),
        };

        let input_channel_count = match setup.input_device {
            Some(_) => setup.input_channels.min(caps.max_input_channels),
            None => 0,
        };
        let output_channel_count = match setup.output_device {
            Some(_) => setup.output_channels.min(caps.max_output_channels),
            None => 0,
        };
        if input_channel_count == 0 && output_channel_count == 0 {
            return Err(AudioError::UnsupportedConfiguration(
                "Selected devices offer no usable channels".to_string(),
            ));
        }

        let name = |device: &Option<String>, channels: u16| {
            if channels > 0 {
                device.clone().unwrap_or_default()
            } else {
                String::new()
            }
        };

        Ok(StreamConfiguration {
            sample_rate_hz,
            buffer_size_frames,
            input_channel_count,
            output_channel_count,
            input_device_name: name(&setup.input_device, input_channel_count),
            output_device_name: name(&setup.output_device, output_channel_count),
        })
    }

    /// Stop the running stream, start the new one, roll back on failure
    fn restart(&mut self, config: StreamConfiguration) -> AudioResult<()> {
        let previous = self.device.take().map(|d| d.configuration().clone());

        match self
            .platform
            .open(&config, Arc::clone(&self.gate), Arc::clone(&self.notifier))
        {
            Ok(device) => {
                let applied = device.configuration().clone();
                log::info!(
                    "Audio configuration applied - in: '{}', out: '{}', {}Hz, {} frames",
                    applied.input_device_name,
                    applied.output_device_name,
                    applied.sample_rate_hz,
                    applied.buffer_size_frames
                );
                self.device = Some(device);
                if self.gate.is_attached() {
                    self.gate
                        .callback()
                        .prepare(applied.sample_rate_hz, applied.buffer_size_frames);
                }
                self.notifier.notify(ConfigurationChange::Reconfigured(applied));
                Ok(())
            }
            Err(err) => {
                log::warn!("Failed to apply audio configuration: {}", err);
                if let Some(previous) = previous {
                    match self.platform.open(
                        &previous,
                        Arc::clone(&self.gate),
                        Arc::clone(&self.notifier),
                    ) {
                        Ok(device) => {
                            log::info!("Restored previous audio configuration");
                            self.device = Some(device);
                        }
                        Err(restore_err) => {
                            log::error!(
                                "Could not restore previous audio configuration: {}",
                                restore_err
                            );
                            self.notifier.notify(ConfigurationChange::Closed);
                        }
                    }
                }
                Err(err)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries (neutral values when no device is open)
    // ─────────────────────────────────────────────────────────────────────

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn current_configuration(&self) -> Option<StreamConfiguration> {
        self.device.as_ref().map(|d| d.configuration().clone())
    }

    pub fn current_sample_rate(&self) -> f64 {
        self.device
            .as_ref()
            .map(|d| d.configuration().sample_rate_hz)
            .unwrap_or(0.0)
    }

    pub fn current_buffer_size(&self) -> u32 {
        self.device
            .as_ref()
            .map(|d| d.configuration().buffer_size_frames)
            .unwrap_or(0)
    }

    pub fn current_input_device_name(&self) -> String {
        self.device
            .as_ref()
            .map(|d| d.configuration().input_device_name.clone())
            .unwrap_or_default()
    }

    pub fn current_output_device_name(&self) -> String {
        self.device
            .as_ref()
            .map(|d| d.configuration().output_device_name.clone())
            .unwrap_or_default()
    }

    pub fn available_sample_rates(&self) -> Vec<f64> {
        self.device
            .as_ref()
            .map(|d| d.capabilities().sample_rates.clone())
            .unwrap_or_default()
    }

    pub fn available_buffer_sizes(&self) -> Vec<u32> {
        self.device
            .as_ref()
            .map(|d| d.capabilities().buffer_sizes.clone())
            .unwrap_or_default()
    }

    pub fn active_input_channels(&self) -> ActiveChannels {
        self.device
            .as_ref()
            .map(|d| d.active_input_channels())
            .unwrap_or_default()
    }

    /// One-way block latency in milliseconds (0.0 with no device)
    pub fn latency_ms(&self) -> f64 {
        self.device
            .as_ref()
            .map(|d| d.configuration().latency_ms())
            .unwrap_or(0.0)
    }

    /// Warning from the most recent open, if any
    pub fn last_warning(&self) -> Option<&SessionWarning> {
        self.last_warning.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Catalog and notifications
    // ─────────────────────────────────────────────────────────────────────

    pub fn devices(&self, direction: Direction) -> Vec<DeviceDescriptor> {
        self.platform.devices(direction)
    }

    pub fn host_names(&self) -> Vec<String> {
        self.platform.host_names()
    }

    /// Receive a [`ConfigurationChange`] for every successful
    /// reconfiguration and every platform-reported device loss
    pub fn subscribe(&self) -> Receiver<ConfigurationChange> {
        self.notifier.subscribe()
    }

    pub fn gate(&self) -> &Arc<CallbackGate> {
        &self.gate
    }
}
