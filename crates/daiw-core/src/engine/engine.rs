//! Main audio engine - ties together device session, transport and metering

use std::sync::Arc;

use crossbeam::channel::Receiver;

use super::{CallbackGate, LevelBridge, LevelSnapshot, PassThroughEngine, Transport};
use crate::audio::{
    AudioPlatform, AudioResult, ConfigurationChange, CpalPlatform, DeviceDescriptor,
    DeviceSession, DeviceSetup, EngineConfig, OpenReport, SessionWarning, StreamConfiguration,
};
use crate::types::Direction;

/// The audio engine
///
/// Owns the device session, the transport and the level bridge. All methods
/// run on the control thread; the level getters may also be called from any
/// thread holding the bridge (see [`AudioEngine::levels`]).
pub struct AudioEngine {
    session: DeviceSession,
    transport: Transport,
    levels: Arc<LevelBridge>,
}

impl AudioEngine {
    /// Create an engine with no device open
    pub fn new(platform: Box<dyn AudioPlatform>) -> Self {
        let levels = Arc::new(LevelBridge::new());
        let engine = Arc::new(PassThroughEngine::new(Arc::clone(&levels)));
        let gate = Arc::new(CallbackGate::new(engine));
        Self {
            session: DeviceSession::new(platform, gate),
            transport: Transport::new(),
            levels,
        }
    }

    /// Create an engine on `platform` and open devices as `config` asks
    ///
    /// Opens the default devices first, then applies any saved devices and
    /// sample rate. Failures are logged and leave whatever did open in place,
    /// possibly nothing.
    pub fn with_config(platform: Box<dyn AudioPlatform>, config: &EngineConfig) -> Self {
        let mut engine = Self::new(platform);
        engine.open_from_config(config);
        engine
    }

    /// Create an engine on the system's audio hosts (cpal)
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_config(Box::new(CpalPlatform::new()), config)
    }

    fn open_from_config(&mut self, config: &EngineConfig) {
        match self.session.open_preferring(
            config.input_channels,
            config.output_channels,
            config.preferred_buffer_size,
        ) {
            Ok(report) => {
                log::info!(
                    "Opened default audio devices ({:.1} ms latency)",
                    report.configuration.latency_ms()
                );
            }
            Err(e) => log::warn!("Could not open default audio devices: {}", e),
        }

        let restores_something = config.input_device.is_some()
            || config.output_device.is_some()
            || config.preferred_sample_rate.is_some();
        if !restores_something {
            return;
        }

        let current = self.session.current_configuration().map(|c| c.to_setup());
        let pick = |saved: &Option<String>, current: Option<String>| saved.clone().or(current);
        let setup = DeviceSetup {
            input_device: pick(
                &config.input_device,
                current.as_ref().and_then(|s| s.input_device.clone()),
            ),
            output_device: pick(
                &config.output_device,
                current.as_ref().and_then(|s| s.output_device.clone()),
            ),
            sample_rate_hz: config.preferred_sample_rate,
            buffer_size_frames: None,
            input_channels: config.input_channels,
            output_channels: config.output_channels,
        };

        if let Err(e) = self.session.open_with(setup, config.preferred_buffer_size) {
            log::warn!("Could not restore saved audio settings: {}", e);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Devices
    // ─────────────────────────────────────────────────────────────────────

    pub fn list_input_devices(&self) -> Vec<DeviceDescriptor> {
        self.session.devices(Direction::Input)
    }

    pub fn list_output_devices(&self) -> Vec<DeviceDescriptor> {
        self.session.devices(Direction::Output)
    }

    pub fn host_names(&self) -> Vec<String> {
        self.session.host_names()
    }

    /// Open the default devices
    pub fn open(&mut self, input_channels: u16, output_channels: u16) -> AudioResult<OpenReport> {
        self.session.open(input_channels, output_channels)
    }

    pub fn set_input_device(&mut self, name: &str) -> AudioResult<()> {
        self.session.set_input_device(name)
    }

    pub fn set_output_device(&mut self, name: &str) -> AudioResult<()> {
        self.session.set_output_device(name)
    }

    pub fn set_sample_rate(&mut self, hz: f64) -> AudioResult<()> {
        self.session.set_sample_rate(hz)
    }

    pub fn set_buffer_size(&mut self, frames: u32) -> AudioResult<()> {
        self.session.set_buffer_size(frames)
    }

    /// Apply a full setup atomically
    pub fn apply(&mut self, setup: &DeviceSetup) -> AudioResult<()> {
        self.session.apply(setup)
    }

    /// Stop the transport and close the device
    pub fn close(&mut self) {
        self.stop();
        self.session.close();
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    pub fn current_configuration(&self) -> Option<StreamConfiguration> {
        self.session.current_configuration()
    }

    pub fn current_sample_rate(&self) -> f64 {
        self.session.current_sample_rate()
    }

    pub fn current_buffer_size(&self) -> u32 {
        self.session.current_buffer_size()
    }

    pub fn current_input_device_name(&self) -> String {
        self.session.current_input_device_name()
    }

    pub fn current_output_device_name(&self) -> String {
        self.session.current_output_device_name()
    }

    pub fn available_sample_rates(&self) -> Vec<f64> {
        self.session.available_sample_rates()
    }

    pub fn available_buffer_sizes(&self) -> Vec<u32> {
        self.session.available_buffer_sizes()
    }

    pub fn latency_ms(&self) -> f64 {
        self.session.latency_ms()
    }

    pub fn last_warning(&self) -> Option<&SessionWarning> {
        self.session.last_warning()
    }

    pub fn subscribe(&self) -> Receiver<ConfigurationChange> {
        self.session.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────────────

    pub fn start(&mut self) {
        self.transport.start(&self.session);
    }

    pub fn stop(&mut self) {
        self.transport.stop(&self.session, &self.levels);
    }

    pub fn is_running(&self) -> bool {
        self.transport.is_running()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Levels
    // ─────────────────────────────────────────────────────────────────────

    #[inline]
    pub fn input_left(&self) -> f32 {
        self.levels.input_left()
    }

    #[inline]
    pub fn input_right(&self) -> f32 {
        self.levels.input_right()
    }

    #[inline]
    pub fn output_left(&self) -> f32 {
        self.levels.output_left()
    }

    #[inline]
    pub fn output_right(&self) -> f32 {
        self.levels.output_right()
    }

    pub fn level_snapshot(&self) -> LevelSnapshot {
        self.levels.snapshot()
    }

    /// Shared handle to the level bridge
    ///
    /// Clone it once to read levels from another thread without going
    /// through the engine.
    pub fn levels(&self) -> Arc<LevelBridge> {
        Arc::clone(&self.levels)
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
        self.session.close();
    }
}
