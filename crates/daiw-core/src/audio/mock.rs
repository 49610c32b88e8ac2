//! In-memory platform for tests
//!
//! Holds a scripted device list, records opens, can be told to fail the next
//! open, and renders blocks through whatever gate the session bound to the
//! currently open device. Clones share state, so a test keeps one handle
//! while the session owns another.

use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{AudioPlatform, PlatformDevice};
use super::config::{DeviceCapabilities, StreamConfiguration};
use super::device::DeviceDescriptor;
use super::error::{AudioError, AudioResult};
use super::notify::{ChangeNotifier, ConfigurationChange};
use crate::engine::CallbackGate;
use crate::types::{ActiveChannels, ChannelBuffer, Direction};

pub const MOCK_HOST: &str = "Mock";

/// Scripted device
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub name: String,
    pub sample_rates: Vec<f64>,
    pub buffer_sizes: Vec<u32>,
    pub max_channels: u16,
    pub default_sample_rate: f64,
    pub default_buffer_size: u32,
}

impl MockDevice {
    /// Stereo device at 44.1/48/96kHz with 128..1024 frame buffers
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sample_rates: vec![44100.0, 48000.0, 96000.0],
            buffer_sizes: vec![128, 256, 512, 1024],
            max_channels: 2,
            default_sample_rate: 48000.0,
            default_buffer_size: 512,
        }
    }

    pub fn with_buffer_sizes(mut self, sizes: &[u32]) -> Self {
        self.buffer_sizes = sizes.to_vec();
        self
    }

    pub fn with_sample_rates(mut self, rates: &[f64]) -> Self {
        self.sample_rates = rates.to_vec();
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.max_channels = channels;
        self
    }
}

struct LiveDevice {
    id: u64,
    gate: Arc<CallbackGate>,
    notifier: Arc<ChangeNotifier>,
    configuration: StreamConfiguration,
}

#[derive(Default)]
struct MockState {
    inputs: Vec<MockDevice>,
    outputs: Vec<MockDevice>,
    default_input: Option<String>,
    default_output: Option<String>,
    fail_opens: usize,
    open_count: usize,
    next_id: u64,
    live: Option<LiveDevice>,
}

#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    /// No devices at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// One default stereo input ("Mock Mic") and output ("Mock Speakers")
    pub fn stereo() -> Self {
        Self::empty()
            .with_input(MockDevice::new("Mock Mic"))
            .with_output(MockDevice::new("Mock Speakers"))
    }

    /// Add an input device; the first one added becomes the default
    pub fn with_input(self, device: MockDevice) -> Self {
        {
            let mut state = self.lock();
            if state.default_input.is_none() {
                state.default_input = Some(device.name.clone());
            }
            state.inputs.push(device);
        }
        self
    }

    /// Add an output device; the first one added becomes the default
    pub fn with_output(self, device: MockDevice) -> Self {
        {
            let mut state = self.lock();
            if state.default_output.is_none() {
                state.default_output = Some(device.name.clone());
            }
            state.outputs.push(device);
        }
        self
    }

    /// Make the next `count` opens fail
    pub fn fail_next_opens(&self, count: usize) {
        self.lock().fail_opens = count;
    }

    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }

    pub fn is_open(&self) -> bool {
        self.lock().live.is_some()
    }

    /// Run one block through the open device's gate, as the audio thread would
    ///
    /// `input` holds one slice per captured channel. Returns the rendered
    /// block, or `None` if no device is open.
    pub fn render(&self, input: &[&[f32]], frames: usize) -> Option<ChannelBuffer> {
        let (gate, config) = {
            let state = self.lock();
            let live = state.live.as_ref()?;
            (Arc::clone(&live.gate), live.configuration.clone())
        };

        let in_channels = config.input_channel_count as usize;
        let channels = in_channels.max(config.output_channel_count as usize);
        let mut block = ChannelBuffer::with_capacity(channels, frames);
        for (ch, samples) in input.iter().enumerate().take(channels) {
            let n = samples.len().min(frames);
            block.channel_mut(ch)[..n].copy_from_slice(&samples[..n]);
        }

        gate.render(&mut block, Some(ActiveChannels::first(in_channels)));
        Some(block)
    }

    /// Simulate the platform reporting the open device as gone
    pub fn lose_device(&self, direction: Direction) {
        let notifier = {
            let state = self.lock();
            state.live.as_ref().map(|l| Arc::clone(&l.notifier))
        };
        if let Some(notifier) = notifier {
            notifier.notify(ConfigurationChange::DeviceLost {
                direction,
                message: "Mock device unplugged".to_string(),
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn find(&self, name: &str, direction: Direction) -> AudioResult<MockDevice> {
        let state = self.lock();
        let list = match direction {
            Direction::Input => &state.inputs,
            Direction::Output => &state.outputs,
        };
        list.iter()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| AudioError::DeviceNotFound(format!("{} ({})", name, direction)))
    }
}

impl AudioPlatform for MockPlatform {
    fn host_names(&self) -> Vec<String> {
        vec![MOCK_HOST.to_string()]
    }

    fn devices(&self, direction: Direction) -> Vec<DeviceDescriptor> {
        let state = self.lock();
        let list = match direction {
            Direction::Input => &state.inputs,
            Direction::Output => &state.outputs,
        };
        list.iter()
            .map(|d| DeviceDescriptor::new(d.name.clone(), MOCK_HOST, direction))
            .collect()
    }

    fn default_device_name(&self, direction: Direction) -> Option<String> {
        let state = self.lock();
        match direction {
            Direction::Input => state.default_input.clone(),
            Direction::Output => state.default_output.clone(),
        }
    }

    fn probe(&self, input: Option<&str>, output: Option<&str>) -> AudioResult<DeviceCapabilities> {
        let input = input.map(|n| self.find(n, Direction::Input)).transpose()?;
        let output = output.map(|n| self.find(n, Direction::Output)).transpose()?;

        let sides: Vec<&MockDevice> = output.iter().chain(input.iter()).collect();
        let Some(first) = sides.first() else {
            return Err(AudioError::DeviceOpenFailure(
                "No input or output device selected".to_string(),
            ));
        };

        let sample_rates: Vec<f64> = first
            .sample_rates
            .iter()
            .copied()
            .filter(|r| sides.iter().all(|d| d.sample_rates.contains(r)))
            .collect();
        let buffer_sizes: Vec<u32> = first
            .buffer_sizes
            .iter()
            .copied()
            .filter(|s| sides.iter().all(|d| d.buffer_sizes.contains(s)))
            .collect();

        if sample_rates.is_empty() || buffer_sizes.is_empty() {
            return Err(AudioError::UnsupportedConfiguration(
                "Devices have no common format".to_string(),
            ));
        }

        Ok(DeviceCapabilities {
            default_sample_rate: if sample_rates.contains(&first.default_sample_rate) {
                first.default_sample_rate
            } else {
                sample_rates[0]
            },
            default_buffer_size: if buffer_sizes.contains(&first.default_buffer_size) {
                first.default_buffer_size
            } else {
                buffer_sizes[0]
            },
            sample_rates,
            buffer_sizes,
            max_input_channels: input.as_ref().map(|d| d.max_channels).unwrap_or(0),
            max_output_channels: output.as_ref().map(|d| d.max_channels).unwrap_or(0),
        })
    }

    fn open(
        &mut self,
        config: &StreamConfiguration,
        gate: Arc<CallbackGate>,
        notifier: Arc<ChangeNotifier>,
    ) -> AudioResult<Box<dyn PlatformDevice>> {
        let name = |s: &String| (!s.is_empty()).then(|| s.clone());
        let capabilities = self.probe(
            name(&config.input_device_name).as_deref(),
            name(&config.output_device_name).as_deref(),
        )?;

        let mut state = self.lock();
        if state.fail_opens > 0 {
            state.fail_opens -= 1;
            return Err(AudioError::DeviceOpenFailure("Simulated open failure".to_string()));
        }
        if !capabilities.supports_sample_rate(config.sample_rate_hz)
            || !capabilities.supports_buffer_size(config.buffer_size_frames)
        {
            return Err(AudioError::UnsupportedConfiguration(format!(
                "{}Hz / {} frames",
                config.sample_rate_hz, config.buffer_size_frames
            )));
        }
        assert!(state.live.is_none(), "device opened twice without closing");

        state.open_count += 1;
        state.next_id += 1;
        let id = state.next_id;
        state.live = Some(LiveDevice {
            id,
            gate,
            notifier,
            configuration: config.clone(),
        });

        Ok(Box::new(MockOpenDevice {
            id,
            configuration: config.clone(),
            capabilities,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockOpenDevice {
    id: u64,
    configuration: StreamConfiguration,
    capabilities: DeviceCapabilities,
    state: Arc<Mutex<MockState>>,
}

impl PlatformDevice for MockOpenDevice {
    fn configuration(&self) -> &StreamConfiguration {
        &self.configuration
    }

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }
}

impl Drop for MockOpenDevice {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            if state.live.as_ref().map(|l| l.id) == Some(self.id) {
                state.live = None;
            }
        }
    }
}
