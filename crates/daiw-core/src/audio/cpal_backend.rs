//! CPAL audio backend implementation
//!
//! CPAL has no duplex stream, so a device pair is opened as two streams that
//! hand captured samples across a lock-free ring buffer. The output stream
//! drives the callback; an input-only configuration lets the input stream
//! drive it instead.
//!
//! ```text
//! ┌──────────────────┐   push() whole frames   ┌─────────────────────┐
//! │  Input Stream    │────────────────────────►│  Capture Queue      │
//! │  (capture thread)│                         │  (rtrb SPSC, f32)   │
//! └──────────────────┘                         └──────────┬──────────┘
//!                                                         │ pop()
//!                                                         ▼
//! ┌──────────────────┐   Relaxed atomics       ┌─────────────────────┐
//! │   LevelBridge    │◄────────────────────────│  Output Stream      │
//! │   (UI reads)     │                         │  CallbackGate       │
//! └──────────────────┘                         │  → PassThroughEngine│
//!                                              └─────────────────────┘
//! ```
//!
//! Each stream closure owns its state by move (queue endpoint and a
//! pre-allocated [`ChannelBuffer`]), so the data path takes no locks.
//! Underruns render silence; a full queue drops the newest whole frames.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize as CpalBufferSize, SampleFormat, SampleRate, Stream, StreamConfig,
    SupportedBufferSize, SupportedStreamConfigRange,
};

use super::backend::{AudioPlatform, PlatformDevice};
use super::config::{
    DeviceCapabilities, StreamConfiguration, CANDIDATE_BUFFER_SIZES, COMMON_SAMPLE_RATES,
    DEFAULT_BUFFER_SIZE,
};
use super::device::{self, DeviceDescriptor};
use super::error::{AudioError, AudioResult};
use super::notify::{ChangeNotifier, ConfigurationChange};
use crate::engine::CallbackGate;
use crate::types::{ActiveChannels, ChannelBuffer, Direction, MAX_BUFFER_SIZE};

/// Capture queue depth in blocks
const CAPTURE_QUEUE_BLOCKS: usize = 4;

/// Blocks of captured audio held back as jitter cushion before playback
/// starts draining the queue
const CAPTURE_CUSHION_BLOCKS: usize = 1;

/// Platform backed by every host CPAL was built with
#[derive(Debug, Default)]
pub struct CpalPlatform;

impl CpalPlatform {
    pub fn new() -> Self {
        Self
    }
}

/// Capabilities of one side of a device pair
#[derive(Debug, Clone)]
struct SideCapabilities {
    sample_rates: Vec<u32>,
    buffer_sizes: Vec<u32>,
    max_channels: u16,
    default_sample_rate: u32,
}

fn supported_ranges(
    device: &cpal::Device,
    direction: Direction,
) -> AudioResult<Vec<SupportedStreamConfigRange>> {
    let ranges: Vec<_> = match direction {
        Direction::Input => device
            .supported_input_configs()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .collect(),
        Direction::Output => device
            .supported_output_configs()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .collect(),
    };

    let f32_ranges: Vec<_> = ranges
        .into_iter()
        .filter(|r| r.sample_format() == SampleFormat::F32)
        .collect();

    if f32_ranges.is_empty() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        return Err(AudioError::UnsupportedFormat(format!(
            "{} has no f32 {} configuration",
            name, direction
        )));
    }
    Ok(f32_ranges)
}

fn side_capabilities(device: &cpal::Device, direction: Direction) -> AudioResult<SideCapabilities> {
    let ranges = supported_ranges(device, direction)?;

    let sample_rates: Vec<u32> = COMMON_SAMPLE_RATES
        .iter()
        .copied()
        .filter(|&rate| {
            ranges
                .iter()
                .any(|r| rate >= r.min_sample_rate().0 && rate <= r.max_sample_rate().0)
        })
        .collect();

    let buffer_sizes: Vec<u32> = CANDIDATE_BUFFER_SIZES
        .iter()
        .copied()
        .filter(|&frames| {
            ranges.iter().any(|r| match r.buffer_size() {
                SupportedBufferSize::Range { min, max } => frames >= *min && frames <= *max,
                SupportedBufferSize::Unknown => true,
            })
        })
        .collect();

    let max_channels = ranges.iter().map(|r| r.channels()).max().unwrap_or(0);

    let reported_default = match direction {
        Direction::Input => device.default_input_config(),
        Direction::Output => device.default_output_config(),
    }
    .ok()
    .map(|c| c.sample_rate().0);

    let default_sample_rate = reported_default
        .filter(|rate| sample_rates.contains(rate))
        .or_else(|| sample_rates.iter().copied().find(|&r| r == 48000))
        .or_else(|| sample_rates.first().copied())
        .unwrap_or(0);

    Ok(SideCapabilities {
        sample_rates,
        buffer_sizes,
        max_channels,
        default_sample_rate,
    })
}

/// Combine the two sides of a pair; rate and buffer sets are intersected
fn merge_capabilities(
    input: Option<SideCapabilities>,
    output: Option<SideCapabilities>,
) -> AudioResult<DeviceCapabilities> {
    let (sample_rates, buffer_sizes, preferred_defaults) = match (&input, &output) {
        (Some(i), Some(o)) => (
            intersect(&i.sample_rates, &o.sample_rates),
            intersect(&i.buffer_sizes, &o.buffer_sizes),
            vec![o.default_sample_rate, i.default_sample_rate],
        ),
        (Some(side), None) | (None, Some(side)) => (
            side.sample_rates.clone(),
            side.buffer_sizes.clone(),
            vec![side.default_sample_rate],
        ),
        (None, None) => {
            return Err(AudioError::DeviceOpenFailure(
                "No input or output device selected".to_string(),
            ))
        }
    };

    if sample_rates.is_empty() {
        return Err(AudioError::UnsupportedConfiguration(
            "Input and output devices have no sample rate in common".to_string(),
        ));
    }
    if buffer_sizes.is_empty() {
        return Err(AudioError::UnsupportedConfiguration(
            "Input and output devices have no buffer size in common".to_string(),
        ));
    }

    let default_sample_rate = preferred_defaults
        .into_iter()
        .chain(std::iter::once(48000))
        .find(|rate| sample_rates.contains(rate))
        .unwrap_or(sample_rates[0]);

    let default_buffer_size = nearest(&buffer_sizes, DEFAULT_BUFFER_SIZE);

    Ok(DeviceCapabilities {
        sample_rates: sample_rates.into_iter().map(f64::from).collect(),
        buffer_sizes,
        max_input_channels: input.map(|s| s.max_channels).unwrap_or(0),
        max_output_channels: output.map(|s| s.max_channels).unwrap_or(0),
        default_sample_rate: f64::from(default_sample_rate),
        default_buffer_size,
    })
}

fn intersect(a: &[u32], b: &[u32]) -> Vec<u32> {
    a.iter().copied().filter(|x| b.contains(x)).collect()
}

/// Value in `sizes` closest to `target` (ties go to the smaller one)
fn nearest(sizes: &[u32], target: u32) -> u32 {
    sizes
        .iter()
        .copied()
        .min_by_key(|&s| (s.abs_diff(target), s))
        .unwrap_or(target)
}

/// Smallest device channel count that covers `wanted` at `rate`
///
/// Devices that only offer wide layouts (e.g. 8 channels) are opened wide
/// and the extra channels are ignored on input and silenced on output.
fn stream_channels(
    device: &cpal::Device,
    direction: Direction,
    wanted: u16,
    rate: u32,
) -> AudioResult<u16> {
    let ranges = supported_ranges(device, direction)?;
    ranges
        .iter()
        .filter(|r| rate >= r.min_sample_rate().0 && rate <= r.max_sample_rate().0)
        .map(|r| r.channels())
        .filter(|&c| c >= wanted)
        .min()
        .ok_or_else(|| {
            AudioError::UnsupportedConfiguration(format!(
                "{} channels at {}Hz not available for {}",
                wanted, rate, direction
            ))
        })
}

fn optional_device(name: &str, direction: Direction) -> AudioResult<Option<cpal::Device>> {
    if name.is_empty() {
        Ok(None)
    } else {
        device::find_device(name, direction).map(Some)
    }
}

impl AudioPlatform for CpalPlatform {
    fn host_names(&self) -> Vec<String> {
        device::available_host_names()
    }

    fn devices(&self, direction: Direction) -> Vec<DeviceDescriptor> {
        device::enumerate_devices(direction)
    }

    fn default_device_name(&self, direction: Direction) -> Option<String> {
        device::default_device_name(direction)
    }

    fn probe(&self, input: Option<&str>, output: Option<&str>) -> AudioResult<DeviceCapabilities> {
        let input_caps = match input {
            Some(name) => Some(side_capabilities(
                &device::find_device(name, Direction::Input)?,
                Direction::Input,
            )?),
            None => None,
        };
        let output_caps = match output {
            Some(name) => Some(side_capabilities(
                &device::find_device(name, Direction::Output)?,
                Direction::Output,
            )?),
            None => None,
        };
        merge_capabilities(input_caps, output_caps)
    }

    fn open(
        &mut self,
        config: &StreamConfiguration,
        gate: Arc<CallbackGate>,
        notifier: Arc<ChangeNotifier>,
    ) -> AudioResult<Box<dyn PlatformDevice>> {
        let input_device = optional_device(&config.input_device_name, Direction::Input)?
            .filter(|_| config.input_channel_count > 0);
        let output_device = optional_device(&config.output_device_name, Direction::Output)?
            .filter(|_| config.output_channel_count > 0);

        let capabilities = merge_capabilities(
            input_device
                .as_ref()
                .map(|d| side_capabilities(d, Direction::Input))
                .transpose()?,
            output_device
                .as_ref()
                .map(|d| side_capabilities(d, Direction::Output))
                .transpose()?,
        )?;

        if !capabilities.supports_sample_rate(config.sample_rate_hz) {
            return Err(AudioError::UnsupportedConfiguration(format!(
                "{}Hz is not supported by the selected devices",
                config.sample_rate_hz
            )));
        }
        if !capabilities.supports_buffer_size(config.buffer_size_frames) {
            return Err(AudioError::UnsupportedConfiguration(format!(
                "{} frames is not supported by the selected devices",
                config.buffer_size_frames
            )));
        }

        let sample_rate = config.sample_rate_hz.round() as u32;
        let buffer_size = config.buffer_size_frames;
        let in_channels = if input_device.is_some() {
            config.input_channel_count as usize
        } else {
            0
        };
        let out_channels = if output_device.is_some() {
            config.output_channel_count as usize
        } else {
            0
        };
        let active_inputs = ActiveChannels::first(in_channels);
        let block_channels = in_channels.max(out_channels);

        log::info!(
            "Opening audio: in='{}' ({}ch), out='{}' ({}ch), {}Hz, {} frames (~{:.1}ms)",
            config.input_device_name,
            in_channels,
            config.output_device_name,
            out_channels,
            sample_rate,
            buffer_size,
            config.latency_ms()
        );

        let mut input_stream = None;
        let mut output_stream = None;

        match (&input_device, &output_device) {
            (Some(input), Some(output)) => {
                let device_in = stream_channels(input, Direction::Input, in_channels as u16, sample_rate)?;
                let device_out =
                    stream_channels(output, Direction::Output, out_channels as u16, sample_rate)?;

                let capacity_frames = buffer_size as usize * CAPTURE_QUEUE_BLOCKS;
                let capacity = capacity_frames * device_in as usize;
                let (producer, consumer) = rtrb::RingBuffer::<f32>::new(capacity);
                log::debug!("Capture queue created with capacity {} samples", capacity);

                input_stream = Some(build_capture_stream(
                    input,
                    &stream_config(device_in, sample_rate, buffer_size),
                    producer,
                    Arc::clone(&notifier),
                )?);
                output_stream = Some(build_output_stream(
                    output,
                    &stream_config(device_out, sample_rate, buffer_size),
                    OutputRenderer {
                        block: ChannelBuffer::with_capacity(block_channels, MAX_BUFFER_SIZE),
                        capture: Some(CaptureReader::new(
                            consumer,
                            device_in as usize,
                            in_channels,
                            buffer_size as usize * CAPTURE_CUSHION_BLOCKS,
                            capacity_frames,
                        )),
                        active_inputs,
                        gate,
                    },
                    notifier,
                )?);
            }
            (None, Some(output)) => {
                let device_out =
                    stream_channels(output, Direction::Output, out_channels as u16, sample_rate)?;
                output_stream = Some(build_output_stream(
                    output,
                    &stream_config(device_out, sample_rate, buffer_size),
                    OutputRenderer {
                        block: ChannelBuffer::with_capacity(block_channels, MAX_BUFFER_SIZE),
                        capture: None,
                        active_inputs,
                        gate,
                    },
                    notifier,
                )?);
            }
            (Some(input), None) => {
                let device_in = stream_channels(input, Direction::Input, in_channels as u16, sample_rate)?;
                input_stream = Some(build_input_driven_stream(
                    input,
                    &stream_config(device_in, sample_rate, buffer_size),
                    InputRenderer {
                        block: ChannelBuffer::with_capacity(block_channels, MAX_BUFFER_SIZE),
                        in_channels,
                        active_inputs,
                        gate,
                    },
                    notifier,
                )?);
            }
            (None, None) => {
                return Err(AudioError::DeviceOpenFailure(
                    "No input or output device selected".to_string(),
                ))
            }
        }

        // Output first so the capture queue starts draining immediately
        if let Some(stream) = &output_stream {
            stream
                .play()
                .map_err(|e| AudioError::StreamPlayError(format!("Output: {}", e)))?;
        }
        if let Some(stream) = &input_stream {
            stream
                .play()
                .map_err(|e| AudioError::StreamPlayError(format!("Input: {}", e)))?;
        }

        log::info!("Audio streams started");

        Ok(Box::new(CpalDevice {
            _output_stream: output_stream,
            _input_stream: input_stream,
            configuration: StreamConfiguration {
                input_channel_count: in_channels as u16,
                output_channel_count: out_channels as u16,
                ..config.clone()
            },
            capabilities,
        }))
    }
}

/// Open CPAL device pair. Dropping it stops both streams.
struct CpalDevice {
    _output_stream: Option<Stream>,
    _input_stream: Option<Stream>,
    configuration: StreamConfiguration,
    capabilities: DeviceCapabilities,
}

impl PlatformDevice for CpalDevice {
    fn configuration(&self) -> &StreamConfiguration {
        &self.configuration
    }

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        log::info!(
            "Closing audio streams (in='{}', out='{}')",
            self.configuration.input_device_name,
            self.configuration.output_device_name
        );
    }
}

fn stream_config(channels: u16, sample_rate: u32, buffer_size: u32) -> StreamConfig {
    StreamConfig {
        channels,
        sample_rate: SampleRate(sample_rate),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    }
}

fn error_callback(
    notifier: Arc<ChangeNotifier>,
    direction: Direction,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        log::error!("{} audio stream error: {}", direction, err);
        if matches!(err, cpal::StreamError::DeviceNotAvailable) {
            notifier.notify(ConfigurationChange::DeviceLost {
                direction,
                message: err.to_string(),
            });
        }
    }
}

/// Output-side state owned by the playback callback
struct OutputRenderer {
    block: ChannelBuffer,
    capture: Option<CaptureReader>,
    active_inputs: ActiveChannels,
    gate: Arc<CallbackGate>,
}

impl OutputRenderer {
    /// Fill one interleaved device buffer (audio thread)
    fn render(&mut self, data: &mut [f32], device_channels: usize) {
        let total_frames = data.len() / device_channels;
        let mut offset = 0;

        while offset < total_frames {
            let frames = (total_frames - offset).min(self.block.capacity());
            self.block.set_len(frames);
            self.block.fill_silence();

            if let Some(capture) = self.capture.as_mut() {
                capture.pull(&mut self.block);
            }

            self.gate.render(&mut self.block, Some(self.active_inputs));

            let out = &mut data[offset * device_channels..(offset + frames) * device_channels];
            write_interleaved(&self.block, out, device_channels);
            offset += frames;
        }
    }
}

/// Input-side state when no output device drives the callback
struct InputRenderer {
    block: ChannelBuffer,
    in_channels: usize,
    active_inputs: ActiveChannels,
    gate: Arc<CallbackGate>,
}

impl InputRenderer {
    /// Meter one interleaved capture buffer; the output is discarded (audio thread)
    fn render(&mut self, data: &[f32], device_channels: usize) {
        for chunk in data.chunks(self.block.capacity() * device_channels) {
            let frames = chunk.len() / device_channels;
            self.block.set_len(frames);
            self.block.fill_silence();
            read_interleaved(chunk, device_channels, &mut self.block, self.in_channels);
            self.gate.render(&mut self.block, Some(self.active_inputs));
        }
    }
}

/// Reader side of the capture queue (audio thread)
///
/// Stays silent until `cushion_frames` beyond the current request have
/// queued up, so the capture callback running slightly late does not punch
/// gaps into the signal. An underrun drops back to priming.
struct CaptureReader {
    consumer: rtrb::Consumer<f32>,
    device_channels: usize,
    in_channels: usize,
    cushion_frames: usize,
    capacity_frames: usize,
    primed: bool,
}

impl CaptureReader {
    fn new(
        consumer: rtrb::Consumer<f32>,
        device_channels: usize,
        in_channels: usize,
        cushion_frames: usize,
        capacity_frames: usize,
    ) -> Self {
        Self {
            consumer,
            device_channels,
            in_channels,
            cushion_frames,
            capacity_frames,
            primed: false,
        }
    }

    /// Pop whole captured frames into the block; missing frames stay silent
    fn pull(&mut self, block: &mut ChannelBuffer) {
        if self.device_channels == 0 {
            return;
        }
        let wanted = block.len();
        let available = self.consumer.slots() / self.device_channels;

        if !self.primed {
            // A full queue primes even if the cushion cannot fit next to the request
            let threshold = (wanted + self.cushion_frames).min(self.capacity_frames);
            if available < threshold {
                return;
            }
            self.primed = true;
        }
        if available < wanted {
            self.primed = false;
        }

        for frame in 0..available.min(wanted) {
            for ch in 0..self.device_channels {
                let sample = self.consumer.pop().unwrap_or(0.0);
                if ch < self.in_channels {
                    block.channel_mut(ch)[frame] = sample;
                }
            }
        }
    }
}

/// Deinterleave the first `in_channels` of a device buffer into the block
fn read_interleaved(data: &[f32], device_channels: usize, block: &mut ChannelBuffer, in_channels: usize) {
    let channels = in_channels.min(device_channels).min(block.num_channels());
    for (frame, samples) in data.chunks_exact(device_channels).enumerate() {
        for (ch, &sample) in samples.iter().take(channels).enumerate() {
            block.channel_mut(ch)[frame] = sample;
        }
    }
}

/// Interleave the block into a device buffer, silencing surplus device channels
fn write_interleaved(block: &ChannelBuffer, out: &mut [f32], device_channels: usize) {
    let channels = block.num_channels();
    for (frame, samples) in out.chunks_exact_mut(device_channels).enumerate() {
        for (ch, sample) in samples.iter_mut().enumerate() {
            *sample = if ch < channels { block.channel(ch)[frame] } else { 0.0 };
        }
    }
}

/// Build the capture stream that feeds the queue
fn build_capture_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: rtrb::Producer<f32>,
    notifier: Arc<ChangeNotifier>,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_input_stream(
            config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                // Whole frames only, so the reader never loses channel alignment
                let frames = (producer.slots() / channels).min(data.len() / channels);
                for &sample in &data[..frames * channels] {
                    if producer.push(sample).is_err() {
                        break;
                    }
                }
            },
            error_callback(notifier, Direction::Input),
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(format!("Input: {}", e)))
}

/// Build the playback stream that drives the callback
fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut renderer: OutputRenderer,
    notifier: Arc<ChangeNotifier>,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                renderer.render(data, channels);
            },
            error_callback(notifier, Direction::Output),
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(format!("Output: {}", e)))
}

/// Build a capture stream that drives the callback itself (no output device)
fn build_input_driven_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut renderer: InputRenderer,
    notifier: Arc<ChangeNotifier>,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_input_stream(
            config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                renderer.render(data, channels);
            },
            error_callback(notifier, Direction::Input),
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(format!("Input: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LevelBridge, PassThroughEngine};

    fn attached_gate() -> (Arc<CallbackGate>, Arc<LevelBridge>) {
        let levels = Arc::new(LevelBridge::new());
        let gate = Arc::new(CallbackGate::new(Arc::new(PassThroughEngine::new(Arc::clone(&levels)))));
        gate.attach();
        (gate, levels)
    }

    fn side(rates: &[u32], sizes: &[u32], default_rate: u32) -> SideCapabilities {
        SideCapabilities {
            sample_rates: rates.to_vec(),
            buffer_sizes: sizes.to_vec(),
            max_channels: 2,
            default_sample_rate: default_rate,
        }
    }

    #[test]
    fn test_merge_intersects_duplex_sets() {
        let caps = merge_capabilities(
            Some(side(&[44100, 48000], &[128, 256, 512], 44100)),
            Some(side(&[48000, 96000], &[256, 512, 1024], 48000)),
        )
        .unwrap();

        assert_eq!(caps.sample_rates, vec![48000.0]);
        assert_eq!(caps.buffer_sizes, vec![256, 512]);
        assert_eq!(caps.default_sample_rate, 48000.0);
        assert_eq!(caps.default_buffer_size, 512);
    }

    #[test]
    fn test_merge_rejects_disjoint_rates() {
        let result = merge_capabilities(
            Some(side(&[44100], &[256], 44100)),
            Some(side(&[48000], &[256], 48000)),
        );
        assert!(matches!(result, Err(AudioError::UnsupportedConfiguration(_))));
    }

    #[test]
    fn test_merge_requires_a_device() {
        assert!(matches!(
            merge_capabilities(None, None),
            Err(AudioError::DeviceOpenFailure(_))
        ));
    }

    #[test]
    fn test_nearest_buffer_size() {
        assert_eq!(nearest(&[128, 256, 1024], 512), 256);
        assert_eq!(nearest(&[64, 2048], 512), 64);
        assert_eq!(nearest(&[], 512), 512);
    }

    #[test]
    fn test_output_renderer_passes_captured_frames() {
        let (gate, levels) = attached_gate();
        let (mut producer, consumer) = rtrb::RingBuffer::<f32>::new(64);
        // Two frames of a 3-channel capture device; only the first 2 channels are used
        for sample in [0.5, -0.5, 9.0, 0.5, -0.5, 9.0] {
            producer.push(sample).unwrap();
        }

        let mut renderer = OutputRenderer {
            block: ChannelBuffer::with_capacity(2, 16),
            capture: Some(CaptureReader::new(consumer, 3, 2, 0, 21)),
            active_inputs: ActiveChannels::first(2),
            gate,
        };

        // 4-channel output device, 2 frames
        let mut data = [1.0f32; 8];
        renderer.render(&mut data, 4);

        assert_eq!(data, [0.5, -0.5, 0.0, 0.0, 0.5, -0.5, 0.0, 0.0]);
        assert!((levels.input_left() - 0.5).abs() < 1e-6);
        assert!((levels.output_right() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_output_renderer_underrun_is_silent() {
        let (gate, _levels) = attached_gate();
        let (_producer, consumer) = rtrb::RingBuffer::<f32>::new(64);
        let mut renderer = OutputRenderer {
            block: ChannelBuffer::with_capacity(2, 16),
            capture: Some(CaptureReader::new(consumer, 2, 2, 0, 32)),
            active_inputs: ActiveChannels::first(2),
            gate,
        };

        let mut data = [0.7f32; 8];
        renderer.render(&mut data, 2);
        assert!(data.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_output_renderer_splits_oversized_buffers() {
        let (gate, _levels) = attached_gate();
        let (mut producer, consumer) = rtrb::RingBuffer::<f32>::new(64);
        for i in 0..10 {
            producer.push(i as f32 / 10.0).unwrap();
        }
        let mut renderer = OutputRenderer {
            block: ChannelBuffer::with_capacity(1, 4),
            capture: Some(CaptureReader::new(consumer, 1, 1, 0, 64)),
            active_inputs: ActiveChannels::first(1),
            gate,
        };

        let mut data = [0.0f32; 10];
        renderer.render(&mut data, 1);
        let expected: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        assert_eq!(data.to_vec(), expected);
    }

    #[test]
    fn test_capture_holds_back_until_cushion_builds() {
        let (mut producer, consumer) = rtrb::RingBuffer::<f32>::new(16);
        let mut reader = CaptureReader::new(consumer, 1, 1, 2, 16);
        let mut block = ChannelBuffer::with_capacity(1, 2);

        producer.push(0.1).unwrap();
        producer.push(0.2).unwrap();
        reader.pull(&mut block);
        assert!(block.is_silent());

        producer.push(0.3).unwrap();
        producer.push(0.4).unwrap();
        reader.pull(&mut block);
        assert_eq!(block.channel(0), &[0.1, 0.2]);

        // Primed: the cushion is played out without waiting again
        block.fill_silence();
        reader.pull(&mut block);
        assert_eq!(block.channel(0), &[0.3, 0.4]);
    }

    #[test]
    fn test_capture_underrun_reprimes() {
        let (mut producer, consumer) = rtrb::RingBuffer::<f32>::new(16);
        let mut reader = CaptureReader::new(consumer, 1, 1, 1, 16);
        let mut block = ChannelBuffer::with_capacity(1, 2);

        for sample in [0.1, 0.2, 0.3] {
            producer.push(sample).unwrap();
        }
        reader.pull(&mut block);
        assert_eq!(block.channel(0), &[0.1, 0.2]);

        // One frame left: play it, then wait for the cushion again
        block.fill_silence();
        reader.pull(&mut block);
        assert_eq!(block.channel(0), &[0.3, 0.0]);

        producer.push(0.4).unwrap();
        producer.push(0.5).unwrap();
        block.fill_silence();
        reader.pull(&mut block);
        assert!(block.is_silent());

        producer.push(0.6).unwrap();
        reader.pull(&mut block);
        assert_eq!(block.channel(0), &[0.4, 0.5]);
    }

    #[test]
    fn test_capture_full_queue_primes() {
        let (mut producer, consumer) = rtrb::RingBuffer::<f32>::new(4);
        let mut reader = CaptureReader::new(consumer, 1, 1, 4, 4);
        let mut block = ChannelBuffer::with_capacity(1, 2);

        for sample in [0.1, 0.2, 0.3, 0.4] {
            producer.push(sample).unwrap();
        }
        reader.pull(&mut block);
        assert_eq!(block.channel(0), &[0.1, 0.2]);
    }

    #[test]
    fn test_input_renderer_meters_capture() {
        let (gate, levels) = attached_gate();
        let mut renderer = InputRenderer {
            block: ChannelBuffer::with_capacity(2, 16),
            in_channels: 2,
            active_inputs: ActiveChannels::first(2),
            gate,
        };

        renderer.render(&[0.25, 0.5, 0.25, 0.5], 2);
        assert!((levels.input_left() - 0.25).abs() < 1e-6);
        assert!((levels.input_right() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_cpal_probe_default_output() {
        // Hardware dependent: only report what the machine offers
        let platform = CpalPlatform::new();
        match platform.default_device_name(Direction::Output) {
            Some(name) => match platform.probe(None, Some(&name)) {
                Ok(caps) => println!("{}: rates {:?}, sizes {:?}", name, caps.sample_rates, caps.buffer_sizes),
                Err(e) => println!("{}: {}", name, e),
            },
            None => println!("No default output device (expected in CI)"),
        }
    }
}
