//! Real-time audio callback
//!
//! [`AudioCallback`] is the interface the platform invokes once per block on
//! its audio thread. [`PassThroughEngine`] is the production implementation:
//! it measures per-channel RMS into the [`LevelBridge`] and passes captured
//! input straight through to the output.
//!
//! [`CallbackGate`] sits between a platform stream and the callback. The
//! transport attaches or detaches the callback by flipping one atomic flag;
//! while detached the stream renders silence.
//!
//! # RT-safety
//!
//! Everything reachable from [`AudioCallback::process`] and
//! [`CallbackGate::render`] is allocation-free, lock-free and never logs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::levels::{LevelBridge, Side};
use crate::types::{ActiveChannels, ChannelBuffer};

/// Callback invoked by the platform audio subsystem
pub trait AudioCallback: Send + Sync {
    /// Process one block in place
    ///
    /// `block` holds the captured input on entry and must hold the output on
    /// return. `active_inputs` is `None` when no device is open. Called on
    /// the audio thread: must not block, allocate or log.
    fn process(&self, block: &mut ChannelBuffer, active_inputs: Option<ActiveChannels>);

    /// Called on the control thread before blocks start arriving
    fn prepare(&self, _sample_rate: f64, _buffer_size: u32) {}

    /// Called on the control thread after blocks stop arriving
    fn released(&self) {}
}

/// Pass-through engine with input/output metering
#[derive(Debug, Clone)]
pub struct PassThroughEngine {
    levels: Arc<LevelBridge>,
}

impl PassThroughEngine {
    pub fn new(levels: Arc<LevelBridge>) -> Self {
        Self { levels }
    }
}

impl AudioCallback for PassThroughEngine {
    fn process(&self, block: &mut ChannelBuffer, active_inputs: Option<ActiveChannels>) {
        process_block(block, active_inputs, &self.levels);
    }

    fn prepare(&self, sample_rate: f64, buffer_size: u32) {
        log::debug!(
            "Prepared to play - sample rate: {}Hz, buffer size: {} frames",
            sample_rate,
            buffer_size
        );
    }

    fn released(&self) {
        log::debug!("Released audio resources");
    }
}

/// Measure and pass one block through
///
/// 1. No device: silence the block, zero every level.
/// 2. Store the RMS of channels 0 and 1 as the input levels when they are
///    active inputs, 0.0 otherwise.
/// 3. No active input at all: silence the block, zero every level.
/// 4. Otherwise leave captured samples untouched and silence every channel
///    that is not an active input.
/// 5. Mirror the input levels into the output levels.
pub fn process_block(
    block: &mut ChannelBuffer,
    active_inputs: Option<ActiveChannels>,
    levels: &LevelBridge,
) {
    let Some(active) = active_inputs else {
        block.fill_silence();
        levels.reset();
        return;
    };

    let num_channels = block.num_channels();
    for side in [Side::Left, Side::Right] {
        let ch = side.channel();
        let level = if ch < num_channels && active.contains(ch) {
            block.rms(ch)
        } else {
            0.0
        };
        levels.store_input(side, level);
    }

    if active.is_empty() {
        block.fill_silence();
        levels.reset();
        return;
    }

    for ch in 0..num_channels {
        if !active.contains(ch) {
            block.clear_channel(ch);
        }
    }

    levels.store_output(Side::Left, levels.input(Side::Left));
    levels.store_output(Side::Right, levels.input(Side::Right));
}

/// Attach point between a platform stream and the callback
///
/// Created once per session and shared with every stream the session opens,
/// so the attached state survives device restarts.
pub struct CallbackGate {
    callback: Arc<dyn AudioCallback>,
    attached: AtomicBool,
}

impl CallbackGate {
    pub fn new(callback: Arc<dyn AudioCallback>) -> Self {
        Self {
            callback,
            attached: AtomicBool::new(false),
        }
    }

    pub fn callback(&self) -> &Arc<dyn AudioCallback> {
        &self.callback
    }

    /// Start delivering blocks to the callback
    ///
    /// Returns false if it was already attached.
    pub fn attach(&self) -> bool {
        !self.attached.swap(true, Ordering::AcqRel)
    }

    /// Stop delivering blocks to the callback
    ///
    /// Returns false if it was already detached.
    pub fn detach(&self) -> bool {
        self.attached.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Render one block (audio thread)
    ///
    /// Runs the callback when attached, otherwise renders silence.
    #[inline]
    pub fn render(&self, block: &mut ChannelBuffer, active_inputs: Option<ActiveChannels>) {
        if self.is_attached() {
            self.callback.process(block, active_inputs);
        } else {
            block.fill_silence();
        }
    }
}

impl std::fmt::Debug for CallbackGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackGate")
            .field("attached", &self.is_attached())
            .finish()
    }
}
