//! Common types for the DAIW audio core
//!
//! Planar block buffers handed to the real-time callback, the active-channel
//! mask, and the input/output direction tag.

/// Audio sample type (32-bit float throughout the signal path)
pub type Sample = f32;

/// Maximum frames per callback block (pre-allocated, covers typical configurations)
/// Common values: 64, 128, 256, 512, 1024, 2048, 4096 frames
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Maximum number of channels addressable by [`ActiveChannels`]
pub const MAX_CHANNELS: usize = 64;

/// Direction of a device or channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of active channels, one bit per channel index
///
/// Copyable so the audio thread can receive it by value with no allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ActiveChannels(u64);

impl ActiveChannels {
    /// No active channels
    pub const fn none() -> Self {
        Self(0)
    }

    /// The first `count` channels active (the default channel mapping)
    pub fn first(count: usize) -> Self {
        match count {
            0 => Self(0),
            n if n >= MAX_CHANNELS => Self(u64::MAX),
            n => Self((1u64 << n) - 1),
        }
    }

    /// Build from an explicit list of channel indices (indices >= 64 are ignored)
    pub fn from_indices(indices: &[usize]) -> Self {
        let mut mask = 0u64;
        for &index in indices {
            if index < MAX_CHANNELS {
                mask |= 1 << index;
            }
        }
        Self(mask)
    }

    #[inline]
    pub fn contains(&self, channel: usize) -> bool {
        channel < MAX_CHANNELS && self.0 & (1 << channel) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }
}

/// Planar multi-channel sample block
///
/// Storage is allocated once for `channels × capacity` frames. The working
/// length can then be changed with [`ChannelBuffer::set_len`] without touching
/// the allocator, which makes it safe to resize inside an audio callback.
#[derive(Debug, Clone)]
pub struct ChannelBuffer {
    data: Vec<Sample>,
    num_channels: usize,
    capacity: usize,
    len: usize,
}

impl ChannelBuffer {
    /// Allocate a silent buffer with room for `capacity` frames per channel
    ///
    /// The working length starts at `capacity`.
    pub fn with_capacity(num_channels: usize, capacity: usize) -> Self {
        Self {
            data: vec![0.0; num_channels * capacity],
            num_channels,
            capacity,
            len: capacity,
        }
    }

    /// Build a buffer from per-channel sample slices (test and offline use)
    ///
    /// All channels take the length of the longest slice; shorter ones are
    /// padded with silence.
    pub fn from_channels(channels: &[&[Sample]]) -> Self {
        let frames = channels.iter().map(|c| c.len()).max().unwrap_or(0);
        let mut buffer = Self::with_capacity(channels.len(), frames);
        for (ch, samples) in channels.iter().enumerate() {
            buffer.channel_mut(ch)[..samples.len()].copy_from_slice(samples);
        }
        buffer
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Working length in frames
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set the working length in frames, clamped to capacity (RT-safe: no allocation)
    #[inline]
    pub fn set_len(&mut self, frames: usize) {
        debug_assert!(frames <= self.capacity, "set_len called with len > capacity");
        self.len = frames.min(self.capacity);
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[Sample] {
        let start = channel * self.capacity;
        &self.data[start..start + self.len]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [Sample] {
        let start = channel * self.capacity;
        &mut self.data[start..start + self.len]
    }

    /// Silence one channel over the working length
    #[inline]
    pub fn clear_channel(&mut self, channel: usize) {
        self.channel_mut(channel).fill(0.0);
    }

    /// Silence every channel over the working length
    pub fn fill_silence(&mut self) {
        for ch in 0..self.num_channels {
            self.clear_channel(ch);
        }
    }

    /// Root-mean-square amplitude of one channel over the working length
    ///
    /// Returns 0.0 for an empty block.
    pub fn rms(&self, channel: usize) -> Sample {
        let samples = self.channel(channel);
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / samples.len() as f64).sqrt() as Sample
    }

    /// True if every sample in the working length is exactly zero
    pub fn is_silent(&self) -> bool {
        (0..self.num_channels).all(|ch| self.channel(ch).iter().all(|&s| s == 0.0))
    }
}
