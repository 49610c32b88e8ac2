//! Lock-free level bridge between the audio thread and the UI
//!
//! Each level is an `f32` stored as its bit pattern in an `AtomicU32`. The
//! audio thread performs one relaxed store per level per block; readers do a
//! single relaxed load and always see the latest value. There is no ordering
//! between the four levels: a reader may observe input-left from one block
//! and input-right from the next. The values feed a meter, nothing else.

use std::sync::atomic::{AtomicU32, Ordering};

/// Left or right channel of a stereo pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Channel index of this side within a block
    pub fn channel(&self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// Single-writer/multi-reader `f32` scalar
#[derive(Debug, Default)]
pub struct AtomicLevel(AtomicU32);

impl AtomicLevel {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    /// Store a level, clamped to [0.0, 1.0] (NaN stores 0.0)
    #[inline]
    pub fn store(&self, value: f32) {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        self.0.store(clamped.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Point-in-time copy of all four levels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LevelSnapshot {
    pub input_left: f32,
    pub input_right: f32,
    pub output_left: f32,
    pub output_right: f32,
}

/// The four per-block RMS levels (input/output × left/right)
#[derive(Debug, Default)]
pub struct LevelBridge {
    input_left: AtomicLevel,
    input_right: AtomicLevel,
    output_left: AtomicLevel,
    output_right: AtomicLevel,
}

impl LevelBridge {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn input_left(&self) -> f32 {
        self.input_left.load()
    }

    #[inline]
    pub fn input_right(&self) -> f32 {
        self.input_right.load()
    }

    #[inline]
    pub fn output_left(&self) -> f32 {
        self.output_left.load()
    }

    #[inline]
    pub fn output_right(&self) -> f32 {
        self.output_right.load()
    }

    #[inline]
    pub fn input(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.input_left(),
            Side::Right => self.input_right(),
        }
    }

    #[inline]
    pub fn output(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.output_left(),
            Side::Right => self.output_right(),
        }
    }

    #[inline]
    pub fn store_input(&self, side: Side, value: f32) {
        match side {
            Side::Left => self.input_left.store(value),
            Side::Right => self.input_right.store(value),
        }
    }

    #[inline]
    pub fn store_output(&self, side: Side, value: f32) {
        match side {
            Side::Left => self.output_left.store(value),
            Side::Right => self.output_right.store(value),
        }
    }

    /// Zero all four levels
    #[inline]
    pub fn reset(&self) {
        self.input_left.store(0.0);
        self.input_right.store(0.0);
        self.output_left.store(0.0);
        self.output_right.store(0.0);
    }

    /// Read all four levels (four independent loads)
    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            input_left: self.input_left(),
            input_right: self.input_right(),
            output_left: self.output_left(),
            output_right: self.output_right(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_store_and_load() {
        let bridge = LevelBridge::new();
        bridge.store_input(Side::Left, 0.25);
        bridge.store_output(Side::Right, 0.75);

        assert_eq!(bridge.input_left(), 0.25);
        assert_eq!(bridge.input_right(), 0.0);
        assert_eq!(bridge.output_right(), 0.75);
    }

    #[test]
    fn test_levels_are_clamped() {
        let level = AtomicLevel::default();
        level.store(1.5);
        assert_eq!(level.load(), 1.0);
        level.store(-0.5);
        assert_eq!(level.load(), 0.0);
        level.store(f32::NAN);
        assert_eq!(level.load(), 0.0);
    }

    #[test]
    fn test_reset_zeroes_all() {
        let bridge = LevelBridge::new();
        bridge.store_input(Side::Left, 0.1);
        bridge.store_input(Side::Right, 0.2);
        bridge.store_output(Side::Left, 0.3);
        bridge.store_output(Side::Right, 0.4);

        bridge.reset();

        assert_eq!(bridge.snapshot(), LevelSnapshot::default());
    }

    #[test]
    fn test_cross_thread_reader_sees_latest_value() {
        let bridge = Arc::new(LevelBridge::new());
        let writer = Arc::clone(&bridge);

        std::thread::spawn(move || {
            for i in 0..=100 {
                writer.store_input(Side::Left, i as f32 / 100.0);
            }
        })
        .join()
        .unwrap();

        assert_eq!(bridge.input(Side::Left), 1.0);
    }
}
