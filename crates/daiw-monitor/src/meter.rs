//! Terminal level meters
//!
//! The engine publishes raw block RMS. Smoothing happens here: a meter holds
//! the highest level it has seen and lets it fall back by a fixed factor on
//! every refresh tick, then maps it onto a -60..0 dB bar.

/// Per-tick decay factor applied to the displayed level
pub const DECAY_RATE: f32 = 0.92;

/// Displayed levels below this snap to zero
pub const SILENCE_FLOOR: f32 = 0.001;

/// Bottom of the dB scale (maps to an empty bar)
pub const MIN_DB: f32 = -60.0;

/// Fill fraction at which the bar turns from safe to warning
const WARNING_FILL: f32 = 0.6;
/// Fill fraction at which the bar turns from warning to hot
const HOT_FILL: f32 = 0.85;

/// Colour band of a meter's current fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterZone {
    Safe,
    Warning,
    Hot,
}

/// Peak-hold meter with exponential fall-back
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelMeter {
    current: f32,
    display: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the latest level. The display jumps up immediately.
    pub fn set_level(&mut self, level: f32) {
        self.current = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        if self.current > self.display {
            self.display = self.current;
        }
    }

    /// Advance one refresh tick
    pub fn tick(&mut self) {
        if self.display > self.current {
            self.display *= DECAY_RATE;
            if self.display < SILENCE_FLOOR {
                self.display = 0.0;
            }
        } else if self.display < self.current {
            self.display = self.current;
        }
    }

    /// Level currently shown (linear, 0..1)
    pub fn display_level(&self) -> f32 {
        self.display
    }

    /// Bar fill on a -60..0 dB scale
    pub fn fill_fraction(&self) -> f32 {
        fill_fraction(self.display)
    }

    pub fn zone(&self) -> MeterZone {
        let fill = self.fill_fraction();
        if fill < WARNING_FILL {
            MeterZone::Safe
        } else if fill < HOT_FILL {
            MeterZone::Warning
        } else {
            MeterZone::Hot
        }
    }

    /// Render as a fixed-width text bar, e.g. `[######==  ]`
    ///
    /// `#` marks the safe band, `=` warning and `!` hot.
    pub fn bar(&self, width: usize) -> String {
        let filled = ((self.fill_fraction() * width as f32).round() as usize).min(width);
        let mut out = String::with_capacity(width + 2);
        out.push('[');
        for i in 0..width {
            if i >= filled {
                out.push(' ');
                continue;
            }
            let position = (i + 1) as f32 / width as f32;
            out.push(if position <= WARNING_FILL {
                '#'
            } else if position <= HOT_FILL {
                '='
            } else {
                '!'
            });
        }
        out.push(']');
        out
    }
}

/// Map a linear gain onto 0..1 across -60..0 dB
pub fn fill_fraction(gain: f32) -> f32 {
    if gain <= 0.0 {
        return 0.0;
    }
    let db = (20.0 * gain.log10()).max(MIN_DB);
    ((db - MIN_DB) / -MIN_DB).clamp(0.0, 1.0)
}

/// Left/right pair refreshed together
#[derive(Debug, Clone, Copy, Default)]
pub struct StereoMeter {
    pub left: LevelMeter,
    pub right: LevelMeter,
}

impl StereoMeter {
    pub fn set_levels(&mut self, left: f32, right: f32) {
        self.left.set_level(left);
        self.right.set_level(right);
    }

    pub fn tick(&mut self) {
        self.left.tick();
        self.right.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_level_clamps() {
        let mut meter = LevelMeter::new();
        meter.set_level(1.7);
        assert_eq!(meter.display_level(), 1.0);

        let mut meter = LevelMeter::new();
        meter.set_level(-0.3);
        assert_eq!(meter.display_level(), 0.0);
    }

    #[test]
    fn test_peak_held_when_level_drops() {
        let mut meter = LevelMeter::new();
        meter.set_level(0.8);
        meter.set_level(0.2);
        assert_eq!(meter.display_level(), 0.8);
    }

    #[test]
    fn test_tick_decays_toward_current() {
        let mut meter = LevelMeter::new();
        meter.set_level(0.5);
        meter.set_level(0.0);

        meter.tick();
        assert!((meter.display_level() - 0.5 * DECAY_RATE).abs() < 1e-6);
        meter.tick();
        assert!((meter.display_level() - 0.5 * DECAY_RATE * DECAY_RATE).abs() < 1e-6);
    }

    #[test]
    fn test_decay_snaps_to_zero_below_floor() {
        let mut meter = LevelMeter::new();
        meter.set_level(0.00105);
        meter.set_level(0.0);

        meter.tick();
        assert_eq!(meter.display_level(), 0.0);
    }

    #[test]
    fn test_decay_stops_at_current_level() {
        let mut meter = LevelMeter::new();
        meter.set_level(0.5);
        meter.set_level(0.45);

        meter.tick(); // 0.46
        meter.tick(); // 0.4232
        assert!(meter.display_level() < 0.45);
        meter.tick(); // back up to the current level
        assert_eq!(meter.display_level(), 0.45);
        meter.tick();
        assert_eq!(meter.display_level(), 0.45);
    }

    #[test]
    fn test_fill_fraction_db_scale() {
        assert_eq!(fill_fraction(0.0), 0.0);
        assert!((fill_fraction(1.0) - 1.0).abs() < 1e-6);
        // -20 dB
        assert!((fill_fraction(0.1) - 2.0 / 3.0).abs() < 1e-5);
        // -6 dB
        assert!((fill_fraction(0.5) - (1.0 - 6.0206 / 60.0)).abs() < 1e-4);
        // Below -60 dB pins to empty
        assert_eq!(fill_fraction(1e-5), 0.0);
    }

    #[test]
    fn test_zones() {
        let mut meter = LevelMeter::new();
        meter.set_level(0.01); // -40 dB
        assert_eq!(meter.zone(), MeterZone::Safe);

        let mut meter = LevelMeter::new();
        meter.set_level(0.2); // -14 dB
        assert_eq!(meter.zone(), MeterZone::Warning);

        let mut meter = LevelMeter::new();
        meter.set_level(0.9); // -0.9 dB
        assert_eq!(meter.zone(), MeterZone::Hot);
    }

    #[test]
    fn test_bar_rendering() {
        let mut meter = LevelMeter::new();
        assert_eq!(meter.bar(10), "[          ]");

        meter.set_level(1.0);
        assert_eq!(meter.bar(10), "[######==!!]");

        let mut meter = LevelMeter::new();
        meter.set_level(0.1);
        assert_eq!(meter.bar(6), "[###=  ]");
    }
}
