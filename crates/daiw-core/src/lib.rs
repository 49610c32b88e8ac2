//! DAIW Core - audio device session, real-time pass-through and metering
//!
//! The [`AudioEngine`] opens an input/output device pair, passes captured
//! input straight to the output, and publishes per-channel RMS levels that
//! any thread can poll without locking.
//!
//! ```ignore
//! use daiw_core::{AudioEngine, EngineConfig};
//!
//! let mut engine = AudioEngine::from_config(&EngineConfig::default());
//! engine.start();
//! println!("L {:.3} R {:.3}", engine.input_left(), engine.input_right());
//! ```

pub mod audio;
pub mod engine;
pub mod types;

pub use audio::{AudioError, AudioResult, EngineConfig};
pub use engine::AudioEngine;
pub use types::*;
