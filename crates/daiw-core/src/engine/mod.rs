//! Audio engine - callback, metering, transport
//!
//! This module contains the real-time side of DAIW and the facade over it:
//! - AudioCallback: the per-block interface the platform invokes
//! - PassThroughEngine: input pass-through with RMS metering
//! - LevelBridge: lock-free levels read by the UI
//! - Transport: start/stop attaching the callback to the session
//! - AudioEngine: main engine tying everything together

mod callback;
mod engine;
mod levels;
mod transport;

pub use callback::*;
pub use engine::*;
pub use levels::*;
pub use transport::*;
