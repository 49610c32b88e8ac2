//! Audio device layer for DAIW
//!
//! Everything between the engine and the hardware:
//! - **Catalog**: enumerate input/output devices across every cpal host
//! - **Session**: the one open device pair, reconfigured atomically
//! - **Notifier**: fan-out of configuration changes to subscribers
//!
//! # Architecture
//!
//! The session talks to hardware only through the [`AudioPlatform`] trait.
//! [`CpalPlatform`] is the production implementation; tests use an
//! in-memory mock.
//!
//! - **Control thread**: owns the session, applies configuration changes
//! - **Audio thread**: the platform's callback renders through a `CallbackGate`
//! - **Atomics**: the UI reads levels via relaxed atomics (no locks)
//!
//! # Example Usage
//!
//! ```ignore
//! use daiw_core::audio::{CpalPlatform, DeviceSession};
//!
//! let mut session = DeviceSession::new(Box::new(CpalPlatform::new()), gate);
//! let report = session.open(2, 2)?;
//! for warning in &report.warnings {
//!     log::warn!("{}", warning);
//! }
//! session.set_buffer_size(128)?;
//! ```

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;
mod notify;
mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{AudioPlatform, PlatformDevice};
pub use config::{
    DeviceCapabilities, DeviceSetup, EngineConfig, StreamConfiguration, CANDIDATE_BUFFER_SIZES,
    COMMON_SAMPLE_RATES, DEFAULT_BUFFER_SIZE, DEFAULT_CHANNELS, DEFAULT_METER_REFRESH_HZ,
    PREFERRED_BUFFER_SIZE,
};
pub use cpal_backend::CpalPlatform;
pub use device::{
    available_host_names, default_device_name, enumerate_devices, find_device,
    input_device_names, list_input_devices, list_output_devices, output_device_names,
    DeviceDescriptor,
};
pub use error::{AudioError, AudioResult};
pub use notify::{ChangeNotifier, ConfigurationChange};
pub use session::{DeviceSession, OpenReport, SessionWarning};
