//! Platform abstraction for the device session
//!
//! The session never talks to an audio API directly. It goes through
//! [`AudioPlatform`], which covers device enumeration, probing a device pair
//! without opening it, and opening a running stream bound to a
//! [`CallbackGate`]. The open stream is represented by a [`PlatformDevice`];
//! dropping it stops and releases the hardware.
//!
//! - **Production**: [`CpalPlatform`](super::cpal_backend::CpalPlatform)
//! - **Tests**: `MockPlatform`, which renders blocks on demand
//!
//! Neither trait requires `Send`: cpal streams are not `Send` on every
//! platform, so an open session stays on the control thread that created it.

use std::sync::Arc;

use super::config::{DeviceCapabilities, StreamConfiguration};
use super::device::DeviceDescriptor;
use super::error::AudioResult;
use super::notify::ChangeNotifier;
use crate::engine::CallbackGate;
use crate::types::{ActiveChannels, Direction};

/// An audio subsystem that can enumerate and open devices
pub trait AudioPlatform {
    /// Names of the host backends in platform order (e.g. "ALSA", "JACK")
    fn host_names(&self) -> Vec<String>;

    /// Every device in one direction, host-then-enumeration order
    fn devices(&self, direction: Direction) -> Vec<DeviceDescriptor>;

    /// The platform's default device for a direction
    fn default_device_name(&self, direction: Direction) -> Option<String>;

    /// What the given device pair supports, without opening it
    ///
    /// A `None` name means that direction is disabled.
    fn probe(&self, input: Option<&str>, output: Option<&str>)
        -> AudioResult<DeviceCapabilities>;

    /// Open and start streams for a fully resolved configuration
    ///
    /// Blocks are rendered through `gate`. Platform-originated stream errors
    /// are reported through `notifier`.
    fn open(
        &mut self,
        config: &StreamConfiguration,
        gate: Arc<CallbackGate>,
        notifier: Arc<ChangeNotifier>,
    ) -> AudioResult<Box<dyn PlatformDevice>>;
}

/// A running device pair. Dropping it closes the device.
pub trait PlatformDevice {
    /// Configuration the device is actually running with
    fn configuration(&self) -> &StreamConfiguration;

    /// Capability sets reported by the open device
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Input channels delivered to the callback
    fn active_input_channels(&self) -> ActiveChannels {
        ActiveChannels::first(self.configuration().input_channel_count as usize)
    }
}
