//! Transport controller
//!
//! Attaches the callback to the session's stream (start) or detaches it
//! (stop). The device itself stays open while stopped; the stream keeps
//! running and renders silence through the gate.

use super::levels::LevelBridge;
use crate::audio::DeviceSession;

/// Whether the callback is receiving blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Running,
}

#[derive(Debug, Default)]
pub struct Transport {
    state: TransportState,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TransportState::Running
    }

    /// Attach the callback. No-op when already running.
    ///
    /// With no device open the callback is attached anyway and gets
    /// `prepare` once a device is opened.
    pub fn start(&mut self, session: &DeviceSession) {
        if self.is_running() {
            return;
        }

        let gate = session.gate();
        if session.is_open() {
            gate.callback()
                .prepare(session.current_sample_rate(), session.current_buffer_size());
        }
        gate.attach();
        self.state = TransportState::Running;
        log::info!("Transport started");
    }

    /// Detach the callback and zero the levels. No-op when already stopped.
    ///
    /// Safe at any time, including before any device was opened.
    pub fn stop(&mut self, session: &DeviceSession, levels: &LevelBridge) {
        if !self.is_running() {
            return;
        }

        let gate = session.gate();
        gate.detach();
        gate.callback().released();
        // A block already in flight may still publish once after this
        levels.reset();
        self.state = TransportState::Stopped;
        log::info!("Transport stopped");
    }
}
