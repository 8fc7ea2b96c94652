use core::time::Duration;

use crate::signal::SignalBuffer;

/// Port to the pulse-generating peripheral driving the bus pin.
///
/// An implementation owns the pin (configured open-drain with a pull-up)
/// and a pair of transmit/receive channels on it. Transmission may run
/// while a receive is active; a capture therefore contains the master's
/// own pulses with any slave modifications folded in, terminated once the
/// line stays idle past the configured idle threshold.
///
/// The protocol layers never touch the pin directly; everything physical
/// goes through this trait.
pub trait Transceiver {
    /// Error type reported by the underlying peripheral.
    type Error;

    /// Transmits a pulse train, blocking until it has been emitted.
    fn transmit(&mut self, signals: &SignalBuffer) -> Result<(), Self::Error>;

    /// Arms the receiver. Must be called before the stimulus producing the
    /// response is transmitted.
    fn start_receive(&mut self) -> Result<(), Self::Error>;

    /// Blocks until a captured frame is available or `timeout` expires.
    ///
    /// Returns `None` on timeout; the receiver stays armed either way.
    fn receive(&mut self, timeout: Duration) -> Result<Option<SignalBuffer>, Self::Error>;

    /// Disarms the receiver and discards any pending capture.
    fn stop_receive(&mut self) -> Result<(), Self::Error>;

    /// Current receive idle threshold in microseconds.
    fn idle_threshold(&self) -> u16;

    /// Sets the receive idle threshold: the minimum idle gap that
    /// terminates a captured frame.
    fn set_idle_threshold(&mut self, micros: u16) -> Result<(), Self::Error>;

    /// Switches the pin between open-drain mode (normal signalling) and
    /// push-pull mode (strong pull-up power delivery).
    fn set_open_drain(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Releases both channels. Idempotent; further operations on a closed
    /// transceiver fail with an implementation error.
    fn close(&mut self);
}

/// Receive-side configuration consumed by [`Transceiver`] constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransceiverConfig {
    /// Enable the internal pull-up on the pin.
    pub pull_up: bool,
    /// Initial receive idle threshold in microseconds.
    pub idle_threshold: u16,
    /// Glitch filter: pulses shorter than this many ticks are discarded.
    pub filter_ticks: u8,
    /// Size of the receiver's capture ring buffer in bytes.
    pub rx_buffer_size: usize,
}

impl Default for TransceiverConfig {
    fn default() -> Self {
        TransceiverConfig {
            pull_up: false,
            idle_threshold: crate::consts::IDLE_THRESHOLD_US,
            filter_ticks: 30,
            rx_buffer_size: 1024,
        }
    }
}
