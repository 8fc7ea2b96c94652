use core::time::Duration;

use log::trace;
use rmt_onewire::consts::READ_HIGH_BEFORE_SAMPLE_US;
use rmt_onewire::{
    Level, Signal, SignalBuffer, Transceiver, TransceiverConfig, SIGNAL_BUFFER_CAPACITY,
};
use thiserror::Error;

use crate::bus::{SimBus, SimDevice};

/// Low pulses at least this long count as a reset.
const RESET_PULSE_MIN_US: u16 = 450;
/// Gap between the master releasing the line and the presence pulse.
const PRESENCE_DELAY_US: u16 = 30;
/// Length of the presence pulse.
const PRESENCE_LOW_US: u16 = 100;
/// How long a device answering '0' holds the line past the stimulus low.
const RESPONSE_HOLD_US: u16 = 24;

/// Failures of the simulated peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimError {
    /// Operation on closed channels.
    #[error("transceiver channels are closed")]
    Closed,
    /// A capture was requested without arming the receiver.
    #[error("receiver is not armed")]
    ReceiverNotArmed,
    /// A transmitted pulse train was not a sequence of low/high pairs.
    #[error("pulse train is not a sequence of low/high slot pairs")]
    MalformedPulseTrain,
}

/// Simulated RMT transceiver: both channels of one open-drain pin wired to
/// a [`SimBus`].
///
/// Transmitted slots are interpreted by the bus; while the receiver is
/// armed, the capture mirrors the transmitted pulses with the devices'
/// line-holding folded in, the way a receive channel on the same pin
/// records them.
#[derive(Debug)]
pub struct SimTransceiver {
    bus: SimBus,
    idle_threshold: u16,
    open_drain: bool,
    receiving: bool,
    capture: Vec<Signal>,
    drop_responses: bool,
    closed: bool,
}

impl Default for SimTransceiver {
    fn default() -> Self {
        SimTransceiver::new(TransceiverConfig::default())
    }
}

impl SimTransceiver {
    /// Creates a transceiver on an empty simulated bus.
    pub fn new(config: TransceiverConfig) -> Self {
        SimTransceiver {
            bus: SimBus::new(),
            idle_threshold: config.idle_threshold,
            open_drain: true,
            receiving: false,
            capture: Vec::new(),
            drop_responses: false,
            closed: false,
        }
    }

    /// Attaches a device to the simulated bus.
    pub fn attach(&mut self, device: SimDevice) {
        self.bus.attach(device);
    }

    /// The simulated bus.
    pub fn bus(&self) -> &SimBus {
        &self.bus
    }

    /// Mutable access to the simulated bus.
    pub fn bus_mut(&mut self) -> &mut SimBus {
        &mut self.bus
    }

    /// Whether the pin is currently in open-drain mode.
    pub fn open_drain(&self) -> bool {
        self.open_drain
    }

    /// When set, captures vanish: every receive times out.
    pub fn set_drop_responses(&mut self, drop: bool) {
        self.drop_responses = drop;
    }

    fn record(&mut self, level: Level, period: u16) {
        if self.receiving && !self.drop_responses {
            self.capture.push(Signal::new(level, period));
        }
    }

    fn process_slot(&mut self, low: Signal, high: Signal) -> Result<(), SimError> {
        if low.level != Level::Low || high.level != Level::High {
            return Err(SimError::MalformedPulseTrain);
        }
        if low.period >= RESET_PULSE_MIN_US {
            self.bus.reset();
            self.record(Level::Low, low.period);
            if self.bus.any_present() {
                self.record(Level::High, PRESENCE_DELAY_US);
                self.record(Level::Low, PRESENCE_LOW_US);
                self.record(
                    Level::High,
                    high.period
                        .saturating_sub(PRESENCE_DELAY_US + PRESENCE_LOW_US),
                );
            } else {
                self.record(Level::High, high.period);
            }
            return Ok(());
        }
        let master_bit = low.period < READ_HIGH_BEFORE_SAMPLE_US;
        let pulled_low = self.bus.slot(master_bit);
        trace!("slot master_bit={master_bit} pulled_low={pulled_low}");
        if pulled_low {
            let total = low.period + high.period;
            self.record(Level::Low, RESPONSE_HOLD_US);
            self.record(Level::High, total.saturating_sub(RESPONSE_HOLD_US));
        } else {
            self.record(Level::Low, low.period);
            self.record(Level::High, high.period);
        }
        Ok(())
    }
}

impl Transceiver for SimTransceiver {
    type Error = SimError;

    fn transmit(&mut self, signals: &SignalBuffer) -> Result<(), Self::Error> {
        if self.closed {
            return Err(SimError::Closed);
        }
        let pulses = signals.as_slice();
        if pulses.len() % 2 != 0 {
            return Err(SimError::MalformedPulseTrain);
        }
        for pair in pulses.chunks_exact(2) {
            self.process_slot(pair[0], pair[1])?;
        }
        Ok(())
    }

    fn start_receive(&mut self) -> Result<(), Self::Error> {
        if self.closed {
            return Err(SimError::Closed);
        }
        self.receiving = true;
        self.capture.clear();
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Option<SignalBuffer>, Self::Error> {
        if self.closed {
            return Err(SimError::Closed);
        }
        if !self.receiving {
            return Err(SimError::ReceiverNotArmed);
        }
        if self.capture.is_empty() {
            return Ok(None);
        }
        let len = self.capture.len().min(SIGNAL_BUFFER_CAPACITY);
        let mut frame = SignalBuffer::new(len);
        for (i, signal) in self.capture.drain(..).take(len).enumerate() {
            frame.set(i, signal.level, signal.period);
        }
        Ok(Some(frame))
    }

    fn stop_receive(&mut self) -> Result<(), Self::Error> {
        if self.closed {
            return Err(SimError::Closed);
        }
        self.receiving = false;
        self.capture.clear();
        Ok(())
    }

    fn idle_threshold(&self) -> u16 {
        self.idle_threshold
    }

    fn set_idle_threshold(&mut self, micros: u16) -> Result<(), Self::Error> {
        if self.closed {
            return Err(SimError::Closed);
        }
        self.idle_threshold = micros;
        Ok(())
    }

    fn set_open_drain(&mut self, enabled: bool) -> Result<(), Self::Error> {
        if self.closed {
            return Err(SimError::Closed);
        }
        self.open_drain = enabled;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        self.receiving = false;
        self.capture.clear();
    }
}
