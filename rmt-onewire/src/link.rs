use crate::codec;
use crate::consts::{
    RESET_HIGH_US, RESET_IDLE_THRESHOLD_US, RESET_LOW_US, RESET_RESPONSE_TIMEOUT,
};
use crate::error::OneWireError;
use crate::signal::{Level, SignalBuffer};
use crate::traits::Transceiver;
use crate::OneWireResult;

/// Protocol driver for a single 1-Wire pin.
///
/// Owns the [`Transceiver`] and sequences its channels: every read arms
/// the receiver, emits the stimulus and decodes the capture; every write
/// encodes and transmits. The pin is kept open-drain except while strong
/// pull-up power delivery is active, and any read restores open-drain
/// before touching the bus.
pub struct LinkLayer<T: Transceiver> {
    transceiver: T,
    closed: bool,
}

impl<T: Transceiver> LinkLayer<T> {
    /// Wraps a configured transceiver.
    pub fn new(transceiver: T) -> Self {
        LinkLayer {
            transceiver,
            closed: false,
        }
    }

    /// Shared access to the underlying transceiver.
    pub fn transceiver(&self) -> &T {
        &self.transceiver
    }

    /// Exclusive access to the underlying transceiver.
    pub fn transceiver_mut(&mut self) -> &mut T {
        &mut self.transceiver
    }

    /// Whether [`close`](LinkLayer::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> OneWireResult<(), T::Error> {
        if self.closed {
            Err(OneWireError::BusClosed)
        } else {
            Ok(())
        }
    }

    /// Issues a reset pulse and samples the presence response.
    ///
    /// Returns `true` if at least one device answered with a presence
    /// pulse, `false` on an empty bus or when no frame was captured within
    /// [`RESET_RESPONSE_TIMEOUT`]. The receive idle threshold is raised to
    /// [`RESET_IDLE_THRESHOLD_US`] for the exchange and restored on every
    /// exit path.
    pub fn reset(&mut self) -> OneWireResult<bool, T::Error> {
        self.ensure_open()?;
        self.transceiver.set_open_drain(true)?;
        let saved = self.transceiver.idle_threshold();
        self.transceiver.set_idle_threshold(RESET_IDLE_THRESHOLD_US)?;
        let outcome = self.reset_exchange();
        let restored = self.transceiver.set_idle_threshold(saved);
        let presence = outcome?;
        restored?;
        Ok(presence)
    }

    fn reset_exchange(&mut self) -> OneWireResult<bool, T::Error> {
        let mut pulses = SignalBuffer::new(2);
        pulses.set(0, Level::Low, RESET_LOW_US);
        pulses.set(1, Level::High, RESET_HIGH_US);
        match self.exchange(&pulses)? {
            Some(response) => Ok(presence_detected(&response)),
            None => Ok(false),
        }
    }

    /// Writes the low `count` bits of `value`, least-significant first.
    ///
    /// With `activate_power` the pin leaves open-drain mode before the
    /// pulses go out, so the line is driven high at full strength as soon
    /// as the last slot ends.
    pub fn write_bits(
        &mut self,
        value: u64,
        count: usize,
        activate_power: bool,
    ) -> OneWireResult<(), T::Error> {
        self.ensure_open()?;
        let signals = codec::encode_write(value, count)?;
        if activate_power {
            self.transceiver.set_open_drain(false)?;
        }
        self.transceiver.transmit(&signals)?;
        Ok(())
    }

    /// Writes one byte.
    pub fn write_byte(&mut self, byte: u8, activate_power: bool) -> OneWireResult<(), T::Error> {
        self.write_bits(byte as u64, 8, activate_power)
    }

    /// Writes a byte sequence; each byte gets its own slot train.
    ///
    /// Power activation, if requested, applies to the final byte so the
    /// bus stays open-drain until the sequence completes.
    pub fn write(&mut self, bytes: &[u8], activate_power: bool) -> OneWireResult<(), T::Error> {
        let Some((last, head)) = bytes.split_last() else {
            return self.ensure_open();
        };
        for &byte in head {
            self.write_byte(byte, false)?;
        }
        self.write_byte(*last, activate_power)
    }

    /// Reads `count` bits (0..=64), least-significant first.
    ///
    /// Re-enables open-drain on the pin first, which ends any strong
    /// pull-up still active.
    pub fn read_bits(&mut self, count: usize) -> OneWireResult<u64, T::Error> {
        let response = self.read_exchange(count)?;
        codec::decode(&response, 0, count)
    }

    /// Reads one byte.
    pub fn read_byte(&mut self) -> OneWireResult<u8, T::Error> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Fills `out` with consecutive bytes from the bus.
    pub fn read(&mut self, out: &mut [u8]) -> OneWireResult<(), T::Error> {
        for chunk in out.chunks_mut(codec::MAX_BITS / 8) {
            let response = self.read_exchange(chunk.len() * 8)?;
            codec::decode_bytes(&response, 0, chunk)?;
        }
        Ok(())
    }

    fn read_exchange(&mut self, count: usize) -> OneWireResult<SignalBuffer, T::Error> {
        self.ensure_open()?;
        let stimulus = codec::encode_read(count)?;
        self.transceiver.set_open_drain(true)?;
        if count == 0 {
            return Ok(stimulus);
        }
        // A timeout leaves the buffer empty; decode then rejects it.
        Ok(self.exchange(&stimulus)?.unwrap_or_default())
    }

    fn exchange(
        &mut self,
        stimulus: &SignalBuffer,
    ) -> OneWireResult<Option<SignalBuffer>, T::Error> {
        self.transceiver.start_receive()?;
        let outcome = self.transmit_and_capture(stimulus);
        let stopped = self.transceiver.stop_receive();
        let response = outcome?;
        stopped?;
        Ok(response)
    }

    fn transmit_and_capture(
        &mut self,
        stimulus: &SignalBuffer,
    ) -> OneWireResult<Option<SignalBuffer>, T::Error> {
        self.transceiver.transmit(stimulus)?;
        Ok(self.transceiver.receive(RESET_RESPONSE_TIMEOUT)?)
    }

    /// Switches strong pull-up power delivery.
    ///
    /// While on, the pin is driven push-pull so a parasitically powered
    /// device can draw current from the line. The next read turns power
    /// off again.
    pub fn set_power(&mut self, on: bool) -> OneWireResult<(), T::Error> {
        self.ensure_open()?;
        self.transceiver.set_open_drain(!on)?;
        Ok(())
    }

    /// Closes both transceiver channels. Idempotent; any later operation
    /// fails with [`OneWireError::BusClosed`].
    pub fn close(&mut self) {
        if !self.closed {
            self.transceiver.close();
            self.closed = true;
        }
    }
}

impl<T: Transceiver> Drop for LinkLayer<T> {
    fn drop(&mut self) {
        self.close();
    }
}

fn presence_detected(response: &SignalBuffer) -> bool {
    // The capture echoes the master's own reset low, then the released
    // line, then the presence pulse. The low-pulse tolerance is asymmetric
    // since the peripheral tends to overshoot.
    let captured = response.as_slice();
    if captured.len() < 3 {
        return false;
    }
    let window = (RESET_LOW_US - 2)..=(RESET_LOW_US + 10);
    captured[0].level == Level::Low
        && window.contains(&captured[0].period)
        && captured[1].level == Level::High
        && captured[1].period > 0
        && captured[2].level == Level::Low
        && captured[2].period > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::IDLE_THRESHOLD_US;
    use core::time::Duration;

    #[derive(Default)]
    struct FakeTransceiver {
        idle_threshold: u16,
        open_drain: bool,
        receiving: bool,
        closed: bool,
        response: Option<SignalBuffer>,
        transmitted: Vec<SignalBuffer>,
        thresholds_seen: Vec<u16>,
        fail_transmit: bool,
    }

    impl FakeTransceiver {
        fn new() -> Self {
            FakeTransceiver {
                idle_threshold: IDLE_THRESHOLD_US,
                open_drain: true,
                ..FakeTransceiver::default()
            }
        }

        fn respond(mut self, pairs: &[(u8, u16)]) -> Self {
            self.response = Some(SignalBuffer::from_pairs(pairs));
            self
        }
    }

    impl Transceiver for FakeTransceiver {
        type Error = &'static str;

        fn transmit(&mut self, signals: &SignalBuffer) -> Result<(), Self::Error> {
            if self.fail_transmit {
                return Err("transmit");
            }
            self.transmitted.push(signals.clone());
            Ok(())
        }

        fn start_receive(&mut self) -> Result<(), Self::Error> {
            self.receiving = true;
            Ok(())
        }

        fn receive(&mut self, _timeout: Duration) -> Result<Option<SignalBuffer>, Self::Error> {
            if !self.receiving {
                return Err("receiver not armed");
            }
            Ok(self.response.take())
        }

        fn stop_receive(&mut self) -> Result<(), Self::Error> {
            self.receiving = false;
            Ok(())
        }

        fn idle_threshold(&self) -> u16 {
            self.idle_threshold
        }

        fn set_idle_threshold(&mut self, micros: u16) -> Result<(), Self::Error> {
            self.idle_threshold = micros;
            self.thresholds_seen.push(micros);
            Ok(())
        }

        fn set_open_drain(&mut self, enabled: bool) -> Result<(), Self::Error> {
            self.open_drain = enabled;
            Ok(())
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn presence_response(master_low: u16) -> Vec<(u8, u16)> {
        vec![(0, master_low), (1, 30), (0, 100), (1, 350)]
    }

    #[test]
    fn reset_detects_presence_and_restores_threshold() {
        let fake = FakeTransceiver::new().respond(&presence_response(480));
        let mut link = LinkLayer::new(fake);
        assert_eq!(link.reset(), Ok(true));
        assert_eq!(link.transceiver().idle_threshold, IDLE_THRESHOLD_US);
        assert_eq!(
            link.transceiver().thresholds_seen,
            [RESET_IDLE_THRESHOLD_US, IDLE_THRESHOLD_US]
        );
        let pulses = &link.transceiver().transmitted[0];
        assert_eq!(pulses.get(0).unwrap().period, RESET_LOW_US);
        assert_eq!(pulses.get(1).unwrap().period, RESET_HIGH_US);
    }

    #[test]
    fn reset_low_pulse_window_is_asymmetric() {
        for (period, presence) in [(478, true), (477, false), (490, true), (491, false)] {
            let fake = FakeTransceiver::new().respond(&presence_response(period));
            let mut link = LinkLayer::new(fake);
            assert_eq!(link.reset(), Ok(presence), "master low {period}");
        }
    }

    #[test]
    fn reset_needs_three_captured_signals() {
        // An empty bus echoes the master pulses and nothing else.
        let fake = FakeTransceiver::new().respond(&[(0, 480), (1, 480)]);
        let mut link = LinkLayer::new(fake);
        assert_eq!(link.reset(), Ok(false));
    }

    #[test]
    fn reset_timeout_returns_false() {
        let mut link = LinkLayer::new(FakeTransceiver::new());
        assert_eq!(link.reset(), Ok(false));
        assert_eq!(link.transceiver().idle_threshold, IDLE_THRESHOLD_US);
    }

    #[test]
    fn reset_restores_threshold_on_transport_error() {
        let mut fake = FakeTransceiver::new();
        fake.fail_transmit = true;
        let mut link = LinkLayer::new(fake);
        assert_eq!(link.reset(), Err(OneWireError::Transport("transmit")));
        assert_eq!(link.transceiver().idle_threshold, IDLE_THRESHOLD_US);
        assert!(!link.transceiver().receiving);
    }

    #[test]
    fn read_reenables_open_drain() {
        let fake = FakeTransceiver::new().respond(&[(0, 24), (1, 46), (0, 6), (1, 64)]);
        let mut link = LinkLayer::new(fake);
        link.set_power(true).unwrap();
        assert!(!link.transceiver().open_drain);
        assert_eq!(link.read_bits(2), Ok(0b10));
        assert!(link.transceiver().open_drain);
    }

    #[test]
    fn powered_write_drops_open_drain() {
        let mut link = LinkLayer::new(FakeTransceiver::new());
        link.write_byte(0x44, true).unwrap();
        assert!(!link.transceiver().open_drain);
        link.set_power(false).unwrap();
        assert!(link.transceiver().open_drain);
    }

    #[test]
    fn bytes_are_written_individually() {
        let mut link = LinkLayer::new(FakeTransceiver::new());
        link.write(&[0xcc, 0x44], false).unwrap();
        let transmitted = &link.transceiver().transmitted;
        assert_eq!(transmitted.len(), 2);
        assert!(transmitted.iter().all(|s| s.len() == 16));
        assert!(link.transceiver().open_drain);
    }

    #[test]
    fn read_timeout_is_an_invalid_signal() {
        let mut link = LinkLayer::new(FakeTransceiver::new());
        assert_eq!(link.read_bits(1), Err(OneWireError::InvalidSignal));
    }

    #[test]
    fn bit_counts_are_bounded() {
        let mut link = LinkLayer::new(FakeTransceiver::new());
        assert_eq!(link.read_bits(65), Err(OneWireError::InvalidArgument));
        assert_eq!(
            link.write_bits(0, 65, false),
            Err(OneWireError::InvalidArgument)
        );
        assert_eq!(link.read_bits(0), Ok(0));
        assert_eq!(link.write_bits(0, 0, false), Ok(()));
    }

    #[test]
    fn closed_link_rejects_everything() {
        let mut link = LinkLayer::new(FakeTransceiver::new());
        link.close();
        link.close(); // idempotent
        assert!(link.is_closed());
        assert_eq!(link.reset(), Err(OneWireError::BusClosed));
        assert_eq!(link.read_byte(), Err(OneWireError::BusClosed));
        assert_eq!(link.write_byte(0, false), Err(OneWireError::BusClosed));
        assert_eq!(link.set_power(true), Err(OneWireError::BusClosed));
    }
}
