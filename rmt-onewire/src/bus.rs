use crate::consts::{ONEWIRE_MATCH_ROM_CMD, ONEWIRE_READ_ROM_CMD, ONEWIRE_SKIP_ROM_CMD};
use crate::error::OneWireError;
use crate::link::LinkLayer;
use crate::search::{Search, SearchAction, SearchKind};
use crate::traits::Transceiver;
use crate::OneWireResult;

/// ROM-command façade over a [`LinkLayer`].
///
/// Adds device addressing (match/skip/read ROM), presence probing and the
/// enumeration entry points on top of the raw bit transport. Closing the
/// bus closes the link it owns.
pub struct Bus<T: Transceiver> {
    link: LinkLayer<T>,
}

impl<T: Transceiver> From<LinkLayer<T>> for Bus<T> {
    fn from(link: LinkLayer<T>) -> Self {
        Bus::new(link)
    }
}

impl<T: Transceiver> Bus<T> {
    /// Takes ownership of a link layer.
    pub fn new(link: LinkLayer<T>) -> Self {
        Bus { link }
    }

    /// Shared access to the underlying transceiver.
    pub fn transceiver(&self) -> &T {
        self.link.transceiver()
    }

    /// Exclusive access to the underlying transceiver.
    pub fn transceiver_mut(&mut self) -> &mut T {
        self.link.transceiver_mut()
    }

    /// Issues a reset pulse; `true` if any device asserted presence.
    pub fn reset(&mut self) -> OneWireResult<bool, T::Error> {
        self.link.reset()
    }

    fn address(&mut self, command: u8) -> OneWireResult<(), T::Error> {
        if !self.link.reset()? {
            return Err(OneWireError::NoDevicePresent);
        }
        self.link.write_byte(command, false)
    }

    /// Selects the device with the given ROM id for the next command.
    ///
    /// # Errors
    /// [`OneWireError::NoDevicePresent`] if the reset saw no presence
    /// pulse.
    pub fn select(&mut self, id: u64) -> OneWireResult<(), T::Error> {
        self.address(ONEWIRE_MATCH_ROM_CMD)?;
        self.link.write(&id.to_le_bytes(), false)
    }

    /// Addresses every device on the bus at once.
    ///
    /// # Errors
    /// [`OneWireError::NoDevicePresent`] if the reset saw no presence
    /// pulse.
    pub fn skip(&mut self) -> OneWireResult<(), T::Error> {
        self.address(ONEWIRE_SKIP_ROM_CMD)
    }

    /// Reads the ROM id of the single device on the bus.
    ///
    /// Only meaningful with exactly one device present: with several, the
    /// open-drain line returns the bitwise AND of all their ids.
    pub fn read_device_id(&mut self) -> OneWireResult<u64, T::Error> {
        self.address(ONEWIRE_READ_ROM_CMD)?;
        self.link.read_bits(64)
    }

    /// Checks whether the device with the given id is present.
    ///
    /// Runs a single targeted search pass retracing `id` and compares what
    /// the bus steered towards.
    pub fn ping(&mut self, id: u64) -> OneWireResult<bool, T::Error> {
        Ok(Search::targeting(self, id).next()? == Some(id))
    }

    /// Enumerates the bus, delivering each discovered ROM id to `visit`.
    ///
    /// With `alarm_only`, only devices in an alarm state answer and an
    /// empty answer terminates the traversal instead of failing. With a
    /// `family`, the walk is seeded with the family byte and stops at the
    /// first id outside it. The callback steers the traversal through its
    /// [`SearchAction`] return value.
    pub fn enumerate<F>(
        &mut self,
        alarm_only: bool,
        family: Option<u8>,
        mut visit: F,
    ) -> OneWireResult<(), T::Error>
    where
        F: FnMut(u64) -> SearchAction,
    {
        let kind = if alarm_only {
            SearchKind::Alarmed
        } else {
            SearchKind::Normal
        };
        let mut search = match family {
            Some(family) => Search::with_family(self, kind, family),
            None => Search::new(self, kind),
        };
        while let Some(id) = search.next()? {
            if visit(id) == SearchAction::SkipFamily {
                search.skip_family();
            }
        }
        Ok(())
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, bit: bool, activate_power: bool) -> OneWireResult<(), T::Error> {
        self.link.write_bits(bit as u64, 1, activate_power)
    }

    /// Writes the low `count` bits of `value`, least-significant first.
    pub fn write_bits(
        &mut self,
        value: u64,
        count: usize,
        activate_power: bool,
    ) -> OneWireResult<(), T::Error> {
        self.link.write_bits(value, count, activate_power)
    }

    /// Writes one byte.
    pub fn write_byte(&mut self, byte: u8, activate_power: bool) -> OneWireResult<(), T::Error> {
        self.link.write_byte(byte, activate_power)
    }

    /// Writes a byte sequence.
    pub fn write(&mut self, bytes: &[u8], activate_power: bool) -> OneWireResult<(), T::Error> {
        self.link.write(bytes, activate_power)
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> OneWireResult<bool, T::Error> {
        Ok(self.link.read_bits(1)? != 0)
    }

    /// Reads `count` bits (0..=64), least-significant first.
    pub fn read_bits(&mut self, count: usize) -> OneWireResult<u64, T::Error> {
        self.link.read_bits(count)
    }

    /// Reads one byte.
    pub fn read_byte(&mut self) -> OneWireResult<u8, T::Error> {
        self.link.read_byte()
    }

    /// Fills `out` with consecutive bytes from the bus.
    pub fn read(&mut self, out: &mut [u8]) -> OneWireResult<(), T::Error> {
        self.link.read(out)
    }

    /// Switches strong pull-up power delivery; any read turns it off.
    pub fn set_power(&mut self, on: bool) -> OneWireResult<(), T::Error> {
        self.link.set_power(on)
    }

    /// Whether [`close`](Bus::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.link.is_closed()
    }

    /// Closes the bus and the link it owns. Idempotent.
    pub fn close(&mut self) {
        self.link.close();
    }
}
