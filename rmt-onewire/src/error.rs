#[allow(unused_imports)]
use crate::Search;

/// One wire communication error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneWireError<E> {
    /// Encapsulates the error type of the underlying transceiver.
    Transport(E),
    /// Operation attempted after the bus was closed.
    BusClosed,
    /// Indicates that no device asserted a presence pulse on the bus.
    NoDevicePresent,
    /// A [`Search`] read an id bit and its complement both as 1, which means
    /// no device drove the line mid-enumeration.
    BusError,
    /// Computed CRC of the ROM id is invalid.
    InvalidCrc,
    /// A captured signal sequence had the wrong length or edge levels.
    InvalidSignal,
    /// Bit count outside the supported 0..=64 range.
    InvalidArgument,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Transport(other)
    }
}
