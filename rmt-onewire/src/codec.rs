//! Translation between bit values and the timed pulse trains the physical
//! layer emits or captures.
//!
//! All functions are pure; the link layer owns the I/O. Bits travel on the
//! wire least-significant first, and every bit occupies
//! [`SIGNALS_PER_BIT`] signals: one low edge followed by one high edge.

use crate::consts::{
    IO_TIME_SLOT_US, READ_HIGH_BEFORE_SAMPLE_US, READ_HIGH_US, READ_LOW_US, SIGNALS_PER_BIT,
    WRITE_0_LOW_US, WRITE_1_LOW_US,
};
use crate::error::OneWireError;
use crate::signal::{Level, SignalBuffer};

/// Largest transfer handled in one pulse train.
pub const MAX_BITS: usize = 64;

fn bit_mask(count: usize) -> u64 {
    if count >= 64 {
        u64::MAX
    } else {
        (1u64 << count) - 1
    }
}

/// Encodes the low `count` bits of `value` as write slots.
///
/// Each bit becomes a low pulse of [`WRITE_1_LOW_US`] or [`WRITE_0_LOW_US`]
/// followed by a high pulse filling the rest of the
/// [`IO_TIME_SLOT_US`] slot.
///
/// # Errors
/// [`OneWireError::InvalidArgument`] if `count` exceeds [`MAX_BITS`].
pub fn encode_write<E>(value: u64, count: usize) -> Result<SignalBuffer, OneWireError<E>> {
    if count > MAX_BITS {
        return Err(OneWireError::InvalidArgument);
    }
    let mut signals = SignalBuffer::new(count * SIGNALS_PER_BIT);
    for i in 0..count {
        let low = if (value >> i) & 1 == 1 {
            WRITE_1_LOW_US
        } else {
            WRITE_0_LOW_US
        };
        signals.set(SIGNALS_PER_BIT * i, Level::Low, low);
        signals.set(SIGNALS_PER_BIT * i + 1, Level::High, IO_TIME_SLOT_US - low);
    }
    Ok(signals)
}

/// Encodes the stimulus for `count` read slots.
///
/// The master emits a short low pulse and releases the line; a slave
/// answering '0' holds the line low past the sample point, a slave
/// answering '1' leaves it to the pull-up.
///
/// # Errors
/// [`OneWireError::InvalidArgument`] if `count` exceeds [`MAX_BITS`].
pub fn encode_read<E>(count: usize) -> Result<SignalBuffer, OneWireError<E>> {
    if count > MAX_BITS {
        return Err(OneWireError::InvalidArgument);
    }
    let mut signals = SignalBuffer::new(count * SIGNALS_PER_BIT);
    for i in 0..count {
        signals.set(SIGNALS_PER_BIT * i, Level::Low, READ_LOW_US);
        signals.set(SIGNALS_PER_BIT * i + 1, Level::High, READ_HIGH_US);
    }
    Ok(signals)
}

/// Decodes `bit_count` bits from captured signals, starting at signal
/// index `from`.
///
/// Every bit must appear as a low edge followed by a high edge. The bit is
/// 1 when the line returned high before the sample point, i.e. the low
/// period is shorter than [`READ_HIGH_BEFORE_SAMPLE_US`]. Bits accumulate
/// least-significant first.
///
/// # Errors
/// [`OneWireError::InvalidArgument`] if `bit_count` exceeds [`MAX_BITS`];
/// [`OneWireError::InvalidSignal`] if the buffer is too short or an edge
/// has the wrong level.
pub fn decode<E>(
    signals: &SignalBuffer,
    from: usize,
    bit_count: usize,
) -> Result<u64, OneWireError<E>> {
    if bit_count > MAX_BITS {
        return Err(OneWireError::InvalidArgument);
    }
    if from + SIGNALS_PER_BIT * bit_count > signals.len() {
        return Err(OneWireError::InvalidSignal);
    }
    let mut value = 0u64;
    let captured = signals.as_slice();
    for i in 0..bit_count {
        let low = captured[from + SIGNALS_PER_BIT * i];
        let high = captured[from + SIGNALS_PER_BIT * i + 1];
        if low.level != Level::Low || high.level != Level::High {
            return Err(OneWireError::InvalidSignal);
        }
        if low.period < READ_HIGH_BEFORE_SAMPLE_US {
            value |= 1 << i;
        }
    }
    Ok(value & bit_mask(bit_count))
}

/// Decodes consecutive bytes into `out`, starting `from_byte` bytes into
/// the captured sequence.
///
/// # Errors
/// As for [`decode`], applied per byte.
pub fn decode_bytes<E>(
    signals: &SignalBuffer,
    from_byte: usize,
    out: &mut [u8],
) -> Result<(), OneWireError<E>> {
    for (i, byte) in out.iter_mut().enumerate() {
        let from = (from_byte + i) * 8 * SIGNALS_PER_BIT;
        *byte = decode(signals, from, 8)? as u8;
    }
    Ok(())
}
