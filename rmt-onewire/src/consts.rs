//! Timing and command constants for 1-Wire communication.
//!
//! Timing values are the standard-speed windows from
//! [application note 126](https://www.analog.com/en/resources/app-notes/1wire-communication-through-software.html),
//! in microseconds.

use core::time::Duration;

/// Command to match a specific 64-bit ROM id.
pub const ONEWIRE_MATCH_ROM_CMD: u8 = 0x55;

/// Command to skip ROM addressing and address all devices at once.
pub const ONEWIRE_SKIP_ROM_CMD: u8 = 0xcc;

/// Command to enumerate devices on the bus.
pub const ONEWIRE_SEARCH_CMD: u8 = 0xf0;

/// Command to enumerate only devices currently in an alarm state.
pub const ONEWIRE_CONDITIONAL_SEARCH_CMD: u8 = 0xec;

/// Command to read the ROM id of the single device on the bus.
///
/// With more than one device present every device answers at once and the
/// open-drain line returns the bitwise AND of all ids.
pub const ONEWIRE_READ_ROM_CMD: u8 = 0x33;

/// Duration of the master's reset low pulse (H).
pub const RESET_LOW_US: u16 = 480;

/// Release time before the presence pulse is sampled during reset (I).
pub const RESET_HIGH_BEFORE_SAMPLE_US: u16 = 70;

/// Remainder of the reset high window after the presence sample (J).
pub const RESET_HIGH_AFTER_SAMPLE_US: u16 = 410;

/// Total reset high window.
pub const RESET_HIGH_US: u16 = RESET_HIGH_BEFORE_SAMPLE_US + RESET_HIGH_AFTER_SAMPLE_US;

/// Receiver idle threshold while a reset exchange is in flight.
///
/// Must exceed [`RESET_LOW_US`] so the echoed reset pulse does not
/// terminate the capture early.
pub const RESET_IDLE_THRESHOLD_US: u16 = 530;

/// Duration of one read/write bit slot.
pub const IO_TIME_SLOT_US: u16 = 70;

/// Master low pulse initiating a read slot (A).
pub const READ_LOW_US: u16 = 6;

/// Sample delay within a read slot: 9 us per the timing tables plus a 5 us
/// margin for the pull-up to restore the line (E).
pub const READ_HIGH_BEFORE_SAMPLE_US: u16 = 14;

/// Remainder of the read slot after the sample point (F).
pub const READ_HIGH_AFTER_SAMPLE_US: u16 = 55;

/// Total high portion of a read slot.
pub const READ_HIGH_US: u16 = READ_HIGH_BEFORE_SAMPLE_US + READ_HIGH_AFTER_SAMPLE_US;

/// Master low pulse for a '0' bit (C).
pub const WRITE_0_LOW_US: u16 = 60;

/// Master low pulse for a '1' bit (A).
pub const WRITE_1_LOW_US: u16 = 6;

/// Default receiver idle threshold, above any write low pulse.
pub const IDLE_THRESHOLD_US: u16 = 75;

/// Signals per transferred bit: one low edge and one high edge.
pub const SIGNALS_PER_BIT: usize = 2;

/// How long to wait for a captured response to a reset pulse before
/// concluding that the bus is empty.
pub const RESET_RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);
