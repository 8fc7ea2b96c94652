//! In-process simulation of an RMT transceiver wired to a 1-Wire bus.
//!
//! [`SimTransceiver`] implements [`rmt_onewire::Transceiver`] against a
//! [`SimBus`] of [`SimDevice`]s, so the whole protocol stack runs without
//! hardware: the master's pulse trains are interpreted slot by slot,
//! devices answer through the open-drain AND of the line, and captures
//! mirror what a receiver on the same pin would record.

mod bus;
mod transceiver;

pub use bus::{SimBus, SimDevice};
pub use transceiver::{SimError, SimTransceiver};
