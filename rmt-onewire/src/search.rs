use crate::bus::Bus;
use crate::consts::{ONEWIRE_CONDITIONAL_SEARCH_CMD, ONEWIRE_SEARCH_CMD};
use crate::error::OneWireError;
use crate::traits::Transceiver;
use crate::utils::OneWireCrc;
use crate::OneWireResult;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Type of search performed by a [`Search`] traversal.
pub enum SearchKind {
    /// Enumerate every device on the bus.
    Normal = ONEWIRE_SEARCH_CMD,
    /// Enumerate only devices currently in an alarm state.
    Alarmed = ONEWIRE_CONDITIONAL_SEARCH_CMD,
}

/// What an enumeration callback asks the traversal to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchAction {
    /// Keep walking the id tree.
    Continue,
    /// Backtrack past the current family byte: no more ids with the same
    /// low byte are delivered in this traversal.
    SkipFamily,
}

/// One enumeration traversal over the bus.
///
/// Implements the [1-Wire search algorithm](https://www.analog.com/en/resources/app-notes/1wire-search-algorithm.html):
/// after a reset and a search command, every responding device broadcasts
/// each id bit and its complement simultaneously. Where the open-drain AND
/// of the answers collides, the master picks a branch, writes it back to
/// deselect the other group, and remembers the bit position so the other
/// branch can be revisited in a later pass.
///
/// Call [`next`](Search::next) repeatedly; it yields one 64-bit ROM id per
/// bus pass and `None` once no unexplored branch remains. Between yields,
/// [`skip_family`](Search::skip_family) abandons the branches of the
/// current family byte.
pub struct Search<'a, T: Transceiver> {
    bus: &'a mut Bus<T>,
    kind: SearchKind,
    family: Option<u8>,
    /// Accumulated id, doubling as the path memory of the previous pass.
    id: u64,
    /// Deepest collision of the current pass resolved to 0, -1 if none.
    last_branch: i8,
    /// As `last_branch`, restricted to the family byte (bits 0..8).
    last_family_branch: i8,
    /// Family branch of the pass that produced the latest yield.
    pending_family_branch: i8,
    /// Branch driving the current pass: bits below it retrace `id`, the
    /// branch itself flips to 1. -1 for a fresh search, 64 to retrace a
    /// full preset id.
    previous_branch: i8,
    complete: bool,
}

impl<'a, T: Transceiver> Search<'a, T> {
    /// Starts a search over all devices (or all alarmed devices).
    pub fn new(bus: &'a mut Bus<T>, kind: SearchKind) -> Self {
        Self::with_state(bus, kind, None, 0, -1)
    }

    /// Starts a search constrained to one family code.
    ///
    /// The family byte seeds the first eight id bits, and the traversal
    /// ends as soon as a yielded id leaves the family subtree.
    pub fn with_family(bus: &'a mut Bus<T>, kind: SearchKind, family: u8) -> Self {
        Self::with_state(bus, kind, Some(family), family as u64, 8)
    }

    /// Starts a traversal that retraces one specific id.
    ///
    /// The first yield is the id of the device the bus steered towards
    /// while retracing; it equals `id` exactly when that device is
    /// present. Used by [`Bus::ping`].
    pub fn targeting(bus: &'a mut Bus<T>, id: u64) -> Self {
        Self::with_state(bus, SearchKind::Normal, None, id, 64)
    }

    fn with_state(
        bus: &'a mut Bus<T>,
        kind: SearchKind,
        family: Option<u8>,
        start_id: u64,
        fixed_bits: i8,
    ) -> Self {
        Search {
            bus,
            kind,
            family,
            id: start_id,
            last_branch: -1,
            last_family_branch: -1,
            pending_family_branch: -1,
            previous_branch: fixed_bits,
            complete: false,
        }
    }

    /// Runs one bus pass and yields the next discovered ROM id.
    ///
    /// Returns `Ok(None)` when the traversal is exhausted: no presence
    /// pulse after reset, no unexplored branch left, the family filter ran
    /// out of matching devices, or (for [`SearchKind::Alarmed`]) no device
    /// answered the search command.
    ///
    /// # Errors
    /// [`OneWireError::BusError`] if a normal search reads an id bit and
    /// its complement both as 1 mid-pass;
    /// [`OneWireError::InvalidCrc`] if the assembled id fails CRC-8
    /// validation.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> OneWireResult<Option<u64>, T::Error> {
        if self.complete {
            return Ok(None);
        }
        if !self.bus.reset()? {
            self.complete = true;
            return Ok(None);
        }
        self.bus.write_byte(self.kind as u8, false)?;
        for position in 0..64u8 {
            let bit = self.bus.read_bit()?;
            let complement = self.bus.read_bit()?;
            let value = match (bit, complement) {
                (true, true) => {
                    // Nothing drove the line: every device dropped out.
                    if self.kind == SearchKind::Alarmed {
                        self.complete = true;
                        return Ok(None);
                    }
                    return Err(OneWireError::BusError);
                }
                (b, c) if b != c => b,
                _ => self.resolve_collision(position),
            };
            if value {
                self.id |= 1 << position;
            } else {
                self.id &= !(1 << position);
            }
            // Devices whose bit differs deselect themselves here.
            self.bus.write_bit(value, false)?;
        }
        if OneWireCrc::of_id(self.id) != (self.id >> 56) as u8 {
            return Err(OneWireError::InvalidCrc);
        }
        self.previous_branch = self.last_branch;
        self.pending_family_branch = self.last_family_branch;
        self.last_branch = -1;
        self.last_family_branch = -1;
        if self.previous_branch < 0 {
            self.complete = true;
        }
        if let Some(family) = self.family {
            if (self.id & 0xff) as u8 != family {
                // Walked past the family subtree: nothing left to find.
                self.complete = true;
                return Ok(None);
            }
        }
        Ok(Some(self.id))
    }

    fn resolve_collision(&mut self, position: u8) -> bool {
        let p = position as i8;
        let choice = if p < self.previous_branch {
            // Retrace the path of the previous pass.
            (self.id >> position) & 1 == 1
        } else {
            // Flip the driving branch to 1, open new territory with 0.
            p == self.previous_branch
        };
        if !choice {
            if position < 8 {
                self.last_family_branch = p;
            }
            self.last_branch = p;
        }
        choice
    }

    /// Abandons the family subtree of the most recent yield.
    ///
    /// The next [`next`](Search::next) call resumes at the last unexplored
    /// branch within the first eight bits, or exhausts the traversal if
    /// there is none.
    pub fn skip_family(&mut self) {
        self.previous_branch = self.pending_family_branch;
        self.complete = self.previous_branch < 0;
    }
}
