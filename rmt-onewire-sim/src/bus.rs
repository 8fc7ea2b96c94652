use log::debug;
use rmt_onewire::consts::{
    ONEWIRE_CONDITIONAL_SEARCH_CMD, ONEWIRE_MATCH_ROM_CMD, ONEWIRE_READ_ROM_CMD,
    ONEWIRE_SEARCH_CMD, ONEWIRE_SKIP_ROM_CMD,
};

/// One simulated slave on the bus.
#[derive(Debug, Clone)]
pub struct SimDevice {
    rom: u64,
    alarm: bool,
    search_capable: bool,
    selected: bool,
}

impl SimDevice {
    /// Creates a device with the given 64-bit ROM id.
    pub fn new(rom: u64) -> Self {
        SimDevice {
            rom,
            alarm: false,
            search_capable: true,
            selected: false,
        }
    }

    /// Creates a device that asserts presence but never answers a search
    /// command.
    pub fn presence_only(rom: u64) -> Self {
        SimDevice {
            search_capable: false,
            ..SimDevice::new(rom)
        }
    }

    /// Marks the device as being in an alarm state.
    pub fn with_alarm(mut self) -> Self {
        self.alarm = true;
        self
    }

    /// The device's ROM id.
    pub fn rom(&self) -> u64 {
        self.rom
    }

    /// Sets the alarm state.
    pub fn set_alarm(&mut self, alarm: bool) {
        self.alarm = alarm;
    }

    fn bit(&self, position: u8) -> bool {
        (self.rom >> position) & 1 == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchStep {
    Bit,
    Complement,
    Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for a reset pulse.
    Idle,
    /// Collecting the 8 command bits following a reset, LSB first.
    Command { value: u8, count: u8 },
    /// Search triplets: id bit, complement, then the master's direction.
    Search { position: u8, step: SearchStep },
    /// Match ROM: comparing 64 incoming id bits.
    MatchRom { position: u8 },
    /// Read ROM: streaming out 64 id bits, wired-AND across devices.
    ReadRom { position: u8 },
    /// Addressed device data; nothing in the simulation drives the line.
    Transparent,
}

/// Protocol state of the simulated bus.
///
/// Consumes the master's slots one at a time and reports, per slot,
/// whether any device pulls the line low.
#[derive(Debug)]
pub struct SimBus {
    devices: Vec<SimDevice>,
    phase: Phase,
}

impl Default for SimBus {
    fn default() -> Self {
        SimBus::new()
    }
}

impl SimBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        SimBus {
            devices: Vec::new(),
            phase: Phase::Idle,
        }
    }

    /// Attaches a device.
    pub fn attach(&mut self, device: SimDevice) {
        self.devices.push(device);
    }

    /// All attached devices.
    pub fn devices(&self) -> &[SimDevice] {
        &self.devices
    }

    /// Mutable access to the attached devices.
    pub fn devices_mut(&mut self) -> &mut [SimDevice] {
        &mut self.devices
    }

    /// ROM ids of the devices still selected in the current transaction.
    pub fn selected_roms(&self) -> Vec<u64> {
        self.devices
            .iter()
            .filter(|d| d.selected)
            .map(|d| d.rom)
            .collect()
    }

    /// Whether any device is attached (and will answer a reset).
    pub fn any_present(&self) -> bool {
        !self.devices.is_empty()
    }

    /// Handles a reset pulse: selects every device again and starts
    /// collecting the next ROM command.
    pub(crate) fn reset(&mut self) {
        for device in &mut self.devices {
            device.selected = true;
        }
        self.phase = Phase::Command { value: 0, count: 0 };
        debug!("bus reset, {} device(s) present", self.devices.len());
    }

    /// Consumes one non-reset slot carrying `master_bit` and returns
    /// `true` if a device holds the line low during it.
    pub(crate) fn slot(&mut self, master_bit: bool) -> bool {
        match self.phase {
            Phase::Idle | Phase::Transparent => false,
            Phase::Command { value, count } => {
                let value = value | ((master_bit as u8) << count);
                if count == 7 {
                    self.dispatch(value);
                } else {
                    self.phase = Phase::Command {
                        value,
                        count: count + 1,
                    };
                }
                false
            }
            Phase::Search { position, step } => self.search_slot(position, step, master_bit),
            Phase::MatchRom { position } => {
                for device in &mut self.devices {
                    if device.selected && device.bit(position) != master_bit {
                        device.selected = false;
                    }
                }
                self.phase = if position == 63 {
                    Phase::Transparent
                } else {
                    Phase::MatchRom {
                        position: position + 1,
                    }
                };
                false
            }
            Phase::ReadRom { position } => {
                // Every selected device answers at once; open-drain wins
                // on 0.
                let pulled = self
                    .devices
                    .iter()
                    .any(|d| d.selected && !d.bit(position));
                self.phase = if position == 63 {
                    Phase::Transparent
                } else {
                    Phase::ReadRom {
                        position: position + 1,
                    }
                };
                pulled
            }
        }
    }

    fn dispatch(&mut self, command: u8) {
        debug!("rom command {command:#04x}");
        self.phase = match command {
            ONEWIRE_SEARCH_CMD | ONEWIRE_CONDITIONAL_SEARCH_CMD => {
                let alarm_only = command == ONEWIRE_CONDITIONAL_SEARCH_CMD;
                for device in &mut self.devices {
                    device.selected &= device.search_capable && (!alarm_only || device.alarm);
                }
                Phase::Search {
                    position: 0,
                    step: SearchStep::Bit,
                }
            }
            ONEWIRE_MATCH_ROM_CMD => Phase::MatchRom { position: 0 },
            ONEWIRE_READ_ROM_CMD => Phase::ReadRom { position: 0 },
            ONEWIRE_SKIP_ROM_CMD => Phase::Transparent,
            _ => Phase::Transparent,
        };
    }

    fn search_slot(&mut self, position: u8, step: SearchStep, master_bit: bool) -> bool {
        match step {
            SearchStep::Bit => {
                self.phase = Phase::Search {
                    position,
                    step: SearchStep::Complement,
                };
                self.devices
                    .iter()
                    .any(|d| d.selected && !d.bit(position))
            }
            SearchStep::Complement => {
                self.phase = Phase::Search {
                    position,
                    step: SearchStep::Direction,
                };
                self.devices.iter().any(|d| d.selected && d.bit(position))
            }
            SearchStep::Direction => {
                for device in &mut self.devices {
                    if device.selected && device.bit(position) != master_bit {
                        device.selected = false;
                    }
                }
                self.phase = if position == 63 {
                    Phase::Idle
                } else {
                    Phase::Search {
                        position: position + 1,
                        step: SearchStep::Bit,
                    }
                };
                false
            }
        }
    }
}
