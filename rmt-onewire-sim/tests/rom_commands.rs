use rmt_onewire::{Bus, LinkLayer, OneWireError};
use rmt_onewire_sim::{SimDevice, SimTransceiver};

const TAG: u64 = 0x3d00_0000_0000_0001;
const THERMO_A: u64 = 0x5100_0000_ff2a_5a28;
const THERMO_B: u64 = 0xfa00_0001_ff2a_5a28;

fn bus_with(roms: &[u64]) -> Bus<SimTransceiver> {
    let mut transceiver = SimTransceiver::default();
    for &rom in roms {
        transceiver.attach(SimDevice::new(rom));
    }
    Bus::new(LinkLayer::new(transceiver))
}

#[test]
fn reset_reports_presence() {
    let mut empty = bus_with(&[]);
    assert_eq!(empty.reset(), Ok(false));

    let mut populated = bus_with(&[TAG]);
    assert_eq!(populated.reset(), Ok(true));
}

#[test]
fn reset_timeout_is_not_an_error() {
    let mut bus = bus_with(&[TAG]);
    bus.transceiver_mut().set_drop_responses(true);
    assert_eq!(bus.reset(), Ok(false));
    bus.transceiver_mut().set_drop_responses(false);
    assert_eq!(bus.reset(), Ok(true));
}

#[test]
fn select_deselects_every_other_device() {
    let mut bus = bus_with(&[TAG, THERMO_A, THERMO_B]);
    bus.select(THERMO_A).unwrap();
    assert_eq!(bus.transceiver().bus().selected_roms(), vec![THERMO_A]);

    bus.select(0x5100_0000_ff2a_5a29).unwrap();
    assert!(bus.transceiver().bus().selected_roms().is_empty());
}

#[test]
fn skip_addresses_every_device() {
    let mut bus = bus_with(&[TAG, THERMO_A]);
    bus.skip().unwrap();
    let mut selected = bus.transceiver().bus().selected_roms();
    selected.sort_unstable();
    assert_eq!(selected, vec![TAG, THERMO_A]);
}

#[test]
fn addressing_an_empty_bus_fails() {
    let mut bus = bus_with(&[]);
    assert_eq!(bus.select(TAG), Err(OneWireError::NoDevicePresent));
    assert_eq!(bus.skip(), Err(OneWireError::NoDevicePresent));
    assert_eq!(bus.read_device_id(), Err(OneWireError::NoDevicePresent));
}

#[test]
fn read_device_id_returns_the_lone_rom() {
    let mut bus = bus_with(&[THERMO_A]);
    assert_eq!(bus.read_device_id(), Ok(THERMO_A));
}

#[test]
fn read_device_id_with_collisions_is_the_and_of_all_roms() {
    let mut bus = bus_with(&[TAG, THERMO_A, THERMO_B]);
    assert_eq!(bus.read_device_id(), Ok(TAG & THERMO_A & THERMO_B));
}

#[test]
fn idle_bus_reads_high() {
    let mut bus = bus_with(&[TAG]);
    bus.skip().unwrap();
    // Nothing in the simulation answers device-function commands.
    assert_eq!(bus.read_byte(), Ok(0xff));
    assert_eq!(bus.read_bits(12), Ok(0x0fff));
    assert!(bus.read_bit().unwrap());
}

#[test]
fn closed_bus_rejects_operations() {
    let mut bus = bus_with(&[TAG]);
    bus.close();
    bus.close(); // idempotent
    assert!(bus.is_closed());
    assert_eq!(bus.reset(), Err(OneWireError::BusClosed));
    assert_eq!(bus.select(TAG), Err(OneWireError::BusClosed));
    assert_eq!(bus.read_device_id(), Err(OneWireError::BusClosed));
    assert_eq!(bus.ping(TAG), Err(OneWireError::BusClosed));
    assert_eq!(
        bus.enumerate(false, None, |_| rmt_onewire::SearchAction::Continue),
        Err(OneWireError::BusClosed)
    );
}
