use clap::Parser;
use rmt_onewire::{families, Bus, LinkLayer, OneWireCrc, SearchAction};
use rmt_onewire_sim::{SimDevice, SimTransceiver};

/// Enumerate a simulated 1-Wire bus.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// ROM id to place on the bus (hex, e.g. 0x5100_0000_ff2a_5a28); repeatable
    #[arg(short, long = "device", value_parser = parse_rom)]
    devices: Vec<u64>,

    /// Restrict the search to one family code (hex)
    #[arg(short, long, value_parser = parse_family)]
    family: Option<u8>,

    /// Search only devices in an alarm state
    #[arg(short, long)]
    alarm: bool,
}

fn parse_rom(arg: &str) -> Result<u64, String> {
    let digits = arg.trim_start_matches("0x").replace('_', "");
    let rom = u64::from_str_radix(&digits, 16).map_err(|e| e.to_string())?;
    if OneWireCrc::of_id(rom) != (rom >> 56) as u8 {
        return Err(format!("ROM {rom:#018x} has a bad CRC byte"));
    }
    Ok(rom)
}

fn parse_family(arg: &str) -> Result<u8, String> {
    u8::from_str_radix(arg.trim_start_matches("0x"), 16).map_err(|e| e.to_string())
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    // Wire the requested devices to a simulated transceiver
    let mut transceiver = SimTransceiver::default();
    for &rom in &args.devices {
        transceiver.attach(if args.alarm {
            SimDevice::new(rom).with_alarm()
        } else {
            SimDevice::new(rom)
        });
    }
    let mut bus = Bus::new(LinkLayer::new(transceiver));
    // Enumerate devices on the 1-Wire bus
    let mut found = Vec::new();
    bus.enumerate(args.alarm, args.family, |id| {
        found.push(id);
        SearchAction::Continue
    })
    .expect("enumeration failed");
    log::info!("Found {} devices", found.len());
    for id in &found {
        let family = families::family_name_of(*id).unwrap_or("unknown family");
        log::info!("ROM: {id:#018x} ({family})");
    }
    // Verify the first device answers a targeted search
    if let Some(&first) = found.first() {
        let present = bus.ping(first).expect("ping failed");
        log::info!("ping {first:#018x}: {present}");
    }
}
