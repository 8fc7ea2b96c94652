//! Family codes of common Dallas/Maxim parts.
//!
//! The low byte of a 64-bit ROM id identifies the device model.

/// Returns the part name for a family code, if it is a known one.
pub fn family_name(family: u8) -> Option<&'static str> {
    Some(match family {
        0x01 => "DS1990A serial number iButton",
        0x02 => "DS1991 multikey iButton",
        0x04 => "DS2404 real-time clock",
        0x05 => "DS2405 addressable switch",
        0x06 => "DS1993 4Kb NVRAM iButton",
        0x08 => "DS1992 1Kb NVRAM iButton",
        0x09 => "DS2502 1Kb EPROM",
        0x0a => "DS1995 16Kb NVRAM iButton",
        0x0c => "DS1996 64Kb NVRAM iButton",
        0x0f => "DS2506 64Kb EPROM",
        0x10 => "DS18S20 temperature sensor",
        0x12 => "DS2406 dual addressable switch",
        0x14 => "DS2430A 256-bit EEPROM",
        0x1d => "DS2423 4Kb RAM with counter",
        0x20 => "DS2450 quad A/D converter",
        0x22 => "DS1822 temperature sensor",
        0x23 => "DS2433 4Kb EEPROM",
        0x26 => "DS2438 smart battery monitor",
        0x28 => "DS18B20 temperature sensor",
        0x29 => "DS2408 8-channel switch",
        0x2c => "DS2890 digital potentiometer",
        0x2d => "DS2431 1Kb EEPROM",
        0x3a => "DS2413 dual-channel switch",
        0x42 => "DS28EA00 temperature sensor",
        0x43 => "DS28EC20 20Kb EEPROM",
        _ => return None,
    })
}

/// Returns the part name for the family code of a ROM id.
pub fn family_name_of(id: u64) -> Option<&'static str> {
    family_name((id & 0xff) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_codes() {
        assert_eq!(family_name(0x28), Some("DS18B20 temperature sensor"));
        assert_eq!(family_name(0x42), Some("DS28EA00 temperature sensor"));
        assert_eq!(family_name(0xfe), None);
        assert_eq!(
            family_name_of(0x5100_0000_ff2a_5a28),
            Some("DS18B20 temperature sensor")
        );
    }
}
