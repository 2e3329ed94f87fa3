//! NVRAM property identifiers, vendor opcodes and USB IDs

use std::fmt;

/// Magtek vendor ID
pub const MAGTEK_VID: u16 = 0x0801;
/// Magtek SureSwipe / MagneSafe in keyboard emulation mode
pub const MAGTEK_KB_PID: u16 = 0x0001;
/// Magtek SureSwipe in HID mode
pub const MAGTEK_SURESWIPE_HID_PID: u16 = 0x0002;
/// Magtek MagneSafe in HID mode
pub const MAGTEK_MAGNESAFE_HID_PID: u16 = 0x0011;

/// IDTech vendor ID
pub const IDTECH_VID: u16 = 0x0ACD;
/// IDTech SecureMag in keyboard emulation mode
pub const IDTECH_KB_PID: u16 = 0x2030;
/// IDTech SecureMag in HID mode
pub const IDTECH_HID_PID: u16 = 0x2010;

/// Magtek command opcodes (byte 0 of a request)
pub mod magtek_command {
    pub const GET_PROPERTY: u8 = 0x00;
    pub const SET_PROPERTY: u8 = 0x01;
    pub const RESET: u8 = 0x02;
    pub const GET_STATE: u8 = 0x14;
}

/// IDTech command bytes (first byte inside the frame)
pub mod idtech_command {
    /// `R`: review a setting
    pub const REVIEW_SETTING: u8 = 0x52;
    /// `S`: send a setting
    pub const SEND_SETTING: u8 = 0x53;
    pub const VERSION: u8 = 0x39;
    pub const RESET: u8 = 0x49;
}

/// Magtek NVRAM property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagtekProperty {
    SoftwareId,
    DeviceSerialNumber,
    FactorySerialNumber,
    ProductVersion,
}

impl MagtekProperty {
    pub fn id(self) -> u8 {
        match self {
            MagtekProperty::SoftwareId => 0x00,
            MagtekProperty::DeviceSerialNumber => 0x01,
            MagtekProperty::FactorySerialNumber => 0x03,
            MagtekProperty::ProductVersion => 0x04,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MagtekProperty::SoftwareId => "software ID",
            MagtekProperty::DeviceSerialNumber => "device serial number",
            MagtekProperty::FactorySerialNumber => "factory serial number",
            MagtekProperty::ProductVersion => "product version",
        }
    }
}

/// IDTech NVRAM setting (function ID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdTechProperty {
    Beep,
    FirmwareVersion,
    DeviceSerialNumber,
}

impl IdTechProperty {
    pub fn id(self) -> u8 {
        match self {
            IdTechProperty::Beep => 0x11,
            IdTechProperty::FirmwareVersion => 0x22,
            IdTechProperty::DeviceSerialNumber => 0x4e,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IdTechProperty::Beep => "beep",
            IdTechProperty::FirmwareVersion => "firmware version",
            IdTechProperty::DeviceSerialNumber => "device serial number",
        }
    }
}

impl fmt::Display for MagtekProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04x})", self.name(), self.id())
    }
}

impl fmt::Display for IdTechProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04x})", self.name(), self.id())
    }
}

/// IDTech beep setting values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeepSetting {
    None,
    LowLong,
    HighLong,
    HighShort,
    LowShort,
}

impl BeepSetting {
    /// ASCII value stored in NVRAM
    pub fn value(self) -> &'static str {
        match self {
            BeepSetting::None => "0",
            BeepSetting::LowLong => "1",
            BeepSetting::HighLong => "2",
            BeepSetting::HighShort => "3",
            BeepSetting::LowShort => "4",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_magtek_property_ids_distinct() {
        let magtek = [
            MagtekProperty::SoftwareId,
            MagtekProperty::DeviceSerialNumber,
            MagtekProperty::FactorySerialNumber,
            MagtekProperty::ProductVersion,
        ];
        let ids: HashSet<u8> = magtek.iter().map(|p| p.id()).collect();
        assert_eq!(ids.len(), magtek.len());
    }

    #[test]
    fn test_idtech_property_ids_distinct() {
        let idtech = [
            IdTechProperty::Beep,
            IdTechProperty::FirmwareVersion,
            IdTechProperty::DeviceSerialNumber,
        ];
        let ids: HashSet<u8> = idtech.iter().map(|p| p.id()).collect();
        assert_eq!(ids.len(), idtech.len());
    }

    #[test]
    fn test_property_display() {
        assert_eq!(
            IdTechProperty::DeviceSerialNumber.to_string(),
            "device serial number (0x4e)"
        );
    }
}
