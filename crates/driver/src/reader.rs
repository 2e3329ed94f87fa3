//! Vendor identification and the per-vendor reader variant

use crate::config::DriverConfig;
use crate::{DeviceProtocol, IdTech, Magtek};
use protocol::property::{
    IDTECH_HID_PID, IDTECH_KB_PID, IDTECH_VID, MAGTEK_KB_PID, MAGTEK_MAGNESAFE_HID_PID,
    MAGTEK_SURESWIPE_HID_PID, MAGTEK_VID,
};
use protocol::{ProtocolError, Result, SerialNumbers, Transport};
use std::fmt;
use tracing::{debug, info};

const MAGTEK_PIDS: &[u16] = &[
    MAGTEK_KB_PID,
    MAGTEK_SURESWIPE_HID_PID,
    MAGTEK_MAGNESAFE_HID_PID,
];
const IDTECH_PIDS: &[u16] = &[IDTECH_KB_PID, IDTECH_HID_PID];

/// Protocol family a device speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Magtek,
    IdTech,
    /// Unknown reader; only the descriptor serial number is available
    Generic,
}

impl Vendor {
    pub fn identify(vendor_id: u16, product_id: u16) -> Self {
        match vendor_id {
            MAGTEK_VID if MAGTEK_PIDS.contains(&product_id) => Vendor::Magtek,
            IDTECH_VID if IDTECH_PIDS.contains(&product_id) => Vendor::IdTech,
            _ => Vendor::Generic,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Magtek => write!(f, "Magtek"),
            Vendor::IdTech => write!(f, "IDTech"),
            Vendor::Generic => write!(f, "Generic"),
        }
    }
}

/// Reader without a vendor protocol
pub struct Generic<T> {
    transport: T,
    serials: SerialNumbers,
}

impl<T: Transport> Generic<T> {
    pub fn open(transport: T) -> Result<Self> {
        let mut generic = Self {
            transport,
            serials: SerialNumbers::default(),
        };
        generic.refresh()?;
        Ok(generic)
    }

    pub fn refresh(&mut self) -> Result<SerialNumbers> {
        self.serials = SerialNumbers {
            descriptor_sn: self.transport.serial_number()?,
            ..SerialNumbers::default()
        };
        Ok(self.serials.clone())
    }

    pub fn serial_numbers(&self) -> &SerialNumbers {
        &self.serials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// An opened reader of any supported vendor
pub enum Reader<T> {
    Magtek(Magtek<T>),
    IdTech(IdTech<T>),
    Generic(Generic<T>),
}

impl<T: Transport> Reader<T> {
    /// Open `transport` with the driver for `vendor`
    pub fn open(vendor: Vendor, transport: T, config: &DriverConfig) -> Result<Self> {
        debug!("Opening {} reader", vendor);
        let reader = match vendor {
            Vendor::Magtek => Reader::Magtek(Magtek::open(transport, config.magtek.clone())?),
            Vendor::IdTech => Reader::IdTech(IdTech::open(transport, config.idtech.clone())?),
            Vendor::Generic => Reader::Generic(Generic::open(transport)?),
        };
        info!(
            "{} reader ready, serial {:?}",
            vendor,
            reader.serial_numbers().effective()
        );
        Ok(reader)
    }

    pub fn vendor(&self) -> Vendor {
        match self {
            Reader::Magtek(_) => Vendor::Magtek,
            Reader::IdTech(_) => Vendor::IdTech,
            Reader::Generic(_) => Vendor::Generic,
        }
    }

    pub fn refresh(&mut self) -> Result<SerialNumbers> {
        match self {
            Reader::Magtek(m) => m.refresh(),
            Reader::IdTech(i) => i.refresh(),
            Reader::Generic(g) => g.refresh(),
        }
    }

    pub fn serial_numbers(&self) -> &SerialNumbers {
        match self {
            Reader::Magtek(m) => m.serial_numbers(),
            Reader::IdTech(i) => i.serial_numbers(),
            Reader::Generic(g) => g.serial_numbers(),
        }
    }

    pub fn reset(&mut self) -> Result<()> {
        match self {
            Reader::Magtek(m) => m.reset(),
            Reader::IdTech(i) => i.reset(),
            Reader::Generic(_) => Err(unsupported("reset")),
        }
    }

    pub fn get_device_sn(&mut self) -> Result<String> {
        match self {
            Reader::Magtek(m) => m.get_device_sn(),
            Reader::IdTech(i) => i.get_device_sn(),
            Reader::Generic(_) => Err(unsupported("device serial number")),
        }
    }

    pub fn set_device_sn(&mut self, value: &str) -> Result<()> {
        match self {
            Reader::Magtek(m) => m.set_device_sn(value),
            Reader::IdTech(i) => i.set_device_sn(value),
            Reader::Generic(_) => Err(unsupported("device serial number")),
        }
    }

    pub fn erase_device_sn(&mut self) -> Result<()> {
        match self {
            Reader::Magtek(m) => m.erase_device_sn(),
            Reader::IdTech(i) => i.erase_device_sn(),
            Reader::Generic(_) => Err(unsupported("device serial number")),
        }
    }

    /// Firmware version read at open; empty for generic readers
    pub fn firmware_version(&self) -> &str {
        match self {
            Reader::Magtek(m) => m.firmware_version(),
            Reader::IdTech(i) => i.firmware_version(),
            Reader::Generic(_) => "",
        }
    }

    pub fn software_id(&self) -> &str {
        match self {
            Reader::Magtek(m) => m.software_id(),
            Reader::IdTech(i) => i.software_id(),
            Reader::Generic(_) => "",
        }
    }

    pub fn product_version(&self) -> &str {
        match self {
            Reader::Magtek(m) => m.product_version(),
            Reader::IdTech(i) => i.product_version(),
            Reader::Generic(_) => "",
        }
    }
}

fn unsupported(what: &str) -> ProtocolError {
    ProtocolError::Validation(format!("{} not supported on generic readers", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_known_readers() {
        assert_eq!(Vendor::identify(0x0801, 0x0002), Vendor::Magtek);
        assert_eq!(Vendor::identify(0x0801, 0x0011), Vendor::Magtek);
        assert_eq!(Vendor::identify(0x0ACD, 0x2010), Vendor::IdTech);
        assert_eq!(Vendor::identify(0x0ACD, 0x2030), Vendor::IdTech);
    }

    #[test]
    fn test_identify_unknown_pid_is_generic() {
        assert_eq!(Vendor::identify(0x0801, 0x9999), Vendor::Generic);
        assert_eq!(Vendor::identify(0x046d, 0x2010), Vendor::Generic);
    }
}
