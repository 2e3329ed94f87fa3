//! Shared value types

/// Serial numbers re-read by a refresh
///
/// `factory_sn` is always empty for devices without a factory serial number
/// property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerialNumbers {
    /// Configurable serial number stored in NVRAM
    pub device_sn: String,
    /// Factory-programmed serial number (Magtek only)
    pub factory_sn: String,
    /// Serial number string from the USB device descriptor
    pub descriptor_sn: String,
}

impl SerialNumbers {
    /// Device serial number, falling back to the descriptor serial number
    pub fn effective(&self) -> &str {
        if self.device_sn.is_empty() {
            &self.descriptor_sn
        } else {
            &self.device_sn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_prefers_device_sn() {
        let serials = SerialNumbers {
            device_sn: "DEV".to_string(),
            factory_sn: "FACTORY".to_string(),
            descriptor_sn: "USB".to_string(),
        };
        assert_eq!(serials.effective(), "DEV");
    }

    #[test]
    fn test_effective_falls_back_to_descriptor() {
        let serials = SerialNumbers {
            descriptor_sn: "USB".to_string(),
            ..SerialNumbers::default()
        };
        assert_eq!(serials.effective(), "USB");
    }
}
