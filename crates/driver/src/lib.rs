//! Vendor protocol drivers for Magtek and IDTech card readers
//!
//! Each driver wraps a [`protocol::Transport`] and exposes the readers' NVRAM
//! properties through [`DeviceProtocol`]. The drivers are synchronous and
//! assume exclusive use of their transport; when a device is shared between
//! tasks, hand the driver to [`worker::spawn_device_worker`] and talk to it
//! through a [`common::DeviceBridge`].
//!
//! # Example
//!
//! ```
//! use common::test_utils::SimulatedMagtek;
//! use driver::config::MagtekSettings;
//! use driver::{DeviceProtocol, Magtek};
//!
//! let device = SimulatedMagtek::new(60);
//! let settings = MagtekSettings { reset_settle_ms: 0, ..MagtekSettings::default() };
//!
//! let mut reader = Magtek::open(device, settings).unwrap();
//! assert_eq!(reader.buffer_size(), 60);
//!
//! reader.set_device_sn("ABCDEFG").unwrap();
//! assert_eq!(reader.get_device_sn().unwrap(), "ABCDEFG");
//! ```

pub mod config;
pub mod idtech;
pub mod magtek;
pub mod reader;
pub mod usb;
pub mod worker;

pub use config::DriverConfig;
pub use idtech::IdTech;
pub use magtek::Magtek;
pub use reader::{Reader, Vendor};
pub use worker::spawn_device_worker;

use protocol::{BeepSetting, DeviceState, ProtocolError, Result, SerialNumbers};
use std::fmt;

/// Property get/set operations shared by the vendor drivers
pub trait DeviceProtocol {
    /// Vendor-specific NVRAM property identifier
    type Property: Copy + fmt::Debug + fmt::Display + Send + 'static;

    fn get_property(&mut self, property: Self::Property) -> Result<String>;

    fn set_property(&mut self, property: Self::Property, value: &str) -> Result<()>;

    /// Vendor reset command
    fn reset(&mut self) -> Result<()>;

    /// Re-read the serial numbers and update the cached copy
    fn refresh(&mut self) -> Result<SerialNumbers>;

    /// Serial numbers from the last refresh
    fn serial_numbers(&self) -> &SerialNumbers;

    /// Reader state query (Magtek)
    fn get_state(&mut self) -> Result<DeviceState> {
        Err(unsupported("reader state query"))
    }

    /// Copy a factory serial number prefix into the device serial number (Magtek)
    fn copy_factory_sn(&mut self, _n: usize) -> Result<()> {
        Err(unsupported("factory serial number"))
    }

    /// Beep configuration (IDTech)
    fn set_beep(&mut self, _beep: BeepSetting) -> Result<()> {
        Err(unsupported("beep setting"))
    }
}

fn unsupported(what: &str) -> ProtocolError {
    ProtocolError::Validation(format!("{} not supported by this reader", what))
}
