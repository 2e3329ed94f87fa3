//! USB host integration
//!
//! [`RusbTransport`] executes the drivers' control transfers through libusb;
//! [`UsbDevice`] opens an attached reader with the driver its VID/PID calls for.

pub mod device;
pub mod transport;

pub use device::{DescriptorInfo, DeviceSpeed, UsbDevice, find_readers};
pub use transport::{RusbTransport, map_rusb_error};
