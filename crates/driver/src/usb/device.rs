//! USB device abstraction
//!
//! A [`UsbDevice`] is built from one of three sources, each with its own
//! constructor: an open handle (full driver), a bare `rusb::Device`
//! (descriptor data only), or nothing at all.

use super::transport::{RusbTransport, map_rusb_error};
use crate::config::DriverConfig;
use crate::reader::{Reader, Vendor};
use protocol::Result;
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, UsbContext};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSpeed {
    Low,
    #[default]
    Full,
    High,
    Super,
    SuperPlus,
}

/// Data captured from the device descriptor and string descriptors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub address: u8,
    pub port_number: u8,
    /// Max packet size of the control endpoint
    pub max_packet_size: u8,
    pub usb_version: String,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub speed: DeviceSpeed,
    pub device_version: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl DescriptorInfo {
    /// Read the descriptor; string descriptors are only read when a handle is given
    pub fn read(device: &Device<Context>, handle: Option<&DeviceHandle<Context>>) -> Result<Self> {
        let descriptor = device.device_descriptor().map_err(map_rusb_error)?;
        let (manufacturer, product, serial_number) = handle
            .map(|h| read_string_descriptors(&descriptor, h))
            .unwrap_or((None, None, None));

        Ok(Self {
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
            bus_number: device.bus_number(),
            address: device.address(),
            port_number: device.port_number(),
            max_packet_size: descriptor.max_packet_size(),
            usb_version: format_version(descriptor.usb_version()),
            class: descriptor.class_code(),
            subclass: descriptor.sub_class_code(),
            protocol: descriptor.protocol_code(),
            speed: map_device_speed(device.speed()),
            device_version: format_version(descriptor.device_version()),
            manufacturer,
            product,
            serial_number,
        })
    }

    pub fn vendor(&self) -> Vendor {
        Vendor::identify(self.vendor_id, self.product_id)
    }
}

impl fmt::Display for DescriptorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} (bus {}, address {})",
            self.vendor_id, self.product_id, self.bus_number, self.address
        )?;
        if let Some(product) = &self.product {
            write!(f, " {}", product)?;
        }
        Ok(())
    }
}

/// A card reader as seen by the host
pub enum UsbDevice {
    /// Opened handle with its vendor driver
    Live {
        info: DescriptorInfo,
        reader: Box<Reader<RusbTransport>>,
    },
    /// Descriptor data only; no handle was opened
    Descriptor { info: DescriptorInfo },
    Empty,
}

impl UsbDevice {
    /// Identify the vendor from the descriptor, claim the control interface
    /// and open the matching driver
    pub fn from_handle(handle: DeviceHandle<Context>, config: &DriverConfig) -> Result<Self> {
        let info = DescriptorInfo::read(&handle.device(), Some(&handle))?;
        let vendor = info.vendor();
        debug!("Opening {} as {}", info, vendor);

        let mut transport = RusbTransport::new(handle, config.transfer.timeout());
        if vendor != Vendor::Generic {
            transport.claim_control_interface()?;
        }

        let reader = Reader::open(vendor, transport, config)?;
        info!("Opened {} reader {}", vendor, info);
        Ok(UsbDevice::Live {
            info,
            reader: Box::new(reader),
        })
    }

    pub fn from_descriptor(device: &Device<Context>) -> Result<Self> {
        let info = DescriptorInfo::read(device, None)?;
        Ok(UsbDevice::Descriptor { info })
    }

    pub fn empty() -> Self {
        UsbDevice::Empty
    }

    pub fn info(&self) -> Option<&DescriptorInfo> {
        match self {
            UsbDevice::Live { info, .. } | UsbDevice::Descriptor { info } => Some(info),
            UsbDevice::Empty => None,
        }
    }

    pub fn reader_mut(&mut self) -> Option<&mut Reader<RusbTransport>> {
        match self {
            UsbDevice::Live { reader, .. } => Some(&mut **reader),
            _ => None,
        }
    }
}

/// Attached devices whose VID/PID belongs to a supported reader
pub fn find_readers(context: &Context) -> Result<Vec<Device<Context>>> {
    let devices = context.devices().map_err(map_rusb_error)?;

    let readers: Vec<_> = devices
        .iter()
        .filter(|device| match device.device_descriptor() {
            Ok(desc) => {
                Vendor::identify(desc.vendor_id(), desc.product_id()) != Vendor::Generic
            }
            Err(e) => {
                warn!(
                    "Skipping device on bus {} address {}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                false
            }
        })
        .collect();

    debug!("Found {} card reader(s)", readers.len());
    Ok(readers)
}

fn read_string_descriptors(
    descriptor: &DeviceDescriptor,
    handle: &DeviceHandle<Context>,
) -> (Option<String>, Option<String>, Option<String>) {
    let manufacturer = descriptor
        .manufacturer_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    let product = descriptor
        .product_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    let serial_number = descriptor
        .serial_number_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    (manufacturer, product, serial_number)
}

fn format_version(version: rusb::Version) -> String {
    format!(
        "{}.{}{}",
        version.major(),
        version.minor(),
        version.sub_minor()
    )
}

fn map_device_speed(speed: rusb::Speed) -> DeviceSpeed {
    match speed {
        rusb::Speed::Low => DeviceSpeed::Low,
        rusb::Speed::Full => DeviceSpeed::Full,
        rusb::Speed::High => DeviceSpeed::High,
        rusb::Speed::Super => DeviceSpeed::Super,
        rusb::Speed::SuperPlus => DeviceSpeed::SuperPlus,
        _ => DeviceSpeed::Full,
    }
}
