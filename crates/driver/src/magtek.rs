//! Magtek protocol driver
//!
//! Magtek readers take one fixed-size feature report per command and answer
//! in place: a SET_REPORT carrying the request, then a GET_REPORT into the
//! same buffer.
//!
//! ```text
//! request:  [opcode][len][property][value ...][0 padding]
//! response: [result][len][value ...][0 padding]
//! ```
//!
//! The buffer size is not advertised by the device. Sending the wrong size
//! stalls the pipe, so it is found by trial at open time and then used for
//! every command.

use crate::DeviceProtocol;
use crate::config::MagtekSettings;
use protocol::property::magtek_command;
use protocol::{
    DeviceState, FeatureReports, MagtekProperty, MagtekResponse, ProtocolError, ResponseCode,
    Result, SerialNumbers, Transport,
};
use tracing::{debug, info, warn};

/// Find the control buffer size a Magtek device accepts
///
/// Each candidate gets one get-software-ID exchange; the first size for which
/// both transfers succeed wins. Result codes are only checked when
/// `validate_response` is set.
pub fn negotiate_buffer_size<T: Transport + ?Sized>(
    transport: &mut T,
    candidates: &[usize],
    validate_response: bool,
) -> Result<usize> {
    for &size in candidates {
        if size < 3 {
            debug!("Skipping buffer size {}: too small for a request", size);
            continue;
        }

        let mut buf = vec![0u8; size];
        buf[..3].copy_from_slice(&[
            magtek_command::GET_PROPERTY,
            0x01,
            MagtekProperty::SoftwareId.id(),
        ]);

        if let Err(e) = transport.set_report(&mut buf) {
            debug!("Buffer size {} rejected on SET_REPORT: {}", size, e);
            continue;
        }
        if let Err(e) = transport.get_report(&mut buf) {
            debug!("Buffer size {} rejected on GET_REPORT: {}", size, e);
            continue;
        }
        if validate_response {
            let rc = MagtekResponse::from_byte(buf[0]);
            if !rc.is_success() {
                debug!("Buffer size {} answered {}", size, rc);
                continue;
            }
        }

        info!("Negotiated Magtek buffer size: {} bytes", size);
        return Ok(size);
    }

    Err(ProtocolError::Negotiation {
        candidates: candidates.to_vec(),
    })
}

/// Magtek reader driver
pub struct Magtek<T> {
    transport: T,
    settings: MagtekSettings,
    buffer_size: usize,
    software_id: String,
    product_version: String,
    serials: SerialNumbers,
}

impl<T: Transport> Magtek<T> {
    /// Negotiate the buffer size and read the device identity
    pub fn open(mut transport: T, settings: MagtekSettings) -> Result<Self> {
        let buffer_size = negotiate_buffer_size(
            &mut transport,
            &settings.buffer_sizes,
            settings.validate_negotiation,
        )?;

        let mut magtek = Self::with_buffer_size(transport, buffer_size, settings);
        magtek.software_id = magtek.get_software_id()?;
        magtek.product_version = magtek.get_product_version()?;
        magtek.refresh()?;

        info!(
            "Opened Magtek reader: software ID {:?}, product version {:?}",
            magtek.software_id, magtek.product_version
        );
        Ok(magtek)
    }

    /// Wrap a device whose buffer size is already known; no I/O
    pub fn with_buffer_size(transport: T, buffer_size: usize, settings: MagtekSettings) -> Self {
        Self {
            transport,
            settings,
            buffer_size,
            software_id: String::new(),
            product_version: String::new(),
            serials: SerialNumbers::default(),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Software ID read at open
    pub fn software_id(&self) -> &str {
        &self.software_id
    }

    /// Magtek reports its software ID as the firmware version
    pub fn firmware_version(&self) -> &str {
        &self.software_id
    }

    /// Product version read at open
    pub fn product_version(&self) -> &str {
        &self.product_version
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn get_device_sn(&mut self) -> Result<String> {
        self.get_property(MagtekProperty::DeviceSerialNumber)
    }

    pub fn set_device_sn(&mut self, value: &str) -> Result<()> {
        self.set_property(MagtekProperty::DeviceSerialNumber, value)
    }

    pub fn erase_device_sn(&mut self) -> Result<()> {
        self.set_property(MagtekProperty::DeviceSerialNumber, "")
    }

    /// Factory serial number; a single stray byte reads as empty
    pub fn get_factory_sn(&mut self) -> Result<String> {
        let value = self.get_property(MagtekProperty::FactorySerialNumber)?;
        Ok(if value.len() <= 1 { String::new() } else { value })
    }

    /// Program the factory serial number
    ///
    /// The device refuses (result 0x07) if one is already present.
    pub fn set_factory_sn(&mut self, value: &str) -> Result<()> {
        self.set_property(MagtekProperty::FactorySerialNumber, value)
    }

    /// Copy the first `n` characters of the factory serial number into the
    /// device serial number
    pub fn copy_factory_sn(&mut self, n: usize) -> Result<()> {
        let factory_sn = self.get_factory_sn()?;
        if factory_sn.is_empty() {
            return Err(ProtocolError::Validation(
                "no factory serial number".to_string(),
            ));
        }

        let value: String = factory_sn.chars().take(n).collect();
        debug!("Copying factory serial number prefix {:?}", value);
        self.set_device_sn(&value)
    }

    /// `copy_factory_sn` with the configured default length
    pub fn set_default_sn(&mut self) -> Result<()> {
        self.copy_factory_sn(self.settings.default_sn_length)
    }

    pub fn get_software_id(&mut self) -> Result<String> {
        self.get_property(MagtekProperty::SoftwareId)
    }

    /// Product version; a single stray byte reads as empty
    pub fn get_product_version(&mut self) -> Result<String> {
        let value = self.get_property(MagtekProperty::ProductVersion)?;
        Ok(if value.len() <= 1 { String::new() } else { value })
    }

    /// Query the reader state and decode it
    pub fn get_state(&mut self) -> Result<DeviceState> {
        let value = self.command(magtek_command::GET_STATE, &[])?;
        match value.as_slice() {
            [state, antecedent, ..] => Ok(DeviceState::new(*state, *antecedent)),
            _ => Err(ProtocolError::Malformed(format!(
                "reader state needs 2 bytes, got {}",
                value.len()
            ))),
        }
    }

    /// Build a request buffer of exactly the negotiated size
    fn build_request(&self, opcode: u8, payload: &[u8]) -> Result<Vec<u8>> {
        let needed = 2 + payload.len();
        if needed > self.buffer_size || payload.len() > u8::MAX as usize {
            return Err(ProtocolError::Validation(format!(
                "request needs {} bytes, buffer is {}",
                needed, self.buffer_size
            )));
        }

        let mut buf = vec![0u8; self.buffer_size];
        buf[0] = opcode;
        buf[1] = payload.len() as u8;
        buf[2..needed].copy_from_slice(payload);
        Ok(buf)
    }

    /// One SET_REPORT / GET_REPORT exchange; returns the response value
    fn command(&mut self, opcode: u8, payload: &[u8]) -> Result<Vec<u8>> {
        let mut buf = self.build_request(opcode, payload)?;

        self.transport.set_report(&mut buf)?;
        self.transport.get_report(&mut buf)?;

        let rc = MagtekResponse::from_byte(buf[0]);
        if !rc.is_success() {
            warn!("Magtek command {:#04x} failed: {}", opcode, rc);
            return Err(ProtocolError::Response {
                code: rc.byte(),
                description: rc.description(),
                payload: Vec::new(),
            });
        }

        let len = buf[1] as usize;
        if len == 0 {
            return Ok(Vec::new());
        }
        match buf.get(2..2 + len) {
            Some(value) => Ok(value.to_vec()),
            None => Err(ProtocolError::Malformed(format!(
                "response length {} exceeds buffer size {}",
                len, self.buffer_size
            ))),
        }
    }
}

impl<T: Transport> DeviceProtocol for Magtek<T> {
    type Property = MagtekProperty;

    fn get_property(&mut self, property: MagtekProperty) -> Result<String> {
        let value = self.command(magtek_command::GET_PROPERTY, &[property.id()])?;
        debug!("Read {}: {} bytes", property, value.len());
        Ok(String::from_utf8_lossy(&value).into_owned())
    }

    /// Write a property, then refresh the cached serial numbers
    ///
    /// A refresh failure is returned, but the write has already happened.
    fn set_property(&mut self, property: MagtekProperty, value: &str) -> Result<()> {
        let mut payload = Vec::with_capacity(1 + value.len());
        payload.push(property.id());
        payload.extend_from_slice(value.as_bytes());

        self.command(magtek_command::SET_PROPERTY, &payload)?;
        info!("Set {} to {:?}", property, value);

        if let Err(e) = self.refresh() {
            warn!("Refresh after setting {} failed: {}", property, e);
            return Err(e);
        }
        Ok(())
    }

    /// Vendor reset followed by the re-enumeration settle delay
    fn reset(&mut self) -> Result<()> {
        self.command(magtek_command::RESET, &[])?;
        info!(
            "Magtek reset accepted, settling for {:?}",
            self.settings.reset_settle()
        );
        std::thread::sleep(self.settings.reset_settle());
        Ok(())
    }

    fn refresh(&mut self) -> Result<SerialNumbers> {
        let device_sn = self.get_device_sn()?;
        let factory_sn = self.get_factory_sn()?;
        let descriptor_sn = self.transport.serial_number()?;

        self.serials = SerialNumbers {
            device_sn,
            factory_sn,
            descriptor_sn,
        };
        debug!("Refreshed Magtek serial numbers: {:?}", self.serials);
        Ok(self.serials.clone())
    }

    fn serial_numbers(&self) -> &SerialNumbers {
        &self.serials
    }

    fn get_state(&mut self) -> Result<DeviceState> {
        Magtek::get_state(self)
    }

    fn copy_factory_sn(&mut self, n: usize) -> Result<()> {
        Magtek::copy_factory_sn(self, n)
    }
}
