//! IDTech protocol driver
//!
//! SecureMag readers take framed commands split into 8-byte feature reports
//! and answer through a series of GET_REPORT polls:
//!
//! ```text
//! review setting:  <STX> 'R' <id> <ETX> <LRC>
//!     response:    <ACK> <STX> [<id> <len>] <value> <ETX> <LRC>
//! send setting:    <STX> 'S' <id> <len> <value> <ETX> <LRC>
//!     response:    <ACK> | <NAK>
//! ```
//!
//! Whether a review reply carries the `<id> <len>` prefix varies between
//! firmware revisions; see [`strip_property_prefix`].

use crate::DeviceProtocol;
use crate::config::IdTechSettings;
use protocol::frame::{self, chunks, extract_payload, wrap};
use protocol::property::idtech_command;
use protocol::{
    BeepSetting, FeatureReports, IdTechProperty, IdTechResponse, ProtocolError, ResponseCode,
    Result, SerialNumbers, Transport,
};
use tracing::{debug, info, warn};

/// Drop the `<id> <len>` prefix from a review-setting payload when present
///
/// The prefix is assumed present when the payload is longer than two bytes
/// and starts with the requested ID. A value that genuinely begins with its
/// own ID byte is indistinguishable and loses its first two bytes.
pub fn strip_property_prefix(payload: &[u8], id: u8) -> &[u8] {
    if payload.len() > 2 && payload[0] == id {
        &payload[2..]
    } else {
        payload
    }
}

/// IDTech reader driver
pub struct IdTech<T> {
    transport: T,
    settings: IdTechSettings,
    firmware_version: String,
    product_version: String,
    serials: SerialNumbers,
}

impl<T: Transport> IdTech<T> {
    /// Read the device identity and serial numbers
    pub fn open(transport: T, settings: IdTechSettings) -> Result<Self> {
        let mut idtech = Self::new(transport, settings);
        idtech.firmware_version = idtech.get_firmware_version()?;
        idtech.product_version = idtech.get_product_version()?;
        idtech.refresh()?;

        info!(
            "Opened IDTech reader: firmware {:?}, product version {:?}",
            idtech.firmware_version, idtech.product_version
        );
        Ok(idtech)
    }

    /// Wrap a transport without talking to the device
    pub fn new(transport: T, settings: IdTechSettings) -> Self {
        Self {
            transport,
            settings,
            firmware_version: String::new(),
            product_version: String::new(),
            serials: SerialNumbers::default(),
        }
    }

    /// Firmware version read at open
    pub fn firmware_version(&self) -> &str {
        &self.firmware_version
    }

    /// IDTech has no separate software ID; the firmware version stands in
    pub fn software_id(&self) -> &str {
        &self.firmware_version
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
        self.get_property(IdTechProperty::DeviceSerialNumber)
    }

    pub fn set_device_sn(&mut self, value: &str) -> Result<()> {
        self.set_property(IdTechProperty::DeviceSerialNumber, value)
    }

    pub fn erase_device_sn(&mut self) -> Result<()> {
        self.set_property(IdTechProperty::DeviceSerialNumber, "")
    }

    pub fn get_firmware_version(&mut self) -> Result<String> {
        self.get_property(IdTechProperty::FirmwareVersion)
    }

    pub fn set_beep(&mut self, beep: BeepSetting) -> Result<()> {
        self.set_property(IdTechProperty::Beep, beep.value())
    }

    pub fn get_product_version(&mut self) -> Result<String> {
        let payload = self.send_command(&[idtech_command::VERSION])?;
        Ok(text(&payload))
    }

    /// Frame, transmit, settle, poll, and validate one command
    ///
    /// On a non-success result code the extracted payload is still returned
    /// inside [`ProtocolError::Response`].
    pub fn send_command(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        let chunk_size = self.settings.chunk_size;
        if chunk_size == 0 {
            return Err(ProtocolError::Validation(
                "chunk size must be greater than 0".to_string(),
            ));
        }

        let framed = wrap(command);
        let pieces = chunks(&framed, chunk_size);
        debug!(
            "Sending IDTech command {:02x?} in {} chunk(s)",
            command,
            pieces.len()
        );
        for mut chunk in pieces {
            self.transport.set_report(&mut chunk)?;
        }

        std::thread::sleep(self.settings.settle());

        let response = self.collect(chunk_size)?;
        let response = trim_trailing_nulls(&response);
        if response.is_empty() {
            return Err(ProtocolError::NoResponse);
        }

        if frame::verify_response_lrc(response) == Some(false) {
            warn!("IDTech response LRC mismatch: {:02x?}", response);
        }

        let rc = IdTechResponse::from_byte(response[0]);
        let payload = extract_payload(response).to_vec();

        if !rc.is_success() {
            warn!("IDTech command {:02x?} failed: {}", command, rc);
            return Err(ProtocolError::Response {
                code: rc.byte(),
                description: rc.description(),
                payload,
            });
        }
        Ok(payload)
    }

    /// Poll GET_REPORT until the device returns an empty read
    fn collect(&mut self, chunk_size: usize) -> Result<Vec<u8>> {
        let mut response = Vec::new();
        let mut buf = vec![0u8; chunk_size];

        loop {
            buf.fill(0);
            let n = self.transport.get_report(&mut buf)?;
            if n == 0 {
                break;
            }
            response.extend_from_slice(&buf[..n.min(chunk_size)]);

            if response.len() > self.settings.max_response_len {
                return Err(ProtocolError::Malformed(format!(
                    "response exceeded {} bytes without terminating",
                    self.settings.max_response_len
                )));
            }
        }

        debug!("Collected {} response bytes", response.len());
        Ok(response)
    }
}

impl<T: Transport> DeviceProtocol for IdTech<T> {
    type Property = IdTechProperty;

    fn get_property(&mut self, property: IdTechProperty) -> Result<String> {
        let id = property.id();
        let payload = self.send_command(&[idtech_command::REVIEW_SETTING, id])?;
        let value = text(strip_property_prefix(&payload, id));
        debug!("Read {}: {:?}", property, value);
        Ok(value)
    }

    fn set_property(&mut self, property: IdTechProperty, value: &str) -> Result<()> {
        let len = u8::try_from(value.len()).map_err(|_| {
            ProtocolError::Validation(format!(
                "value for {} is {} bytes, limit is 255",
                property,
                value.len()
            ))
        })?;

        let mut command = Vec::with_capacity(3 + value.len());
        command.extend_from_slice(&[idtech_command::SEND_SETTING, property.id(), len]);
        command.extend_from_slice(value.as_bytes());

        self.send_command(&command)?;
        info!("Set {} to {:?}", property, value);
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.send_command(&[idtech_command::RESET])?;
        info!("IDTech reset accepted");
        Ok(())
    }

    fn refresh(&mut self) -> Result<SerialNumbers> {
        let device_sn = self.get_device_sn()?;
        let descriptor_sn = self.transport.serial_number()?;

        self.serials = SerialNumbers {
            device_sn,
            factory_sn: String::new(),
            descriptor_sn,
        };
        debug!("Refreshed IDTech serial numbers: {:?}", self.serials);
        Ok(self.serials.clone())
    }

    fn serial_numbers(&self) -> &SerialNumbers {
        &self.serials
    }

    fn set_beep(&mut self, beep: BeepSetting) -> Result<()> {
        IdTech::set_beep(self, beep)
    }
}

fn trim_trailing_nulls(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}
