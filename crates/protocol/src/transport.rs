//! Transport capability
//!
//! The protocol drivers never touch a USB stack directly. They talk to a
//! [`Transport`], which performs one blocking control transfer at a time and
//! reports the descriptor serial number. The host supplies the implementation
//! (`driver::usb::RusbTransport` for real hardware, the simulated devices in
//! `common::test_utils` for tests).
//!
//! Every vendor command in this workspace travels as a HID feature report:
//!
//! ```text
//! SET_REPORT  bmRequestType=0x21 bRequest=0x09 wValue=0x0300 wIndex=0x0000
//! GET_REPORT  bmRequestType=0xA1 bRequest=0x01 wValue=0x0300 wIndex=0x0000
//! ```

use std::fmt;
use thiserror::Error;

/// HID class request: GET_REPORT
pub const REQUEST_GET_REPORT: u8 = 0x01;
/// HID class request: SET_REPORT
pub const REQUEST_SET_REPORT: u8 = 0x09;

/// wValue selecting a feature report (report type 3, report ID 0)
pub const FEATURE_REPORT: u16 = 0x0300;
/// wIndex of the control interface
pub const CONTROL_INTERFACE: u16 = 0x0000;

/// Transfer direction (bit 7 of bmRequestType)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host to device
    Out,
    /// Device to host
    In,
}

impl Direction {
    pub fn bits(self) -> u8 {
        match self {
            Direction::Out => 0x00,
            Direction::In => 0x80,
        }
    }
}

/// Request type (bits 5..6 of bmRequestType)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Standard,
    Class,
    Vendor,
}

impl RequestType {
    pub fn bits(self) -> u8 {
        match self {
            RequestType::Standard => 0x00,
            RequestType::Class => 0x20,
            RequestType::Vendor => 0x40,
        }
    }
}

/// Recipient (bits 0..4 of bmRequestType)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
}

impl Recipient {
    pub fn bits(self) -> u8 {
        match self {
            Recipient::Device => 0x00,
            Recipient::Interface => 0x01,
            Recipient::Endpoint => 0x02,
            Recipient::Other => 0x03,
        }
    }
}

/// Setup stage of a control transfer, minus the data length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlSetup {
    pub direction: Direction,
    pub request_type: RequestType,
    pub recipient: Recipient,
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

impl ControlSetup {
    /// HID SET_REPORT carrying a feature report to the control interface
    pub const fn set_report() -> Self {
        Self {
            direction: Direction::Out,
            request_type: RequestType::Class,
            recipient: Recipient::Interface,
            request: REQUEST_SET_REPORT,
            value: FEATURE_REPORT,
            index: CONTROL_INTERFACE,
        }
    }

    /// HID GET_REPORT reading a feature report from the control interface
    pub const fn get_report() -> Self {
        Self {
            direction: Direction::In,
            request_type: RequestType::Class,
            recipient: Recipient::Interface,
            request: REQUEST_GET_REPORT,
            value: FEATURE_REPORT,
            index: CONTROL_INTERFACE,
        }
    }

    /// Packed bmRequestType byte
    pub fn request_type_byte(&self) -> u8 {
        self.direction.bits() | self.request_type.bits() | self.recipient.bits()
    }
}

/// Errors raised by the transport itself
///
/// These pass through the drivers verbatim and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Transfer timed out
    #[error("transfer timed out")]
    Timeout,
    /// Endpoint stalled, usually a buffer of the wrong size
    #[error("pipe error (endpoint stalled)")]
    Pipe,
    /// Device was disconnected
    #[error("device disconnected")]
    NoDevice,
    /// Device or entity not found
    #[error("entity not found")]
    NotFound,
    /// Device is busy
    #[error("device busy")]
    Busy,
    /// Device sent more data than requested
    #[error("overflow")]
    Overflow,
    /// I/O error
    #[error("input/output error")]
    Io,
    /// Invalid parameter
    #[error("invalid parameter")]
    InvalidParam,
    /// Access denied (permissions)
    #[error("access denied")]
    Access,
    /// Other error with message
    #[error("{message}")]
    Other { message: String },
}

/// A single-handle, blocking control-transfer capability
///
/// Implementations perform exactly one transfer per call. For `Direction::Out`
/// the buffer is sent as-is; for `Direction::In` the device writes into it and
/// the return value is the number of bytes it wrote.
pub trait Transport {
    fn control(&mut self, setup: ControlSetup, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Serial number string from the USB device descriptor
    fn serial_number(&mut self) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn control(&mut self, setup: ControlSetup, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).control(setup, buf)
    }

    fn serial_number(&mut self) -> Result<String, TransportError> {
        (**self).serial_number()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn control(&mut self, setup: ControlSetup, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).control(setup, buf)
    }

    fn serial_number(&mut self) -> Result<String, TransportError> {
        (**self).serial_number()
    }
}

/// Feature-report helpers available on every [`Transport`]
pub trait FeatureReports: Transport {
    /// Send `buf` as a feature report
    fn set_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.control(ControlSetup::set_report(), buf)
    }

    /// Read a feature report into `buf`
    fn get_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.control(ControlSetup::get_report(), buf)
    }
}

impl<T: Transport + ?Sized> FeatureReports for T {}

impl fmt::Display for ControlSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bmRequestType={:#04x} bRequest={:#04x} wValue={:#06x} wIndex={:#06x}",
            self.request_type_byte(),
            self.request,
            self.value,
            self.index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_report_request_type() {
        let setup = ControlSetup::set_report();
        assert_eq!(setup.request_type_byte(), 0x21);
        assert_eq!(setup.request, 0x09);
        assert_eq!(setup.value, 0x0300);
        assert_eq!(setup.index, 0x0000);
    }

    #[test]
    fn test_get_report_request_type() {
        let setup = ControlSetup::get_report();
        assert_eq!(setup.request_type_byte(), 0xA1);
        assert_eq!(setup.request, 0x01);
    }

    #[test]
    fn test_vendor_endpoint_bits() {
        let setup = ControlSetup {
            direction: Direction::In,
            request_type: RequestType::Vendor,
            recipient: Recipient::Endpoint,
            request: 0,
            value: 0,
            index: 0,
        };
        assert_eq!(setup.request_type_byte(), 0xC2);
    }

    #[test]
    fn test_setup_display() {
        let text = ControlSetup::set_report().to_string();
        assert!(text.contains("bmRequestType=0x21"));
        assert!(text.contains("wValue=0x0300"));
    }
}
