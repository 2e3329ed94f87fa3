//! rusb-backed transport
//!
//! Executes the drivers' control transfers on a libusb device handle and maps
//! rusb errors onto [`TransportError`].

use protocol::transport::Direction;
use protocol::{ControlSetup, Transport, TransportError};
use rusb::{Context, DeviceHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Interface the HID feature reports are addressed to
const CONTROL_INTERFACE: u8 = 0;

/// [`Transport`] over an open rusb device handle
pub struct RusbTransport {
    handle: DeviceHandle<Context>,
    timeout: Duration,
    claimed: bool,
    detached_kernel_driver: bool,
}

impl RusbTransport {
    pub fn new(handle: DeviceHandle<Context>, timeout: Duration) -> Self {
        Self {
            handle,
            timeout,
            claimed: false,
            detached_kernel_driver: false,
        }
    }

    /// Detach the kernel HID driver (if bound) and claim the control interface
    pub fn claim_control_interface(&mut self) -> Result<(), TransportError> {
        match self.handle.kernel_driver_active(CONTROL_INTERFACE) {
            Ok(true) => {
                debug!(
                    "Detaching kernel driver from interface {}",
                    CONTROL_INTERFACE
                );
                self.handle
                    .detach_kernel_driver(CONTROL_INTERFACE)
                    .map_err(map_rusb_error)?;
                self.detached_kernel_driver = true;
            }
            Ok(false) => {
                debug!("No kernel driver active on interface {}", CONTROL_INTERFACE);
            }
            Err(e) => {
                // Not supported on every platform
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    CONTROL_INTERFACE, e
                );
            }
        }

        self.handle
            .claim_interface(CONTROL_INTERFACE)
            .map_err(|e| {
                warn!("Failed to claim interface {}: {}", CONTROL_INTERFACE, e);
                map_rusb_error(e)
            })?;
        self.claimed = true;
        debug!("Claimed interface {}", CONTROL_INTERFACE);
        Ok(())
    }

    pub fn handle(&self) -> &DeviceHandle<Context> {
        &self.handle
    }
}

impl Drop for RusbTransport {
    fn drop(&mut self) {
        if self.claimed {
            let _ = self.handle.release_interface(CONTROL_INTERFACE);
        }
        if !self.detached_kernel_driver {
            return;
        }
        if let Err(e) = self.handle.attach_kernel_driver(CONTROL_INTERFACE) {
            debug!(
                "Could not reattach kernel driver to interface {}: {}",
                CONTROL_INTERFACE, e
            );
        }
    }
}

impl Transport for RusbTransport {
    fn control(&mut self, setup: ControlSetup, buf: &mut [u8]) -> Result<usize, TransportError> {
        debug!("Control transfer: {}, data_len={}", setup, buf.len());

        let request_type = setup.request_type_byte();
        let result = match setup.direction {
            Direction::In => self.handle.read_control(
                request_type,
                setup.request,
                setup.value,
                setup.index,
                buf,
                self.timeout,
            ),
            Direction::Out => self.handle.write_control(
                request_type,
                setup.request,
                setup.value,
                setup.index,
                buf,
                self.timeout,
            ),
        };

        match result {
            Ok(len) => {
                debug!("Control transfer succeeded: {} bytes", len);
                Ok(len)
            }
            Err(e) => {
                warn!("Control transfer failed: {}", e);
                Err(map_rusb_error(e))
            }
        }
    }

    fn serial_number(&mut self) -> Result<String, TransportError> {
        let descriptor = self
            .handle
            .device()
            .device_descriptor()
            .map_err(map_rusb_error)?;

        if descriptor.serial_number_string_index().is_none() {
            return Ok(String::new());
        }
        self.handle
            .read_serial_number_string_ascii(&descriptor)
            .map_err(map_rusb_error)
    }
}

/// Map rusb::Error to TransportError
pub fn map_rusb_error(err: rusb::Error) -> TransportError {
    match err {
        rusb::Error::Timeout => TransportError::Timeout,
        rusb::Error::Pipe => TransportError::Pipe,
        rusb::Error::NoDevice => TransportError::NoDevice,
        rusb::Error::NotFound => TransportError::NotFound,
        rusb::Error::Busy => TransportError::Busy,
        rusb::Error::Overflow => TransportError::Overflow,
        rusb::Error::Io => TransportError::Io,
        rusb::Error::InvalidParam => TransportError::InvalidParam,
        rusb::Error::Access => TransportError::Access,
        _ => TransportError::Other {
            message: err.to_string(),
        },
    }
}
