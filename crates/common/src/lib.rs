//! Common utilities for hid-nvram
//!
//! This crate provides shared functionality for the driver crate and its
//! consumers: logging setup, error handling, the channel bridge that
//! serializes access to a device handle, and simulated devices for tests.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;

pub use channel::{DeviceBridge, DeviceCommand, DeviceWorker, create_device_bridge};
pub use error::{Error, Result};
pub use logging::setup_logging;
