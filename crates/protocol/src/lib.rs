//! Wire layer for Magtek and IDTech card readers
//!
//! This crate holds everything about the vendor command protocols that does
//! not need a device: the transport capability the drivers are written
//! against, the IDTech frame codec, response code and property tables, the
//! Magtek reader-state decoder, and the shared error type.
//!
//! # Example
//!
//! ```
//! use protocol::frame::{chunks, lrc, wrap};
//!
//! // Review setting 0x4e (device serial number)
//! let frame = wrap(&[0x52, 0x4e]);
//! assert_eq!(lrc(&frame[..frame.len() - 1]), frame[frame.len() - 1]);
//!
//! // One 8-byte feature report, zero-padded
//! let pieces: Vec<_> = chunks(&frame, 8).collect();
//! assert_eq!(pieces, vec![vec![0x02, 0x52, 0x4e, 0x03, 0x1d, 0, 0, 0]]);
//! ```

pub mod error;
pub mod frame;
pub mod property;
pub mod response;
pub mod state;
pub mod transport;
pub mod types;

pub use error::{ErrorKind, ProtocolError, Result};
pub use property::{BeepSetting, IdTechProperty, MagtekProperty};
pub use response::{IdTechResponse, MagtekResponse, ResponseCode};
pub use state::DeviceState;
pub use transport::{ControlSetup, FeatureReports, Transport, TransportError};
pub use types::SerialNumbers;
