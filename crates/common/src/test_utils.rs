//! Test utilities for hid-nvram
//!
//! Simulated readers implementing [`Transport`], so the drivers can be
//! exercised without hardware.
//!
//! - [`SimulatedMagtek`] accepts exactly one buffer size and answers the
//!   single-shot request/response protocol from an in-memory NVRAM.
//! - [`SimulatedIdTech`] reassembles 8-byte chunks, checks the frame LRC and
//!   queues a framed reply for the polling reads.
//! - [`ScriptedTransport`] replays canned GET_REPORT replies and records
//!   everything it was sent.
//!
//! # Example
//!
//! ```
//! use common::test_utils::SimulatedMagtek;
//! use protocol::{FeatureReports, MagtekProperty};
//!
//! let mut device = SimulatedMagtek::new(24).with_property(MagtekProperty::DeviceSerialNumber, "ABC");
//! let mut buf = vec![0u8; 24];
//! buf[..3].copy_from_slice(&[0x00, 0x01, 0x01]);
//! device.set_report(&mut buf).unwrap();
//! device.get_report(&mut buf).unwrap();
//! assert_eq!(&buf[..5], &[0x00, 0x03, b'A', b'B', b'C']);
//! ```

use protocol::frame::{ETX, STX, lrc, wrap};
use protocol::property::{idtech_command, magtek_command};
use protocol::transport::Direction;
use protocol::{ControlSetup, IdTechProperty, MagtekProperty, Transport, TransportError};
use std::collections::{HashMap, VecDeque};

/// One control transfer seen by a simulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    pub setup: ControlSetup,
    /// Length of the buffer handed to the transport
    pub buffer_len: usize,
    /// Bytes sent (OUT) or returned (IN)
    pub data: Vec<u8>,
}

impl RecordedTransfer {
    pub fn is_out(&self) -> bool {
        self.setup.direction == Direction::Out
    }
}

/// In-memory Magtek reader
#[derive(Debug, Clone)]
pub struct SimulatedMagtek {
    /// The only buffer size the device accepts; others stall the pipe
    pub buffer_size: usize,
    properties: HashMap<u8, Vec<u8>>,
    /// `(state, antecedent)` returned by the get-state command
    pub state: (u8, u8),
    /// Forces byte 0 of every reply when set
    pub result_override: Option<u8>,
    pub descriptor_sn: String,
    pub transfers: Vec<RecordedTransfer>,
    /// Number of descriptor serial number reads (one per refresh)
    pub serial_reads: usize,
    pub resets: usize,
    pending: Option<Vec<u8>>,
}

impl SimulatedMagtek {
    pub fn new(buffer_size: usize) -> Self {
        let mut properties = HashMap::new();
        properties.insert(MagtekProperty::SoftwareId.id(), b"21042840G01".to_vec());
        properties.insert(MagtekProperty::ProductVersion.id(), b"V05".to_vec());
        properties.insert(MagtekProperty::DeviceSerialNumber.id(), Vec::new());
        properties.insert(MagtekProperty::FactorySerialNumber.id(), Vec::new());

        Self {
            buffer_size,
            properties,
            state: (0x02, 0x00),
            result_override: None,
            descriptor_sn: "B164F78".to_string(),
            transfers: Vec::new(),
            serial_reads: 0,
            resets: 0,
            pending: None,
        }
    }

    pub fn with_property(mut self, property: MagtekProperty, value: &str) -> Self {
        self.properties
            .insert(property.id(), value.as_bytes().to_vec());
        self
    }

    pub fn property(&self, property: MagtekProperty) -> Option<&[u8]> {
        self.properties.get(&property.id()).map(Vec::as_slice)
    }

    fn execute(&mut self, request: &[u8]) -> Vec<u8> {
        let len = request[1] as usize;
        let mut reply = match request[0] {
            magtek_command::GET_PROPERTY => match self.properties.get(&request[2]) {
                Some(value) => {
                    let mut reply = vec![0x00, value.len() as u8];
                    reply.extend_from_slice(value);
                    reply
                }
                None => vec![0x02, 0x00],
            },
            magtek_command::SET_PROPERTY => {
                let id = request[2];
                let value = request.get(3..2 + len.max(1)).unwrap_or_default().to_vec();
                let factory = MagtekProperty::FactorySerialNumber.id();
                if id == factory && self.properties.get(&id).is_some_and(|v| v.len() > 1) {
                    vec![0x07, 0x00]
                } else if self.properties.contains_key(&id) {
                    self.properties.insert(id, value);
                    vec![0x00, 0x00]
                } else {
                    vec![0x02, 0x00]
                }
            }
            magtek_command::RESET => {
                self.resets += 1;
                vec![0x00, 0x00]
            }
            magtek_command::GET_STATE => vec![0x00, 0x02, self.state.0, self.state.1],
            _ => vec![0x01, 0x00],
        };

        if let Some(code) = self.result_override {
            reply[0] = code;
        }
        reply
    }
}

impl Transport for SimulatedMagtek {
    fn control(&mut self, setup: ControlSetup, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut record = RecordedTransfer {
            setup,
            buffer_len: buf.len(),
            data: Vec::new(),
        };

        if buf.len() != self.buffer_size {
            self.transfers.push(record);
            return Err(TransportError::Pipe);
        }

        let result = match setup.direction {
            Direction::Out => {
                record.data = buf.to_vec();
                self.pending = Some(self.execute(buf));
                Ok(buf.len())
            }
            Direction::In => match self.pending.take() {
                Some(reply) => {
                    buf.fill(0);
                    let n = reply.len().min(buf.len());
                    buf[..n].copy_from_slice(&reply[..n]);
                    record.data = buf.to_vec();
                    Ok(buf.len())
                }
                None => Err(TransportError::Pipe),
            },
        };

        self.transfers.push(record);
        result
    }

    fn serial_number(&mut self) -> Result<String, TransportError> {
        self.serial_reads += 1;
        Ok(self.descriptor_sn.clone())
    }
}

/// In-memory IDTech SecureMag reader
#[derive(Debug, Clone)]
pub struct SimulatedIdTech {
    /// Feature report size; other sizes stall the pipe
    pub report_size: usize,
    properties: HashMap<u8, Vec<u8>>,
    pub version: String,
    /// Prefix review-setting replies with `(id, len)`
    pub echo_prefix: bool,
    pub descriptor_sn: String,
    pub transfers: Vec<RecordedTransfer>,
    pub serial_reads: usize,
    pub resets: usize,
    /// Commands that arrived with a bad LRC
    pub checksum_failures: usize,
    inbound: Vec<u8>,
    outbound: VecDeque<u8>,
}

impl Default for SimulatedIdTech {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedIdTech {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(IdTechProperty::DeviceSerialNumber.id(), Vec::new());
        properties.insert(IdTechProperty::FirmwareVersion.id(), b"V1.03".to_vec());
        properties.insert(IdTechProperty::Beep.id(), b"1".to_vec());

        Self {
            report_size: 8,
            properties,
            version: "ID TECH SecureMag V1.03".to_string(),
            echo_prefix: true,
            descriptor_sn: String::new(),
            transfers: Vec::new(),
            serial_reads: 0,
            resets: 0,
            checksum_failures: 0,
            inbound: Vec::new(),
            outbound: VecDeque::new(),
        }
    }

    pub fn with_property(mut self, property: IdTechProperty, value: &str) -> Self {
        self.properties
            .insert(property.id(), value.as_bytes().to_vec());
        self
    }

    pub fn with_echo_prefix(mut self, echo_prefix: bool) -> Self {
        self.echo_prefix = echo_prefix;
        self
    }

    pub fn property(&self, property: IdTechProperty) -> Option<&[u8]> {
        self.properties.get(&property.id()).map(Vec::as_slice)
    }

    /// Length of the complete frame at the head of `inbound`, once known
    fn frame_len(&self) -> Option<usize> {
        let body = match *self.inbound.get(1)? {
            idtech_command::REVIEW_SETTING => 2,
            idtech_command::SEND_SETTING => 3 + *self.inbound.get(3)? as usize,
            _ => 1,
        };
        Some(1 + body + 2)
    }

    fn receive(&mut self) {
        if self.inbound.first() != Some(&STX) {
            self.inbound.clear();
            self.outbound = VecDeque::from(vec![0x15]);
            return;
        }

        let Some(frame_len) = self.frame_len() else {
            return;
        };
        if self.inbound.len() < frame_len {
            return;
        }

        let frame: Vec<u8> = self.inbound[..frame_len].to_vec();
        self.inbound.clear();

        let valid = frame[frame_len - 2] == ETX && lrc(&frame[..frame_len - 1]) == frame[frame_len - 1];
        let reply = if valid {
            self.execute(&frame[1..frame_len - 2])
        } else {
            self.checksum_failures += 1;
            vec![0x15]
        };
        self.outbound = VecDeque::from(reply);
    }

    fn execute(&mut self, command: &[u8]) -> Vec<u8> {
        let mut reply = vec![0x06];
        match command[0] {
            idtech_command::REVIEW_SETTING => match self.properties.get(&command[1]) {
                Some(value) => {
                    let mut data = Vec::new();
                    if self.echo_prefix {
                        data.extend_from_slice(&[command[1], value.len() as u8]);
                    }
                    data.extend_from_slice(value);
                    reply.extend(wrap(&data));
                }
                None => return vec![0x16],
            },
            idtech_command::SEND_SETTING => {
                let len = command[2] as usize;
                self.properties
                    .insert(command[1], command[3..3 + len].to_vec());
            }
            idtech_command::VERSION => reply.extend(wrap(self.version.as_bytes())),
            idtech_command::RESET => self.resets += 1,
            _ => return vec![0x15],
        }
        reply
    }
}

impl Transport for SimulatedIdTech {
    fn control(&mut self, setup: ControlSetup, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut record = RecordedTransfer {
            setup,
            buffer_len: buf.len(),
            data: Vec::new(),
        };

        if buf.len() != self.report_size {
            self.transfers.push(record);
            return Err(TransportError::Pipe);
        }

        let n = match setup.direction {
            Direction::Out => {
                record.data = buf.to_vec();
                self.inbound.extend_from_slice(buf);
                self.receive();
                buf.len()
            }
            Direction::In => {
                buf.fill(0);
                let n = self.outbound.len().min(buf.len());
                for (slot, byte) in buf.iter_mut().zip(self.outbound.drain(..n)) {
                    *slot = byte;
                }
                record.data = buf[..n].to_vec();
                n
            }
        };

        self.transfers.push(record);
        Ok(n)
    }

    fn serial_number(&mut self) -> Result<String, TransportError> {
        self.serial_reads += 1;
        Ok(self.descriptor_sn.clone())
    }
}

/// Transport that replays canned replies
///
/// Each GET_REPORT pops the next reply (copied into the caller's buffer);
/// once the script runs out it returns zero bytes. SET_REPORT always
/// succeeds unless `fail_out_at` names its index among OUT transfers.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    replies: VecDeque<Result<Vec<u8>, TransportError>>,
    pub fail_out_at: Option<(usize, TransportError)>,
    pub descriptor_sn: String,
    pub transfers: Vec<RecordedTransfer>,
    pub serial_reads: usize,
    outs: usize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, bytes: &[u8]) -> Self {
        self.replies.push_back(Ok(bytes.to_vec()));
        self
    }

    pub fn reply_error(mut self, error: TransportError) -> Self {
        self.replies.push_back(Err(error));
        self
    }

    pub fn fail_out(mut self, index: usize, error: TransportError) -> Self {
        self.fail_out_at = Some((index, error));
        self
    }

    /// Bytes sent in OUT transfers, in order
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.transfers
            .iter()
            .filter(|t| t.is_out())
            .map(|t| t.data.clone())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn control(&mut self, setup: ControlSetup, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut record = RecordedTransfer {
            setup,
            buffer_len: buf.len(),
            data: Vec::new(),
        };

        let result = match setup.direction {
            Direction::Out => {
                let index = self.outs;
                self.outs += 1;
                record.data = buf.to_vec();
                match &self.fail_out_at {
                    Some((at, error)) if *at == index => Err(error.clone()),
                    _ => Ok(buf.len()),
                }
            }
            Direction::In => match self.replies.pop_front() {
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    record.data = bytes[..n].to_vec();
                    Ok(n)
                }
                Some(Err(error)) => Err(error),
                None => Ok(0),
            },
        };

        self.transfers.push(record);
        result
    }

    fn serial_number(&mut self) -> Result<String, TransportError> {
        self.serial_reads += 1;
        Ok(self.descriptor_sn.clone())
    }
}
