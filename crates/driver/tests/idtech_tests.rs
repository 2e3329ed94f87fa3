//! IDTech driver tests against scripted and simulated readers

use common::test_utils::{ScriptedTransport, SimulatedIdTech};
use driver::config::IdTechSettings;
use driver::{DeviceProtocol, IdTech};
use protocol::frame::wrap;
use protocol::{
    BeepSetting, ControlSetup, ErrorKind, IdTechProperty, ProtocolError, TransportError,
};

fn settings() -> IdTechSettings {
    IdTechSettings {
        settle_ms: 0,
        ..IdTechSettings::default()
    }
}

/// Script `response` as a series of 8-byte GET_REPORT replies
fn scripted(response: &[u8]) -> ScriptedTransport {
    response
        .chunks(8)
        .fold(ScriptedTransport::new(), |t, chunk| t.reply(chunk))
}

/// ACK followed by a framed payload
fn ack(payload: &[u8]) -> Vec<u8> {
    let mut response = vec![0x06];
    response.extend(wrap(payload));
    response
}

mod transmission {
    use super::*;

    #[test]
    fn test_review_setting_frame() {
        let mut idtech = IdTech::new(scripted(&ack(b"SN")), settings());
        idtech.get_device_sn().unwrap();

        let sent = idtech.transport().sent();
        assert_eq!(sent, vec![vec![0x02, 0x52, 0x4e, 0x03, 0x1d, 0, 0, 0]]);
    }

    #[test]
    fn test_chunks_are_feature_reports() {
        let mut idtech = IdTech::new(scripted(&[0x06]), settings());
        idtech
            .set_property(IdTechProperty::DeviceSerialNumber, "0123456789")
            .unwrap();

        let transfers = &idtech.transport().transfers;
        let outs: Vec<_> = transfers.iter().filter(|t| t.is_out()).collect();
        // 'S' id len + 10 bytes, framed: 16 bytes
        assert_eq!(outs.len(), 2);
        for t in &outs {
            assert_eq!(t.setup, ControlSetup::set_report());
            assert_eq!(t.buffer_len, 8);
        }
        for t in transfers.iter().filter(|t| !t.is_out()) {
            assert_eq!(t.setup, ControlSetup::get_report());
            assert_eq!(t.buffer_len, 8);
        }

        let frame: Vec<u8> = outs.iter().flat_map(|t| t.data.clone()).collect();
        let mut command = vec![0x53, 0x4e, 10];
        command.extend_from_slice(b"0123456789");
        assert_eq!(frame, wrap(&command));
    }

    #[test]
    fn test_out_failure_aborts() {
        let transport = scripted(&[0x06]).fail_out(0, TransportError::Timeout);
        let mut idtech = IdTech::new(transport, settings());

        let err = idtech
            .set_property(IdTechProperty::DeviceSerialNumber, "0123456789")
            .unwrap_err();
        assert_eq!(err, ProtocolError::Transport(TransportError::Timeout));
        // No second chunk, no polling
        assert_eq!(idtech.transport().transfers.len(), 1);
    }

    #[test]
    fn test_in_failure_aborts() {
        let transport = ScriptedTransport::new()
            .reply(&[0x06, 0x02])
            .reply_error(TransportError::Pipe);
        let mut idtech = IdTech::new(transport, settings());

        let err = idtech.get_device_sn().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_endless_response_capped() {
        let transport = (0..4).fold(ScriptedTransport::new(), |t, _| t.reply(&[0x06; 8]));
        let settings = IdTechSettings {
            max_response_len: 16,
            ..settings()
        };
        let mut idtech = IdTech::new(transport, settings);

        assert!(matches!(
            idtech.get_device_sn(),
            Err(ProtocolError::Malformed(_))
        ));
    }
}

mod responses {
    use super::*;

    #[test]
    fn test_prefixed_value_stripped() {
        let mut payload = vec![0x4e, 0x0A];
        payload.extend_from_slice(b"0123456789");
        let mut idtech = IdTech::new(scripted(&ack(&payload)), settings());

        assert_eq!(idtech.get_device_sn().unwrap(), "0123456789");
    }

    #[test]
    fn test_unprefixed_value_unchanged() {
        let mut idtech = IdTech::new(scripted(&ack(b"0123456789")), settings());
        assert_eq!(idtech.get_device_sn().unwrap(), "0123456789");
    }

    #[test]
    fn test_value_whitespace_trimmed() {
        let mut idtech = IdTech::new(scripted(&ack(b" V1.03 \r\n")), settings());
        assert_eq!(idtech.get_firmware_version().unwrap(), "V1.03");
    }

    #[test]
    fn test_nak_carries_payload() {
        let mut response = vec![0x15];
        response.extend(wrap(b"ERR"));
        let mut idtech = IdTech::new(scripted(&response), settings());

        match idtech.get_device_sn().unwrap_err() {
            ProtocolError::Response {
                code,
                description,
                payload,
            } => {
                assert_eq!(code, 0x15);
                assert!(!description.is_empty());
                assert_eq!(payload, b"ERR");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_response() {
        let mut idtech = IdTech::new(ScriptedTransport::new(), settings());
        assert_eq!(idtech.get_device_sn(), Err(ProtocolError::NoResponse));
    }

    #[test]
    fn test_padding_only_is_no_response() {
        let mut idtech = IdTech::new(scripted(&[0u8; 8]), settings());
        assert_eq!(idtech.reset(), Err(ProtocolError::NoResponse));
    }

    #[test]
    fn test_bare_ack() {
        let mut idtech = IdTech::new(scripted(&[0x06]), settings());
        assert_eq!(idtech.send_command(&[0x49]), Ok(vec![0x06]));
    }
}

mod simulated {
    use super::*;

    fn open(device: SimulatedIdTech) -> IdTech<SimulatedIdTech> {
        IdTech::open(device, settings()).unwrap()
    }

    #[test]
    fn test_open_reads_identity() {
        let mut device = SimulatedIdTech::new().with_property(IdTechProperty::DeviceSerialNumber, "SN42");
        device.descriptor_sn = "USB0001".to_string();
        let idtech = open(device);

        assert_eq!(idtech.firmware_version(), "V1.03");
        assert_eq!(idtech.software_id(), "V1.03");
        assert_eq!(idtech.product_version(), "ID TECH SecureMag V1.03");
        assert_eq!(idtech.serial_numbers().device_sn, "SN42");
        assert_eq!(idtech.serial_numbers().descriptor_sn, "USB0001");
        assert_eq!(idtech.serial_numbers().factory_sn, "");
    }

    #[test]
    fn test_set_then_get_device_sn() {
        let mut idtech = open(SimulatedIdTech::new());
        idtech.set_device_sn("ABCDEFGHIJKLMNOP").unwrap();

        assert_eq!(idtech.get_device_sn().unwrap(), "ABCDEFGHIJKLMNOP");
        assert_eq!(idtech.transport().checksum_failures, 0);
    }

    #[test]
    fn test_three_byte_value_truncated_at_length_byte() {
        let mut idtech = open(SimulatedIdTech::new());
        idtech.set_device_sn("ABC").unwrap();

        // Length byte 0x03 is taken as the ETX, leaving only the ID byte
        assert_eq!(idtech.get_device_sn().unwrap(), "N");
        assert_eq!(
            idtech.transport().property(IdTechProperty::DeviceSerialNumber),
            Some(&b"ABC"[..])
        );
    }

    #[test]
    fn test_without_echo_prefix() {
        let device = SimulatedIdTech::new()
            .with_echo_prefix(false)
            .with_property(IdTechProperty::DeviceSerialNumber, "SN42");
        let mut idtech = open(device);
        assert_eq!(idtech.get_device_sn().unwrap(), "SN42");
    }

    #[test]
    fn test_erase_device_sn() {
        let device = SimulatedIdTech::new().with_property(IdTechProperty::DeviceSerialNumber, "SN42");
        let mut idtech = open(device);

        idtech.erase_device_sn().unwrap();
        assert_eq!(
            idtech.transport().property(IdTechProperty::DeviceSerialNumber),
            Some(&b""[..])
        );
    }

    #[test]
    fn test_set_beep() {
        let mut idtech = open(SimulatedIdTech::new());
        idtech.set_beep(BeepSetting::HighShort).unwrap();
        assert_eq!(
            idtech.transport().property(IdTechProperty::Beep),
            Some(&b"3"[..])
        );
    }

    #[test]
    fn test_reset() {
        let mut idtech = open(SimulatedIdTech::new());
        idtech.reset().unwrap();
        assert_eq!(idtech.transport().resets, 1);
    }

    #[test]
    fn test_refresh_reads_descriptor() {
        let mut idtech = open(SimulatedIdTech::new());
        let reads = idtech.transport().serial_reads;

        idtech.refresh().unwrap();
        assert_eq!(idtech.transport().serial_reads, reads + 1);
    }

    #[test]
    fn test_set_does_not_refresh() {
        let mut idtech = open(SimulatedIdTech::new());
        let reads = idtech.transport().serial_reads;

        idtech.set_device_sn("NEW").unwrap();
        assert_eq!(idtech.transport().serial_reads, reads);
    }
}
