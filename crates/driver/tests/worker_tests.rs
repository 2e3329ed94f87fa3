//! Device worker tests: bridge commands executed on the worker thread

use common::test_utils::{SimulatedIdTech, SimulatedMagtek};
use common::{Error, create_device_bridge};
use driver::config::{IdTechSettings, MagtekSettings};
use driver::{IdTech, Magtek, spawn_device_worker};
use protocol::{BeepSetting, DeviceState, ErrorKind, IdTechProperty, MagtekProperty, ProtocolError};

fn magtek(device: SimulatedMagtek) -> Magtek<SimulatedMagtek> {
    let settings = MagtekSettings {
        reset_settle_ms: 0,
        ..MagtekSettings::default()
    };
    Magtek::open(device, settings).unwrap()
}

#[tokio::test]
async fn test_magtek_through_bridge() {
    let (bridge, worker) = create_device_bridge::<MagtekProperty>();
    let handle = spawn_device_worker(magtek(SimulatedMagtek::new(24)), worker).unwrap();

    bridge
        .set_property(MagtekProperty::DeviceSerialNumber, "ABCDEFG")
        .await
        .unwrap();
    let value = bridge
        .get_property(MagtekProperty::DeviceSerialNumber)
        .await
        .unwrap();
    assert_eq!(value, "ABCDEFG");

    let serials = bridge.refresh().await.unwrap();
    assert_eq!(serials.device_sn, "ABCDEFG");
    assert_eq!(serials.descriptor_sn, "B164F78");

    bridge.reset().await.unwrap();
    bridge.shutdown().await.unwrap();

    let driver = handle.join().unwrap();
    assert_eq!(driver.transport().resets, 1);
}

#[tokio::test]
async fn test_magtek_vendor_commands() {
    let mut device = SimulatedMagtek::new(24)
        .with_property(MagtekProperty::FactorySerialNumber, "B164F78012345AB");
    device.state = (0x02, 0x03);
    let (bridge, worker) = create_device_bridge::<MagtekProperty>();
    let handle = spawn_device_worker(magtek(device), worker).unwrap();

    assert_eq!(bridge.get_state().await.unwrap(), DeviceState::new(0x02, 0x03));

    bridge.copy_factory_sn(7).await.unwrap();
    let value = bridge
        .get_property(MagtekProperty::DeviceSerialNumber)
        .await
        .unwrap();
    assert_eq!(value, "B164F78");

    // Beep is an IDTech setting
    match bridge.set_beep(BeepSetting::LowLong).await.unwrap_err() {
        Error::Device(e) => assert_eq!(e.kind(), ErrorKind::LocalValidation),
        other => panic!("unexpected error: {other:?}"),
    }

    bridge.shutdown().await.unwrap();
    handle.join().unwrap();
}

#[tokio::test]
async fn test_idtech_vendor_commands() {
    let settings = IdTechSettings {
        settle_ms: 0,
        ..IdTechSettings::default()
    };
    let idtech = IdTech::open(SimulatedIdTech::new(), settings).unwrap();
    let (bridge, worker) = create_device_bridge::<IdTechProperty>();
    let handle = spawn_device_worker(idtech, worker).unwrap();

    bridge.set_beep(BeepSetting::HighShort).await.unwrap();

    let err = bridge.get_state().await.unwrap_err();
    assert!(matches!(err, Error::Device(ProtocolError::Validation(_))));
    let err = bridge.copy_factory_sn(7).await.unwrap_err();
    assert!(matches!(err, Error::Device(ProtocolError::Validation(_))));

    bridge.shutdown().await.unwrap();
    let driver = handle.join().unwrap();
    assert_eq!(
        driver.transport().property(IdTechProperty::Beep),
        Some(&b"3"[..])
    );
}

#[tokio::test]
async fn test_device_error_reaches_caller() {
    let device = SimulatedMagtek::new(24).with_property(MagtekProperty::FactorySerialNumber, "FACTORY01");
    let (bridge, worker) = create_device_bridge::<MagtekProperty>();
    let handle = spawn_device_worker(magtek(device), worker).unwrap();

    let err = bridge
        .set_property(MagtekProperty::FactorySerialNumber, "OTHER")
        .await
        .unwrap_err();
    match err {
        Error::Device(e) => assert_eq!(e.response_code(), Some(0x07)),
        other => panic!("unexpected error: {other:?}"),
    }

    bridge.shutdown().await.unwrap();
    handle.join().unwrap();
}

#[tokio::test]
async fn test_concurrent_idtech_commands_serialized() {
    let settings = IdTechSettings {
        settle_ms: 0,
        ..IdTechSettings::default()
    };
    let idtech = IdTech::open(SimulatedIdTech::new(), settings).unwrap();
    let (bridge, worker) = create_device_bridge::<IdTechProperty>();
    let handle = spawn_device_worker(idtech, worker).unwrap();

    // Multi-chunk sets from several tasks at once
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                bridge
                    .set_property(IdTechProperty::DeviceSerialNumber, format!("SERIAL-{i:02}-ABCDEF"))
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let value = bridge
        .get_property(IdTechProperty::DeviceSerialNumber)
        .await
        .unwrap();
    assert!(value.starts_with("SERIAL-"));

    bridge.shutdown().await.unwrap();
    let driver = handle.join().unwrap();
    assert_eq!(driver.transport().checksum_failures, 0);
}

#[tokio::test]
async fn test_commands_after_shutdown_fail() {
    let (bridge, worker) = create_device_bridge::<MagtekProperty>();
    let handle = spawn_device_worker(magtek(SimulatedMagtek::new(24)), worker).unwrap();

    bridge.shutdown().await.unwrap();
    handle.join().unwrap();

    let err = bridge
        .get_property(MagtekProperty::SoftwareId)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Channel(_)));
}

#[test]
fn test_protocol_error_converts() {
    let err: Error = ProtocolError::NoResponse.into();
    assert!(matches!(err, Error::Device(ProtocolError::NoResponse)));
}
