//! Device worker thread
//!
//! Owns one driver and executes the commands arriving through its
//! [`DeviceWorker`] one at a time. The drivers block (control transfers,
//! settle sleeps), so they run on a dedicated OS thread while callers stay on
//! the Tokio runtime.

use crate::DeviceProtocol;
use common::{DeviceCommand, DeviceWorker};
use std::thread::JoinHandle;
use tracing::{debug, error, info};

/// Run loop for one device
pub struct DeviceWorkerThread<D: DeviceProtocol> {
    driver: D,
    worker: DeviceWorker<D::Property>,
}

impl<D: DeviceProtocol> DeviceWorkerThread<D> {
    pub fn new(driver: D, worker: DeviceWorker<D::Property>) -> Self {
        Self { driver, worker }
    }

    /// Process commands until Shutdown or until every bridge is dropped
    ///
    /// Returns the driver so the caller can reuse the device afterwards.
    pub fn run(mut self) -> D {
        info!("Device worker started");

        loop {
            match self.worker.recv_command() {
                Ok(DeviceCommand::Shutdown) => {
                    info!("Device worker shutting down");
                    break;
                }
                Ok(cmd) => self.handle_command(cmd),
                Err(e) => {
                    debug!("Command channel closed: {}", e);
                    break;
                }
            }
        }

        info!("Device worker stopped");
        self.driver
    }

    fn handle_command(&mut self, cmd: DeviceCommand<D::Property>) {
        // A panicking driver drops the reply sender; the caller sees a closed channel
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.handle_command_inner(cmd)
        }));

        if let Err(e) = result {
            error!("Panic in device command handler: {:?}", e);
        }
    }

    fn handle_command_inner(&mut self, cmd: DeviceCommand<D::Property>) {
        match cmd {
            DeviceCommand::GetProperty { property, response } => {
                debug!("Getting {}", property);
                let _ = response.send(self.driver.get_property(property));
            }

            DeviceCommand::SetProperty {
                property,
                value,
                response,
            } => {
                debug!("Setting {} to {:?}", property, value);
                let _ = response.send(self.driver.set_property(property, &value));
            }

            DeviceCommand::Reset { response } => {
                debug!("Resetting device");
                let _ = response.send(self.driver.reset());
            }

            DeviceCommand::Refresh { response } => {
                debug!("Refreshing serial numbers");
                let _ = response.send(self.driver.refresh());
            }

            DeviceCommand::GetState { response } => {
                debug!("Querying reader state");
                let _ = response.send(self.driver.get_state());
            }

            DeviceCommand::CopyFactorySn { length, response } => {
                debug!("Copying {} factory serial number characters", length);
                let _ = response.send(self.driver.copy_factory_sn(length));
            }

            DeviceCommand::SetBeep { setting, response } => {
                debug!("Setting beep to {:?}", setting);
                let _ = response.send(self.driver.set_beep(setting));
            }

            DeviceCommand::Shutdown => {}
        }
    }
}

/// Spawn a worker thread that owns `driver`
///
/// The thread ends when a Shutdown command arrives or every bridge is
/// dropped, and hands the driver back through the join handle.
pub fn spawn_device_worker<D>(
    driver: D,
    worker: DeviceWorker<D::Property>,
) -> std::io::Result<JoinHandle<D>>
where
    D: DeviceProtocol + Send + 'static,
{
    std::thread::Builder::new()
        .name("device-worker".to_string())
        .spawn(move || DeviceWorkerThread::new(driver, worker).run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Magtek;
    use crate::config::MagtekSettings;
    use common::create_device_bridge;
    use common::test_utils::SimulatedMagtek;
    use protocol::MagtekProperty;

    #[test]
    fn test_worker_stops_when_bridge_dropped() {
        let driver = Magtek::with_buffer_size(
            SimulatedMagtek::new(24),
            24,
            MagtekSettings::default(),
        );
        let (bridge, worker) = create_device_bridge::<MagtekProperty>();
        let handle = spawn_device_worker(driver, worker).unwrap();

        drop(bridge);
        let driver = handle.join().unwrap();
        assert!(driver.transport().transfers.is_empty());
    }
}
