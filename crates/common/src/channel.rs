//! Async channel bridge between callers and a device worker thread
//!
//! A device handle must never run two protocol operations at once. The
//! bridge funnels every request for one device into a single blocking
//! worker, which executes them in arrival order. `P` is the vendor's
//! property identifier type.

use async_channel::{Receiver, Sender, bounded};
use protocol::{BeepSetting, DeviceState, SerialNumbers};
use tokio::sync::oneshot;

/// Reply channel for one command
pub type Reply<T> = oneshot::Sender<protocol::Result<T>>;

/// Commands from callers to the device worker
#[derive(Debug)]
pub enum DeviceCommand<P> {
    /// Read an NVRAM property
    GetProperty {
        property: P,
        response: Reply<String>,
    },

    /// Write an NVRAM property
    SetProperty {
        property: P,
        value: String,
        response: Reply<()>,
    },

    /// Vendor reset, including the settle delay
    Reset { response: Reply<()> },

    /// Re-read the serial numbers
    Refresh { response: Reply<SerialNumbers> },

    /// Query the reader state (Magtek)
    GetState { response: Reply<DeviceState> },

    /// Copy the first `length` characters of the factory serial number into
    /// the device serial number (Magtek)
    CopyFactorySn { length: usize, response: Reply<()> },

    /// Change the beep setting (IDTech)
    SetBeep {
        setting: BeepSetting,
        response: Reply<()>,
    },

    /// Stop the worker thread
    Shutdown,
}

/// Caller-side handle (async, cloneable)
pub struct DeviceBridge<P> {
    cmd_tx: Sender<DeviceCommand<P>>,
}

impl<P> Clone for DeviceBridge<P> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
        }
    }
}

impl<P> DeviceBridge<P> {
    /// Send a command to the worker
    pub async fn send_command(&self, cmd: DeviceCommand<P>) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> DeviceCommand<P>,
    ) -> crate::Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send_command(make(tx)).await?;
        let result = rx
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))?;
        Ok(result?)
    }

    pub async fn get_property(&self, property: P) -> crate::Result<String> {
        self.request(|response| DeviceCommand::GetProperty { property, response })
            .await
    }

    pub async fn set_property(&self, property: P, value: impl Into<String>) -> crate::Result<()> {
        let value = value.into();
        self.request(|response| DeviceCommand::SetProperty {
            property,
            value,
            response,
        })
        .await
    }

    pub async fn reset(&self) -> crate::Result<()> {
        self.request(|response| DeviceCommand::Reset { response })
            .await
    }

    pub async fn refresh(&self) -> crate::Result<SerialNumbers> {
        self.request(|response| DeviceCommand::Refresh { response })
            .await
    }

    pub async fn get_state(&self) -> crate::Result<DeviceState> {
        self.request(|response| DeviceCommand::GetState { response })
            .await
    }

    pub async fn copy_factory_sn(&self, length: usize) -> crate::Result<()> {
        self.request(|response| DeviceCommand::CopyFactorySn { length, response })
            .await
    }

    pub async fn set_beep(&self, setting: BeepSetting) -> crate::Result<()> {
        self.request(|response| DeviceCommand::SetBeep { setting, response })
            .await
    }

    /// Ask the worker to stop after the commands already queued
    pub async fn shutdown(&self) -> crate::Result<()> {
        self.send_command(DeviceCommand::Shutdown).await
    }
}

/// Worker-side handle (blocking)
pub struct DeviceWorker<P> {
    cmd_rx: Receiver<DeviceCommand<P>>,
}

impl<P> DeviceWorker<P> {
    /// Receive the next command (blocking)
    ///
    /// Fails once every bridge has been dropped and the queue is empty.
    pub fn recv_command(&self) -> crate::Result<DeviceCommand<P>> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Try to receive a command without blocking
    pub fn try_recv_command(&self) -> Option<DeviceCommand<P>> {
        self.cmd_rx.try_recv().ok()
    }
}

/// Create the channel bridge for one device
///
/// Returns (DeviceBridge for callers, DeviceWorker for the device thread)
pub fn create_device_bridge<P>() -> (DeviceBridge<P>, DeviceWorker<P>) {
    let (cmd_tx, cmd_rx) = bounded(64);

    (DeviceBridge { cmd_tx }, DeviceWorker { cmd_rx })
}
