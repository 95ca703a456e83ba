use thiserror::Error;

use crate::{
    config::HatAxes,
    drivers::flightstick::{driver::Driver, hid_report::ReportKind},
    usb::{DeviceId, TransferError, UsbHandle},
};

use super::target::{emit_events, SinkError, VirtualSink};

/// Errors that take a live device out of service
#[derive(Debug, Error)]
pub enum PollError {
    #[error("failed to read {kind} report: {source}")]
    Transfer {
        kind: ReportKind,
        source: TransferError,
    },
    #[error("failed to emit {kind} events: {source}")]
    Sink { kind: ReportKind, source: SinkError },
}

/// A live flightstick: the opened USB device paired with the virtual device
/// its input is forwarded to.
pub struct ManagedDevice<H: UsbHandle, S: VirtualSink> {
    id: DeviceId,
    driver: Driver<H>,
    sink: S,
    hat_axes: HatAxes,
}

impl<H: UsbHandle, S: VirtualSink> ManagedDevice<H, S> {
    pub fn new(id: DeviceId, driver: Driver<H>, sink: S, hat_axes: HatAxes) -> Self {
        Self {
            id,
            driver,
            sink,
            hat_axes,
        }
    }

    #[cfg(test)]
    pub fn driver(&self) -> &Driver<H> {
        &self.driver
    }

    /// Poll every report kind in order and forward any changes to the
    /// virtual device. The first failure stops the poll. Returns the number
    /// of events emitted.
    pub fn poll(&mut self) -> Result<usize, PollError> {
        let mut emitted = 0;
        for kind in ReportKind::ALL {
            let events = self
                .driver
                .poll(kind)
                .map_err(|source| PollError::Transfer { kind, source })?;
            emitted += emit_events(&mut self.sink, &events, self.hat_axes)
                .map_err(|source| PollError::Sink { kind, source })?;
        }

        Ok(emitted)
    }

    /// Destroy the virtual device and release the USB device. Errors are
    /// logged since there is nothing left to recover.
    pub fn teardown(self) {
        if let Err(e) = self.sink.destroy() {
            log::warn!("Failed to destroy virtual device for {}: {e}", self.id);
        }
        if let Err(e) = self.driver.close() {
            log::warn!("Failed to release USB device {}: {e}", self.id);
        }
    }
}
