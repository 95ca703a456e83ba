//! Interface to the USB transport. The manager and drivers only talk to the
//! traits defined here; [libusb::LibUsbBackend] is the production backend.
pub mod libusb;

#[cfg(test)]
pub mod mock;

use std::{fmt, time::Duration};

use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from transport operations outside of report transfers
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
    #[error("hotplug notifications are not supported on this system")]
    HotplugUnsupported,
}

/// Outcome of a failed report transfer, classified by how the caller should
/// react to it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// No data was available before the timeout expired
    #[error("transfer timed out")]
    Timeout,
    /// The device stalled the request; no data available
    #[error("endpoint stalled")]
    Stall,
    /// The transfer failed but the device is still usable
    #[error("transfer anomaly: {0}")]
    Recoverable(rusb::Error),
    /// The device is gone or the bus failed
    #[error("transport failure: {0}")]
    Fatal(rusb::Error),
}

impl TransferError {
    /// Returns true if the device should be torn down after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransferError::Fatal(_))
    }
}

impl From<rusb::Error> for TransferError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Timeout => TransferError::Timeout,
            rusb::Error::Pipe => TransferError::Stall,
            rusb::Error::Overflow | rusb::Error::Interrupted | rusb::Error::Busy => {
                TransferError::Recoverable(err)
            }
            _ => TransferError::Fatal(err),
        }
    }
}

/// Identifies one physical device for the lifetime of its attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId {
    pub bus: u8,
    pub address: u8,
}

impl DeviceId {
    pub fn new(bus: u8, address: u8) -> Self {
        Self { bus, address }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}:{:03}", self.bus, self.address)
    }
}

/// Hotplug notification delivered by the transport
#[derive(Debug, Clone)]
pub enum HotplugEvent<D> {
    Arrived(D),
    Departed(D),
}

pub type HotplugSender<D> = mpsc::UnboundedSender<HotplugEvent<D>>;
pub type HotplugReceiver<D> = mpsc::UnboundedReceiver<HotplugEvent<D>>;

/// Wakes a thread blocked in [UsbBackend::wait_for_events]
pub type Waker = Box<dyn Fn() + Send + Sync>;

/// A physical device that has not been opened yet
pub trait UsbDevice: Clone + fmt::Debug {
    fn id(&self) -> DeviceId;
}

/// An opened and claimed device
pub trait UsbHandle {
    /// Blocking interrupt IN transfer. Returns the number of bytes read.
    fn read_interrupt(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransferError>;

    /// Blocking vendor control IN transfer addressed to an endpoint. Returns
    /// the number of bytes read.
    fn read_vendor(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransferError>;

    /// Release the device. The handle is closed even if releasing fails.
    fn close(self) -> Result<(), TransportError>;
}

/// Enumerates, opens and watches devices of one vendor/product identity
pub trait UsbBackend {
    type Device: UsbDevice;
    type Handle: UsbHandle;

    /// Returns all currently attached matching devices
    fn enumerate(&self) -> Result<Vec<Self::Device>, TransportError>;

    /// Open and claim the given device
    fn open(&self, device: &Self::Device) -> Result<Self::Handle, TransportError>;

    /// Start delivering arrival/departure notifications to the given channel
    fn subscribe(&mut self, tx: HotplugSender<Self::Device>) -> Result<(), TransportError>;

    /// Block until transport events were handled or the timeout expired.
    /// Hotplug notifications are delivered from inside this call.
    fn wait_for_events(&self, timeout: Duration) -> Result<(), TransportError>;

    /// Returns a [Waker] that interrupts a pending [UsbBackend::wait_for_events]
    fn waker(&self) -> Waker;
}
