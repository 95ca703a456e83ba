use std::{fmt, time::Duration};

use rusb::{
    Context, Device, DeviceHandle, Direction, Hotplug, HotplugBuilder, Recipient, Registration,
    RequestType, UsbContext,
};

use super::{
    DeviceId, HotplugEvent, HotplugSender, TransferError, TransportError, UsbBackend, UsbDevice,
    UsbHandle, Waker,
};

/// Interface claimed on the device
const INTERFACE: u8 = 0;

/// [UsbBackend] built on libusb
pub struct LibUsbBackend {
    context: Context,
    vendor_id: u16,
    product_id: u16,
    /// Dropping the registration stops hotplug notifications
    registration: Option<Registration<Context>>,
}

impl LibUsbBackend {
    /// Initialize a new libusb context matching the given identity
    pub fn new(vendor_id: u16, product_id: u16) -> Result<Self, TransportError> {
        let context = Context::new()?;
        Ok(Self {
            context,
            vendor_id,
            product_id,
            registration: None,
        })
    }
}

impl UsbBackend for LibUsbBackend {
    type Device = LibUsbDevice;
    type Handle = LibUsbHandle;

    fn enumerate(&self) -> Result<Vec<LibUsbDevice>, TransportError> {
        let devices = self.context.devices()?;
        let mut matching = Vec::new();
        for device in devices.iter() {
            let desc = match device.device_descriptor() {
                Ok(desc) => desc,
                Err(e) => {
                    log::trace!("Unable to read device descriptor: {e}");
                    continue;
                }
            };
            if desc.vendor_id() != self.vendor_id || desc.product_id() != self.product_id {
                continue;
            }
            matching.push(LibUsbDevice(device));
        }

        Ok(matching)
    }

    fn open(&self, device: &LibUsbDevice) -> Result<LibUsbHandle, TransportError> {
        let mut handle = device.0.open()?;
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            log::debug!("Kernel driver auto-detach unavailable for {}: {e}", device.id());
        }
        handle.claim_interface(INTERFACE)?;
        handle.set_alternate_setting(INTERFACE, 0)?;

        Ok(LibUsbHandle { handle })
    }

    fn subscribe(&mut self, tx: HotplugSender<LibUsbDevice>) -> Result<(), TransportError> {
        if !rusb::has_hotplug() {
            return Err(TransportError::HotplugUnsupported);
        }

        let callback: Box<dyn Hotplug<Context>> = Box::new(HotplugForwarder { tx });
        let registration = HotplugBuilder::new()
            .vendor_id(self.vendor_id)
            .product_id(self.product_id)
            .enumerate(false)
            .register(&self.context, callback)?;
        self.registration = Some(registration);

        Ok(())
    }

    fn wait_for_events(&self, timeout: Duration) -> Result<(), TransportError> {
        match self.context.handle_events(Some(timeout)) {
            Ok(()) | Err(rusb::Error::Interrupted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn waker(&self) -> Waker {
        let context = self.context.clone();
        Box::new(move || context.interrupt_handle_events())
    }
}

/// A matching device that was found on the bus
#[derive(Clone)]
pub struct LibUsbDevice(Device<Context>);

impl fmt::Debug for LibUsbDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LibUsbDevice").field(&self.id()).finish()
    }
}

impl UsbDevice for LibUsbDevice {
    fn id(&self) -> DeviceId {
        DeviceId::new(self.0.bus_number(), self.0.address())
    }
}

/// An opened device with its interface claimed
pub struct LibUsbHandle {
    handle: DeviceHandle<Context>,
}

impl UsbHandle for LibUsbHandle {
    fn read_interrupt(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransferError> {
        Ok(self.handle.read_interrupt(endpoint, buf, timeout)?)
    }

    fn read_vendor(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransferError> {
        let request_type =
            rusb::request_type(Direction::In, RequestType::Vendor, Recipient::Endpoint);
        Ok(self
            .handle
            .read_control(request_type, request, value, index, buf, timeout)?)
    }

    fn close(mut self) -> Result<(), TransportError> {
        // The handle itself is closed when dropped
        self.handle.release_interface(INTERFACE)?;
        Ok(())
    }
}

/// Forwards libusb hotplug callbacks to the manager's channel
struct HotplugForwarder {
    tx: HotplugSender<LibUsbDevice>,
}

impl Hotplug<Context> for HotplugForwarder {
    fn device_arrived(&mut self, device: Device<Context>) {
        let device = LibUsbDevice(device);
        log::debug!("Hotplug arrival: {}", device.id());
        if let Err(e) = self.tx.send(HotplugEvent::Arrived(device)) {
            log::error!("Error sending hotplug event: {e}");
        }
    }

    fn device_left(&mut self, device: Device<Context>) {
        let device = LibUsbDevice(device);
        log::debug!("Hotplug departure: {}", device.id());
        if let Err(e) = self.tx.send(HotplugEvent::Departed(device)) {
            log::error!("Error sending hotplug event: {e}");
        }
    }
}
