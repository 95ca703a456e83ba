//! Scripted [UsbBackend] for tests
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use crate::drivers::flightstick::{
    driver::{AUX_A_REQUEST, AUX_B_REQUEST, PRIMARY_ENDPOINT},
    hid_report::ReportKind,
};

use super::{
    DeviceId, HotplugEvent, HotplugSender, TransferError, TransportError, UsbBackend, UsbDevice,
    UsbHandle, Waker,
};

/// A single transfer issued against a mock device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transfer {
    Interrupt(u8),
    Vendor(u8),
}

impl From<ReportKind> for Transfer {
    fn from(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Primary => Transfer::Interrupt(PRIMARY_ENDPOINT),
            ReportKind::AuxA => Transfer::Vendor(AUX_A_REQUEST),
            ReportKind::AuxB => Transfer::Vendor(AUX_B_REQUEST),
        }
    }
}

type Response = Result<Vec<u8>, TransferError>;

#[derive(Debug, Default)]
struct MockBus {
    attached: Vec<DeviceId>,
    responses: HashMap<(DeviceId, Transfer), VecDeque<Response>>,
    failing_opens: HashSet<DeviceId>,
    opened: Vec<DeviceId>,
    transfers: Vec<(DeviceId, Transfer)>,
    closed: Vec<DeviceId>,
    hotplug: Option<HotplugSender<MockDevice>>,
    subscribe_fails: bool,
    waits: Vec<Duration>,
    wait_fails: bool,
}

/// In-memory bus. Clones share the same bus.
#[derive(Debug, Default, Clone)]
pub struct MockBackend {
    bus: Arc<Mutex<MockBus>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device without a hotplug notification
    pub fn attach(&self, id: DeviceId) {
        self.bus.lock().unwrap().attached.push(id);
    }

    /// Attach a device and notify subscribers
    pub fn plug(&self, id: DeviceId) {
        let mut bus = self.bus.lock().unwrap();
        bus.attached.push(id);
        if let Some(tx) = bus.hotplug.as_ref() {
            tx.send(HotplugEvent::Arrived(MockDevice { id })).unwrap();
        }
    }

    /// Detach a device and notify subscribers
    pub fn unplug(&self, id: DeviceId) {
        let mut bus = self.bus.lock().unwrap();
        bus.attached.retain(|attached| *attached != id);
        if let Some(tx) = bus.hotplug.as_ref() {
            tx.send(HotplugEvent::Departed(MockDevice { id })).unwrap();
        }
    }

    /// Queue the outcome of the next transfer of the given kind
    pub fn queue(&self, id: DeviceId, kind: ReportKind, response: Response) {
        let mut bus = self.bus.lock().unwrap();
        bus.responses
            .entry((id, kind.into()))
            .or_default()
            .push_back(response);
    }

    /// Queue a successful transfer returning the given bytes
    pub fn queue_report(&self, id: DeviceId, kind: ReportKind, data: &[u8]) {
        self.queue(id, kind, Ok(data.to_vec()));
    }

    pub fn fail_open(&self, id: DeviceId) {
        self.bus.lock().unwrap().failing_opens.insert(id);
    }

    pub fn fail_subscribe(&self) {
        self.bus.lock().unwrap().subscribe_fails = true;
    }

    /// Make every following wait for USB events fail
    pub fn fail_wait(&self) {
        self.bus.lock().unwrap().wait_fails = true;
    }

    /// Timeouts passed to [UsbBackend::wait_for_events], in order
    pub fn waits(&self) -> Vec<Duration> {
        self.bus.lock().unwrap().waits.clone()
    }

    /// Transfers issued against the given device, in order
    pub fn transfers(&self, id: DeviceId) -> Vec<Transfer> {
        let bus = self.bus.lock().unwrap();
        bus.transfers
            .iter()
            .filter(|(device, _)| *device == id)
            .map(|(_, transfer)| *transfer)
            .collect()
    }

    pub fn clear_transfers(&self) {
        self.bus.lock().unwrap().transfers.clear();
    }

    pub fn opened(&self) -> Vec<DeviceId> {
        self.bus.lock().unwrap().opened.clone()
    }

    pub fn closed(&self) -> Vec<DeviceId> {
        self.bus.lock().unwrap().closed.clone()
    }

    /// Returns a handle to the given device without going through [UsbBackend::open]
    pub fn handle(&self, id: DeviceId) -> MockHandle {
        MockHandle {
            id,
            bus: self.bus.clone(),
        }
    }
}

impl UsbBackend for MockBackend {
    type Device = MockDevice;
    type Handle = MockHandle;

    fn enumerate(&self) -> Result<Vec<MockDevice>, TransportError> {
        let bus = self.bus.lock().unwrap();
        Ok(bus.attached.iter().map(|id| MockDevice { id: *id }).collect())
    }

    fn open(&self, device: &MockDevice) -> Result<MockHandle, TransportError> {
        let mut bus = self.bus.lock().unwrap();
        if bus.failing_opens.contains(&device.id) {
            return Err(rusb::Error::Access.into());
        }
        bus.opened.push(device.id);
        Ok(MockHandle {
            id: device.id,
            bus: self.bus.clone(),
        })
    }

    fn subscribe(&mut self, tx: HotplugSender<MockDevice>) -> Result<(), TransportError> {
        let mut bus = self.bus.lock().unwrap();
        if bus.subscribe_fails {
            return Err(TransportError::HotplugUnsupported);
        }
        bus.hotplug = Some(tx);
        Ok(())
    }

    fn wait_for_events(&self, timeout: Duration) -> Result<(), TransportError> {
        let fails = {
            let mut bus = self.bus.lock().unwrap();
            bus.waits.push(timeout);
            bus.wait_fails
        };
        // Stand in for a blocking wait without holding up the tests
        thread::sleep(Duration::from_millis(1));
        if fails {
            return Err(rusb::Error::Io.into());
        }
        Ok(())
    }

    fn waker(&self) -> Waker {
        Box::new(|| {})
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDevice {
    pub id: DeviceId,
}

impl UsbDevice for MockDevice {
    fn id(&self) -> DeviceId {
        self.id
    }
}

#[derive(Debug)]
pub struct MockHandle {
    id: DeviceId,
    bus: Arc<Mutex<MockBus>>,
}

impl MockHandle {
    fn transfer(&mut self, transfer: Transfer, buf: &mut [u8]) -> Result<usize, TransferError> {
        let mut bus = self.bus.lock().unwrap();
        bus.transfers.push((self.id, transfer));

        if !bus.attached.contains(&self.id) {
            return Err(TransferError::Fatal(rusb::Error::NoDevice));
        }

        // Nothing scripted behaves like an idle device
        let response = bus
            .responses
            .get_mut(&(self.id, transfer))
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Err(TransferError::Timeout));

        let data = response?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }
}

impl UsbHandle for MockHandle {
    fn read_interrupt(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransferError> {
        self.transfer(Transfer::Interrupt(endpoint), buf)
    }

    fn read_vendor(
        &mut self,
        request: u8,
        _value: u16,
        _index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransferError> {
        self.transfer(Transfer::Vendor(request), buf)
    }

    fn close(self) -> Result<(), TransportError> {
        self.bus.lock().unwrap().closed.push(self.id);
        Ok(())
    }
}
