use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    config::Config,
    drivers::flightstick::driver::{Driver, PID, VID},
    usb::{
        DeviceId, HotplugEvent, HotplugReceiver, HotplugSender, TransportError, UsbBackend,
        UsbDevice,
    },
};

use super::{
    device::ManagedDevice,
    registry::Registry,
    target::{SinkError, SinkFactory, TargetConfig, VirtualSink},
};

/// Version reported by the virtual device
const TARGET_VERSION: u16 = 1;

/// Errors that prevent a device from becoming live
#[derive(Debug, Error)]
pub enum AttachError {
    #[error("failed to open USB device: {0}")]
    Transport(#[from] TransportError),
    #[error("failed to create virtual device: {0}")]
    Sink(#[from] SinkError),
}

/// Result of a single [Manager::poll_cycle]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Number of devices polled
    pub polled: usize,
    /// Number of devices torn down after a failed poll
    pub torn_down: usize,
    /// Number of input events emitted, not counting sync events
    pub events: usize,
}

type LiveDevice<B, F> = ManagedDevice<<B as UsbBackend>::Handle, <F as SinkFactory>::Sink>;

/// Manages flightsticks
///
/// The [Manager] attaches every flightstick that is present at startup or
/// plugged in later, polls each of them for reports and forwards the
/// resulting input to a virtual device created for each one. Devices that
/// are unplugged or fail are torn down; they come back only when plugged in
/// again.
pub struct Manager<B: UsbBackend, F: SinkFactory> {
    backend: B,
    factory: F,
    config: Config,
    /// Mapping of all currently live devices
    registry: Registry<LiveDevice<B, F>>,
    /// Transmit side of the hotplug channel, handed to the backend
    tx: HotplugSender<B::Device>,
    /// Hotplug notifications waiting to be processed between poll cycles
    rx: HotplugReceiver<B::Device>,
}

impl<B: UsbBackend, F: SinkFactory> Manager<B, F> {
    pub fn new(backend: B, factory: F, config: Config) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            factory,
            config,
            registry: Registry::new(),
            tx,
            rx,
        }
    }

    /// Subscribe to hotplug notifications and attach every flightstick that
    /// is already connected.
    pub fn start(&mut self) -> Result<(), TransportError> {
        self.backend.subscribe(self.tx.clone())?;

        let devices = self.backend.enumerate()?;
        log::info!("Found {} flightstick(s)", devices.len());
        for device in devices {
            if let Err(e) = self.attach(&device) {
                log::error!("Unable to attach flightstick {}: {e}", device.id());
            }
        }

        Ok(())
    }

    /// Attach the given device. Returns false if the device is already live.
    /// Nothing is left behind if attaching fails.
    pub fn attach(&mut self, device: &B::Device) -> Result<bool, AttachError> {
        let id = device.id();
        if self.is_live(&id) {
            log::debug!("Flightstick {id} is already attached");
            return Ok(false);
        }
        log::debug!("Attaching flightstick {id}");

        let sink = self.factory.create(&self.target_config())?;
        let handle = match self.backend.open(device) {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(e) = sink.destroy() {
                    log::warn!("Failed to destroy virtual device for {id}: {e}");
                }
                return Err(e.into());
            }
        };

        let driver = Driver::new(handle, self.config.timeouts());
        let device = ManagedDevice::new(id, driver, sink, self.config.hat_axes);
        if let Err(device) = self.registry.insert(id, device) {
            device.teardown();
            return Ok(false);
        }
        log::info!("Attached flightstick {id}");

        Ok(true)
    }

    /// Tear down the device with the given identity. Returns false if no
    /// such device is live.
    pub fn detach(&mut self, id: DeviceId) -> bool {
        let Some(device) = self.registry.remove(&id) else {
            return false;
        };
        device.teardown();
        log::info!("Detached flightstick {id}");
        true
    }

    /// Poll every live device once. Devices that fail are torn down.
    pub fn poll_cycle(&mut self) -> CycleSummary {
        let mut summary = CycleSummary::default();

        for id in self.device_ids() {
            let Some(device) = self.registry.find_mut(&id) else {
                continue;
            };
            summary.polled += 1;

            match device.poll() {
                Ok(events) => summary.events += events,
                Err(e) => {
                    log::warn!("Removing flightstick {id}: {e}");
                    self.detach(id);
                    summary.torn_down += 1;
                }
            }
        }

        summary
    }

    /// Process all queued hotplug notifications. Returns the number of
    /// notifications processed.
    pub fn process_hotplug_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.rx.try_recv() {
            processed += 1;
            match event {
                HotplugEvent::Arrived(device) => {
                    if let Err(e) = self.attach(&device) {
                        log::error!("Unable to attach flightstick {}: {e}", device.id());
                    }
                }
                HotplugEvent::Departed(device) => {
                    let id = device.id();
                    if !self.detach(id) {
                        log::debug!("Ignoring departure of unknown flightstick {id}");
                    }
                }
            }
        }

        processed
    }

    /// Run the polling loop until the given flag is set. Blocks the calling
    /// thread; use the backend's waker to interrupt a pending wait. Failing
    /// to wait for USB events never stops the loop.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        let poll_interval = self.config.poll_interval();
        let hotplug_interval = self.config.hotplug_interval();
        let mut last_hotplug_check = Instant::now();

        log::info!("Polling flightsticks every {poll_interval:?}");
        while !shutdown.load(Ordering::SeqCst) {
            // Nothing to poll; sleep until something is plugged in
            if self.registry.is_empty() {
                log::trace!("No flightsticks connected, waiting for hotplug events");
                self.wait_for_events(self.config.idle_wait());
                self.process_hotplug_events();
                last_hotplug_check = Instant::now();
                continue;
            }

            let summary = self.poll_cycle();
            if summary.events > 0 || summary.torn_down > 0 {
                log::trace!(
                    "Polled {} flightstick(s): {} event(s), {} removed",
                    summary.polled,
                    summary.events,
                    summary.torn_down
                );
            }

            if last_hotplug_check.elapsed() >= hotplug_interval {
                self.wait_for_events(poll_interval);
                last_hotplug_check = Instant::now();
            } else {
                std::thread::sleep(poll_interval);
            }
            self.process_hotplug_events();
        }
        log::debug!("Polling loop stopped");
    }

    /// Let the backend deliver pending hotplug notifications. On failure the
    /// loop backs off for one poll interval instead of spinning.
    fn wait_for_events(&self, timeout: Duration) {
        if let Err(e) = self.backend.wait_for_events(timeout) {
            log::warn!("Error waiting for USB events: {e}");
            std::thread::sleep(self.config.poll_interval());
        }
    }

    /// Tear down every live device
    pub fn shutdown(&mut self) {
        log::info!("Shutting down {} flightstick(s)", self.device_count());
        for (id, device) in self.registry.drain() {
            device.teardown();
            log::info!("Detached flightstick {id}");
        }
    }

    /// Returns true if the device with the given identity is live
    pub fn is_live(&self, id: &DeviceId) -> bool {
        self.registry.contains(id)
    }

    /// Returns the live device with the given identity
    #[cfg(test)]
    pub fn device(&self, id: &DeviceId) -> Option<&LiveDevice<B, F>> {
        self.registry.find(id)
    }

    /// Returns the identities of all live devices
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.registry.ids()
    }

    pub fn device_count(&self) -> usize {
        self.registry.len()
    }

    fn target_config(&self) -> TargetConfig {
        TargetConfig {
            name: self.config.name.clone(),
            vendor_id: VID,
            product_id: PID,
            version: TARGET_VERSION,
            hat_axes: self.config.hat_axes,
        }
    }
}
