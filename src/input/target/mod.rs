pub mod flightstick;

#[cfg(test)]
pub mod mock;

use std::io;

use evdev::{InputEvent, SynchronizationCode, SynchronizationEvent};
use thiserror::Error;

use crate::{config::HatAxes, drivers::flightstick::event::Event};

/// Errors writing to a virtual input device
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("uinput error: {0}")]
    Io(#[from] io::Error),
}

/// Identity and layout of the virtual device to create
#[derive(Debug, Clone, PartialEq)]
pub struct TargetConfig {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
    pub hat_axes: HatAxes,
}

/// A virtual input device that consumes input events
pub trait VirtualSink {
    /// Write a single event to the device
    fn emit(&mut self, event: InputEvent) -> Result<(), SinkError>;

    /// Unregister the device from the input subsystem
    fn destroy(self) -> Result<(), SinkError>;
}

/// Creates [VirtualSink] devices
pub trait SinkFactory {
    type Sink: VirtualSink;

    fn create(&self, config: &TargetConfig) -> Result<Self::Sink, SinkError>;
}

/// Write the given events to the sink followed by a single SYN_REPORT. Nothing
/// is written if there are no events. Returns the number of events written,
/// not counting the sync event.
pub fn emit_events<S: VirtualSink>(
    sink: &mut S,
    events: &[Event],
    hat_axes: HatAxes,
) -> Result<usize, SinkError> {
    if events.is_empty() {
        return Ok(0);
    }

    for event in events {
        sink.emit(flightstick::translate_event(event, hat_axes))?;
    }
    sink.emit(SynchronizationEvent::new(SynchronizationCode::SYN_REPORT, 0).into())?;

    Ok(events.len())
}
