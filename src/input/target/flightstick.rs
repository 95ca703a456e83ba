//! The flightstick target exposes the physical flightstick as a uinput
//! joystick with the same identity as the USB device.
use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, EventType, InputEvent, InputId, KeyCode,
    SynchronizationCode, UinputAbsSetup,
};

use crate::{
    config::HatAxes,
    drivers::flightstick::event::{Axis, Button, Event},
};

use super::{SinkError, SinkFactory, TargetConfig, VirtualSink};

/// Every key the virtual device declares
pub const KEYS: [KeyCode; 20] = [
    KeyCode::BTN_TRIGGER_HAPPY1,
    KeyCode::BTN_TRIGGER_HAPPY2,
    KeyCode::BTN_TRIGGER_HAPPY3,
    KeyCode::BTN_TRIGGER_HAPPY4,
    KeyCode::BTN_TRIGGER_HAPPY5,
    KeyCode::BTN_TRIGGER_HAPPY6,
    KeyCode::BTN_TRIGGER_HAPPY7,
    KeyCode::BTN_TRIGGER_HAPPY8,
    KeyCode::BTN_TRIGGER,
    KeyCode::BTN_THUMB,
    KeyCode::BTN_THUMB2,
    KeyCode::BTN_SOUTH,
    KeyCode::BTN_EAST,
    KeyCode::BTN_C,
    KeyCode::BTN_NORTH,
    KeyCode::BTN_WEST,
    KeyCode::BTN_Z,
    KeyCode::BTN_TL,
    KeyCode::BTN_TR,
    KeyCode::BTN_MODE,
];

/// Every axis the virtual device declares
pub const AXES: [Axis; 6] = [
    Axis::PosX,
    Axis::PosY,
    Axis::Rudder,
    Axis::Throttle,
    Axis::HatX,
    Axis::HatY,
];

/// Returns the key code a button is reported as
pub fn key_code(button: Button) -> KeyCode {
    match button {
        Button::A => KeyCode::BTN_SOUTH,
        Button::B => KeyCode::BTN_EAST,
        Button::FireC => KeyCode::BTN_TRIGGER_HAPPY1,
        Button::ButtonD => KeyCode::BTN_TRIGGER_HAPPY2,
        Button::Hat => KeyCode::BTN_TRIGGER_HAPPY3,
        Button::ButtonSt => KeyCode::BTN_TRIGGER_HAPPY4,
        Button::Dpad1Top => KeyCode::BTN_TRIGGER_HAPPY5,
        Button::Dpad1Right => KeyCode::BTN_TRIGGER_HAPPY6,
        Button::Dpad1Bottom => KeyCode::BTN_TRIGGER_HAPPY7,
        Button::Dpad1Left => KeyCode::BTN_TRIGGER_HAPPY8,
        Button::Launch => KeyCode::BTN_THUMB,
        Button::Trigger => KeyCode::BTN_TRIGGER,
        Button::Dpad3Right => KeyCode::BTN_THUMB2,
        Button::Dpad3Middle => KeyCode::BTN_C,
        Button::Dpad3Left => KeyCode::BTN_NORTH,
        Button::ButtonSw1 => KeyCode::BTN_WEST,
        Button::Dpad2Top => KeyCode::BTN_Z,
        Button::Dpad2Right => KeyCode::BTN_TL,
        Button::Dpad2Bottom => KeyCode::BTN_TR,
        Button::Dpad2Left => KeyCode::BTN_MODE,
    }
}

/// Returns the absolute axis code an axis is reported as
pub fn axis_code(axis: Axis, hat_axes: HatAxes) -> AbsoluteAxisCode {
    match (axis, hat_axes) {
        (Axis::PosX, _) => AbsoluteAxisCode::ABS_X,
        (Axis::PosY, _) => AbsoluteAxisCode::ABS_Y,
        (Axis::Rudder, _) => AbsoluteAxisCode::ABS_RUDDER,
        (Axis::Throttle, _) => AbsoluteAxisCode::ABS_GAS,
        (Axis::HatX, HatAxes::Tilt) => AbsoluteAxisCode::ABS_TILT_X,
        (Axis::HatY, HatAxes::Tilt) => AbsoluteAxisCode::ABS_TILT_Y,
        (Axis::HatX, HatAxes::Rotation) => AbsoluteAxisCode::ABS_RX,
        (Axis::HatY, HatAxes::Rotation) => AbsoluteAxisCode::ABS_RY,
    }
}

/// Translate the given event into an evdev event
pub fn translate_event(event: &Event, hat_axes: HatAxes) -> InputEvent {
    match *event {
        Event::Button(button, input) => InputEvent::new(
            EventType::KEY.0,
            key_code(button).0,
            input.pressed as i32,
        ),
        Event::Axis(axis, input) => InputEvent::new(
            EventType::ABSOLUTE.0,
            axis_code(axis, hat_axes).0,
            input.value as i32,
        ),
    }
}

/// Creates uinput devices
#[derive(Debug, Default, Clone, Copy)]
pub struct UinputFactory;

impl SinkFactory for UinputFactory {
    type Sink = UinputSink;

    fn create(&self, config: &TargetConfig) -> Result<UinputSink, SinkError> {
        log::debug!("Creating virtual flightstick");
        let device = create_virtual_device(config)?;
        Ok(UinputSink {
            device,
            pending: Vec::new(),
        })
    }
}

/// A flightstick exposed through uinput
pub struct UinputSink {
    device: VirtualDevice,
    /// Events waiting for the next SYN_REPORT
    pending: Vec<InputEvent>,
}

impl VirtualSink for UinputSink {
    fn emit(&mut self, event: InputEvent) -> Result<(), SinkError> {
        // VirtualDevice::emit terminates every batch with its own SYN_REPORT,
        // so events are held back until the sync arrives.
        let is_sync = event.event_type() == EventType::SYNCHRONIZATION
            && event.code() == SynchronizationCode::SYN_REPORT.0;
        if !is_sync {
            self.pending.push(event);
            return Ok(());
        }

        let result = self.device.emit(self.pending.as_slice());
        self.pending.clear();
        result?;

        Ok(())
    }

    fn destroy(self) -> Result<(), SinkError> {
        // Closing the uinput file descriptor removes the device
        drop(self.device);
        Ok(())
    }
}

/// Create the virtual device to emulate
fn create_virtual_device(config: &TargetConfig) -> Result<VirtualDevice, SinkError> {
    // Setup Key inputs
    let mut keys = AttributeSet::<KeyCode>::new();
    for key in KEYS {
        keys.insert(key);
    }

    // Identify to the kernel as the physical device
    let id = InputId::new(
        BusType::BUS_USB,
        config.vendor_id,
        config.product_id,
        config.version,
    );

    let mut builder = VirtualDeviceBuilder::new()?
        .name(config.name.as_str())
        .input_id(id)
        .with_keys(&keys)?;

    // Setup ABS inputs
    let axis_setup = AbsInfo::new(0, 0, 255, 0, 0, 0);
    for axis in AXES {
        let setup = UinputAbsSetup::new(axis_code(axis, config.hat_axes), axis_setup);
        builder = builder.with_absolute_axis(&setup)?;
    }

    // Build the device
    let device = builder.build()?;

    Ok(device)
}
