use std::time::Duration;

use crate::usb::{TransferError, TransportError, UsbHandle};

use super::{
    event::{Axis, AxisInput, BinaryInput, Button, Event},
    hid_report::{
        self, AuxAReport, AuxBReport, PrimaryReport, Report, ReportKind, MAX_REPORT_SIZE,
    },
};

// Hardware ID's
pub const VID: u16 = 0x06d3;
pub const PID: u16 = 0x0f10;

/// Interrupt endpoint carrying the primary report
pub const PRIMARY_ENDPOINT: u8 = 0x81;
/// Vendor request returning the aux A report
pub const AUX_A_REQUEST: u8 = 0x00;
/// Vendor request returning the aux B report
pub const AUX_B_REQUEST: u8 = 0x01;
const VENDOR_VALUE: u16 = 0;
const VENDOR_INDEX: u16 = 1;

/// Raw values above this are reported as "up" for the analog-like buttons
pub const BUTTON_THRESHOLD: u8 = 0xCA;

/// Timeouts applied to each transfer
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub interrupt: Duration,
    pub control: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            interrupt: Duration::from_millis(1000),
            control: Duration::from_millis(200),
        }
    }
}

/// Last applied report of each kind
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct State {
    pub primary: PrimaryReport,
    pub aux_a: AuxAReport,
    pub aux_b: AuxBReport,
}

pub struct Driver<H: UsbHandle> {
    /// Opened USB device
    handle: H,
    timeouts: Timeouts,
    /// State for the device
    state: State,
}

impl<H: UsbHandle> Driver<H> {
    pub fn new(handle: H, timeouts: Timeouts) -> Self {
        Self {
            handle,
            timeouts,
            state: State::default(),
        }
    }

    /// Returns the last applied state of the device
    #[cfg(test)]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Poll the device for a report of the given kind and translate any
    /// changes into events. Only transport failures that leave the device
    /// unusable are returned as errors; everything else yields no events.
    pub fn poll(&mut self, kind: ReportKind) -> Result<Vec<Event>, TransferError> {
        let mut buf = [0; MAX_REPORT_SIZE];
        let buf = &mut buf[..kind.size()];

        let result = match kind {
            ReportKind::Primary => {
                self.handle
                    .read_interrupt(PRIMARY_ENDPOINT, buf, self.timeouts.interrupt)
            }
            ReportKind::AuxA => self.handle.read_vendor(
                AUX_A_REQUEST,
                VENDOR_VALUE,
                VENDOR_INDEX,
                buf,
                self.timeouts.control,
            ),
            ReportKind::AuxB => self.handle.read_vendor(
                AUX_B_REQUEST,
                VENDOR_VALUE,
                VENDOR_INDEX,
                buf,
                self.timeouts.control,
            ),
        };

        let bytes_read = match result {
            Ok(bytes_read) => bytes_read,
            Err(TransferError::Timeout) | Err(TransferError::Stall) => {
                log::trace!("No {kind} report available");
                return Ok(vec![]);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Ignoring failed {kind} transfer: {e}");
                return Ok(vec![]);
            }
        };

        let report = match hid_report::decode(kind, &buf[..bytes_read]) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("Discarding {kind} report: {e}");
                return Ok(vec![]);
            }
        };

        Ok(self.apply(report))
    }

    /// Update the state with the given report and return the resulting events
    pub fn apply(&mut self, report: Report) -> Vec<Event> {
        let kind = report.kind();
        let events = match report {
            Report::Primary(new) => {
                let old = std::mem::replace(&mut self.state.primary, new);
                translate_primary(&old, &new)
            }
            Report::AuxA(new) => {
                let old = std::mem::replace(&mut self.state.aux_a, new);
                translate_aux_a(&old, &new)
            }
            Report::AuxB(new) => {
                let old = std::mem::replace(&mut self.state.aux_b, new);
                if old.mode_select != new.mode_select {
                    log::debug!("Mode select changed to {:?}", new.mode_select);
                }
                translate_aux_b(&old, &new)
            }
        };

        if !events.is_empty() {
            log::trace!("Got {kind} events: {events:?}");
        }

        events
    }

    /// Release the underlying USB device
    pub fn close(self) -> Result<(), TransportError> {
        self.handle.close()
    }
}

/// Translate changes between two primary reports into events
pub fn translate_primary(old: &PrimaryReport, new: &PrimaryReport) -> Vec<Event> {
    if old == new {
        return vec![];
    }
    compare_primary(old, new)
}

/// Translate changes between two aux A reports into events
pub fn translate_aux_a(old: &AuxAReport, new: &AuxAReport) -> Vec<Event> {
    if old == new {
        return vec![];
    }
    compare_aux_a(old, new)
}

/// Translate changes between two aux B reports into events
pub fn translate_aux_b(old: &AuxBReport, new: &AuxBReport) -> Vec<Event> {
    if old == new {
        return vec![];
    }
    compare_aux_b(old, new)
}

/// Field by field comparison of two primary reports
pub fn compare_primary(old: &PrimaryReport, new: &PrimaryReport) -> Vec<Event> {
    let mut events = Vec::new();

    // Axis events
    axis_changed(&mut events, Axis::PosX, old.pos_x, new.pos_x);
    axis_changed(&mut events, Axis::PosY, old.pos_y, new.pos_y);
    axis_changed(&mut events, Axis::Rudder, old.rudder, new.rudder);
    axis_changed(&mut events, Axis::Throttle, old.throttle, new.throttle);
    axis_changed(&mut events, Axis::HatX, old.hat_x, new.hat_x);
    axis_changed(&mut events, Axis::HatY, old.hat_y, new.hat_y);

    // The buttons in this report are analog bytes; only threshold crossings count
    threshold_crossed(&mut events, Button::A, old.btn_a, new.btn_a);
    threshold_crossed(&mut events, Button::B, old.btn_b, new.btn_b);

    events
}

/// Field by field comparison of two aux A reports
pub fn compare_aux_a(old: &AuxAReport, new: &AuxAReport) -> Vec<Event> {
    let mut events = Vec::new();

    button_changed(&mut events, Button::FireC, old.fire_c, new.fire_c);
    button_changed(&mut events, Button::ButtonD, old.button_d, new.button_d);
    button_changed(&mut events, Button::Hat, old.hat, new.hat);
    button_changed(&mut events, Button::ButtonSt, old.button_st, new.button_st);
    button_changed(&mut events, Button::Dpad1Top, old.dpad1_top, new.dpad1_top);
    button_changed(&mut events, Button::Dpad1Right, old.dpad1_right, new.dpad1_right);
    button_changed(&mut events, Button::Dpad1Bottom, old.dpad1_bottom, new.dpad1_bottom);
    button_changed(&mut events, Button::Dpad1Left, old.dpad1_left, new.dpad1_left);
    button_changed(&mut events, Button::Launch, old.launch, new.launch);
    button_changed(&mut events, Button::Trigger, old.trigger, new.trigger);

    events
}

/// Field by field comparison of two aux B reports
pub fn compare_aux_b(old: &AuxBReport, new: &AuxBReport) -> Vec<Event> {
    let mut events = Vec::new();

    button_changed(&mut events, Button::Dpad3Right, old.dpad3_right, new.dpad3_right);
    button_changed(&mut events, Button::Dpad3Middle, old.dpad3_middle, new.dpad3_middle);
    button_changed(&mut events, Button::Dpad3Left, old.dpad3_left, new.dpad3_left);
    button_changed(&mut events, Button::ButtonSw1, old.button_sw1, new.button_sw1);
    button_changed(&mut events, Button::Dpad2Top, old.dpad2_top, new.dpad2_top);
    button_changed(&mut events, Button::Dpad2Right, old.dpad2_right, new.dpad2_right);
    button_changed(&mut events, Button::Dpad2Bottom, old.dpad2_bottom, new.dpad2_bottom);
    button_changed(&mut events, Button::Dpad2Left, old.dpad2_left, new.dpad2_left);

    events
}

/// Digital state of an analog-like button
pub fn digital(value: u8) -> bool {
    value > BUTTON_THRESHOLD
}

fn axis_changed(events: &mut Vec<Event>, axis: Axis, old: u8, new: u8) {
    if old != new {
        events.push(Event::Axis(axis, AxisInput { value: new }));
    }
}

// Buttons are active-low: a set bit (or a value above the threshold) means
// released.
fn threshold_crossed(events: &mut Vec<Event>, button: Button, old: u8, new: u8) {
    let (old, new) = (digital(old), digital(new));
    if old != new {
        events.push(Event::Button(button, BinaryInput { pressed: !new }));
    }
}

fn button_changed(events: &mut Vec<Event>, button: Button, old: bool, new: bool) {
    if old != new {
        events.push(Event::Button(button, BinaryInput { pressed: !new }));
    }
}
