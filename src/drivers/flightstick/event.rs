/// Events that can be emitted by the flightstick. Each event names the field
/// that changed and carries its new logical value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Button(Button, BinaryInput),
    Axis(Axis, AxisInput),
}

/// [BinaryInput] contains either pressed or unpressed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinaryInput {
    pub pressed: bool,
}

/// [AxisInput] is a single absolute axis in the range 0-255
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisInput {
    pub value: u8,
}

/// Absolute axes from the primary report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Stick left/right
    PosX,
    /// Stick forward/back
    PosY,
    /// Stick twist
    Rudder,
    /// Throttle lever
    Throttle,
    /// Thumb hat left/right
    HatX,
    /// Thumb hat up/down
    HatY,
}

/// Buttons reported across all three reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    // Primary report
    A,
    B,

    // Aux A report
    FireC,
    ButtonD,
    /// Hat press
    Hat,
    ButtonSt,
    Dpad1Top,
    Dpad1Right,
    Dpad1Bottom,
    Dpad1Left,
    Launch,
    Trigger,

    // Aux B report
    Dpad3Right,
    Dpad3Middle,
    Dpad3Left,
    ButtonSw1,
    Dpad2Top,
    Dpad2Right,
    Dpad2Bottom,
    Dpad2Left,
}
