//! Wire layouts for the three reports the flightstick produces.
//!
//! The device reports its state through three independent transfers: an
//! interrupt transfer carrying the analog axes (the primary report) and two
//! vendor control requests carrying the remaining buttons. Within each byte
//! the device packs bits LSB first, so with `msb0` numbering bit N of byte B
//! lives at index `B * 8 + (7 - N)`.
use std::fmt;

use packed_struct::prelude::*;
use packed_struct::{PackedStructSlice, PackingError};
use thiserror::Error;

/// Size in bytes of the largest report
pub const MAX_REPORT_SIZE: usize = 8;

/// Errors that can occur while decoding a raw report buffer
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("expected {expected} bytes for {kind} report, received {actual} bytes")]
    ShortRead {
        kind: ReportKind,
        expected: usize,
        actual: usize,
    },
    #[error("unable to unpack {kind} report: {source}")]
    Packing {
        kind: ReportKind,
        source: PackingError,
    },
}

/// The kinds of report polled from the device, in polling order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Analog axes and the two analog-like buttons (interrupt endpoint)
    Primary,
    /// First auxiliary button set (vendor request 0x00)
    AuxA,
    /// Second auxiliary button set (vendor request 0x01)
    AuxB,
}

impl ReportKind {
    /// All report kinds in the order they are polled
    pub const ALL: [ReportKind; 3] = [ReportKind::Primary, ReportKind::AuxA, ReportKind::AuxB];

    /// Returns the exact size in bytes of this report on the wire
    pub fn size(&self) -> usize {
        match self {
            ReportKind::Primary => 8,
            ReportKind::AuxA => 2,
            ReportKind::AuxB => 2,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportKind::Primary => "primary",
            ReportKind::AuxA => "aux-a",
            ReportKind::AuxB => "aux-b",
        };
        write!(f, "{name}")
    }
}

/// Position of the three-way mode switch on the base
#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ModeSelect {
    #[default]
    None = 0,
    M2 = 1,
    M1 = 2,
    M3 = 3,
}

/// Primary report read from interrupt endpoint 0x81
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "8")]
pub struct PrimaryReport {
    #[packed_field(bytes = "0")]
    pub pos_x: u8,
    #[packed_field(bytes = "1")]
    pub pos_y: u8,
    #[packed_field(bytes = "2")]
    pub rudder: u8,
    #[packed_field(bytes = "3")]
    pub throttle: u8,
    #[packed_field(bytes = "4")]
    pub hat_x: u8,
    #[packed_field(bytes = "5")]
    pub hat_y: u8,
    // Analog-like buttons, see driver::BUTTON_THRESHOLD
    #[packed_field(bytes = "6")]
    pub btn_a: u8,
    #[packed_field(bytes = "7")]
    pub btn_b: u8,
}

/// First auxiliary button report (vendor request 0x00). Every button is
/// active-low.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "2")]
pub struct AuxAReport {
    // byte 0
    #[packed_field(bits = "0")]
    pub dpad1_left: bool,
    #[packed_field(bits = "1")]
    pub dpad1_bottom: bool,
    #[packed_field(bits = "2")]
    pub dpad1_right: bool,
    #[packed_field(bits = "3")]
    pub dpad1_top: bool,
    #[packed_field(bits = "4")]
    pub button_st: bool,
    #[packed_field(bits = "5")]
    pub hat: bool, // Hat press
    #[packed_field(bits = "6")]
    pub button_d: bool,
    #[packed_field(bits = "7")]
    pub fire_c: bool,

    // byte 1
    #[packed_field(bits = "8")]
    pub reserved3: bool,
    #[packed_field(bits = "9")]
    pub trigger: bool,
    #[packed_field(bits = "10")]
    pub launch: bool,
    #[packed_field(bits = "11")]
    pub reserved2: bool,
    #[packed_field(bits = "12..=15")]
    pub reserved1: Integer<u8, packed_bits::Bits<4>>,
}

/// Second auxiliary button report (vendor request 0x01). Every button is
/// active-low.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "2")]
pub struct AuxBReport {
    // byte 0
    #[packed_field(bits = "0")]
    pub reserved2: bool,
    #[packed_field(bits = "1")]
    pub dpad3_left: bool,
    #[packed_field(bits = "2")]
    pub dpad3_middle: bool,
    #[packed_field(bits = "3")]
    pub dpad3_right: bool,
    #[packed_field(bits = "4..=7")]
    pub reserved1: Integer<u8, packed_bits::Bits<4>>,

    // byte 1
    #[packed_field(bits = "8")]
    pub dpad2_left: bool,
    #[packed_field(bits = "9")]
    pub dpad2_bottom: bool,
    #[packed_field(bits = "10")]
    pub dpad2_right: bool,
    #[packed_field(bits = "11")]
    pub dpad2_top: bool,
    #[packed_field(bits = "12")]
    pub button_sw1: bool,
    #[packed_field(bits = "13")]
    pub reserved3: bool,
    #[packed_field(bits = "14..=15", ty = "enum")]
    pub mode_select: ModeSelect,
}

/// A fully decoded report of any kind
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Report {
    Primary(PrimaryReport),
    AuxA(AuxAReport),
    AuxB(AuxBReport),
}

impl Report {
    /// Returns the kind of this report
    pub fn kind(&self) -> ReportKind {
        match self {
            Report::Primary(_) => ReportKind::Primary,
            Report::AuxA(_) => ReportKind::AuxA,
            Report::AuxB(_) => ReportKind::AuxB,
        }
    }
}

/// Decode the given buffer as a report of the given kind. The buffer must be
/// exactly the size of the report; nothing is decoded otherwise.
pub fn decode(kind: ReportKind, buf: &[u8]) -> Result<Report, DecodeError> {
    let expected = kind.size();
    if buf.len() != expected {
        return Err(DecodeError::ShortRead {
            kind,
            expected,
            actual: buf.len(),
        });
    }

    let report = match kind {
        ReportKind::Primary => PrimaryReport::unpack_from_slice(buf).map(Report::Primary),
        ReportKind::AuxA => AuxAReport::unpack_from_slice(buf).map(Report::AuxA),
        ReportKind::AuxB => AuxBReport::unpack_from_slice(buf).map(Report::AuxB),
    };

    report.map_err(|source| DecodeError::Packing { kind, source })
}
