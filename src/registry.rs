//! The field registry: which (sender, channel) pairs the bike pushes and how
//! to decode each one.
//!
//! Every notification frame starts with a sender byte and a channel byte.
//! The registry maps that pair to a [`FieldDefinition`] giving the value's
//! width, signedness, byte order, scale factor and unit. Lookups are total:
//! a pair with no entry yields `None`, never an error, so firmware additions
//! pass through the decoder harmlessly.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Which bike subsystem produced a frame. The first byte of every frame.
///
/// Tags not listed here are carried through as `Unknown` rather than
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    Battery,
    Motor,
    Settings,
    Unknown(u8),
}

impl Sender {
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Battery,
            0x01 => Self::Motor,
            0x02 => Self::Settings,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Battery => 0x00,
            Self::Motor => 0x01,
            Self::Settings => 0x02,
            Self::Unknown(byte) => byte,
        }
    }
}

/// Channels pushed by the battery controller (sender `0x00`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BatteryChannel {
    CapacityWh = 0x00,
    RemainingWh = 0x01,
    HealthPct = 0x02,
    TempC = 0x03,
    ChargeCycles = 0x04,
    VoltageV = 0x05,
    CurrentA = 0x06,
    ChargePct = 0x0C,
}

/// Channels pushed by the motor / drive unit (sender `0x01`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MotorChannel {
    OdometerKm = 0x00,
    SpeedKmh = 0x02,
    RiderPowerW = 0x03,
    MotorPowerW = 0x04,
    CadenceRpm = 0x05,
    TempC = 0x06,
    AssistLevel = 0x0D,
}

/// Channels pushed by the settings module (sender `0x02`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BikeSettingsChannel {
    AssistLev1Pct = 0x00,
    AssistLev2Pct = 0x01,
    AssistLev3Pct = 0x02,
}

/// Rider-selected assist profile as reported on the assist-level channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistLevel {
    Off,
    Eco,
    Trail,
    Turbo,
}

impl AssistLevel {
    /// The profile for a raw assist byte, or `None` for values this crate
    /// doesn't know. Callers keep the raw byte in that case.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::Eco),
            2 => Some(Self::Trail),
            3 => Some(Self::Turbo),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Eco => "Eco",
            Self::Trail => "Trail",
            Self::Turbo => "Turbo",
        }
    }
}

/// Byte order of a multi-byte raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// How a raw integer becomes a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A scaled numeric quantity.
    Scalar,
    /// The symbolic assist level, with a raw-byte fallback.
    AssistLevel,
}

/// One registry entry: how to decode the value carried by a
/// (sender, channel) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDefinition {
    pub sender: Sender,
    pub channel: u8,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    /// Raw value width in bytes.
    pub byte_width: usize,
    /// Multiplier from raw integer to physical value. Applied in floating
    /// arithmetic at conversion time only; raw extraction stays integral.
    pub scale: f64,
    pub signed: bool,
    pub endian: Endian,
    pub kind: FieldKind,
}

const fn scalar(
    sender: Sender,
    channel: u8,
    name: &'static str,
    unit: &'static str,
    byte_width: usize,
    scale: f64,
    signed: bool,
) -> FieldDefinition {
    FieldDefinition {
        sender,
        channel,
        name,
        unit: Some(unit),
        byte_width,
        scale,
        signed,
        endian: Endian::Little,
        kind: FieldKind::Scalar,
    }
}

/// Every (sender, channel) pair this crate knows how to decode.
///
/// Only battery charge percent and motor speed have been confirmed against a
/// live bike; the remaining channel numbers, widths and scales are
/// provisional, kept here as data so a corrected entry is a one-line edit.
pub static FIELD_DEFS: [FieldDefinition; 18] = [
    // Battery controller
    scalar(Sender::Battery, BatteryChannel::CapacityWh as u8, "battery_capacity_wh", "Wh", 2, 1.0, false),
    scalar(Sender::Battery, BatteryChannel::RemainingWh as u8, "battery_remaining_wh", "Wh", 2, 1.0, false),
    scalar(Sender::Battery, BatteryChannel::HealthPct as u8, "battery_health_pct", "%", 1, 1.0, false),
    scalar(Sender::Battery, BatteryChannel::TempC as u8, "battery_temp_c", "°C", 1, 1.0, true),
    scalar(Sender::Battery, BatteryChannel::ChargeCycles as u8, "battery_charge_cycles", "cycles", 2, 1.0, false),
    scalar(Sender::Battery, BatteryChannel::VoltageV as u8, "battery_voltage_v", "V", 2, 0.01, false),
    // Negative while charging
    scalar(Sender::Battery, BatteryChannel::CurrentA as u8, "battery_current_a", "A", 2, 0.01, true),
    scalar(Sender::Battery, BatteryChannel::ChargePct as u8, "battery_charge_pct", "%", 1, 1.0, false),
    // Motor / drive unit
    scalar(Sender::Motor, MotorChannel::OdometerKm as u8, "odometer_km", "km", 4, 0.1, false),
    scalar(Sender::Motor, MotorChannel::SpeedKmh as u8, "speed_kmh", "km/h", 2, 0.1, false),
    scalar(Sender::Motor, MotorChannel::RiderPowerW as u8, "rider_power_w", "W", 2, 1.0, false),
    scalar(Sender::Motor, MotorChannel::MotorPowerW as u8, "motor_power_w", "W", 2, 1.0, false),
    scalar(Sender::Motor, MotorChannel::CadenceRpm as u8, "cadence_rpm", "rpm", 2, 1.0, false),
    scalar(Sender::Motor, MotorChannel::TempC as u8, "motor_temp_c", "°C", 1, 1.0, true),
    FieldDefinition {
        sender: Sender::Motor,
        channel: MotorChannel::AssistLevel as u8,
        name: "assist_level",
        unit: None,
        byte_width: 1,
        scale: 1.0,
        signed: false,
        endian: Endian::Little,
        kind: FieldKind::AssistLevel,
    },
    // Settings module
    scalar(Sender::Settings, BikeSettingsChannel::AssistLev1Pct as u8, "assist_lev1_pct", "%", 1, 1.0, false),
    scalar(Sender::Settings, BikeSettingsChannel::AssistLev2Pct as u8, "assist_lev2_pct", "%", 1, 1.0, false),
    scalar(Sender::Settings, BikeSettingsChannel::AssistLev3Pct as u8, "assist_lev3_pct", "%", 1, 1.0, false),
];

static FIELD_INDEX: LazyLock<HashMap<(u8, u8), &'static FieldDefinition>> = LazyLock::new(|| {
    FIELD_DEFS
        .iter()
        .map(|def| ((def.sender.to_byte(), def.channel), def))
        .collect()
});

/// Look up the field definition for a (sender, channel) pair.
pub fn get_field_def(sender: Sender, channel: u8) -> Option<&'static FieldDefinition> {
    FIELD_INDEX.get(&(sender.to_byte(), channel)).copied()
}

/// All registered field definitions, for diagnostics and enumeration.
pub fn all_field_defs() -> &'static [FieldDefinition] {
    &FIELD_DEFS
}

#[test]
fn test_get_field_def_speed() {
    let def = get_field_def(Sender::Motor, MotorChannel::SpeedKmh as u8).unwrap();
    assert_eq!(def.name, "speed_kmh");
    assert_eq!(def.unit, Some("km/h"));
    assert_eq!(def.byte_width, 2);
    assert_eq!(def.scale, 0.1);
    assert_eq!(def.endian, Endian::Little);
    assert!(!def.signed);
}

#[test]
fn test_get_field_def_battery_charge() {
    let def = get_field_def(Sender::Battery, BatteryChannel::ChargePct as u8).unwrap();
    assert_eq!(def.name, "battery_charge_pct");
    assert_eq!(def.byte_width, 1);
    assert_eq!(def.kind, FieldKind::Scalar);
}

#[test]
fn test_get_field_def_unknown_pair_is_none() {
    assert!(get_field_def(Sender::Battery, 0x7F).is_none());
    assert!(get_field_def(Sender::Unknown(0x03), 0x00).is_none());
    assert!(get_field_def(Sender::Settings, 0x0C).is_none());
}

#[test]
fn test_field_defs_have_unique_keys() {
    let mut seen = std::collections::HashSet::new();
    for def in all_field_defs() {
        assert!(
            seen.insert((def.sender.to_byte(), def.channel)),
            "duplicate registry key for {}",
            def.name
        );
    }
}

#[test]
fn test_sender_byte_round_trip() {
    for byte in 0..=u8::MAX {
        assert_eq!(Sender::from_byte(byte).to_byte(), byte);
    }
}

#[test]
fn test_assist_level_from_raw() {
    assert_eq!(AssistLevel::from_raw(0), Some(AssistLevel::Off));
    assert_eq!(AssistLevel::from_raw(1), Some(AssistLevel::Eco));
    assert_eq!(AssistLevel::from_raw(2), Some(AssistLevel::Trail));
    assert_eq!(AssistLevel::from_raw(3), Some(AssistLevel::Turbo));
    assert_eq!(AssistLevel::from_raw(4), None);
    assert_eq!(AssistLevel::from_raw(99), None);
}
