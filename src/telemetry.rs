//! The mutable telemetry aggregate fed by parsed notification frames.

use crate::message::{Assist, FieldValue, ParsedMessage};

/// Battery controller state. Every field stays `None` until the bike has
/// pushed it at least once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatteryState {
    /// State of charge in %
    pub charge_pct: Option<u8>,
    /// Design capacity in Wh
    pub capacity_wh: Option<f64>,
    /// Remaining energy in Wh
    pub remaining_wh: Option<f64>,
    /// Health in % of design capacity
    pub health_pct: Option<u8>,
    /// Battery temperature in °C
    pub temp_c: Option<i8>,
    /// Lifetime charge cycles
    pub charge_cycles: Option<u16>,
    /// Pack voltage in V
    pub voltage_v: Option<f64>,
    /// Pack current in A. Negative while charging
    pub current_a: Option<f64>,
}

/// Motor and rider state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotorState {
    /// Current speed in km/h
    pub speed_kmh: Option<f64>,
    /// Rider input power in W
    pub rider_power_w: Option<f64>,
    /// Motor output power in W
    pub motor_power_w: Option<f64>,
    /// Pedal cadence in rpm
    pub cadence_rpm: Option<f64>,
    /// Lifetime distance in km
    pub odometer_km: Option<f64>,
    /// Motor temperature in °C
    pub motor_temp_c: Option<i8>,
    /// Selected assist profile, or the raw byte for unknown values
    pub assist_level: Option<Assist>,
}

/// Configured support percentage per assist level. Rarely pushed;
/// informational.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BikeSettings {
    pub assist_lev1_pct: Option<u8>,
    pub assist_lev2_pct: Option<u8>,
    pub assist_lev3_pct: Option<u8>,
}

/// Aggregate of everything received from one bike.
///
/// Every message folded in increments `message_count`, recognized or not.
/// Only messages carrying a field name write state, and each writes exactly
/// the field it names, leaving the rest untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub battery: BatteryState,
    pub motor: MotorState,
    pub settings: BikeSettings,
    /// Messages folded in so far. Never reset.
    pub message_count: u64,
}

impl TelemetrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one parsed message into the snapshot.
    ///
    /// Messages without a field name (unknown sender or channel) advance
    /// the counter and touch nothing else.
    pub fn update_from_message(&mut self, msg: &ParsedMessage) {
        self.message_count += 1;

        let (Some(name), Some(value)) = (msg.field_name, msg.value) else {
            return;
        };

        match (name, value) {
            ("battery_charge_pct", FieldValue::Number(v)) => self.battery.charge_pct = Some(v as u8),
            ("battery_capacity_wh", FieldValue::Number(v)) => self.battery.capacity_wh = Some(v),
            ("battery_remaining_wh", FieldValue::Number(v)) => self.battery.remaining_wh = Some(v),
            ("battery_health_pct", FieldValue::Number(v)) => self.battery.health_pct = Some(v as u8),
            ("battery_temp_c", FieldValue::Number(v)) => self.battery.temp_c = Some(v as i8),
            ("battery_charge_cycles", FieldValue::Number(v)) => {
                self.battery.charge_cycles = Some(v as u16)
            }
            ("battery_voltage_v", FieldValue::Number(v)) => self.battery.voltage_v = Some(v),
            ("battery_current_a", FieldValue::Number(v)) => self.battery.current_a = Some(v),
            ("speed_kmh", FieldValue::Number(v)) => self.motor.speed_kmh = Some(v),
            ("rider_power_w", FieldValue::Number(v)) => self.motor.rider_power_w = Some(v),
            ("motor_power_w", FieldValue::Number(v)) => self.motor.motor_power_w = Some(v),
            ("cadence_rpm", FieldValue::Number(v)) => self.motor.cadence_rpm = Some(v),
            ("odometer_km", FieldValue::Number(v)) => self.motor.odometer_km = Some(v),
            ("motor_temp_c", FieldValue::Number(v)) => self.motor.motor_temp_c = Some(v as i8),
            ("assist_level", FieldValue::Assist(assist)) => self.motor.assist_level = Some(assist),
            ("assist_lev1_pct", FieldValue::Number(v)) => {
                self.settings.assist_lev1_pct = Some(v as u8)
            }
            ("assist_lev2_pct", FieldValue::Number(v)) => {
                self.settings.assist_lev2_pct = Some(v as u8)
            }
            ("assist_lev3_pct", FieldValue::Number(v)) => {
                self.settings.assist_lev3_pct = Some(v as u8)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
fn parsed(data: &[u8]) -> ParsedMessage {
    crate::message::parse_message(data).unwrap()
}

#[test]
fn test_update_battery_charge() {
    let mut snap = TelemetrySnapshot::new();
    snap.update_from_message(&parsed(&[0x00, 0x0C, 0x55]));
    assert_eq!(snap.battery.charge_pct, Some(85));
    assert_eq!(snap.message_count, 1);
    // nothing else was touched
    assert_eq!(snap.battery.voltage_v, None);
    assert_eq!(snap.motor, MotorState::default());
    assert_eq!(snap.settings, BikeSettings::default());
}

#[test]
fn test_update_speed() {
    let mut snap = TelemetrySnapshot::new();
    snap.update_from_message(&parsed(&[0x01, 0x02, 0xFF, 0x00]));
    assert_eq!(snap.motor.speed_kmh, Some(25.5));
    assert_eq!(snap.message_count, 1);
}

#[test]
fn test_unrecognized_message_only_counts() {
    let mut snap = TelemetrySnapshot::new();
    snap.update_from_message(&parsed(&[0x03, 0x00, 0x42]));
    assert_eq!(snap.message_count, 1);
    assert_eq!(snap.battery, BatteryState::default());
    assert_eq!(snap.motor, MotorState::default());
    assert_eq!(snap.settings, BikeSettings::default());
}

#[test]
fn test_message_count_increments_by_one_per_call() {
    let mut snap = TelemetrySnapshot::new();
    snap.update_from_message(&parsed(&[0x00, 0x0C, 0x55]));
    snap.update_from_message(&parsed(&[0x03, 0x00, 0x42]));
    snap.update_from_message(&parsed(&[0x01, 0x02, 0xFF, 0x00]));
    assert_eq!(snap.message_count, 3);
}

#[test]
fn test_update_overwrites_only_the_named_field() {
    let mut snap = TelemetrySnapshot::new();
    snap.update_from_message(&parsed(&[0x01, 0x02, 0xFF, 0x00]));
    snap.update_from_message(&parsed(&[0x00, 0x0C, 0x37]));
    assert_eq!(snap.motor.speed_kmh, Some(25.5));
    assert_eq!(snap.battery.charge_pct, Some(55));
    snap.update_from_message(&parsed(&[0x00, 0x0C, 0x38]));
    assert_eq!(snap.battery.charge_pct, Some(56));
    assert_eq!(snap.message_count, 3);
}

#[test]
fn test_update_assist_level() {
    use crate::registry::AssistLevel;

    let mut snap = TelemetrySnapshot::new();
    snap.update_from_message(&parsed(&[0x01, 0x0D, 0x03]));
    assert_eq!(
        snap.motor.assist_level,
        Some(Assist::Known(AssistLevel::Turbo))
    );
    snap.update_from_message(&parsed(&[0x01, 0x0D, 0x09]));
    assert_eq!(snap.motor.assist_level, Some(Assist::Raw(9)));
}

#[test]
fn test_update_signed_fields() {
    let mut snap = TelemetrySnapshot::new();
    snap.update_from_message(&parsed(&[0x00, 0x03, 0xF6]));
    snap.update_from_message(&parsed(&[0x00, 0x06, 0x00, 0xFF]));
    assert_eq!(snap.battery.temp_c, Some(-10));
    let amps = snap.battery.current_a.unwrap();
    assert!((amps + 2.56).abs() < 1e-9);
}

#[test]
fn test_update_settings() {
    let mut snap = TelemetrySnapshot::new();
    snap.update_from_message(&parsed(&[0x02, 0x00, 0x1E]));
    snap.update_from_message(&parsed(&[0x02, 0x01, 0x3C]));
    snap.update_from_message(&parsed(&[0x02, 0x02, 0x64]));
    assert_eq!(snap.settings.assist_lev1_pct, Some(30));
    assert_eq!(snap.settings.assist_lev2_pct, Some(60));
    assert_eq!(snap.settings.assist_lev3_pct, Some(100));
}
