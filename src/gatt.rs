//! GATT identifiers and advertisement recognition for Specialized Turbo
//! bikes.
//!
//! The characteristic UUIDs are opaque handles: telemetry notifications
//! arrive on the notify characteristic, encoded request frames go to the
//! read-request or write-request characteristic. The tail of the base UUID
//! spells out "TURBOHMI2017" in reversed ASCII.

use std::collections::HashMap;

use bluest::Uuid;

/// Bluetooth company identifier carried in the bike's advertisement
/// manufacturer data. Registered to Nordic Semiconductor, whose radio the
/// Turbo connect module is built on.
pub const NORDIC_COMPANY_ID: u16 = 0x0059;

/// Manufacturer-data values from a Turbo bike start with this prefix.
pub const ADVERTISING_MAGIC: &[u8] = b"TURBO";

/// Primary service carrying bike telemetry.
pub const TURBO_SERVICE_ID: &str = "00000001-3731-3032-494d-484f42525554";

/// Notification characteristic: inbound telemetry frames.
pub const TELEMETRY_NOTIFY_CHARACTERISTIC_ID: &str = "00000003-3731-3032-494d-484f42525554";

/// Write a read-request frame here to have the bike push a field.
pub const REQUEST_READ_CHARACTERISTIC_ID: &str = "00000011-3731-3032-494d-484f42525554";

/// Write a write-request frame here to change a field.
pub const REQUEST_WRITE_CHARACTERISTIC_ID: &str = "00000012-3731-3032-494d-484f42525554";

/// General-purpose write characteristic for pre-encoded frames.
pub const GENERAL_WRITE_CHARACTERISTIC_ID: &str = "00000021-3731-3032-494d-484f42525554";

/// True iff the advertisement manufacturer data identifies a Specialized
/// Turbo bike: the Nordic company id must be present as a key and its value
/// must start with [`ADVERTISING_MAGIC`].
///
/// A false result means "not this device family", never an error.
pub fn is_specialized_advertisement(manufacturer_data: &HashMap<u16, Vec<u8>>) -> bool {
    manufacturer_data
        .get(&NORDIC_COMPANY_ID)
        .is_some_and(|data| data.starts_with(ADVERTISING_MAGIC))
}

pub fn turbo_service_id() -> Uuid {
    Uuid::parse_str(TURBO_SERVICE_ID).unwrap()
}

pub fn telemetry_notify_characteristic_id() -> Uuid {
    Uuid::parse_str(TELEMETRY_NOTIFY_CHARACTERISTIC_ID).unwrap()
}

pub fn request_read_characteristic_id() -> Uuid {
    Uuid::parse_str(REQUEST_READ_CHARACTERISTIC_ID).unwrap()
}

pub fn request_write_characteristic_id() -> Uuid {
    Uuid::parse_str(REQUEST_WRITE_CHARACTERISTIC_ID).unwrap()
}

pub fn general_write_characteristic_id() -> Uuid {
    Uuid::parse_str(GENERAL_WRITE_CHARACTERISTIC_ID).unwrap()
}

#[test]
fn test_advertisement_match() {
    let data = HashMap::from([(0x0059u16, b"TURBOHMItest1234".to_vec())]);
    assert!(is_specialized_advertisement(&data));
}

#[test]
fn test_advertisement_empty_map() {
    assert!(!is_specialized_advertisement(&HashMap::new()));
}

#[test]
fn test_advertisement_wrong_company() {
    let data = HashMap::from([(0x004Cu16, b"TURBOHMItest1234".to_vec())]);
    assert!(!is_specialized_advertisement(&data));
}

#[test]
fn test_advertisement_wrong_prefix() {
    let data = HashMap::from([(0x0059u16, b"LEVOHMItest12345".to_vec())]);
    assert!(!is_specialized_advertisement(&data));
}

#[test]
fn test_advertisement_value_shorter_than_magic() {
    let data = HashMap::from([(0x0059u16, b"TUR".to_vec())]);
    assert!(!is_specialized_advertisement(&data));
}

#[test]
fn test_uuid_constants_parse() {
    turbo_service_id();
    telemetry_notify_characteristic_id();
    request_read_characteristic_id();
    request_write_characteristic_id();
    general_write_characteristic_id();
}
