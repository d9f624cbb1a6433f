//! Read live telemetry from Specialized Turbo e-bikes over Bluetooth Low Energy.
//!
//! Turbo bikes (Levo, Vado, Como and friends) expose a GATT service whose
//! notification characteristic pushes small binary frames of the form
//! `[sender, channel, value...]`. This crate decodes those frames into typed,
//! scaled fields and accumulates them in a [`TelemetrySnapshot`].
//!
//! Currently the following data can be accessed:
//!
//! - Battery: state of charge (%), capacity and remaining energy (Wh),
//!   health (%), temperature (°C), charge cycles, voltage (V), current (A)
//! - Motor: speed (km/h), rider and motor power (W), cadence (rpm),
//!   odometer (km), temperature (°C), assist level
//! - Settings: configured support percentage per assist level
//!
//! # Example
//!
//! ```no_run
//! # use std::time::Duration;
//! #
//! # #[tokio::main]
//! # pub async fn main() {
//!     let mut client = turboread::BikeClient::discover().await.unwrap();
//!     loop {
//!         client.listen(Duration::from_secs(5)).await.unwrap();
//!         println!("{:?}", client.snapshot());
//!     }
//! # }
//! ```
//!
//! The protocol layer is pure and usable without any Bluetooth hardware:
//! [`parse_message`] decodes a frame, [`build_request`] encodes one, and
//! [`is_specialized_advertisement`] recognizes the bike during discovery.

mod bike_client;
mod gatt;
mod message;
mod registry;
mod telemetry;

pub use bike_client::BikeClient;
pub use gatt::{
    is_specialized_advertisement, ADVERTISING_MAGIC, GENERAL_WRITE_CHARACTERISTIC_ID,
    NORDIC_COMPANY_ID, REQUEST_READ_CHARACTERISTIC_ID, REQUEST_WRITE_CHARACTERISTIC_ID,
    TELEMETRY_NOTIFY_CHARACTERISTIC_ID, TURBO_SERVICE_ID,
};
pub use message::{build_request, parse_message, Assist, FieldValue, ParsedMessage, ProtocolError};
pub use registry::{
    all_field_defs, get_field_def, AssistLevel, BatteryChannel, BikeSettingsChannel, Endian,
    FieldDefinition, FieldKind, MotorChannel, Sender,
};
pub use telemetry::{BatteryState, BikeSettings, MotorState, TelemetrySnapshot};
