//! Frame decoding and request encoding.
//!
//! The wire format is minimal: byte 0 is the sender tag, byte 1 the channel
//! tag, and the remaining bytes carry the raw value at the width, byte order
//! and signedness declared by the field registry. Requests going the other
//! way reuse the same two-byte header, followed by a payload only for
//! writes.

use thiserror::Error;

use crate::registry::{get_field_def, AssistLevel, Endian, FieldKind, Sender};

/// Errors produced by the frame decoder and request encoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The buffer ends before the header, or before the recognized field's
    /// declared width. Callers discard the frame; nothing is counted.
    #[error("frame too short: need {needed} bytes, got {got}")]
    FrameTooShort { needed: usize, got: usize },
    /// A write request's payload does not match the target field's width.
    #[error("payload for {field} must be {expected} bytes, got {got}")]
    PayloadWidthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Assist level as reported by the motor: a recognized profile, or the raw
/// byte when the firmware sends a value this crate doesn't know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assist {
    Known(AssistLevel),
    Raw(u8),
}

impl Assist {
    pub const fn from_raw(raw: u8) -> Self {
        match AssistLevel::from_raw(raw) {
            Some(level) => Self::Known(level),
            None => Self::Raw(raw),
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Assist(Assist),
}

/// The result of decoding one notification frame.
///
/// `field_name`, `value` and `unit` are all `None` when the
/// (sender, channel) pair has no registry entry. That is still a
/// successfully parsed message, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub sender: Sender,
    pub channel: u8,
    pub field_name: Option<&'static str>,
    pub value: Option<FieldValue>,
    pub unit: Option<&'static str>,
    /// The frame bytes as received, header included.
    pub raw: Vec<u8>,
}

// sender + channel + at least one value byte
const MIN_FRAME_LEN: usize = 3;

/// Decode one notification frame.
///
/// An unknown (sender, channel) pair decodes to a message with no field
/// metadata rather than failing, so fields added by newer firmware pass
/// through harmlessly. [`ProtocolError::FrameTooShort`] is returned when the
/// buffer ends before the header or before the recognized field's declared
/// width.
pub fn parse_message(data: &[u8]) -> Result<ParsedMessage, ProtocolError> {
    if data.len() < MIN_FRAME_LEN {
        return Err(ProtocolError::FrameTooShort {
            needed: MIN_FRAME_LEN,
            got: data.len(),
        });
    }

    let sender = Sender::from_byte(data[0]);
    let channel = data[1];

    let Some(def) = get_field_def(sender, channel) else {
        return Ok(ParsedMessage {
            sender,
            channel,
            field_name: None,
            value: None,
            unit: None,
            raw: data.to_vec(),
        });
    };

    let needed = 2 + def.byte_width;
    if data.len() < needed {
        return Err(ProtocolError::FrameTooShort {
            needed,
            got: data.len(),
        });
    }

    let raw_int = read_raw_int(&data[2..needed], def.endian, def.signed);
    let value = match def.kind {
        FieldKind::Scalar => FieldValue::Number(raw_int as f64 * def.scale),
        FieldKind::AssistLevel => FieldValue::Assist(Assist::from_raw(raw_int as u8)),
    };

    Ok(ParsedMessage {
        sender,
        channel,
        field_name: Some(def.name),
        value: Some(value),
        unit: def.unit,
        raw: data.to_vec(),
    })
}

/// Build an outbound request frame: `[sender, channel]`, plus the payload
/// for write requests.
///
/// A payload whose length disagrees with the target field's registered
/// width is refused, to catch programmer error before it reaches the bike.
/// Payloads for unregistered fields are passed through unchecked.
pub fn build_request(
    sender: Sender,
    channel: u8,
    payload: Option<&[u8]>,
) -> Result<Vec<u8>, ProtocolError> {
    if let (Some(payload), Some(def)) = (payload, get_field_def(sender, channel)) {
        if payload.len() != def.byte_width {
            return Err(ProtocolError::PayloadWidthMismatch {
                field: def.name,
                expected: def.byte_width,
                got: payload.len(),
            });
        }
    }

    let mut frame = Vec::with_capacity(2 + payload.map_or(0, <[u8]>::len));
    frame.push(sender.to_byte());
    frame.push(channel);
    if let Some(payload) = payload {
        frame.extend_from_slice(payload);
    }
    Ok(frame)
}

/// Assemble raw bytes into an integer honoring byte order, sign-extending
/// from the declared width when signed.
fn read_raw_int(bytes: &[u8], endian: Endian, signed: bool) -> i64 {
    let mut acc: u64 = 0;
    match endian {
        Endian::Little => {
            for (i, byte) in bytes.iter().enumerate() {
                acc |= (*byte as u64) << (8 * i);
            }
        }
        Endian::Big => {
            for byte in bytes {
                acc = (acc << 8) | *byte as u64;
            }
        }
    }
    if signed {
        let unused = 64 - 8 * bytes.len() as u32;
        ((acc << unused) as i64) >> unused
    } else {
        acc as i64
    }
}

#[test]
fn test_parse_battery_charge() {
    let frame = hex::decode("000c55").unwrap();
    let msg = parse_message(&frame).unwrap();
    assert_eq!(msg.sender, Sender::Battery);
    assert_eq!(msg.channel, 0x0C);
    assert_eq!(msg.field_name, Some("battery_charge_pct"));
    assert_eq!(msg.value, Some(FieldValue::Number(85.0)));
    assert_eq!(msg.unit, Some("%"));
    assert_eq!(msg.raw, frame);
}

#[test]
fn test_parse_speed_two_byte_little_endian() {
    let frame = hex::decode("0102ff00").unwrap();
    let msg = parse_message(&frame).unwrap();
    assert_eq!(msg.field_name, Some("speed_kmh"));
    assert_eq!(msg.value, Some(FieldValue::Number(25.5)));
    assert_eq!(msg.unit, Some("km/h"));
}

#[test]
fn test_parse_too_short() {
    for data in [&[][..], &[0x00][..], &[0x00, 0x0C][..]] {
        let err = parse_message(data).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::FrameTooShort {
                needed: 3,
                got: data.len()
            }
        );
    }
}

#[test]
fn test_parse_truncated_known_field() {
    // speed_kmh is two bytes wide, only one byte of value present
    let err = parse_message(&[0x01, 0x02, 0xFF]).unwrap_err();
    assert_eq!(err, ProtocolError::FrameTooShort { needed: 4, got: 3 });
}

#[test]
fn test_parse_unknown_sender_is_success() {
    let msg = parse_message(&[0x03, 0x00, 0x42]).unwrap();
    assert_eq!(msg.sender, Sender::Unknown(0x03));
    assert_eq!(msg.channel, 0x00);
    assert_eq!(msg.field_name, None);
    assert_eq!(msg.value, None);
    assert_eq!(msg.unit, None);
    assert_eq!(msg.raw, vec![0x03, 0x00, 0x42]);
}

#[test]
fn test_parse_unknown_channel_is_success() {
    let msg = parse_message(&[0x00, 0x7F, 0x01]).unwrap();
    assert_eq!(msg.field_name, None);
    assert_eq!(msg.value, None);
}

#[test]
fn test_parse_signed_current() {
    // -256 raw at 0.01 A per count: the battery is charging at 2.56 A
    let msg = parse_message(&[0x00, 0x06, 0x00, 0xFF]).unwrap();
    assert_eq!(msg.field_name, Some("battery_current_a"));
    let Some(FieldValue::Number(amps)) = msg.value else {
        panic!("expected a numeric value");
    };
    assert!((amps + 2.56).abs() < 1e-9);
}

#[test]
fn test_parse_negative_battery_temp() {
    let msg = parse_message(&[0x00, 0x03, 0xF6]).unwrap();
    assert_eq!(msg.field_name, Some("battery_temp_c"));
    assert_eq!(msg.value, Some(FieldValue::Number(-10.0)));
}

#[test]
fn test_parse_assist_level_known() {
    let msg = parse_message(&[0x01, 0x0D, 0x02]).unwrap();
    assert_eq!(msg.field_name, Some("assist_level"));
    assert_eq!(
        msg.value,
        Some(FieldValue::Assist(Assist::Known(AssistLevel::Trail)))
    );
}

#[test]
fn test_parse_assist_level_unknown_keeps_raw() {
    let msg = parse_message(&[0x01, 0x0D, 0x09]).unwrap();
    assert_eq!(msg.field_name, Some("assist_level"));
    assert_eq!(msg.value, Some(FieldValue::Assist(Assist::Raw(9))));
}

#[test]
fn test_build_read_request() {
    let frame = build_request(Sender::Battery, 0x0C, None).unwrap();
    assert_eq!(frame, vec![0x00, 0x0C]);
}

#[test]
fn test_build_write_request() {
    let frame = build_request(Sender::Motor, 0x0D, Some(&[0x03])).unwrap();
    assert_eq!(frame, vec![0x01, 0x0D, 0x03]);
}

#[test]
fn test_build_write_request_rejects_wrong_width() {
    let err = build_request(Sender::Motor, 0x02, Some(&[0xFF])).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::PayloadWidthMismatch {
            field: "speed_kmh",
            expected: 2,
            got: 1
        }
    );
}

#[test]
fn test_build_request_unregistered_field_unchecked() {
    let frame = build_request(Sender::Unknown(0x03), 0x00, Some(&[0x01, 0x02, 0x03])).unwrap();
    assert_eq!(frame, vec![0x03, 0x00, 0x01, 0x02, 0x03]);
}

#[test]
fn test_read_raw_int_endianness_and_sign() {
    assert_eq!(read_raw_int(&[0x01, 0x02], Endian::Little, false), 0x0201);
    assert_eq!(read_raw_int(&[0x01, 0x02], Endian::Big, false), 0x0102);
    assert_eq!(read_raw_int(&[0x00, 0x80], Endian::Little, true), -32768);
    assert_eq!(read_raw_int(&[0x80, 0x00], Endian::Big, true), -32768);
    assert_eq!(read_raw_int(&[0xFF], Endian::Little, true), -1);
    assert_eq!(read_raw_int(&[0xFF], Endian::Little, false), 255);
}

#[test]
fn test_decode_round_trips_registry_raw_values() {
    // decoding then dividing out the scale must recover the raw integer for
    // every registered scalar field
    for def in crate::registry::all_field_defs() {
        if def.kind != FieldKind::Scalar {
            continue;
        }
        let raw: i64 = if def.signed { -5 } else { 5 };
        let le = (raw as u64).to_le_bytes();
        let mut frame = vec![def.sender.to_byte(), def.channel];
        match def.endian {
            Endian::Little => frame.extend_from_slice(&le[..def.byte_width]),
            Endian::Big => frame.extend(le[..def.byte_width].iter().rev()),
        }
        let msg = parse_message(&frame).unwrap();
        let Some(FieldValue::Number(value)) = msg.value else {
            panic!("{} did not decode to a number", def.name);
        };
        assert_eq!((value / def.scale).round() as i64, raw, "{}", def.name);
    }
}

#[test]
fn test_build_request_round_trips_through_parse() {
    let frame = build_request(Sender::Motor, 0x02, Some(&[0xFF, 0x00])).unwrap();
    let msg = parse_message(&frame).unwrap();
    assert_eq!(msg.field_name, Some("speed_kmh"));
    assert_eq!(msg.value, Some(FieldValue::Number(25.5)));
}
