//! Bit-field codec
//!
//! Pure, stateless functions for extracting and injecting packed bit fields.
//! A frame's payload bytes are reconstructed into a single big-endian
//! unsigned integer (byte 0 most significant); fields are addressed by the
//! position of their least significant bit within that accumulator.
//!
//! Fields that would not fit the 64-bit accumulator are rejected rather than
//! silently truncated.

use crate::catalog::{MessageTemplate, SignalDefinition};
use crate::types::{BusError, RawFrame, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Build the 64-bit frame accumulator from payload bytes.
///
/// Byte `i` contributes `byte[i] << ((len - 1 - i) * 8)`, i.e. byte 0 is the
/// most significant. Payloads longer than 8 bytes contribute only their
/// first 8.
pub fn frame_value(data: &[u8]) -> u64 {
    let len = data.len().min(8);
    if len == 0 {
        return 0;
    }
    BigEndian::read_uint(&data[..len], len)
}

/// Extract the raw unsigned field at `start_bit`/`bit_length` from the
/// frame accumulator.
pub fn extract_raw(frame: u64, start_bit: u8, bit_length: u8) -> Result<u64> {
    if bit_length == 0 || start_bit as u32 + bit_length as u32 > 64 {
        return Err(BusError::FieldOutOfRange {
            start_bit,
            bit_length,
        });
    }
    let low_mask = if bit_length == 64 {
        u64::MAX
    } else {
        (1u64 << bit_length) - 1
    };
    Ok((frame >> start_bit) & low_mask)
}

/// Sign-extend a raw field value from `bit_length` bits to 64 bits.
///
/// If the field's top bit is set, the upper bits are filled with ones
/// (two's-complement widening).
pub fn sign_extend(raw: u64, bit_length: u8) -> i64 {
    if bit_length >= 64 {
        return raw as i64;
    }
    let sign_bit = 1u64 << (bit_length - 1);
    if raw & sign_bit != 0 {
        (raw | (!0u64 << bit_length)) as i64
    } else {
        raw as i64
    }
}

/// Decode one signal from payload bytes to its physical value.
///
/// Physical value = raw * scale + offset, with the raw value sign-extended
/// first when the definition is signed.
pub fn decode(def: &SignalDefinition, data: &[u8]) -> Result<f64> {
    let raw = extract_raw(frame_value(data), def.start_bit, def.bit_length)?;
    let raw = if def.is_signed {
        sign_extend(raw, def.bit_length) as f64
    } else {
        raw as f64
    };
    Ok(raw * def.scale + def.offset)
}

/// Encode a raw integer value into payload bytes using a message template.
///
/// With an injection offset the value is shifted into place and added to the
/// default payload; without one the default payload is used as-is and the
/// value is ignored. The resulting integer is serialized least-significant
/// byte first for the template's declared length.
pub fn encode_payload(template: &MessageTemplate, value: u64) -> Result<Vec<u8>> {
    if template.length > 8 {
        return Err(BusError::InvalidMessageTemplate(format!(
            "payload length {} exceeds 8 bytes",
            template.length
        )));
    }
    let mut payload = match template.start_bit {
        Some(start_bit) => {
            if start_bit > 63 {
                return Err(BusError::FieldOutOfRange {
                    start_bit,
                    bit_length: 1,
                });
            }
            template.default_payload.wrapping_add(value << start_bit)
        }
        None => template.default_payload,
    };

    let len = template.length as usize;
    if len == 0 {
        return Ok(Vec::new());
    }
    if len < 8 {
        payload &= (1u64 << (len * 8)) - 1;
    }
    let mut data = vec![0u8; len];
    LittleEndian::write_uint(&mut data, payload, len);
    Ok(data)
}

/// Encode a complete frame for transmission from a template and raw value.
pub fn encode_frame(template: &MessageTemplate, value: u64) -> Result<RawFrame> {
    Ok(RawFrame {
        id: template.id,
        is_extended: template.is_extended,
        data: encode_payload(template, value)?,
    })
}
