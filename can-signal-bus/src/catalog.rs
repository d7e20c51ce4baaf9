//! Signal catalogs
//!
//! Per bus instance there are two catalogs, both immutable once the pipeline
//! starts: a decode catalog mapping message id to the signal definitions
//! packed into that frame, and an encode catalog mapping a writable signal
//! name to its message template. A message id absent from the decode catalog
//! is simply not interesting traffic - the transport reader drops such frames
//! before they are ever queued.

use crate::types::{BusError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mask applied to 29-bit extended identifiers before catalog lookup.
///
/// Extracts the 16-bit field at bit 13, reproducing the id scheme of the
/// reference deployment. Must be preserved bit-for-bit.
pub const EXTENDED_ID_MASK: u32 = ((1 << 16) - 1) << 13;

/// Apply the extended-id mask to a received 29-bit identifier.
pub fn mask_extended_id(id: u32) -> u32 {
    id & EXTENDED_ID_MASK
}

/// Bit-layout and scaling metadata for one signal packed inside a frame.
///
/// `start_bit` is the position of the field's least significant bit within
/// the frame accumulator built most-significant-byte first (so byte 0 of the
/// frame holds the topmost bits). Immutable once loaded into a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDefinition {
    /// Signal name, unique within its message id
    pub name: String,
    /// True if the raw field is two's-complement signed
    pub is_signed: bool,
    /// True if this signal arrives in frames with a 29-bit extended id
    pub is_extended: bool,
    /// Position of the field's LSB in the 64-bit frame accumulator
    pub start_bit: u8,
    /// Field width in bits (1-64)
    pub bit_length: u8,
    /// Multiplier from raw to physical value
    pub scale: f64,
    /// Additive offset, applied after scaling
    pub offset: f64,
    /// Engineering unit, informational only
    pub unit: String,
}

/// Encode-side template for one writable signal.
///
/// The default payload carries every bit not under application control
/// (constant flags, counters baked by the protocol). When `start_bit` is
/// `None` the default payload already encodes the whole command and the
/// request value is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    /// CAN message ID to transmit under
    pub id: u32,
    /// True if the frame should be sent with a 29-bit extended id
    pub is_extended: bool,
    /// Fixed byte pattern for all bits not injected from the request
    pub default_payload: u64,
    /// Injection bit offset for the request value, or `None` when the
    /// default payload is complete as-is
    pub start_bit: Option<u8>,
    /// Payload length in bytes (0-8)
    pub length: u8,
}

/// Statistics about a loaded catalog pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    /// Number of distinct message ids in the decode catalog
    pub num_messages: usize,
    /// Total number of signal definitions across all message ids
    pub num_signals: usize,
    /// Number of writable signal templates in the encode catalog
    pub num_templates: usize,
}

/// Decode catalog: message id -> signal definitions sharing that id.
///
/// Extended definitions are stored under their masked id so lookups with a
/// masked received id land on the same key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecodeCatalog {
    messages: HashMap<u32, Vec<SignalDefinition>>,
}

impl DecodeCatalog {
    /// Create a new empty decode catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signal definition under the given message id.
    ///
    /// Rejects definitions whose field does not fit the 64-bit frame
    /// accumulator, and duplicate names within one message id.
    pub fn insert(&mut self, id: u32, def: SignalDefinition) -> Result<()> {
        if def.bit_length == 0 || def.bit_length > 64 {
            return Err(BusError::InvalidSignalDefinition(format!(
                "signal '{}' has bit length {}, expected 1-64",
                def.name, def.bit_length
            )));
        }
        if def.start_bit as u32 + def.bit_length as u32 > 64 {
            return Err(BusError::FieldOutOfRange {
                start_bit: def.start_bit,
                bit_length: def.bit_length,
            });
        }

        let key = if def.is_extended { mask_extended_id(id) } else { id };
        let slot = self.messages.entry(key).or_default();
        if slot.iter().any(|existing| existing.name == def.name) {
            return Err(BusError::InvalidSignalDefinition(format!(
                "duplicate signal '{}' for message id 0x{:X}",
                def.name, key
            )));
        }
        slot.push(def);
        Ok(())
    }

    /// All definitions packed into frames with this (already masked) id.
    /// Unknown ids yield an empty slice.
    pub fn definitions(&self, id: u32) -> &[SignalDefinition] {
        self.messages.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if any definition exists for this (already masked) id
    pub fn contains(&self, id: u32) -> bool {
        self.messages.contains_key(&id)
    }

    /// Number of distinct message ids
    pub fn num_messages(&self) -> usize {
        self.messages.len()
    }

    /// Total number of signal definitions
    pub fn num_signals(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }
}

/// Encode catalog: writable signal name -> message template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodeCatalog {
    templates: HashMap<String, MessageTemplate>,
}

impl EncodeCatalog {
    /// Create a new empty encode catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message template under the given signal name.
    ///
    /// Rejects templates whose declared length exceeds 8 bytes, whose default
    /// payload has bits set beyond the declared length, or whose injection
    /// offset lies outside the 64-bit accumulator.
    pub fn insert(&mut self, name: impl Into<String>, template: MessageTemplate) -> Result<()> {
        let name = name.into();
        if template.length > 8 {
            return Err(BusError::InvalidMessageTemplate(format!(
                "template '{}' declares {} payload bytes, maximum is 8",
                name, template.length
            )));
        }
        if template.length < 8 && template.default_payload >> (template.length as u32 * 8) != 0 {
            return Err(BusError::InvalidMessageTemplate(format!(
                "template '{}' default payload does not fit {} bytes",
                name, template.length
            )));
        }
        if let Some(start_bit) = template.start_bit {
            if start_bit > 63 {
                return Err(BusError::FieldOutOfRange {
                    start_bit,
                    bit_length: 1,
                });
            }
        }
        if self.templates.contains_key(&name) {
            return Err(BusError::InvalidMessageTemplate(format!(
                "duplicate template '{}'",
                name
            )));
        }
        self.templates.insert(name, template);
        Ok(())
    }

    /// Look up the template for a writable signal name
    pub fn template(&self, name: &str) -> Option<&MessageTemplate> {
        self.templates.get(name)
    }

    /// Number of writable signal templates
    pub fn num_templates(&self) -> usize {
        self.templates.len()
    }
}

/// Compute statistics for a catalog pair
pub fn stats(decode: &DecodeCatalog, encode: &EncodeCatalog) -> CatalogStats {
    CatalogStats {
        num_messages: decode.num_messages(),
        num_signals: decode.num_signals(),
        num_templates: encode.num_templates(),
    }
}
