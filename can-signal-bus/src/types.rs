//! Core types for the CAN signal bus
//!
//! This module defines the ephemeral items that travel through the pipeline
//! queues, plus the error type used across the crate. Items are move-only:
//! whichever stage popped an item owns it until it hands it to the next queue
//! or drops it.

use std::fmt;

/// Result type for signal bus operations
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur in the signal bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Failed to open transport channel {channel}: {reason}")]
    TransportOpen { channel: u32, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Signal not found in write catalog: {0}")]
    SignalNotFound(String),

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),

    #[error("Invalid message template: {0}")]
    InvalidMessageTemplate(String),

    #[error("Bit field out of range: start bit {start_bit} + length {bit_length} exceeds 64 bits")]
    FieldOutOfRange { start_bit: u8, bit_length: u8 },

    #[error("Delivery sink fault: {0}")]
    SinkFault(String),

    #[error("Unknown bus instance: {0}")]
    UnknownBus(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A raw CAN frame moving between the transport boundary and the codec stages.
///
/// On the read path the id has already been masked if the frame arrived with
/// the extended flag set (see [`crate::catalog::mask_extended_id`]). On the
/// write path the frame is transmitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// CAN message ID (post-masking on the read path)
    pub id: u32,
    /// True if this frame uses a 29-bit extended identifier
    pub is_extended: bool,
    /// Payload bytes (0-8 for classic CAN)
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Declared payload length in bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// A decoded signal with its physical value, produced by the decoder stage
/// and consumed by the delivery dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal {
    /// Signal name from the decode catalog
    pub name: String,
    /// Physical value after scale and offset
    pub value: f64,
    /// Engineering unit (e.g., "rpm", "Deg C", "%")
    pub unit: String,
}

impl fmt::Display for DecodedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:.3} {}", self.name, self.value, self.unit)
    }
}

/// An application write request: a named signal and its raw integer value.
///
/// The value is the already-quantized raw integer, not a physical value.
/// The caller is responsible for inverting scale and offset before writing;
/// this asymmetry with the decode path is deliberate and relied upon by
/// existing callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Name of the writable signal (encode catalog key)
    pub name: String,
    /// Raw integer value to inject at the template's start bit
    pub value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_frame_dlc() {
        let frame = RawFrame {
            id: 0x123,
            is_extended: false,
            data: vec![0xAB, 0xCD, 0xEF],
        };
        assert_eq!(frame.dlc(), 3);
    }

    #[test]
    fn test_decoded_signal_display() {
        let signal = DecodedSignal {
            name: "engineRpm".to_string(),
            value: 1500.25,
            unit: "rpm".to_string(),
        };
        assert_eq!(format!("{}", signal), "engineRpm = 1500.250 rpm");
    }

    #[test]
    fn test_error_display() {
        let err = BusError::FieldOutOfRange {
            start_bit: 60,
            bit_length: 16,
        };
        assert!(format!("{}", err).contains("exceeds 64 bits"));
    }
}
