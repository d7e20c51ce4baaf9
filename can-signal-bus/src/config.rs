//! Bus instance configuration
//!
//! Everything a [`crate::pipeline::SignalBus`] needs to bring one bus
//! instance up: the transport channel and bit timing, plus the decode and
//! encode catalogs. Configuration is plain data; the reference deployment's
//! high-speed and low-speed parameter sets are available as presets.

use crate::catalog::{DecodeCatalog, EncodeCatalog};
use serde::{Deserialize, Serialize};

/// Bit timing parameters for one CAN channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusTiming {
    /// Nominal bit rate in bits per second
    pub bit_rate: u32,
    /// Time segment 1 (quanta before the sample point)
    pub tseg1: u32,
    /// Time segment 2 (quanta after the sample point)
    pub tseg2: u32,
    /// Synchronization jump width
    pub sjw: u32,
    /// Number of sample points
    pub sample_points: u32,
    /// Clock synchronization mode
    pub sync_mode: u32,
}

impl BusTiming {
    /// Reference deployment high-speed bus: 500 kbit/s
    pub fn high_speed() -> Self {
        Self {
            bit_rate: 500_000,
            tseg1: 4,
            tseg2: 3,
            sjw: 1,
            sample_points: 1,
            sync_mode: 0,
        }
    }

    /// Reference deployment low-speed bus: 33.333 kbit/s
    pub fn low_speed() -> Self {
        Self {
            bit_rate: 33_333,
            tseg1: 12,
            tseg2: 3,
            sjw: 3,
            sample_points: 1,
            sync_mode: 0,
        }
    }
}

/// Channel selection and timing for one transport handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Hardware channel index
    pub channel: u32,
    /// Driver open flags, passed through opaquely
    pub flags: u32,
    /// Bit timing parameters
    pub timing: BusTiming,
}

impl TransportConfig {
    /// Create a transport configuration with no open flags
    pub fn new(channel: u32, timing: BusTiming) -> Self {
        Self {
            channel,
            flags: 0,
            timing,
        }
    }

    /// Builder method: set driver open flags
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

/// Full configuration for one bus instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusInstanceConfig {
    /// Instance name, used for thread names and diagnostics (e.g. "hs", "ls")
    pub name: String,
    /// Transport channel and timing, shared by the reader and writer handles
    pub transport: TransportConfig,
    /// Decode catalog: message id -> signal definitions
    pub decode: DecodeCatalog,
    /// Encode catalog: writable signal name -> message template
    pub encode: EncodeCatalog,
}

impl BusInstanceConfig {
    /// Create an instance configuration with empty catalogs
    pub fn new(name: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            name: name.into(),
            transport,
            decode: DecodeCatalog::new(),
            encode: EncodeCatalog::new(),
        }
    }

    /// Builder method: set the decode catalog
    pub fn with_decode_catalog(mut self, decode: DecodeCatalog) -> Self {
        self.decode = decode;
        self
    }

    /// Builder method: set the encode catalog
    pub fn with_encode_catalog(mut self, encode: EncodeCatalog) -> Self {
        self.encode = encode;
        self
    }
}
