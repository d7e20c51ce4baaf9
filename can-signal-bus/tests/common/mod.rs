//! Shared test fixtures: an in-memory transport and the reference catalogs.

use can_signal_bus::config::BusTiming;
use can_signal_bus::transport::{BusTransport, FrameKind, TransportFactory, TransportFrame};
use can_signal_bus::types::{BusError, Result};
use can_signal_bus::{DecodeCatalog, EncodeCatalog, MessageTemplate, SignalDefinition};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A frame recorded by the mock on transmit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFrame {
    pub channel: u32,
    pub id: u32,
    pub data: Vec<u8>,
    pub extended: bool,
}

/// In-memory transport: per-channel inbound frame feeds and a shared record
/// of everything written. Channels listed as failing refuse to open.
pub struct MockTransportFactory {
    inbound: Mutex<HashMap<u32, Arc<Mutex<VecDeque<TransportFrame>>>>>,
    written: Arc<Mutex<Vec<WrittenFrame>>>,
    failing_channels: Vec<u32>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self {
            inbound: Mutex::new(HashMap::new()),
            written: Arc::new(Mutex::new(Vec::new())),
            failing_channels: Vec::new(),
        }
    }

    pub fn with_failing_channel(mut self, channel: u32) -> Self {
        self.failing_channels.push(channel);
        self
    }

    /// Queue a frame for delivery on a channel's read side
    pub fn feed(&self, channel: u32, frame: TransportFrame) {
        let feed = self.feed_for(channel);
        feed.lock().unwrap().push_back(frame);
    }

    /// Everything transmitted so far, across all channels
    pub fn written(&self) -> Vec<WrittenFrame> {
        self.written.lock().unwrap().clone()
    }

    fn feed_for(&self, channel: u32) -> Arc<Mutex<VecDeque<TransportFrame>>> {
        let mut inbound = self.inbound.lock().unwrap();
        Arc::clone(inbound.entry(channel).or_default())
    }
}

impl TransportFactory for MockTransportFactory {
    fn open(&self, channel: u32, _flags: u32) -> Result<Box<dyn BusTransport>> {
        if self.failing_channels.contains(&channel) {
            return Err(BusError::TransportOpen {
                channel,
                reason: "no such channel".to_string(),
            });
        }
        Ok(Box::new(MockTransport {
            channel,
            feed: self.feed_for(channel),
            written: Arc::clone(&self.written),
        }))
    }
}

struct MockTransport {
    channel: u32,
    feed: Arc<Mutex<VecDeque<TransportFrame>>>,
    written: Arc<Mutex<Vec<WrittenFrame>>>,
}

impl BusTransport for MockTransport {
    fn configure(&mut self, _timing: &BusTiming) -> Result<()> {
        Ok(())
    }

    fn set_online(&mut self) -> Result<()> {
        Ok(())
    }

    fn blocking_read(&mut self) -> Result<Option<TransportFrame>> {
        if let Some(frame) = self.feed.lock().unwrap().pop_front() {
            return Ok(Some(frame));
        }
        // Timeout tick: lets the reader observe shutdown
        std::thread::sleep(Duration::from_millis(2));
        Ok(None)
    }

    fn write(&mut self, id: u32, data: &[u8], kind: FrameKind) -> Result<()> {
        self.written.lock().unwrap().push(WrittenFrame {
            channel: self.channel,
            id,
            data: data.to_vec(),
            extended: kind == FrameKind::Extended,
        });
        Ok(())
    }
}

pub fn frame(id: u32, extended: bool, data: Vec<u8>) -> TransportFrame {
    TransportFrame {
        id,
        data,
        is_extended: extended,
        timestamp_ns: 0,
    }
}

fn unsigned(name: &str, start_bit: u8, bit_length: u8, scale: f64, offset: f64, unit: &str) -> SignalDefinition {
    SignalDefinition {
        name: name.to_string(),
        is_signed: false,
        is_extended: false,
        start_bit,
        bit_length,
        scale,
        offset,
        unit: unit.to_string(),
    }
}

/// High-speed decode catalog from the reference deployment (battery block)
pub fn hs_decode_catalog() -> DecodeCatalog {
    let mut catalog = DecodeCatalog::new();
    catalog.insert(1954, unsigned("batteryCurrent", 48, 16, 0.025, -1000.0, "amps")).unwrap();
    catalog.insert(1954, unsigned("batteryVoltage", 36, 12, 0.25, 0.0, "volts")).unwrap();
    catalog.insert(1954, unsigned("batteryTemp", 28, 8, 0.5, -40.0, "Deg C")).unwrap();
    catalog.insert(1954, unsigned("batterySoc", 20, 8, 0.5, 0.0, "%")).unwrap();
    catalog.insert(1954, unsigned("engineTemp", 12, 8, 1.0, -40.0, "Deg C")).unwrap();
    catalog.insert(1955, unsigned("engineRpm", 16, 16, 0.25, 0.0, "rpm")).unwrap();
    catalog
}

/// Low-speed decode catalog from the reference deployment (GPS pair)
pub fn ls_decode_catalog() -> DecodeCatalog {
    let mut catalog = DecodeCatalog::new();
    for (name, start_bit, bit_length) in [("gpsLatitude", 32, 30), ("gpsLongitude", 0, 31)] {
        catalog
            .insert(
                0x102A_A000,
                SignalDefinition {
                    name: name.to_string(),
                    is_signed: true,
                    is_extended: true,
                    start_bit,
                    bit_length,
                    scale: 1.0 / 3_600_000.0,
                    offset: 0.0,
                    unit: "deg".to_string(),
                },
            )
            .unwrap();
    }
    catalog
}

/// Low-speed encode catalog from the reference deployment (HVAC block)
pub fn ls_encode_catalog() -> EncodeCatalog {
    let mut catalog = EncodeCatalog::new();
    catalog
        .insert(
            "driverTemp",
            MessageTemplate {
                id: 0x251,
                is_extended: false,
                default_payload: 0x0000_0000_0102_AE07,
                start_bit: Some(32),
                length: 8,
            },
        )
        .unwrap();
    catalog
        .insert(
            "toggleAc",
            MessageTemplate {
                id: 0x251,
                is_extended: false,
                default_payload: 0x0000_0001_0104_AE07,
                start_bit: None,
                length: 8,
            },
        )
        .unwrap();
    catalog
        .insert(
            "ventFanSpeed",
            MessageTemplate {
                id: 0x251,
                is_extended: false,
                default_payload: 0x0000_0000_0802_AE07,
                start_bit: Some(56),
                length: 8,
            },
        )
        .unwrap();
    catalog
}
