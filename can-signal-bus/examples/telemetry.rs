//! Two-bus telemetry demo over a loopback transport.
//!
//! Brings up the reference deployment (high-speed battery/engine bus,
//! low-speed GPS/HVAC bus) against a synthetic transport that fabricates
//! frames, prints every delivered signal, issues a couple of HVAC writes,
//! then shuts down.
//!
//! Run with: cargo run --example telemetry

use anyhow::Result;
use can_signal_bus::config::BusTiming;
use can_signal_bus::transport::{BusTransport, FrameKind, TransportFactory, TransportFrame};
use can_signal_bus::{
    BusInstanceConfig, DecodeCatalog, EncodeCatalog, MessageTemplate, SignalBus,
    SignalDefinition, TransportConfig,
};
use std::sync::Arc;
use std::time::Duration;

/// Fabricates a battery frame (channel 0) or a GPS frame (channel 1) every
/// few milliseconds, and logs whatever the pipeline transmits.
struct LoopbackFactory;

struct LoopbackChannel {
    channel: u32,
    ticks: u64,
}

impl TransportFactory for LoopbackFactory {
    fn open(&self, channel: u32, _flags: u32) -> can_signal_bus::Result<Box<dyn BusTransport>> {
        Ok(Box::new(LoopbackChannel { channel, ticks: 0 }))
    }
}

impl BusTransport for LoopbackChannel {
    fn configure(&mut self, timing: &BusTiming) -> can_signal_bus::Result<()> {
        log::debug!("channel {}: {} bit/s", self.channel, timing.bit_rate);
        Ok(())
    }

    fn set_online(&mut self) -> can_signal_bus::Result<()> {
        Ok(())
    }

    fn blocking_read(&mut self) -> can_signal_bus::Result<Option<TransportFrame>> {
        std::thread::sleep(Duration::from_millis(100));
        self.ticks += 1;

        let frame = match self.channel {
            0 => {
                // Battery block: slowly drifting state of charge
                let soc = 140 + (self.ticks % 60);
                let frame_int: u64 = (41_000u64 << 48)
                    | (1480u64 << 36)
                    | (160u64 << 28)
                    | (soc << 20)
                    | (130u64 << 12);
                TransportFrame {
                    id: 1954,
                    data: frame_int.to_be_bytes().to_vec(),
                    is_extended: false,
                    timestamp_ns: self.ticks * 100_000_000,
                }
            }
            _ => {
                let lat = (45 * 3_600_000 + self.ticks as i64 * 17) as u64;
                TransportFrame {
                    id: 0x102A_A000,
                    data: (lat << 32).to_be_bytes().to_vec(),
                    is_extended: true,
                    timestamp_ns: self.ticks * 100_000_000,
                }
            }
        };
        Ok(Some(frame))
    }

    fn write(&mut self, id: u32, data: &[u8], _kind: FrameKind) -> can_signal_bus::Result<()> {
        log::info!("channel {}: tx 0x{:X} {:02X?}", self.channel, id, data);
        Ok(())
    }
}

fn hs_catalog() -> Result<DecodeCatalog> {
    let mut catalog = DecodeCatalog::new();
    let defs = [
        ("batteryCurrent", 48, 16, 0.025, -1000.0, "amps"),
        ("batteryVoltage", 36, 12, 0.25, 0.0, "volts"),
        ("batteryTemp", 28, 8, 0.5, -40.0, "Deg C"),
        ("batterySoc", 20, 8, 0.5, 0.0, "%"),
        ("engineTemp", 12, 8, 1.0, -40.0, "Deg C"),
    ];
    for (name, start_bit, bit_length, scale, offset, unit) in defs {
        catalog.insert(
            1954,
            SignalDefinition {
                name: name.to_string(),
                is_signed: false,
                is_extended: false,
                start_bit,
                bit_length,
                scale,
                offset,
                unit: unit.to_string(),
            },
        )?;
    }
    Ok(catalog)
}

fn ls_catalogs() -> Result<(DecodeCatalog, EncodeCatalog)> {
    let mut decode = DecodeCatalog::new();
    for (name, start_bit, bit_length) in [("gpsLatitude", 32, 30), ("gpsLongitude", 0, 31)] {
        decode.insert(
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
        )?;
    }

    let mut encode = EncodeCatalog::new();
    encode.insert(
        "driverTemp",
        MessageTemplate {
            id: 0x251,
            is_extended: false,
            default_payload: 0x0000_0000_0102_AE07,
            start_bit: Some(32),
            length: 8,
        },
    )?;
    encode.insert(
        "toggleAc",
        MessageTemplate {
            id: 0x251,
            is_extended: false,
            default_payload: 0x0000_0001_0104_AE07,
            start_bit: None,
            length: 8,
        },
    )?;
    Ok((decode, encode))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (ls_decode, ls_encode) = ls_catalogs()?;
    let bus = SignalBus::builder()
        .add_bus(
            BusInstanceConfig::new("hs", TransportConfig::new(0, BusTiming::high_speed()))
                .with_decode_catalog(hs_catalog()?),
        )
        .add_bus(
            BusInstanceConfig::new("ls", TransportConfig::new(1, BusTiming::low_speed()))
                .with_decode_catalog(ls_decode)
                .with_encode_catalog(ls_encode),
        )
        .start(
            Arc::new(LoopbackFactory),
            |name: &str, value: f64| -> can_signal_bus::Result<()> {
                println!("{:>16} = {:.4}", name, value);
                Ok(())
            },
        )?;

    std::thread::sleep(Duration::from_millis(500));

    let hvac = bus.writer("ls")?;
    hvac.write("driverTemp", 42);
    hvac.write("toggleAc", 0);

    std::thread::sleep(Duration::from_millis(500));
    bus.shutdown();
    Ok(())
}
