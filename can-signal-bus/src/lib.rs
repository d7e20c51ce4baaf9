//! CAN Signal Bus
//!
//! Decodes and encodes packed CAN signals and moves them through a
//! multi-threaded pipeline between a blocking hardware transport and an
//! asynchronous delivery sink.
//!
//! # Architecture
//!
//! Per bus instance the read path is transport reader -> frame queue ->
//! frame decoder -> shared signal queue -> delivery dispatcher, and the
//! write path is the mirror: write inbox -> frame encoder -> write frame
//! queue -> transport writer. Instances share nothing but the signal queue
//! and its dispatcher; catalogs are immutable after construction and read
//! without locking.
//!
//! The library does NOT:
//! - Talk to hardware directly (implement [`transport::TransportFactory`])
//! - Retry transport opens or writes
//! - Persist catalogs
//!
//! # Example Usage
//!
//! ```no_run
//! use can_signal_bus::{
//!     BusInstanceConfig, BusTiming, DecodeCatalog, EncodeCatalog, SignalBus,
//!     SignalDefinition, TransportConfig,
//! };
//! use std::sync::Arc;
//!
//! # fn open_factory() -> Arc<dyn can_signal_bus::TransportFactory> { unimplemented!() }
//! let mut decode = DecodeCatalog::new();
//! decode.insert(1955, SignalDefinition {
//!     name: "engineRpm".to_string(),
//!     is_signed: false,
//!     is_extended: false,
//!     start_bit: 16,
//!     bit_length: 16,
//!     scale: 0.25,
//!     offset: 0.0,
//!     unit: "rpm".to_string(),
//! }).unwrap();
//!
//! let config = BusInstanceConfig::new("hs", TransportConfig::new(0, BusTiming::high_speed()))
//!     .with_decode_catalog(decode)
//!     .with_encode_catalog(EncodeCatalog::new());
//!
//! let bus = SignalBus::builder()
//!     .add_bus(config)
//!     .start(open_factory(), |name: &str, value: f64| -> can_signal_bus::Result<()> {
//!         println!("{} = {}", name, value);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! bus.write("hs", "hvacCommand", 1).ok();
//! bus.shutdown();
//! ```

// Public modules
pub mod catalog;
pub mod codec;
pub mod config;
pub mod pipeline;
pub mod queue;
pub mod transport;
pub mod types;

// Internal module: stage worker loop bodies
mod stages;

// Re-export main types for convenience
pub use catalog::{
    mask_extended_id, CatalogStats, DecodeCatalog, EncodeCatalog, MessageTemplate,
    SignalDefinition, EXTENDED_ID_MASK,
};
pub use config::{BusInstanceConfig, BusTiming, TransportConfig};
pub use pipeline::{DeliverySink, ShutdownToken, SignalBus, SignalBusBuilder, WriteHandle};
pub use queue::BusQueue;
pub use transport::{BusTransport, FrameKind, TransportFactory, TransportFrame};
pub use types::{BusError, DecodedSignal, RawFrame, Result, WriteRequest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
