//! Pipeline stage workers
//!
//! Each function here is the body of one worker thread: transport reader,
//! frame decoder, frame encoder, transport writer, and the shared delivery
//! dispatcher. Workers own nothing but the handles they are given; queues
//! are the only shared mutable state, and all loops exit cooperatively when
//! their input queue closes or the shutdown token fires.
//!
//! Stage-local failures (catalog miss on write, malformed definition) are
//! handled in place and never cross a queue boundary - only well-formed
//! frames, signals and requests travel between stages.

use crate::catalog::{mask_extended_id, DecodeCatalog, EncodeCatalog};
use crate::codec;
use crate::config::TransportConfig;
use crate::pipeline::ShutdownToken;
use crate::queue::BusQueue;
use crate::transport::{BusTransport, FrameKind, TransportFactory};
use crate::types::{DecodedSignal, RawFrame, Result, WriteRequest};

/// Consumes decoded signals at the end of the read path.
///
/// Invoked from the dispatcher thread only, with no queue lock held. A
/// returned error is escalated as fatal to the whole process.
pub trait DeliverySink: Send {
    /// Deliver one decoded signal's name and physical value
    fn deliver(&mut self, name: &str, value: f64) -> Result<()>;
}

impl<F> DeliverySink for F
where
    F: FnMut(&str, f64) -> Result<()> + Send,
{
    fn deliver(&mut self, name: &str, value: f64) -> Result<()> {
        self(name, value)
    }
}

fn open_channel(
    factory: &dyn TransportFactory,
    config: &TransportConfig,
) -> Result<Box<dyn BusTransport>> {
    let mut transport = factory.open(config.channel, config.flags)?;
    transport.configure(&config.timing)?;
    transport.set_online()?;
    Ok(transport)
}

/// Transport reader: blocking-read frames, mask extended ids, drop traffic
/// the decode catalog does not know, queue the rest.
///
/// An open/configure failure is fatal to this bus instance only; the error
/// propagates to the thread wrapper and the thread exits.
pub(crate) fn run_reader(
    bus: &str,
    factory: &dyn TransportFactory,
    config: &TransportConfig,
    catalog: &DecodeCatalog,
    frames: &BusQueue<RawFrame>,
    token: &ShutdownToken,
) -> Result<()> {
    let mut transport = open_channel(factory, config)?;
    log::info!("{}: reader online on channel {}", bus, config.channel);

    while !token.is_cancelled() {
        let frame = match transport.blocking_read() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("{}: transport read failed: {}", bus, e);
                continue;
            }
        };

        let id = if frame.is_extended {
            mask_extended_id(frame.id)
        } else {
            frame.id
        };

        // Filter uninteresting traffic before it is ever queued
        if !catalog.contains(id) {
            continue;
        }

        frames.push(RawFrame {
            id,
            is_extended: frame.is_extended,
            data: frame.data,
        });
    }
    Ok(())
}

/// Frame decoder: run the codec against every definition matching the
/// frame's id and queue one decoded signal per definition.
pub(crate) fn run_decoder(
    bus: &str,
    catalog: &DecodeCatalog,
    frames: &BusQueue<RawFrame>,
    signals: &BusQueue<DecodedSignal>,
    token: &ShutdownToken,
) {
    while let Some(frame) = frames.pop_blocking() {
        if token.is_cancelled() {
            break;
        }
        for def in catalog.definitions(frame.id) {
            match codec::decode(def, &frame.data) {
                Ok(value) => signals.push(DecodedSignal {
                    name: def.name.clone(),
                    value,
                    unit: def.unit.clone(),
                }),
                Err(e) => {
                    log::warn!("{}: cannot decode '{}' from 0x{:X}: {}", bus, def.name, frame.id, e)
                }
            }
        }
    }
}

/// Frame encoder: turn write requests into transmit-ready frames.
///
/// An unknown signal name is a caller error: the request is rejected with a
/// warning and the encoder keeps running.
pub(crate) fn run_encoder(
    bus: &str,
    catalog: &EncodeCatalog,
    requests: &BusQueue<WriteRequest>,
    frames: &BusQueue<RawFrame>,
    token: &ShutdownToken,
) {
    while let Some(request) = requests.pop_blocking() {
        if token.is_cancelled() {
            break;
        }
        let template = match catalog.template(&request.name) {
            Some(template) => template,
            None => {
                log::warn!("{}: unknown writable signal '{}', request dropped", bus, request.name);
                continue;
            }
        };
        match codec::encode_frame(template, request.value) {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                log::warn!("{}: cannot encode '{}': {}", bus, request.name, e)
            }
        }
    }
}

/// Transport writer: transmit processed frames verbatim.
///
/// Transmit failures are reported, never retried; retry belongs to the
/// transport.
pub(crate) fn run_writer(
    bus: &str,
    factory: &dyn TransportFactory,
    config: &TransportConfig,
    frames: &BusQueue<RawFrame>,
    token: &ShutdownToken,
) -> Result<()> {
    let mut transport = open_channel(factory, config)?;
    log::info!("{}: writer online on channel {}", bus, config.channel);

    while let Some(frame) = frames.pop_blocking() {
        if token.is_cancelled() {
            break;
        }
        let kind = if frame.is_extended {
            FrameKind::Extended
        } else {
            FrameKind::Standard
        };
        if let Err(e) = transport.write(frame.id, &frame.data, kind) {
            log::warn!("{}: transmit of 0x{:X} failed: {}", bus, frame.id, e);
        }
    }
    Ok(())
}

/// Delivery dispatcher: drain the shared signal queue into the sink.
///
/// The queue lock is never held across a sink invocation; `pop_blocking`
/// hands out an owned signal before the sink runs. A sink fault stops the
/// loop and propagates upward.
pub(crate) fn run_dispatcher(
    signals: &BusQueue<DecodedSignal>,
    sink: &mut dyn DeliverySink,
    token: &ShutdownToken,
) -> Result<()> {
    while let Some(signal) = signals.pop_blocking() {
        if token.is_cancelled() {
            break;
        }
        sink.deliver(&signal.name, signal.value)?;
    }
    Ok(())
}
