//! Pipeline orchestration
//!
//! [`SignalBus`] constructs N independent bus instances from their
//! configurations, wires the inter-stage queues, and starts the worker
//! threads: per instance a transport reader, frame decoder, frame encoder
//! and transport writer, plus one delivery dispatcher shared by all
//! instances. Queues are owned here and handed to workers as `Arc`s; there
//! are no process-wide globals.
//!
//! Within one instance frames are decoded in transport order. Across
//! instances the shared dispatcher interleaves nondeterministically.

use crate::config::BusInstanceConfig;
use crate::queue::{
    BusQueue, FRAME_QUEUE_WATERMARK, SIGNAL_QUEUE_WATERMARK, WRITE_FRAME_QUEUE_WATERMARK,
};
use crate::stages;
use crate::transport::TransportFactory;
use crate::types::{BusError, DecodedSignal, RawFrame, Result, WriteRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub use crate::stages::DeliverySink;

/// Cooperative cancellation token shared by all workers of one bus.
///
/// Workers check it at every queue wakeup and before every blocking
/// transport call; it changes nothing about observable behavior while the
/// pipeline is running.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    /// Create a token in the running state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once shutdown has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Application-facing write inbox for one bus instance.
///
/// Cheap to clone, callable from any thread, never blocks.
#[derive(Clone)]
pub struct WriteHandle {
    bus: String,
    inbox: Arc<BusQueue<WriteRequest>>,
}

impl WriteHandle {
    /// Enqueue a write request for the encoder stage.
    ///
    /// The value is the raw pre-scaled integer; scale and offset inversion
    /// is the caller's responsibility.
    pub fn write(&self, name: impl Into<String>, value: u64) {
        let name = name.into();
        log::debug!("{}: write request '{}' = {}", self.bus, name, value);
        self.inbox.push(WriteRequest { name, value });
    }
}

/// One running bus instance: its queues and worker threads
struct BusHandle {
    name: String,
    frame_queue: Arc<BusQueue<RawFrame>>,
    inbox: Arc<BusQueue<WriteRequest>>,
    write_frame_queue: Arc<BusQueue<RawFrame>>,
    workers: Vec<JoinHandle<()>>,
}

/// Builder for a [`SignalBus`]
#[derive(Default)]
pub struct SignalBusBuilder {
    configs: Vec<BusInstanceConfig>,
}

impl SignalBusBuilder {
    /// Add one bus instance to construct
    pub fn add_bus(mut self, config: BusInstanceConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Wire the queues and start every worker thread.
    ///
    /// A transport open failure inside a reader or writer thread is fatal to
    /// that instance only; the remaining instances keep running. A delivery
    /// sink fault aborts the process.
    pub fn start<S>(self, factory: Arc<dyn TransportFactory>, sink: S) -> Result<SignalBus>
    where
        S: DeliverySink + 'static,
    {
        let token = ShutdownToken::new();
        let signal_queue = Arc::new(BusQueue::new("signal queue", SIGNAL_QUEUE_WATERMARK));

        let dispatcher = {
            let signal_queue = Arc::clone(&signal_queue);
            let token = token.clone();
            let mut sink = sink;
            thread::Builder::new()
                .name("dispatcher".to_string())
                .spawn(move || {
                    if let Err(e) = stages::run_dispatcher(&signal_queue, &mut sink, &token) {
                        // Mirrors the reference behavior: a failing delivery
                        // callback is unrecoverable for the host.
                        log::error!("delivery sink fault, aborting: {}", e);
                        std::process::abort();
                    }
                })?
        };

        let mut buses = Vec::with_capacity(self.configs.len());
        for config in self.configs {
            buses.push(start_instance(
                config,
                Arc::clone(&factory),
                Arc::clone(&signal_queue),
                token.clone(),
            )?);
        }

        Ok(SignalBus {
            buses,
            signal_queue,
            dispatcher: Some(dispatcher),
            token,
        })
    }
}

fn start_instance(
    config: BusInstanceConfig,
    factory: Arc<dyn TransportFactory>,
    signal_queue: Arc<BusQueue<DecodedSignal>>,
    token: ShutdownToken,
) -> Result<BusHandle> {
    let BusInstanceConfig {
        name,
        transport,
        decode,
        encode,
    } = config;

    let decode = Arc::new(decode);
    let encode = Arc::new(encode);
    let frame_queue = Arc::new(BusQueue::new(
        format!("{} frame queue", name),
        FRAME_QUEUE_WATERMARK,
    ));
    // The inbox never warns; backpressure there would blame the caller for
    // the encoder's pace.
    let inbox = Arc::new(BusQueue::new(format!("{} write inbox", name), usize::MAX));
    let write_frame_queue = Arc::new(BusQueue::new(
        format!("{} write frame queue", name),
        WRITE_FRAME_QUEUE_WATERMARK,
    ));

    let mut workers = Vec::with_capacity(4);

    {
        let bus = name.clone();
        let factory = Arc::clone(&factory);
        let catalog = Arc::clone(&decode);
        let frames = Arc::clone(&frame_queue);
        let token = token.clone();
        workers.push(
            thread::Builder::new()
                .name(format!("{}-reader", name))
                .spawn(move || {
                    if let Err(e) =
                        stages::run_reader(&bus, factory.as_ref(), &transport, &catalog, &frames, &token)
                    {
                        log::error!("{}: reader terminated: {}", bus, e);
                    }
                })?,
        );
    }

    {
        let bus = name.clone();
        let catalog = Arc::clone(&decode);
        let frames = Arc::clone(&frame_queue);
        let signals = Arc::clone(&signal_queue);
        let token = token.clone();
        workers.push(
            thread::Builder::new()
                .name(format!("{}-decoder", name))
                .spawn(move || stages::run_decoder(&bus, &catalog, &frames, &signals, &token))?,
        );
    }

    {
        let bus = name.clone();
        let catalog = Arc::clone(&encode);
        let requests = Arc::clone(&inbox);
        let frames = Arc::clone(&write_frame_queue);
        let token = token.clone();
        workers.push(
            thread::Builder::new()
                .name(format!("{}-encoder", name))
                .spawn(move || stages::run_encoder(&bus, &catalog, &requests, &frames, &token))?,
        );
    }

    {
        let bus = name.clone();
        let factory = Arc::clone(&factory);
        let frames = Arc::clone(&write_frame_queue);
        let token = token.clone();
        workers.push(
            thread::Builder::new()
                .name(format!("{}-writer", name))
                .spawn(move || {
                    if let Err(e) =
                        stages::run_writer(&bus, factory.as_ref(), &transport, &frames, &token)
                    {
                        log::error!("{}: writer terminated: {}", bus, e);
                    }
                })?,
        );
    }

    log::info!("{}: pipeline started on channel {}", name, transport.channel);
    Ok(BusHandle {
        name,
        frame_queue,
        inbox,
        write_frame_queue,
        workers,
    })
}

/// A running set of bus instances sharing one delivery dispatcher.
pub struct SignalBus {
    buses: Vec<BusHandle>,
    signal_queue: Arc<BusQueue<DecodedSignal>>,
    dispatcher: Option<JoinHandle<()>>,
    token: ShutdownToken,
}

impl SignalBus {
    /// Start building a signal bus
    pub fn builder() -> SignalBusBuilder {
        SignalBusBuilder::default()
    }

    /// Get a clonable write inbox for the named bus instance
    pub fn writer(&self, bus: &str) -> Result<WriteHandle> {
        self.buses
            .iter()
            .find(|handle| handle.name == bus)
            .map(|handle| WriteHandle {
                bus: handle.name.clone(),
                inbox: Arc::clone(&handle.inbox),
            })
            .ok_or_else(|| BusError::UnknownBus(bus.to_string()))
    }

    /// Enqueue a write request for the named bus instance
    pub fn write(&self, bus: &str, name: impl Into<String>, value: u64) -> Result<()> {
        self.writer(bus)?.write(name, value);
        Ok(())
    }

    /// Names of the running bus instances
    pub fn bus_names(&self) -> Vec<&str> {
        self.buses.iter().map(|handle| handle.name.as_str()).collect()
    }

    /// Stop every worker cooperatively and join them.
    ///
    /// Workers exit at their next queue wakeup or transport timeout tick.
    /// Items still queued at that point are discarded; this is a live
    /// telemetry stream, not an exactly-once log.
    pub fn shutdown(mut self) {
        log::info!("signal bus shutting down");
        self.token.cancel();
        for handle in &self.buses {
            handle.frame_queue.close();
            handle.inbox.close();
            handle.write_frame_queue.close();
        }
        self.signal_queue.close();

        for handle in &mut self.buses {
            for worker in handle.workers.drain(..) {
                if worker.join().is_err() {
                    log::error!("{}: worker panicked during shutdown", handle.name);
                }
            }
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.join().is_err() {
                log::error!("dispatcher panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_token() {
        let token = ShutdownToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
