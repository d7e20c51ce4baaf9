//! Transport boundary
//!
//! The physical bus driver is opaque to this crate. These traits describe
//! exactly the surface the pipeline consumes: open a channel, configure bit
//! timing, go online, blocking read, write. The reader and writer stages of
//! one bus instance each open their own handle with the same configuration.

use crate::config::BusTiming;
use crate::types::Result;
use chrono::{DateTime, Utc};

/// Frame kind for transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// 11-bit standard identifier
    Standard,
    /// 29-bit extended identifier
    Extended,
}

/// One frame as delivered by the transport, before any masking or decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFrame {
    /// Raw identifier as received (unmasked)
    pub id: u32,
    /// Payload bytes (0-8)
    pub data: Vec<u8>,
    /// True if the frame carried a 29-bit extended identifier
    pub is_extended: bool,
    /// Hardware timestamp in nanoseconds since epoch
    pub timestamp_ns: u64,
}

impl TransportFrame {
    /// Convert the hardware timestamp to a UTC datetime
    pub fn timestamp(&self) -> DateTime<Utc> {
        let secs = (self.timestamp_ns / 1_000_000_000) as i64;
        let nsecs = (self.timestamp_ns % 1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nsecs).unwrap_or_else(Utc::now)
    }
}

/// An open transport handle for one channel.
///
/// `blocking_read` may return `Ok(None)` on a timeout tick; the reader loop
/// uses these ticks to observe shutdown. Implementations that truly block
/// forever still satisfy the contract, they just delay shutdown until the
/// next frame.
pub trait BusTransport: Send {
    /// Apply bit timing parameters to the channel
    fn configure(&mut self, timing: &BusTiming) -> Result<()>;

    /// Bring the channel online
    fn set_online(&mut self) -> Result<()>;

    /// Wait for the next frame. `Ok(None)` means the wait timed out.
    fn blocking_read(&mut self) -> Result<Option<TransportFrame>>;

    /// Transmit one frame verbatim
    fn write(&mut self, id: u32, data: &[u8], kind: FrameKind) -> Result<()>;
}

/// Opens transport handles for the pipeline's reader and writer threads.
pub trait TransportFactory: Send + Sync {
    /// Open a handle on the given hardware channel
    fn open(&self, channel: u32, flags: u32) -> Result<Box<dyn BusTransport>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_frame_timestamp() {
        let frame = TransportFrame {
            id: 0x123,
            data: vec![],
            is_extended: false,
            timestamp_ns: 1_500_000_000 * 1_000_000_000,
        };
        assert_eq!(frame.timestamp().timestamp(), 1_500_000_000);
    }
}
