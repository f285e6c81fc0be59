//! Frame transport abstraction.
//!
//! The engine consumes a bidirectional stream of discrete binary frames.
//! Link setup (USB/serial enumeration and the frame-preserving adaptation
//! over the serial port) happens outside this crate; the engine starts from
//! a connected source/sink pair. Because the transport preserves message
//! boundaries, the engine never has to re-synchronize on byte splits.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use tokio::sync::mpsc;

/// Receiving half of a frame transport.
#[async_trait]
pub trait FrameSource: Send {
    /// Reads the next complete frame. `Ok(None)` means the peer closed the
    /// stream cleanly.
    async fn read_frame(&mut self) -> io::Result<Option<Bytes>>;
}

/// Sending half of a frame transport.
#[async_trait]
pub trait FrameSink: Send {
    /// Writes one complete frame.
    async fn write_frame(&mut self, frame: Bytes) -> io::Result<()>;
}

/// Receiving half of an in-memory transport end.
pub struct ChannelSource {
    rx: mpsc::Receiver<Bytes>,
}

/// Sending half of an in-memory transport end.
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

/// Creates a connected pair of in-memory transport ends.
///
/// Frames written to one end's sink arrive at the other end's source. Used
/// by the test suites to impersonate the hardware, and handy for loopback
/// wiring in general.
pub fn channel_pair(
    capacity: usize,
) -> (
    (ChannelSource, ChannelSink),
    (ChannelSource, ChannelSink),
) {
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);
    (
        (ChannelSource { rx: a_rx }, ChannelSink { tx: a_tx }),
        (ChannelSource { rx: b_rx }, ChannelSink { tx: b_tx }),
    )
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn read_frame(&mut self) -> io::Result<Option<Bytes>> {
        Ok(self.rx.recv().await)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn write_frame(&mut self, frame: Bytes) -> io::Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"))
    }
}
