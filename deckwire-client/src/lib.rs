//! # deckwire-client
//!
//! Client engine for deckwire control panels (buttons, rotary knobs,
//! touch-sensitive displays behind one vendor byte-stream protocol).
//!
//! This crate provides:
//! - An async device handle multiplexing commands and hardware events over
//!   a single frame transport
//! - Transaction correlation between outgoing commands and their
//!   asynchronous responses
//! - Callback routing for button, knob and touch events
//! - The display framebuffer protocol with per-surface pixel encoding
//! - Touch zone geometry
//!
//! Link setup (USB/serial discovery and the frame-preserving adaptation
//! over the serial port) is a collaborator's job: the engine starts from a
//! connected [`FrameSource`]/[`FrameSink`] pair, sends through the handle,
//! and routes everything inbound from a single `read_loop` task.

pub mod device;
pub mod display;
pub mod error;
pub mod events;
pub mod touch;
pub mod transport;

mod transaction;

pub use device::{Device, DeviceConfig, Reply, DEFAULT_REQUEST_TIMEOUT};
pub use display::{Framebuffer, Rgb565, Surface};
pub use error::ClientError;
pub use events::{ButtonHandler, KnobHandler, TouchHandler};
pub use touch::TouchZone;
pub use transport::{channel_pair, ChannelSink, ChannelSource, FrameSink, FrameSource};

pub use deckwire_protocol::{Button, ButtonState, Event, Knob, Message, MessageKind};
