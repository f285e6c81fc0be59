//! The device engine: send paths, the receive loop, and the high-level
//! command surface.
//!
//! All mutable state lives on one [`Device`] instance: the surface table,
//! the transaction registry, the event bindings and the transport halves.
//! Sends are serialized through a single writer lock; frames from
//! concurrent senders must never interleave on the wire, that corrupts the
//! whole session.

use crate::display::{self, Framebuffer, Surface};
use crate::error::ClientError;
use crate::events::Bindings;
use crate::touch::TouchZone;
use crate::transaction::Transactions;
use crate::transport::{FrameSink, FrameSource};
use bytes::Bytes;
use deckwire_protocol::{Button, ButtonState, Knob, Message, MessageKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};

/// Default deadline applied by [`Device::request`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Device configuration.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Product code reported by the hardware during link setup.
    pub product: String,
    /// Deadline for [`Device::request`].
    pub request_timeout: Duration,
}

impl DeviceConfig {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Handle on a pending response.
///
/// There is no built-in deadline: a caller wanting one races [`Reply::wait`]
/// against a timer and simply drops the handle afterwards; a response that
/// still arrives is discarded by the registry.
pub struct Reply {
    id: u8,
    rx: oneshot::Receiver<Message>,
}

impl Reply {
    /// The transaction id the reply is correlated on.
    pub fn transaction_id(&self) -> u8 {
        self.id
    }

    /// Waits for the matching response.
    pub async fn wait(self) -> Result<Message, ClientError> {
        self.rx.await.map_err(|_| ClientError::ConnectionClosed)
    }
}

/// A connected control panel.
pub struct Device {
    config: DeviceConfig,
    surfaces: HashMap<&'static str, Surface>,
    transactions: Transactions,
    bindings: Bindings,
    source: Mutex<Option<Box<dyn FrameSource>>>,
    sink: Mutex<Option<Box<dyn FrameSink>>>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("config", &self.config)
            .field("surfaces", &self.surfaces)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Creates a device over a connected transport.
    ///
    /// Fails when the product code has no surface table; nothing useful can
    /// be done with a panel whose displays cannot be addressed.
    pub fn new(
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
        config: DeviceConfig,
    ) -> Result<Self, ClientError> {
        let surfaces = display::surface_table(&config.product)?;
        Ok(Self {
            config,
            surfaces,
            transactions: Transactions::new(),
            bindings: Bindings::default(),
            source: Mutex::new(Some(source)),
            sink: Mutex::new(Some(sink)),
        })
    }

    /// Looks up a display surface by name.
    pub fn surface(&self, name: &str) -> Result<Surface, ClientError> {
        self.surfaces
            .get(name)
            .copied()
            .ok_or_else(|| ClientError::UnknownSurface(name.to_string()))
    }

    /// Number of registered continuations still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.transactions.pending_count()
    }

    async fn write_message(&self, msg: &Message) -> Result<(), ClientError> {
        tracing::trace!(%msg, "sending");
        let frame = msg.encode().freeze();
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(ClientError::NotConnected)?;
        sink.write_frame(frame).await?;
        Ok(())
    }

    /// Sends a fire-and-forget command.
    ///
    /// Every command carries a fresh transaction id; an acknowledgement
    /// coming back for an id with no continuation is dropped as stale.
    pub async fn send(
        &self,
        kind: MessageKind,
        payload: impl Into<Bytes>,
    ) -> Result<(), ClientError> {
        let id = self.transactions.next_id();
        let msg = Message::new(kind, payload.into()).with_transaction(id);
        self.write_message(&msg).await
    }

    /// Sends a command and registers a one-shot continuation for its
    /// response.
    pub async fn send_with_reply(
        &self,
        kind: MessageKind,
        payload: impl Into<Bytes>,
    ) -> Result<Reply, ClientError> {
        let id = self.transactions.next_id();
        let (tx, rx) = oneshot::channel();
        self.transactions.register(id, tx);

        let msg = Message::new(kind, payload.into()).with_transaction(id);
        if let Err(err) = self.write_message(&msg).await {
            self.transactions.forget(id);
            return Err(err);
        }
        Ok(Reply { id, rx })
    }

    /// Sends a command and waits for its response under the configured
    /// deadline.
    pub async fn request(
        &self,
        kind: MessageKind,
        payload: impl Into<Bytes>,
    ) -> Result<Message, ClientError> {
        let reply = self.send_with_reply(kind, payload).await?;
        let id = reply.transaction_id();
        match tokio::time::timeout(self.config.request_timeout, reply.wait()).await {
            Ok(result) => result,
            Err(_) => {
                // Left in place, the slot would swallow a much later reuse
                // of this id.
                self.transactions.forget(id);
                tracing::debug!(id, "request timed out");
                Err(ClientError::Timeout)
            }
        }
    }

    /// Reads frames and routes them until the transport fails or closes.
    ///
    /// Run this on a dedicated task. Continuations and event handlers fire
    /// here, synchronously; anything blocking must be handed off. Decode
    /// failures are logged and skipped; transport errors terminate the loop
    /// and surface to the caller. There is no reconnect here.
    pub async fn read_loop(&self) -> Result<(), ClientError> {
        loop {
            let frame = {
                let mut guard = self.source.lock().await;
                let source = guard.as_mut().ok_or(ClientError::NotConnected)?;
                source.read_frame().await?
            };
            let Some(frame) = frame else {
                tracing::debug!("transport closed");
                return Err(ClientError::ConnectionClosed);
            };
            if frame.is_empty() {
                tracing::warn!("skipping 0-byte frame");
                continue;
            }

            let msg = match Message::decode(&frame) {
                Ok(msg) => msg,
                Err(err) => {
                    tracing::warn!(%err, "dropping undecodable frame");
                    continue;
                }
            };
            tracing::trace!(%msg, "received");

            if msg.transaction_id != 0 {
                let id = msg.transaction_id;
                if !self.transactions.dispatch(msg) {
                    tracing::debug!(id, "no continuation for transaction, dropping");
                }
            } else {
                self.bindings.route(&msg);
            }
        }
    }

    /// Closes the transport. Pending continuations are left unfired; their
    /// holders observe a closed channel.
    pub async fn close(&self) {
        self.source.lock().await.take();
        self.sink.lock().await.take();
        self.transactions.clear();
        tracing::debug!("device closed");
    }

    // ------------------------------------------------------------------
    // Event bindings
    // ------------------------------------------------------------------

    /// Registers the press callback for a button, replacing any previous
    /// one.
    pub fn bind_button(
        &self,
        button: Button,
        handler: impl Fn(Button, ButtonState) + Send + Sync + 'static,
    ) {
        self.bindings.bind_button(button, Arc::new(handler));
    }

    /// Registers the release callback for a button.
    pub fn bind_button_up(
        &self,
        button: Button,
        handler: impl Fn(Button, ButtonState) + Send + Sync + 'static,
    ) {
        self.bindings.bind_button_up(button, Arc::new(handler));
    }

    /// Registers the rotation callback for a knob.
    pub fn bind_knob(&self, knob: Knob, handler: impl Fn(Knob, i32) + Send + Sync + 'static) {
        self.bindings.bind_knob(knob, Arc::new(handler));
    }

    /// Registers the contact-begin callback for a touch zone.
    pub fn bind_touch(
        &self,
        zone: TouchZone,
        handler: impl Fn(TouchZone, ButtonState, u16, u16) + Send + Sync + 'static,
    ) {
        self.bindings.bind_touch(zone, Arc::new(handler));
    }

    /// Registers the contact-end callback for a touch zone.
    pub fn bind_touch_up(
        &self,
        zone: TouchZone,
        handler: impl Fn(TouchZone, ButtonState, u16, u16) + Send + Sync + 'static,
    ) {
        self.bindings.bind_touch_up(zone, Arc::new(handler));
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Resets the panel to its power-on state.
    pub async fn reset(&self) -> Result<(), ClientError> {
        self.send(MessageKind::Reset, Bytes::new()).await
    }

    /// Sets the backlight brightness; the hardware range is 0..=10.
    pub async fn set_brightness(&self, level: u8) -> Result<(), ClientError> {
        self.send(MessageKind::SetBrightness, vec![level]).await
    }

    /// Sets the LED color of a button.
    pub async fn set_button_color(
        &self,
        button: Button,
        r: u8,
        g: u8,
        b: u8,
    ) -> Result<(), ClientError> {
        self.send(MessageKind::SetColor, vec![button.0 as u8, r, g, b])
            .await
    }

    /// Triggers the haptic motor with a vendor pattern code.
    pub async fn vibrate(&self, pattern: u8) -> Result<(), ClientError> {
        self.send(MessageKind::SetVibration, vec![pattern]).await
    }

    /// Queries the serial number.
    pub async fn serial_number(&self) -> Result<String, ClientError> {
        let resp = self.request(MessageKind::Serial, Bytes::new()).await?;
        Ok(String::from_utf8_lossy(&resp.payload).trim().to_string())
    }

    /// Queries the firmware version as "major.minor.patch".
    pub async fn firmware_version(&self) -> Result<String, ClientError> {
        let resp = self.request(MessageKind::Version, Bytes::new()).await?;
        if resp.payload.len() < 3 {
            return Err(ClientError::MalformedResponse("version"));
        }
        Ok(format!(
            "{}.{}.{}",
            resp.payload[0], resp.payload[1], resp.payload[2]
        ))
    }

    // ------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------

    /// Writes pixels into a surface's framebuffer without repainting.
    ///
    /// The panel shows nothing until a refresh; callers updating several
    /// areas should batch their writes and refresh once.
    pub async fn write_framebuffer(
        &self,
        surface: &str,
        fb: &Framebuffer,
        x_off: u16,
        y_off: u16,
    ) -> Result<(), ClientError> {
        let surface = self.surface(surface)?;
        tracing::debug!(
            surface = surface.name,
            x_off,
            y_off,
            width = fb.width(),
            height = fb.height(),
            "framebuffer write"
        );
        let payload = display::framebuffer_payload(&surface, fb, x_off, y_off);
        self.send(MessageKind::WriteFramebuffer, payload.freeze())
            .await
    }

    /// Repaints a surface from its framebuffer.
    pub async fn refresh(&self, surface: &str) -> Result<(), ClientError> {
        let surface = self.surface(surface)?;
        let payload = display::refresh_payload(&surface);
        self.send(MessageKind::Refresh, payload.freeze()).await
    }

    /// Writes pixels and immediately repaints.
    ///
    /// The write is fully transmitted before the refresh because both pass
    /// through the single ordered writer; there is no acknowledgement wait
    /// in between, the hardware does not reliably acknowledge the write
    /// before the refresh would go out.
    pub async fn draw(
        &self,
        surface: &str,
        fb: &Framebuffer,
        x_off: u16,
        y_off: u16,
    ) -> Result<(), ClientError> {
        self.write_framebuffer(surface, fb, x_off, y_off).await?;
        self.refresh(surface).await
    }

    /// Draws into one touch-zone cell of the full panel.
    pub async fn draw_zone(&self, zone: TouchZone, fb: &Framebuffer) -> Result<(), ClientError> {
        let (x, y) = zone.origin();
        self.draw("all", fb, x, y).await
    }

    /// Blanks a surface.
    pub async fn clear(&self, surface: &str) -> Result<(), ClientError> {
        let s = self.surface(surface)?;
        let fb = Framebuffer::new(s.width, s.height);
        self.draw(surface, &fb, 0, 0).await
    }
}
