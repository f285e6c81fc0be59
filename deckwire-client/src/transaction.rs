//! Transaction id allocation and response correlation.
//!
//! Outgoing commands are tagged with an id from 1..=255; responses echo the
//! id. A continuation is a one-shot channel completed with the matching
//! response and cleared in the same step, so it can fire at most once. The
//! id counter and the pending table share one mutual-exclusion region.

use deckwire_protocol::Message;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

pub(crate) struct Transactions {
    inner: Mutex<Inner>,
}

struct Inner {
    last_id: u8,
    pending: HashMap<u8, oneshot::Sender<Message>>,
}

impl Transactions {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                last_id: 0,
                pending: HashMap::new(),
            }),
        }
    }

    /// Returns the next transaction id: 1, 2, ..., 255, 1, ... (never 0).
    pub fn next_id(&self) -> u8 {
        let mut inner = self.inner.lock();
        let mut id = inner.last_id.wrapping_add(1);
        if id == 0 {
            id = 1;
        }
        inner.last_id = id;
        id
    }

    /// Registers a continuation for `id`, replacing any unfired one.
    ///
    /// Replacement is not an error: the slot is legitimately reused once the
    /// previous response has arrived, and a displaced sender just closes its
    /// receiver's channel.
    pub fn register(&self, id: u8, tx: oneshot::Sender<Message>) {
        debug_assert_ne!(id, 0, "transaction id 0 is never registered");
        if self.inner.lock().pending.insert(id, tx).is_some() {
            tracing::debug!(id, "replaced an unfired continuation");
        }
    }

    /// Removes the continuation for `id` without firing it.
    pub fn forget(&self, id: u8) {
        self.inner.lock().pending.remove(&id);
    }

    /// Completes the continuation registered for this message's id.
    ///
    /// Returns true when the message was consumed. The continuation fires
    /// synchronously and its slot is cleared in the same step; a caller that
    /// already dropped its receiver is tolerated.
    pub fn dispatch(&self, msg: Message) -> bool {
        if msg.transaction_id == 0 {
            return false;
        }
        let tx = self.inner.lock().pending.remove(&msg.transaction_id);
        match tx {
            Some(tx) => {
                let _ = tx.send(msg);
                true
            }
            None => false,
        }
    }

    /// Drops every pending continuation; they are left unfired.
    pub fn clear(&self) {
        self.inner.lock().pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }
}
