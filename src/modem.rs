//! The modem collaborator contract (§6).
//!
//! The core never speaks to sound hardware directly; it speaks to whatever
//! implements [`Modem`]. [`NullModem`] is the "text mode" stand-in used by
//! tests and by stations configured without real hardware.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::scanlist::ChannelId;

/// A pending transmit-buffer entry, tagged with the channel it was queued
/// for — so the engine can prune speculative transmits left behind by a
/// channel change.
#[derive(Clone, Debug)]
pub struct TxEntry {
    pub channel: ChannelId,
}

/// The FSK modem collaborator.
///
/// `send` must be non-blocking (it enqueues to a modem-internal buffer);
/// received frames arrive via the channel passed to `set_rx_callback`.
pub trait Modem: Send {
    /// Enqueues already-framed bytes for transmission.
    fn send(&mut self, bytes: &[u8]);

    /// Registers the channel that receives `(raw_frame, confidence)` for
    /// every frame the modem demodulates.
    fn set_rx_callback(&mut self, tx: Sender<(Vec<u8>, f64)>);

    /// True while energy is detected on the current channel.
    fn carrier_sense(&self) -> bool;

    /// Channels tagged on entries still sitting in the transmit buffer.
    fn tx_buffer_channels(&self) -> Vec<ChannelId>;

    /// Drops transmit-buffer entries tagged for any channel other than
    /// `keep_channel` (stale speculative transmits left behind by a
    /// channel change).
    fn prune_tx_buffer(&mut self, keep_channel: &ChannelId);

    /// The configured symbol rate, used by the padding law (§4.1).
    fn baudrate(&self) -> u32;

    /// Releases any hardware/audio resources.
    fn stop(&mut self);
}

#[derive(Default)]
struct Shared {
    sent: Vec<Vec<u8>>,
    rx_callback: Option<Sender<(Vec<u8>, f64)>>,
}

/// A modem stand-in for text-mode stations and tests: no hardware, an
/// in-memory transmit log, and a configurable fixed baudrate.
///
/// Backed by a shared, lockable inner state so a [`NullModemHandle`] taken
/// before the modem is handed to [`crate::station::Station`] can still
/// inject received frames and inspect what was sent.
pub struct NullModem {
    baudrate: u32,
    shared: Arc<Mutex<Shared>>,
}

impl NullModem {
    pub fn new(baudrate: u32) -> Self {
        Self {
            baudrate,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// A cloneable, `Send + Sync` handle onto this modem, usable after the
    /// modem itself has been moved into a [`crate::station::Station`].
    pub fn handle(&self) -> NullModemHandle {
        NullModemHandle {
            shared: self.shared.clone(),
        }
    }
}

impl Modem for NullModem {
    fn send(&mut self, bytes: &[u8]) {
        self.shared.lock().unwrap().sent.push(bytes.to_vec());
    }

    fn set_rx_callback(&mut self, tx: Sender<(Vec<u8>, f64)>) {
        self.shared.lock().unwrap().rx_callback = Some(tx);
    }

    fn carrier_sense(&self) -> bool {
        false
    }

    fn tx_buffer_channels(&self) -> Vec<ChannelId> {
        Vec::new()
    }

    fn prune_tx_buffer(&mut self, _keep_channel: &ChannelId) {}

    fn baudrate(&self) -> u32 {
        self.baudrate
    }

    fn stop(&mut self) {}
}

/// A handle onto a [`NullModem`]'s shared state, for driving and observing
/// it from outside the station that owns it.
#[derive(Clone)]
pub struct NullModemHandle {
    shared: Arc<Mutex<Shared>>,
}

impl NullModemHandle {
    /// Everything handed to `send` so far, oldest first.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.lock().unwrap().sent.clone()
    }

    /// Feeds a frame to the registered rx callback, as if the modem had
    /// just demodulated it off the air.
    pub fn inject(&self, raw: Vec<u8>, confidence: f64) {
        if let Some(tx) = &self.shared.lock().unwrap().rx_callback {
            let _ = tx.send((raw, confidence));
        }
    }
}
