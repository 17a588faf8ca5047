//! User-facing callbacks, as one explicit record of optional function
//! slots rather than a shared mutable dictionary (§9 redesign notes).

use crate::address::Address;

type Callback<A> = Box<dyn Fn(A) + Send + 'static>;

/// The four user callbacks a [`crate::station::Station`] invokes.
#[derive(Default)]
pub struct Callbacks {
    on_receive: Option<Callback<Vec<u8>>>,
    on_incoming_call: Option<Callback<Address>>,
    on_connected: Option<Callback<Address>>,
    on_disconnected: Option<Box<dyn Fn(Address, i64) + Send + 'static>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the handler for non-ALE data frames received while connected.
    pub fn set_on_receive(&mut self, f: impl Fn(Vec<u8>) + Send + 'static) {
        self.on_receive = Some(Box::new(f));
    }

    /// Sets the handler for an incoming CALL while scanning.
    pub fn set_on_incoming_call(&mut self, f: impl Fn(Address) + Send + 'static) {
        self.on_incoming_call = Some(Box::new(f));
    }

    /// Sets the handler fired on entering CONNECTED.
    pub fn set_on_connected(&mut self, f: impl Fn(Address) + Send + 'static) {
        self.on_connected = Some(Box::new(f));
    }

    /// Sets the handler fired when a call ends, with its duration in seconds.
    pub fn set_on_disconnected(&mut self, f: impl Fn(Address, i64) + Send + 'static) {
        self.on_disconnected = Some(Box::new(f));
    }

    pub(crate) fn fire_on_receive(&self, raw: Vec<u8>) {
        if let Some(f) = &self.on_receive {
            f(raw);
        }
    }

    pub(crate) fn fire_on_incoming_call(&self, origin: Address) {
        if let Some(f) = &self.on_incoming_call {
            f(origin);
        }
    }

    pub(crate) fn fire_on_connected(&self, peer: Address) {
        if let Some(f) = &self.on_connected {
            f(peer);
        }
    }

    pub(crate) fn fire_on_disconnected(&self, peer: Address, duration: i64) {
        if let Some(f) = &self.on_disconnected {
            f(peer, duration);
        }
    }
}
