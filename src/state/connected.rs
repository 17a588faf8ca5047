//! CONNECTED (§4.3.4): the handshake is complete; data flows through the
//! modem outside the ALE machine. Idle timeout only.

use crate::address::Address;
use crate::engine::Engine;
use crate::packet::{Command, Packet};
use crate::statemachine::{StateHandler, Timing, Transition, CONNECTED_TIMEOUT};

pub struct Connected {
    call_address: Address,
    call_started: f64,
    timing: Timing,
    call_timeout_at: f64,
    /// True when this CONNECTED was reached from CALLING — the caller, not
    /// the answering side, is the one that must emit the synchronizing ACK
    /// so its peer (sitting in CONNECTING) can complete the handshake.
    announce: bool,
}

impl Connected {
    pub fn new(call_address: Address, call_started: f64, announce: bool) -> Self {
        Self {
            call_address,
            call_started,
            timing: Timing::default(),
            call_timeout_at: 0.0,
            announce,
        }
    }

    /// Resets the idle timer; called whenever a non-ALE data frame arrives.
    pub fn keep_alive_deadline_bump(&mut self, engine: &mut dyn Engine) {
        self.call_timeout_at = engine.now() + CONNECTED_TIMEOUT;
    }
}

impl StateHandler for Connected {
    fn enter(&mut self, timing: Timing, engine: &mut dyn Engine) {
        self.timing = timing;
        self.call_timeout_at = engine.now() + CONNECTED_TIMEOUT;
        if self.announce {
            engine.send_ale(Command::Ack, self.call_address.clone(), Vec::new());
        }
        engine.fire_on_connected(self.call_address.clone());
    }

    fn leave(&mut self, _engine: &mut dyn Engine) {}

    fn timing(&self) -> Timing {
        self.timing
    }

    fn receive(&mut self, packet: &Packet, engine: &mut dyn Engine) -> Option<Transition> {
        if packet.command != Command::End {
            return None;
        }
        let duration = (engine.now() - self.call_started) as i64;
        engine.fire_on_disconnected(self.call_address.clone(), duration);
        Some(Transition::Scanning)
    }

    fn tick(&mut self, engine: &mut dyn Engine) -> Option<Transition> {
        let now = engine.now();
        if now > self.call_timeout_at {
            let duration = (now - self.call_started) as i64;
            engine.fire_on_disconnected(self.call_address.clone(), duration);
            return Some(Transition::Scanning);
        }
        None
    }
}
