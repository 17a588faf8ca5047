//! CONNECTING (§4.3.3): answering side of the handshake — ack the call and
//! wait for the caller's synchronizing ACK.

use crate::address::Address;
use crate::engine::Engine;
use crate::packet::{Command, Packet};
use crate::statemachine::{call_or_sound_timeout, StateHandler, Timing, Transition, SCAN_WINDOW};

pub struct Connecting {
    pub(crate) call_address: Address,
    pub(crate) call_started: f64,
    timing: Timing,
    call_timeout: f64,
    call_timeout_at: f64,
    last_ack_packet: f64,
}

impl Connecting {
    pub fn new(call_address: Address) -> Self {
        Self {
            call_address,
            call_started: 0.0,
            timing: Timing::default(),
            call_timeout: 0.0,
            call_timeout_at: 0.0,
            last_ack_packet: 0.0,
        }
    }
}

impl StateHandler for Connecting {
    fn enter(&mut self, timing: Timing, engine: &mut dyn Engine) {
        self.timing = timing;
        self.call_started = engine.now();
        self.call_timeout = call_or_sound_timeout(engine.scanlist_len());
        self.call_timeout_at = engine.now() + self.call_timeout;
        self.last_ack_packet = 0.0;
        engine.log(format!("Connecting to {}", self.call_address));
    }

    fn leave(&mut self, _engine: &mut dyn Engine) {}

    fn timing(&self) -> Timing {
        self.timing
    }

    fn receive(&mut self, packet: &Packet, engine: &mut dyn Engine) -> Option<Transition> {
        if !engine.self_addresses().contains(&packet.destination) || packet.origin != self.call_address {
            return None;
        }
        self.timing.last_activity = engine.now();
        match packet.command {
            Command::Ack => Some(Transition::Connected),
            Command::Call => {
                // Peer hasn't heard our ACK yet; restart our timers.
                self.call_timeout_at = engine.now() + self.call_timeout;
                None
            }
            Command::End => {
                let duration = (engine.now() - self.call_started) as i64;
                engine.fire_on_disconnected(self.call_address.clone(), duration);
                Some(Transition::Scanning)
            }
            Command::Sound => None,
        }
    }

    fn tick(&mut self, engine: &mut dyn Engine) -> Option<Transition> {
        let now = engine.now();

        if now > self.call_timeout_at {
            let duration = (now - self.call_started) as i64;
            engine.fire_on_disconnected(self.call_address.clone(), duration);
            return Some(Transition::Scanning);
        }

        if now > self.last_ack_packet + SCAN_WINDOW {
            self.last_ack_packet = now;
            engine.send_ale(Command::Ack, self.call_address.clone(), Vec::new());
        }

        None
    }
}
