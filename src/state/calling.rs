//! CALLING (§4.3.2): place an outgoing call, retrying across the best
//! remaining channels until the peer acks or attempts are exhausted.

use crate::address::Address;
use crate::engine::Engine;
use crate::packet::{Command, Packet};
use crate::scanlist::ChannelId;
use crate::statemachine::{call_or_sound_timeout, StateHandler, Timing, Transition, SCAN_WINDOW};

pub struct Calling {
    pub(crate) call_address: Address,
    pub(crate) call_started: f64,
    timing: Timing,
    call_timeout: f64,
    call_timeout_at: f64,
    last_call_packet: f64,
    attempts: Vec<ChannelId>,
    max_attempts: usize,
}

impl Calling {
    /// A fresh call — attempts start empty (vs. an internal retry, which
    /// only ever appends to an existing attempt list; see `tick`).
    pub fn new(address: Address) -> Self {
        Self {
            call_address: address,
            call_started: 0.0,
            timing: Timing::default(),
            call_timeout: 0.0,
            call_timeout_at: 0.0,
            last_call_packet: 0.0,
            attempts: Vec::new(),
            max_attempts: 0,
        }
    }
}

impl StateHandler for Calling {
    fn enter(&mut self, timing: Timing, engine: &mut dyn Engine) {
        self.timing = timing;
        self.call_started = engine.now();
        self.call_timeout = call_or_sound_timeout(engine.scanlist_len());
        // Forces an immediate first attempt on the next tick.
        self.call_timeout_at = 0.0;
        self.last_call_packet = 0.0;
        self.attempts.clear();
        self.max_attempts = engine.scanlist_len();
        engine.log(format!("Calling {}", self.call_address));
    }

    fn leave(&mut self, _engine: &mut dyn Engine) {}

    fn timing(&self) -> Timing {
        self.timing
    }

    fn receive(&mut self, packet: &Packet, engine: &mut dyn Engine) -> Option<Transition> {
        if !engine.self_addresses().contains(&packet.destination) {
            return None;
        }
        // A call to ANY has no fixed peer yet: the first responder's ACK
        // becomes the peer we lock onto; every other origin is ignored.
        if self.call_address.is_any() {
            if packet.command != Command::Ack {
                return None;
            }
            self.call_address = packet.origin.clone();
        } else if packet.origin != self.call_address {
            return None;
        }
        self.timing.last_activity = engine.now();
        match packet.command {
            Command::Ack => Some(Transition::Connected),
            Command::Call => Some(Transition::Connecting {
                call_address: self.call_address.clone(),
            }),
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
            if self.attempts.len() < self.max_attempts {
                let best = engine
                    .lqa_best_channel(Some(&self.call_address), &self.attempts)
                    .unwrap_or_else(|| engine.current_channel().unwrap_or_default());
                self.attempts.push(best.clone());
                engine.set_channel(&best);
                self.call_timeout_at = now + self.call_timeout;
                self.last_call_packet = now;
                engine.send_ale(Command::Call, self.call_address.clone(), Vec::new());
                None
            } else {
                let duration = (now - self.call_started) as i64;
                engine.fire_on_disconnected(self.call_address.clone(), duration);
                Some(Transition::Scanning)
            }
        } else if now > self.last_call_packet + SCAN_WINDOW {
            self.last_call_packet = now;
            engine.send_ale(Command::Call, self.call_address.clone(), Vec::new());
            None
        } else {
            None
        }
    }
}
