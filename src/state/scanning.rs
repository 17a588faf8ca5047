//! SCANNING (§4.3.1): rotate through channels, listen, answer unicast
//! calls, optionally ack a SOUND.

use rand::Rng;

use crate::engine::Engine;
use crate::packet::{Command, Packet};
use crate::statemachine::{destined_to_us_or_any, StateHandler, Timing, Transition, SCAN_WINDOW};

#[derive(Default)]
pub struct Scanning {
    timing: Timing,
    last_channel_change: f64,
    received_sound: Option<Packet>,
    sound_ack_delay: f64,
}

impl StateHandler for Scanning {
    fn enter(&mut self, timing: Timing, _engine: &mut dyn Engine) {
        self.timing = timing;
        self.received_sound = None;
        self.sound_ack_delay = 0.0;
    }

    fn leave(&mut self, _engine: &mut dyn Engine) {}

    fn timing(&self) -> Timing {
        self.timing
    }

    fn receive(&mut self, packet: &Packet, engine: &mut dyn Engine) -> Option<Transition> {
        match packet.command {
            Command::Sound => {
                if self.received_sound.is_none() {
                    self.timing.last_activity = engine.now();
                    self.sound_ack_delay = rand::thread_rng().gen_range(0.25..1.0);
                    self.received_sound = Some(packet.clone());
                }
                None
            }
            Command::Call => {
                if destined_to_us_or_any(packet, engine.self_addresses()) {
                    self.timing.last_activity = engine.now();
                    engine.fire_on_incoming_call(packet.origin.clone());
                    Some(Transition::Connecting {
                        call_address: packet.origin.clone(),
                    })
                } else {
                    None
                }
            }
            Command::Ack | Command::End => None,
        }
    }

    fn tick(&mut self, engine: &mut dyn Engine) -> Option<Transition> {
        let now = engine.now();

        if let Some(sound) = self.received_sound.clone() {
            let channel = sound.channel.clone().unwrap_or_default();
            if engine.lqa_should_ack_sound(&channel, &sound.origin) {
                if !engine.carrier_sensed_recently()
                    && now > sound.timestamp + self.sound_ack_delay
                {
                    engine.send_ale(Command::Ack, sound.origin.clone(), Vec::new());
                    self.received_sound = None;
                }
            } else {
                self.received_sound = None;
            }
        }

        if now > self.last_channel_change + SCAN_WINDOW && now > self.timing.last_activity + SCAN_WINDOW {
            let current = engine.current_channel().unwrap_or_default();
            if engine.lqa_channel_stale(&current) {
                return Some(Transition::Sounding);
            }
            if self.received_sound.is_none() && engine.tx_buffer_empty() {
                if let Some(next) = engine.next_channel() {
                    engine.set_channel(&next);
                    self.last_channel_change = now;
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::tests::test_engine;

    #[test]
    fn rotates_after_scan_window_with_no_activity() {
        let (mut station, clock) = test_engine(&["40A", "40B"]);
        station.set_channel("40A").unwrap();
        clock.advance(SCAN_WINDOW + 1.0);
        station.tick();
        assert_eq!(station.current_channel().unwrap(), "40B");
    }

    #[test]
    fn incoming_call_to_self_moves_to_connecting() {
        let (mut station, _clock) = test_engine(&["40A"]);
        station.set_channel("40A").unwrap();
        station.inject_ale(Command::Call, "PEER", &station.primary_address_str(), vec![]);
        station.tick();
        assert_eq!(station.state_kind(), crate::statemachine::StateKind::Connecting);
    }
}
