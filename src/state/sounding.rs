//! SOUNDING (§4.3.5): broadcast a SOUND so peers can score this channel.

use crate::address::Address;
use crate::engine::Engine;
use crate::packet::{Command, Packet};
use crate::statemachine::{
    call_or_sound_timeout, destined_to_us_or_any, StateHandler, Timing, Transition, SCAN_WINDOW,
};

#[derive(Default)]
pub struct Sounding {
    timing: Timing,
    sound_timeout_at: f64,
    last_sound_packet: f64,
    sound_rx_ack_count: u32,
}

impl StateHandler for Sounding {
    fn enter(&mut self, timing: Timing, engine: &mut dyn Engine) {
        self.timing = timing;
        self.sound_timeout_at = engine.now() + call_or_sound_timeout(engine.scanlist_len());
        self.sound_rx_ack_count = 0;
        engine.send_ale(Command::Sound, Address::all(), Vec::new());
        self.last_sound_packet = engine.now();
    }

    fn leave(&mut self, _engine: &mut dyn Engine) {}

    fn timing(&self) -> Timing {
        self.timing
    }

    fn receive(&mut self, packet: &Packet, engine: &mut dyn Engine) -> Option<Transition> {
        match packet.command {
            Command::Ack if engine.self_addresses().contains(&packet.destination) => {
                self.timing.last_activity = engine.now();
                self.sound_rx_ack_count += 1;
                None
            }
            Command::Call if destined_to_us_or_any(packet, engine.self_addresses()) => {
                self.timing.last_activity = engine.now();
                Some(Transition::Connecting {
                    call_address: packet.origin.clone(),
                })
            }
            _ => None,
        }
    }

    fn tick(&mut self, engine: &mut dyn Engine) -> Option<Transition> {
        let now = engine.now();

        if now > self.sound_timeout_at {
            engine.log(format!("End sounding ({} responses)", self.sound_rx_ack_count));
            let channel = engine.current_channel().unwrap_or_default();
            engine.lqa_set_next_sounding(channel);
            return Some(Transition::Scanning);
        }

        if now > self.last_sound_packet + SCAN_WINDOW {
            self.last_sound_packet = now;
            engine.send_ale(Command::Sound, Address::all(), Vec::new());
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::tests::test_engine_with_modem;
    use crate::statemachine::StateKind;
    use std::sync::{Arc, Mutex};

    /// Drives a fresh station's channel into staleness so `Scanning::tick`
    /// fires `Transition::Sounding`, and returns it already in SOUNDING.
    fn sounding_station() -> (crate::station::Station, crate::clock::TestClock, crate::modem::NullModemHandle) {
        let (mut station, clock, modem) = test_engine_with_modem(&["40A"]);
        station.set_channel("40A").unwrap();
        // Past every channel's initial next-sound time (now + SOUND_WINDOW +
        // up to 15 minutes of jitter, set when the station's LQA store was
        // created), so the channel reads as stale on the next tick.
        clock.advance(6_000.0);
        station.tick();
        assert_eq!(station.state_kind(), StateKind::Sounding);
        (station, clock, modem)
    }

    #[test]
    fn entering_sounding_broadcasts_a_sound() {
        let (_station, _clock, modem) = sounding_station();
        let sent = modem.sent();
        let last = Packet::unpack(sent.last().expect("a SOUND was sent")).unwrap();
        assert_eq!(last.command, Command::Sound);
        assert!(last.destination.is_all());
    }

    #[test]
    fn call_while_sounding_moves_to_connecting_without_incoming_call_callback() {
        let (mut station, _clock, _modem) = sounding_station();

        let fired = Arc::new(Mutex::new(false));
        let fired_clone = fired.clone();
        station.set_on_incoming_call(move |_origin| {
            *fired_clone.lock().unwrap() = true;
        });

        station.inject_ale(Command::Call, "PEER", &station.primary_address_str(), vec![]);
        station.tick();

        assert_eq!(station.state_kind(), StateKind::Connecting);
        assert!(!*fired.lock().unwrap());
    }

    #[test]
    fn acks_are_counted_and_timeout_returns_to_scanning() {
        let (mut station, clock, _modem) = sounding_station();

        station.inject_ale(Command::Ack, "X", &station.primary_address_str(), vec![]);
        station.inject_ale(Command::Ack, "Y", &station.primary_address_str(), vec![]);
        assert_eq!(station.state_kind(), StateKind::Sounding);

        // call_or_sound_timeout(1 channel) = SCAN_WINDOW * (1 + 1) = 6s.
        clock.advance(10.0);
        station.tick();
        assert_eq!(station.state_kind(), StateKind::Scanning);
    }
}
