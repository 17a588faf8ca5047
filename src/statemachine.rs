//! The state machine (C4): owns exactly one active state and dispatches
//! packets and ticks to it, applying at most one transition per event.

use crate::address::Address;
use crate::packet::Packet;
use crate::state::{calling, connected, connecting, scanning, sounding};

/// The minimum channel dwell and the retransmit cadence for CALL/ACK/SOUND.
pub const SCAN_WINDOW: f64 = 3.0;
/// Idle timeout for an established connection.
pub const CONNECTED_TIMEOUT: f64 = 300.0;

/// Everything a state's `enter` inherits from whichever state preceded it.
///
/// `last_carrier_sense_timestamp` (spec.md §4.3) is tracked once, on the
/// engine, rather than duplicated per state — the scheduler timestamps it
/// every tick regardless of which state is active, so there is only ever
/// one current value to "carry forward."
#[derive(Clone, Copy, Debug, Default)]
pub struct Timing {
    pub last_activity: f64,
}

/// A tag for the currently active state, without its per-state data — used
/// to answer "which state are we in" without borrowing the state itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StateKind {
    Scanning,
    Calling,
    Connecting,
    Connected,
    Sounding,
}

/// A state-change request. Applied by the machine after the handler that
/// produced it returns — never mid-handler — so each event is observed by
/// exactly one state (§8 invariant).
#[derive(Clone, Debug)]
pub enum Transition {
    Scanning,
    /// Only reachable from SCANNING/SOUNDING/CALLING on an incoming CALL.
    Connecting { call_address: Address },
    Connected,
    Sounding,
}

/// The capability set every state implements: entry/exit hooks, a packet
/// handler, and a periodic tick. A tagged variant set, not inheritance
/// (§9 redesign notes).
pub trait StateHandler {
    fn enter(&mut self, timing: Timing, engine: &mut dyn crate::engine::Engine);
    fn leave(&mut self, engine: &mut dyn crate::engine::Engine);
    fn tick(&mut self, engine: &mut dyn crate::engine::Engine) -> Option<Transition>;
    fn receive(&mut self, packet: &Packet, engine: &mut dyn crate::engine::Engine) -> Option<Transition>;
    fn timing(&self) -> Timing;
}

enum AnyState {
    Scanning(scanning::Scanning),
    Calling(calling::Calling),
    Connecting(connecting::Connecting),
    Connected(connected::Connected),
    Sounding(sounding::Sounding),
}

impl AnyState {
    fn kind(&self) -> StateKind {
        match self {
            AnyState::Scanning(_) => StateKind::Scanning,
            AnyState::Calling(_) => StateKind::Calling,
            AnyState::Connecting(_) => StateKind::Connecting,
            AnyState::Connected(_) => StateKind::Connected,
            AnyState::Sounding(_) => StateKind::Sounding,
        }
    }

    fn handler(&mut self) -> &mut dyn StateHandler {
        match self {
            AnyState::Scanning(s) => s,
            AnyState::Calling(s) => s,
            AnyState::Connecting(s) => s,
            AnyState::Connected(s) => s,
            AnyState::Sounding(s) => s,
        }
    }
}

/// Owns the current state and drives transitions. Holds no reference to the
/// station; every operation takes the engine (scanlist/LQA/modem/callback
/// access) as a parameter (§9 redesign notes).
pub struct StateMachine {
    current: AnyState,
    last_kind: Option<StateKind>,
}

impl StateMachine {
    /// Starts in SCANNING, per spec.
    pub fn new(engine: &mut dyn crate::engine::Engine) -> Self {
        let mut machine = Self {
            current: AnyState::Scanning(scanning::Scanning::default()),
            last_kind: None,
        };
        machine.current.handler().enter(Timing::default(), engine);
        machine
    }

    /// Which state is currently active.
    pub fn kind(&self) -> StateKind {
        self.current.kind()
    }

    /// Handles a user-initiated `call(address)`: always a fresh call, so
    /// channel attempts are cleared (vs. an internal retry, which only
    /// appends — see `state::calling`).
    pub fn call(&mut self, address: Address, engine: &mut dyn crate::engine::Engine) {
        self.transition_to(
            AnyState::Calling(calling::Calling::new(address)),
            engine,
        );
    }

    /// Delivers a non-ALE data frame while connected as an implicit
    /// keepalive (§4.3.4).
    pub fn keep_alive(&mut self, engine: &mut dyn crate::engine::Engine) {
        if let AnyState::Connected(state) = &mut self.current {
            state.keep_alive_deadline_bump(engine);
        }
    }

    /// Dispatches a received ALE packet to the active state, then applies
    /// at most one resulting transition.
    pub fn receive(&mut self, packet: &Packet, engine: &mut dyn crate::engine::Engine) {
        if let Some(transition) = self.current.handler().receive(packet, engine) {
            self.apply(transition, engine);
        }
    }

    /// Drives the active state's periodic tick, then applies at most one
    /// resulting transition.
    pub fn tick(&mut self, engine: &mut dyn crate::engine::Engine) {
        if let Some(transition) = self.current.handler().tick(engine) {
            self.apply(transition, engine);
        }
    }

    fn apply(&mut self, transition: Transition, engine: &mut dyn crate::engine::Engine) {
        let next = match transition {
            Transition::Scanning => AnyState::Scanning(scanning::Scanning::default()),
            Transition::Connecting { call_address } => {
                AnyState::Connecting(connecting::Connecting::new(call_address))
            }
            Transition::Connected => {
                let (call_address, call_started, announce) = match &self.current {
                    AnyState::Calling(s) => (s.call_address.clone(), s.call_started, true),
                    AnyState::Connecting(s) => (s.call_address.clone(), s.call_started, false),
                    _ => unreachable!("only CALLING/CONNECTING transition to CONNECTED"),
                };
                AnyState::Connected(connected::Connected::new(call_address, call_started, announce))
            }
            Transition::Sounding => AnyState::Sounding(sounding::Sounding::default()),
        };
        self.transition_to(next, engine);
    }

    fn transition_to(&mut self, mut next: AnyState, engine: &mut dyn crate::engine::Engine) {
        let timing = self.current.handler().timing();
        self.current.handler().leave(engine);
        self.last_kind = Some(self.current.kind());
        next.handler().enter(timing, engine);
        self.current = next;
    }
}

/// Derives the ALE timeout used for CALLING/SOUNDING from scanlist size.
pub fn call_or_sound_timeout(channel_count: usize) -> f64 {
    SCAN_WINDOW * (channel_count as f64 + 1.0)
}

pub(crate) fn destined_to_us_or_any(packet: &Packet, self_addresses: &crate::address::AddressSet) -> bool {
    self_addresses.contains(&packet.destination) || packet.destination.is_any()
}
