//! End-to-end scenarios driven through the public API only: two
//! independent stations exchanging frames through their `NullModem`
//! handles, exactly as a real pair would exchange frames over the air.

use std::sync::{Arc, Mutex};

use ale_rs::address::Address;
use ale_rs::clock::TestClock;
use ale_rs::config::{Config, Paths};
use ale_rs::modem::{NullModem, NullModemHandle};
use ale_rs::radio::NullRadio;
use ale_rs::scanlist::{Channel, Scanlist, Scanlists, Sideband};
use ale_rs::statemachine::StateKind;
use ale_rs::station::Station;

fn scanlist_with(channels: &[&str]) -> Scanlists {
    let mut list = Scanlist::default();
    for (i, id) in channels.iter().enumerate() {
        list.set(
            id.to_string(),
            Channel {
                freq: 7_000_000 + i as u32,
                mode: Sideband::Usb,
            },
        );
    }
    let mut scanlists = Scanlists::default();
    scanlists.insert("default".to_string(), list);
    scanlists
}

fn station(name: &str, channels: &[&str], clock: TestClock) -> (Station, NullModemHandle) {
    let config = Config::new(name).unwrap();
    let paths = Paths::at(std::env::temp_dir().join(format!(
        "ale-scenario-test-{}-{}",
        std::process::id(),
        name
    )));
    let modem = NullModem::new(300);
    let handle = modem.handle();
    let station = Station::new(
        config,
        paths,
        scanlist_with(channels),
        Vec::new(),
        Box::new(clock),
        Box::new(modem),
        Box::new(NullRadio::default()),
    )
    .unwrap();
    (station, handle)
}

/// Delivers every frame sitting in `from`'s sent log — that `from` hasn't
/// delivered yet — to `to`, at confidence 2.0.
fn relay(from: &NullModemHandle, delivered: &mut usize, to: &NullModemHandle) {
    let sent = from.sent();
    for raw in &sent[*delivered..] {
        to.inject(raw.clone(), 2.0);
    }
    *delivered = sent.len();
}

#[test]
fn successful_two_station_call() {
    let clock = TestClock::new(1_000.0);
    let (mut a, a_modem) = station("A", &["40A"], clock.clone());
    let (mut b, b_modem) = station("B", &["40A"], clock.clone());
    a.set_channel("40A").unwrap();
    b.set_channel("40A").unwrap();

    let connected = Arc::new(Mutex::new(None));
    let connected_clone = connected.clone();
    b.set_on_incoming_call(move |origin| {
        *connected_clone.lock().unwrap() = Some(origin);
    });

    a.call(Address::new(b"B".to_vec()).unwrap());
    assert_eq!(a.state_kind(), StateKind::Calling);

    let mut a_delivered = 0;
    let mut b_delivered = 0;

    // A's first CALL attempt, relayed to B.
    a.tick();
    relay(&a_modem, &mut a_delivered, &b_modem);
    b.tick();
    assert_eq!(b.state_kind(), StateKind::Connecting);
    assert_eq!(*connected.lock().unwrap(), Some(Address::new(b"A".to_vec()).unwrap()));

    // B's ACK, relayed to A.
    relay(&b_modem, &mut b_delivered, &a_modem);
    a.tick();
    assert_eq!(a.state_kind(), StateKind::Connected);

    // A's synchronizing ACK, relayed to B.
    relay(&a_modem, &mut a_delivered, &b_modem);
    b.tick();
    assert_eq!(b.state_kind(), StateKind::Connected);
}

#[test]
fn call_to_any_locks_onto_first_responder() {
    let clock = TestClock::new(1_000.0);
    let (mut a, a_modem) = station("A", &["40A"], clock.clone());
    let (mut b, b_modem) = station("B", &["40A"], clock.clone());
    a.set_channel("40A").unwrap();
    b.set_channel("40A").unwrap();

    a.call(Address::any());
    assert_eq!(a.state_kind(), StateKind::Calling);

    let mut a_delivered = 0;
    let mut b_delivered = 0;

    // A's CALL to ANY, relayed to B, is answered like a call to self.
    a.tick();
    relay(&a_modem, &mut a_delivered, &b_modem);
    b.tick();
    assert_eq!(b.state_kind(), StateKind::Connecting);

    // B's ACK names itself as the origin; A has no fixed peer yet (its
    // call address is still the reserved ANY) and must lock onto it.
    relay(&b_modem, &mut b_delivered, &a_modem);
    a.tick();
    assert_eq!(a.state_kind(), StateKind::Connected);

    // A's synchronizing ACK completes B's side of the handshake.
    relay(&a_modem, &mut a_delivered, &b_modem);
    b.tick();
    assert_eq!(b.state_kind(), StateKind::Connected);
}

#[test]
fn call_timeout_tries_next_channel_then_disconnects() {
    let clock = TestClock::new(1_000.0);
    let (mut a, _a_modem) = station("A", &["40A", "40B"], clock.clone());
    a.set_channel("40A").unwrap();

    let disconnected = Arc::new(Mutex::new(false));
    let disconnected_clone = disconnected.clone();
    a.set_on_disconnected(move |_peer, _duration| {
        *disconnected_clone.lock().unwrap() = true;
    });

    a.call(Address::new(b"Z".to_vec()).unwrap());

    // First attempt fires immediately on entering CALLING.
    a.tick();
    let first_channel = a.current_channel();
    assert_eq!(a.state_kind(), StateKind::Calling);

    // Second attempt, SCAN_WINDOW * (N+1) = 3 * 3 = 9s later, tries the
    // other scanlist channel.
    clock.advance(10.0);
    a.tick();
    assert_eq!(a.state_kind(), StateKind::Calling);
    assert_ne!(a.current_channel(), first_channel);

    // Third attempt exhausts both channels (N=2) and gives up.
    clock.advance(10.0);
    a.tick();
    assert_eq!(a.state_kind(), StateKind::Scanning);
    assert!(*disconnected.lock().unwrap());
}

#[test]
fn sound_suppressed_after_three_strong_prior_packets() {
    use ale_rs::{Command, Packet};

    let clock = TestClock::new(1_000.0);
    let (mut b, b_modem) = station("B", &["40A"], clock.clone());
    b.set_channel("40A").unwrap();

    let sound = |confidence| -> (Vec<u8>, f64) {
        let p = Packet::new(
            Address::new(b"X".to_vec()).unwrap(),
            Address::all(),
            Command::Sound,
            Vec::new(),
        );
        (p.pack(), confidence)
    };

    for confidence in [1.8, 1.9, 2.0] {
        let (raw, conf) = sound(confidence);
        b_modem.inject(raw, conf);
        b.tick();
        // Let the ack-delay jitter (0.25-1.0s) elapse and B's pending-ack
        // slot clear before the next SOUND arrives.
        clock.advance(2.0);
        b.tick();
    }
    let sent_before = b_modem.sent().len();

    // A fourth SOUND from X should not be acked: should_ack_sound sees
    // three qualifying prior packets and suppresses the response.
    let (raw, conf) = sound(1.0);
    b_modem.inject(raw, conf);
    b.tick();
    clock.advance(2.0);
    b.tick();
    assert_eq!(b_modem.sent().len(), sent_before);
}

#[test]
fn connected_keepalive_resets_idle_timer() {
    let clock = TestClock::new(1_000.0);
    let (mut a, a_modem) = station("A", &["40A"], clock.clone());
    let (mut b, b_modem) = station("B", &["40A"], clock.clone());
    a.set_channel("40A").unwrap();
    b.set_channel("40A").unwrap();

    a.call(Address::new(b"B".to_vec()).unwrap());
    let mut a_delivered = 0;
    let mut b_delivered = 0;
    a.tick();
    relay(&a_modem, &mut a_delivered, &b_modem);
    b.tick();
    relay(&b_modem, &mut b_delivered, &a_modem);
    a.tick();
    relay(&a_modem, &mut a_delivered, &b_modem);
    b.tick();
    assert_eq!(a.state_kind(), StateKind::Connected);
    assert_eq!(b.state_kind(), StateKind::Connected);

    // A non-ALE data frame every 200s must keep the 300s idle timer alive.
    for _ in 0..3 {
        clock.advance(200.0);
        a.send(b"keepalive".to_vec(), true);
        a.tick();
        assert_eq!(a.state_kind(), StateKind::Connected);
    }
}

#[test]
fn packet_round_trip() {
    use ale_rs::{Command, Packet};
    let p = Packet::new(
        Address::new(b"AL1".to_vec()).unwrap(),
        Address::new(b"AL2".to_vec()).unwrap(),
        Command::Call,
        b"#####".to_vec(),
    );
    let packed = p.pack();
    assert_eq!(packed, b"ALECCAL1:AL2:#####");
    let unpacked = Packet::unpack(&packed).unwrap();
    assert_eq!(unpacked.origin, p.origin);
    assert_eq!(unpacked.destination, p.destination);
    assert_eq!(unpacked.command, p.command);
    assert_eq!(unpacked.data, p.data);
}
