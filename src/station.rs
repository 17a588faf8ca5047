//! The station engine (C5): owns configuration, the scanlist, the LQA
//! store, the modem/radio handles, and the state machine, and drives the
//! receive path and the scheduler loop.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::address::{Address, AddressSet};
use crate::callbacks::Callbacks;
use crate::clock::Clock;
use crate::config::{Config, Paths};
use crate::engine::Engine;
use crate::error::AleError;
use crate::lqa::Lqa;
use crate::modem::Modem;
use crate::packet::{self, Command, Packet};
use crate::radio::Radio;
use crate::scanlist::{ChannelId, Scanlists};
use crate::statemachine::{StateKind, StateMachine, SCAN_WINDOW};

use crate::log::LogQueue;

/// A request to the station from another thread, drained at the top of
/// every tick so ordering against incoming packets (§5b) is preserved.
enum UserCommand {
    Call(Address),
    Send(Vec<u8>, bool),
    Stop,
}

/// Everything a [`crate::statemachine::StateHandler`] can reach through
/// [`Engine`] — every [`Station`] field except the state machine itself, so
/// `station.state_machine.tick(&mut station.core)` borrows two disjoint
/// fields instead of all of `self` twice (§9 redesign notes).
struct StationCore {
    clock: Box<dyn Clock>,
    self_addresses: AddressSet,
    whitelist: AddressSet,
    whitelist_enabled: bool,
    blacklist: AddressSet,
    blacklist_enabled: bool,
    scanlists: Scanlists,
    scanlist_name: String,
    current_channel: Option<ChannelId>,
    lqa: Lqa,
    modem: Box<dyn Modem>,
    radio: Box<dyn Radio>,
    callbacks: Callbacks,
    log: LogQueue,
    last_carrier_sense: f64,
    online: bool,
}

impl StationCore {
    fn scanlist(&self) -> Result<&crate::scanlist::Scanlist, AleError> {
        self.scanlists.get(&self.scanlist_name)
    }
}

impl Engine for StationCore {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn self_addresses(&self) -> &AddressSet {
        &self.self_addresses
    }

    fn scanlist_len(&self) -> usize {
        self.scanlist().map(|l| l.len()).unwrap_or(0)
    }

    fn current_channel(&self) -> Option<ChannelId> {
        self.current_channel.clone()
    }

    fn next_channel(&self) -> Option<ChannelId> {
        let list = self.scanlist().ok()?;
        match &self.current_channel {
            Some(current) => list.next_after(current).cloned().or_else(|| list.first().cloned()),
            None => list.first().cloned(),
        }
    }

    fn set_channel(&mut self, channel: &ChannelId) {
        if let Ok(list) = self.scanlists.get(&self.scanlist_name) {
            if let Some(ch) = list.get(channel) {
                let (freq, mode) = (ch.freq, ch.mode);
                if self.radio.set_vfo_a(freq).is_err() || self.radio.set_sideband(mode).is_err() {
                    self.online = false;
                    self.log(format!("radio I/O failure tuning {channel}"));
                    return;
                }
            }
        }
        self.current_channel = Some(channel.clone());
        self.modem.prune_tx_buffer(channel);
    }

    fn send_ale(&mut self, command: Command, destination: Address, data: Vec<u8>) {
        let Some(origin) = self.self_addresses.primary().cloned() else {
            return;
        };
        let mut packet = Packet::new(origin, destination, command, data);
        if matches!(command, Command::Call | Command::Sound) {
            packet::pad_for_min_airtime(&mut packet, self.modem.baudrate(), SCAN_WINDOW);
        }
        self.modem.send(&packet.pack());
    }

    fn carrier_sensed_recently(&self) -> bool {
        self.clock.now() - self.last_carrier_sense < 0.01
    }

    fn tx_buffer_empty(&self) -> bool {
        self.modem.tx_buffer_channels().is_empty()
    }

    fn lqa_should_ack_sound(&self, channel: &ChannelId, origin: &Address) -> bool {
        let timeout = crate::statemachine::call_or_sound_timeout(self.scanlist_len());
        self.lqa.should_ack_sound(channel, origin, self.clock.now(), timeout)
    }

    fn lqa_channel_stale(&self, channel: &ChannelId) -> bool {
        self.lqa.channel_stale(channel, self.clock.now())
    }

    fn lqa_set_next_sounding(&mut self, channel: ChannelId) {
        let now = self.clock.now();
        self.lqa.set_next_sounding(channel, now);
    }

    fn lqa_best_channel(&self, address: Option<&Address>, exclude: &[ChannelId]) -> Option<ChannelId> {
        let list = self.scanlist().ok()?;
        self.lqa.best_channel(address, exclude, list, self.clock.now())
    }

    fn log(&mut self, message: String) {
        self.log.push(&message);
    }

    fn fire_on_incoming_call(&self, origin: Address) {
        self.callbacks.fire_on_incoming_call(origin);
    }

    fn fire_on_connected(&self, peer: Address) {
        self.callbacks.fire_on_connected(peer);
    }

    fn fire_on_disconnected(&self, peer: Address, duration: i64) {
        self.callbacks.fire_on_disconnected(peer, duration);
    }
}

/// A handle other threads can use to drive a running [`Station`] without
/// touching its state directly — every call is marshaled through the same
/// queue the scheduler drains at the top of each tick (§5).
#[derive(Clone)]
pub struct StationHandle {
    tx: Sender<UserCommand>,
}

impl StationHandle {
    pub fn call(&self, address: Address) {
        let _ = self.tx.send(UserCommand::Call(address));
    }

    pub fn send(&self, data: Vec<u8>, keep_alive: bool) {
        let _ = self.tx.send(UserCommand::Send(data, keep_alive));
    }

    pub fn stop(&self) {
        let _ = self.tx.send(UserCommand::Stop);
    }
}

/// The station engine. Owns the state machine, the LQA store, the
/// modem/radio handles, and the scheduler's bookkeeping.
pub struct Station {
    core: StationCore,
    state_machine: StateMachine,
    paths: Paths,
    rx: Receiver<(Vec<u8>, f64)>,
    user_tx: Sender<UserCommand>,
    user_rx: Receiver<UserCommand>,
    last_log_flush: f64,
    last_cull: f64,
}

impl Station {
    /// Builds a station from already-loaded configuration and collaborator
    /// handles. `modem`/`radio` are typically [`crate::modem::NullModem`]/
    /// [`crate::radio::NullRadio`] for text-mode stations — a real FSK
    /// modem or radio-control wire protocol is out of scope here (§1).
    pub fn new(
        config: Config,
        paths: Paths,
        scanlists: Scanlists,
        lqa_entries: Vec<crate::lqa::HistoryEntry>,
        clock: Box<dyn Clock>,
        mut modem: Box<dyn Modem>,
        radio: Box<dyn Radio>,
    ) -> Result<Self, AleError> {
        let address = Address::new(config.address.as_bytes().to_vec())?;
        let mut self_addresses = AddressSet::with_primary(address);
        for group in &config.group_addresses {
            self_addresses.add(Address::new(group.as_bytes().to_vec())?);
        }

        let mut whitelist = AddressSet::new();
        for entry in &config.whitelist {
            whitelist.add(Address::new(entry.as_bytes().to_vec())?);
        }
        let mut blacklist = AddressSet::new();
        for entry in &config.blacklist {
            blacklist.add(Address::new(entry.as_bytes().to_vec())?);
        }

        let now = clock.now();
        let scanlist_name = config.scanlist.clone();
        let first_channel = scanlists.get(&scanlist_name).ok().and_then(|l| l.first().cloned());

        let mut lqa = match scanlists.get(&scanlist_name) {
            Ok(list) => Lqa::new(list, now),
            Err(_) => Lqa::default(),
        };
        lqa.load_entries(lqa_entries);

        let (rx_tx, rx) = mpsc::channel();
        modem.set_rx_callback(rx_tx);
        let (user_tx, user_rx) = mpsc::channel();

        let mut core = StationCore {
            clock,
            self_addresses,
            whitelist_enabled: !config.whitelist.is_empty(),
            whitelist,
            blacklist_enabled: !config.blacklist.is_empty(),
            blacklist,
            scanlists,
            scanlist_name,
            current_channel: None,
            lqa,
            modem,
            radio,
            callbacks: Callbacks::new(),
            log: LogQueue::new(),
            last_carrier_sense: 0.0,
            online: true,
        };

        if let Some(channel) = first_channel {
            Engine::set_channel(&mut core, &channel);
        }

        let state_machine = StateMachine::new(&mut core);

        Ok(Self {
            core,
            state_machine,
            paths,
            rx,
            user_tx,
            user_rx,
            last_log_flush: 0.0,
            last_cull: 0.0,
        })
    }

    /// A handle other threads can use to call `call`/`send`/`stop` without
    /// a reference to the station itself.
    pub fn handle(&self) -> StationHandle {
        StationHandle {
            tx: self.user_tx.clone(),
        }
    }

    pub fn state_kind(&self) -> StateKind {
        self.state_machine.kind()
    }

    pub fn current_channel(&self) -> Option<ChannelId> {
        self.core.current_channel.clone()
    }

    pub fn is_online(&self) -> bool {
        self.core.online
    }

    /// Tunes to `channel`, failing without side effects if it's not in the
    /// current scanlist (§7 invalid-user-input handling).
    pub fn set_channel(&mut self, channel: &str) -> Result<(), AleError> {
        if self.core.scanlist()?.get(channel).is_none() {
            return Err(AleError::UnknownChannel(channel.to_string()));
        }
        Engine::set_channel(&mut self.core, &channel.to_string());
        Ok(())
    }

    /// Switches the active scanlist, failing without side effects if
    /// `name` isn't known.
    pub fn set_scanlist(&mut self, name: &str) -> Result<(), AleError> {
        self.core.scanlists.get(name)?;
        self.core.scanlist_name = name.to_string();
        self.core.current_channel = self.core.scanlists.get(name)?.first().cloned();
        Ok(())
    }

    pub fn add_address(&mut self, address: Address) {
        self.core.self_addresses.add(address);
    }

    pub fn remove_address(&mut self, address: &Address) {
        self.core.self_addresses.remove(address);
    }

    pub fn set_whitelist_enabled(&mut self, enabled: bool) {
        self.core.whitelist_enabled = enabled;
    }

    pub fn add_whitelist(&mut self, address: Address) {
        self.core.whitelist.add(address);
    }

    pub fn remove_whitelist(&mut self, address: &Address) {
        self.core.whitelist.remove(address);
    }

    pub fn set_blacklist_enabled(&mut self, enabled: bool) {
        self.core.blacklist_enabled = enabled;
    }

    pub fn add_blacklist(&mut self, address: Address) {
        self.core.blacklist.add(address);
    }

    pub fn remove_blacklist(&mut self, address: &Address) {
        self.core.blacklist.remove(address);
    }

    pub fn set_on_receive(&mut self, f: impl Fn(Vec<u8>) + Send + 'static) {
        self.core.callbacks.set_on_receive(f);
    }

    pub fn set_on_incoming_call(&mut self, f: impl Fn(Address) + Send + 'static) {
        self.core.callbacks.set_on_incoming_call(f);
    }

    pub fn set_on_connected(&mut self, f: impl Fn(Address) + Send + 'static) {
        self.core.callbacks.set_on_connected(f);
    }

    pub fn set_on_disconnected(&mut self, f: impl Fn(Address, i64) + Send + 'static) {
        self.core.callbacks.set_on_disconnected(f);
    }

    /// Places an outgoing call. A fresh call always clears any in-progress
    /// channel-attempt list (§9 open questions).
    pub fn call(&mut self, address: Address) {
        self.state_machine.call(address, &mut self.core);
    }

    /// Sends a non-ALE data frame through the modem. When `keep_alive` is
    /// set and the station is CONNECTED, this also resets the idle timer
    /// the way a received data frame would (§4.4).
    pub fn send(&mut self, data: Vec<u8>, keep_alive: bool) {
        self.core.modem.send(&data);
        if keep_alive {
            self.state_machine.keep_alive(&mut self.core);
        }
    }

    pub fn stop(&mut self) {
        self.core.online = false;
        self.core.modem.stop();
        let _ = crate::config::save_lqa_history(&self.paths, &self.core.lqa.to_entries());
        let _ = self.core.log.flush(&self.paths);
    }

    /// Drives one iteration: drains queued user commands (in arrival
    /// order, ahead of any packet — §5b), timestamps carrier sense,
    /// drains received frames, then ticks the active state.
    pub fn tick(&mut self) {
        while let Ok(cmd) = self.user_rx.try_recv() {
            match cmd {
                UserCommand::Call(address) => self.call(address),
                UserCommand::Send(data, keep_alive) => self.send(data, keep_alive),
                UserCommand::Stop => self.stop(),
            }
        }

        if !self.core.online {
            return;
        }

        if self.core.modem.carrier_sense() {
            self.core.last_carrier_sense = self.core.clock.now();
        }

        while let Ok((raw, confidence)) = self.rx.try_recv() {
            self.receive_raw(raw, confidence);
        }

        self.state_machine.tick(&mut self.core);

        let now = self.core.clock.now();
        if now > self.last_log_flush + 1.0 {
            let _ = self.core.log.flush(&self.paths);
            self.last_log_flush = now;
        }
        if now > self.last_cull + crate::lqa::SOUND_WINDOW {
            self.core.lqa.cull(now);
            self.last_cull = now;
        }
    }

    /// The receive path (§4.4): non-ALE frames feed `on_receive` (and, in
    /// CONNECTED, act as an implicit keepalive); ALE frames are parsed,
    /// stored in LQA, filtered by whitelist/blacklist, then dispatched to
    /// the state machine.
    fn receive_raw(&mut self, raw: Vec<u8>, confidence: f64) {
        if !raw.starts_with(packet::PREAMBLE) {
            if self.state_machine.kind() == StateKind::Connected {
                self.state_machine.keep_alive(&mut self.core);
                self.core.callbacks.fire_on_receive(raw);
            }
            return;
        }

        let Ok(mut parsed) = Packet::unpack(&raw) else {
            return;
        };
        let channel = self.core.current_channel.clone().unwrap_or_default();
        parsed.received(self.core.clock.now(), confidence, channel);
        self.core.lqa.store(parsed.clone());

        if self.core.whitelist_enabled && !self.core.whitelist.contains(&parsed.origin) {
            return;
        }
        if self.core.blacklist_enabled && self.core.blacklist.contains(&parsed.origin) {
            return;
        }

        self.state_machine.receive(&parsed, &mut self.core);
    }
}
