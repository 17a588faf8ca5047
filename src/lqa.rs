//! Link Quality Analysis: a bounded history of received packets, channel
//! ranking for outgoing calls, and sounding-cadence/ack-suppression logic.

use std::collections::{HashMap, VecDeque};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::packet::{Command, Packet};
use crate::scanlist::{ChannelId, Scanlist};

/// Entries older than this are expired lazily on read and culled by the
/// background culler.
pub const SOUND_WINDOW: f64 = 3600.0;
/// Number of strong recent (channel, origin) packets that suppress a sound ack.
pub const SHOULD_ACK_PACKET_COUNT: usize = 3;
/// Minimum confidence counted toward `SHOULD_ACK_PACKET_COUNT`.
pub const SHOULD_ACK_MIN_CONFIDENCE: f64 = 1.7;
/// History is capped at this many entries, newest kept.
pub const MAX_HISTORY: usize = 1000;

/// A single recorded packet, as persisted to `~/.ale/lqa_history`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub origin: Vec<u8>,
    pub destination: Vec<u8>,
    pub command: String,
    pub data: Vec<u8>,
    pub timestamp: f64,
    pub confidence: f64,
    pub channel: ChannelId,
}

impl HistoryEntry {
    fn command_str(command: Command) -> &'static str {
        match command {
            Command::Sound => "CS",
            Command::Ack => "CA",
            Command::Call => "CC",
            Command::End => "CE",
        }
    }
}

impl From<&Packet> for HistoryEntry {
    fn from(p: &Packet) -> Self {
        Self {
            origin: p.origin.as_bytes().to_vec(),
            destination: p.destination.as_bytes().to_vec(),
            command: HistoryEntry::command_str(p.command).to_string(),
            data: p.data.clone(),
            timestamp: p.timestamp,
            confidence: p.confidence,
            channel: p.channel.clone().unwrap_or_default(),
        }
    }
}

/// The time-windowed ring of received packets plus next-sound bookkeeping.
///
/// Holds no back-reference to the station; callers pass the current
/// scanlist/channel in as needed (per the back-reference elimination in the
/// design notes).
#[derive(Debug, Default)]
pub struct Lqa {
    history: VecDeque<Packet>,
    next_sound: HashMap<ChannelId, f64>,
}

impl Lqa {
    /// An empty LQA store with next-sound times initialized for each
    /// channel in `scanlist`.
    pub fn new(scanlist: &Scanlist, now: f64) -> Self {
        let mut lqa = Self::default();
        for id in scanlist.ids() {
            lqa.next_sound.insert(id.clone(), next_sound_time(now));
        }
        lqa
    }

    /// Appends a packet to history and refreshes that channel's next-sound time.
    pub fn store(&mut self, packet: Packet) {
        if let Some(channel) = packet.channel.clone() {
            let now = packet.timestamp;
            self.next_sound.insert(channel, next_sound_time(now));
        }
        self.history.push_back(packet);
        if self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// Scans non-expired history for the best channel to reach `address`
    /// on, excluding any channel in `exclude`. Falls back to the first
    /// non-excluded channel in `scanlist`'s rotation if no candidate survives.
    pub fn best_channel(
        &self,
        address: Option<&Address>,
        exclude: &[ChannelId],
        scanlist: &Scanlist,
        now: f64,
    ) -> Option<ChannelId> {
        let mut best_global: Option<(f64, ChannelId)> = None;
        let mut best_for_address: Option<(f64, ChannelId)> = None;

        for packet in &self.history {
            if is_expired(packet.timestamp, now) {
                continue;
            }
            let Some(channel) = &packet.channel else {
                continue;
            };
            if exclude.contains(channel) {
                continue;
            }

            if best_global.as_ref().is_none_or(|(c, _)| packet.confidence > *c) {
                best_global = Some((packet.confidence, channel.clone()));
            }
            if let Some(address) = address {
                if &packet.origin == address
                    && best_for_address.as_ref().is_none_or(|(c, _)| packet.confidence > *c)
                {
                    best_for_address = Some((packet.confidence, channel.clone()));
                }
            }
        }

        let winner = match (best_for_address, &best_global) {
            (Some((addr_conf, addr_chan)), Some((global_conf, _))) if addr_conf >= 0.9 * global_conf => {
                Some(addr_chan)
            }
            _ => best_global.map(|(_, c)| c),
        };

        winner.or_else(|| scanlist.ids().find(|id| !exclude.contains(id)).cloned())
    }

    /// Whether `channel` is due for a sounding.
    pub fn channel_stale(&self, channel: &str, now: f64) -> bool {
        self.next_sound.get(channel).is_some_and(|&t| now > t)
    }

    /// Pushes `channel`'s next-sound time forward.
    pub fn set_next_sounding(&mut self, channel: ChannelId, now: f64) {
        self.next_sound.insert(channel, next_sound_time(now));
    }

    /// False if at least `SHOULD_ACK_PACKET_COUNT` non-expired packets from
    /// `origin` on `channel` with confidence >= `SHOULD_ACK_MIN_CONFIDENCE`
    /// exist within `sound_timeout` seconds of `now` — another strong
    /// station has likely already answered this sounding.
    pub fn should_ack_sound(&self, channel: &str, origin: &Address, now: f64, sound_timeout: f64) -> bool {
        let mut count = 0;
        for packet in self.history.iter().rev() {
            if is_expired(packet.timestamp, now) {
                continue;
            }
            let age_ok = (now - packet.timestamp) <= sound_timeout;
            if packet.channel.as_deref() == Some(channel)
                && &packet.origin == origin
                && age_ok
                && packet.confidence >= SHOULD_ACK_MIN_CONFIDENCE
            {
                count += 1;
                if count >= SHOULD_ACK_PACKET_COUNT {
                    return false;
                }
            }
        }
        true
    }

    /// Removes entries older than `SOUND_WINDOW` and caps length at `MAX_HISTORY`.
    /// Called by the background culler; touches only LQA's own data.
    pub fn cull(&mut self, now: f64) {
        self.history.retain(|p| !is_expired(p.timestamp, now));
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// Serializes the full history for persistence. Tolerates nothing — the
    /// caller decides how to handle a write failure.
    pub fn to_entries(&self) -> Vec<HistoryEntry> {
        self.history.iter().map(HistoryEntry::from).collect()
    }

    /// Rebuilds history from persisted entries (best-effort; malformed
    /// commands are dropped rather than failing the whole load).
    pub fn load_entries(&mut self, entries: Vec<HistoryEntry>) {
        for entry in entries {
            let command = match entry.command.as_str() {
                "CS" => Command::Sound,
                "CA" => Command::Ack,
                "CC" => Command::Call,
                "CE" => Command::End,
                _ => continue,
            };
            let (Ok(origin), Ok(destination)) = (
                Address::new(entry.origin),
                Address::new(entry.destination),
            ) else {
                continue;
            };
            let mut packet = Packet::new(origin, destination, command, entry.data);
            packet.received(entry.timestamp, entry.confidence, entry.channel);
            self.history.push_back(packet);
        }
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }
}

fn is_expired(timestamp: f64, now: f64) -> bool {
    now > timestamp + SOUND_WINDOW
}

fn next_sound_time(now: f64) -> f64 {
    let jitter = rand::thread_rng().gen_range(0.0..=15.0 * 60.0);
    now + SOUND_WINDOW + jitter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanlist::{Channel, Sideband};

    fn addr(s: &str) -> Address {
        Address::new(s.as_bytes().to_vec()).unwrap()
    }

    fn packet(origin: &str, channel: &str, confidence: f64, timestamp: f64) -> Packet {
        let mut p = Packet::new(addr(origin), Address::all(), Command::Sound, vec![]);
        p.received(timestamp, confidence, channel.to_string());
        p
    }

    fn scanlist(channels: &[&str]) -> Scanlist {
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
        list
    }

    #[test]
    fn best_channel_prefers_global_unless_address_close() {
        let mut lqa = Lqa::default();
        lqa.store(packet("X", "40A", 2.0, 100.0));
        lqa.store(packet("Y", "40B", 1.0, 100.0));
        let list = scanlist(&["40A", "40B"]);

        // Y's best channel is 40B at confidence 1.0, well under 90% of the
        // global max (2.0), so the global winner (40A) is returned.
        assert_eq!(
            lqa.best_channel(Some(&addr("Y")), &[], &list, 200.0),
            Some("40A".to_string())
        );
    }

    #[test]
    fn best_channel_prefers_strong_address_match() {
        let mut lqa = Lqa::default();
        lqa.store(packet("X", "40A", 2.0, 100.0));
        lqa.store(packet("Y", "40B", 1.9, 100.0));
        let list = scanlist(&["40A", "40B"]);
        assert_eq!(
            lqa.best_channel(Some(&addr("Y")), &[], &list, 200.0),
            Some("40B".to_string())
        );
    }

    #[test]
    fn best_channel_never_returns_excluded() {
        let mut lqa = Lqa::default();
        lqa.store(packet("X", "40A", 2.0, 100.0));
        let list = scanlist(&["40A", "40B"]);
        assert_eq!(
            lqa.best_channel(None, &["40A".to_string()], &list, 200.0),
            Some("40B".to_string())
        );
    }

    #[test]
    fn best_channel_falls_back_to_rotation() {
        let lqa = Lqa::default();
        let list = scanlist(&["40A", "40B"]);
        assert_eq!(
            lqa.best_channel(None, &["40A".to_string()], &list, 200.0),
            Some("40B".to_string())
        );
    }

    #[test]
    fn should_ack_sound_suppressed_after_three_strong() {
        let mut lqa = Lqa::default();
        lqa.store(packet("X", "40A", 1.8, 100.0));
        lqa.store(packet("X", "40A", 1.9, 150.0));
        lqa.store(packet("X", "40A", 2.0, 190.0));
        assert!(!lqa.should_ack_sound("40A", &addr("X"), 200.0, 300.0));
    }

    #[test]
    fn should_ack_sound_true_when_below_threshold() {
        let mut lqa = Lqa::default();
        lqa.store(packet("X", "40A", 1.0, 190.0));
        assert!(lqa.should_ack_sound("40A", &addr("X"), 200.0, 300.0));
    }

    #[test]
    fn cull_expires_and_caps() {
        let mut lqa = Lqa::default();
        lqa.store(packet("X", "40A", 1.0, 0.0));
        lqa.cull(SOUND_WINDOW + 1.0);
        assert_eq!(lqa.history.len(), 0);
    }
}
