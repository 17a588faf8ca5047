//! Channels, scanlists, and the rotation order a scanning station follows.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AleError;

/// A channel name, as it appears as a key in a scanlist.
pub type ChannelId = String;

/// Upper/lower sideband.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sideband {
    Usb,
    Lsb,
}

/// A single radio channel: a frequency and a sideband.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub freq: u32,
    pub mode: Sideband,
}

/// An ordered list of channels. Order is the rotation order SCANNING walks,
/// so it is preserved exactly as declared (a `Vec`, not a sorted map) — and
/// (de)serialized as a JSON object while keeping that order, since the
/// derived `HashMap`/`BTreeMap` representations would not.
#[derive(Clone, Debug, Default)]
pub struct Scanlist {
    channels: Vec<(ChannelId, Channel)>,
}

impl Serialize for Scanlist {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len()))?;
        for (name, channel) in &self.channels {
            map.serialize_entry(name, channel)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Scanlist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScanlistVisitor;

        impl<'de> Visitor<'de> for ScanlistVisitor {
            type Value = Scanlist;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of channel name to channel")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Scanlist, A::Error> {
                let mut channels = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, channel)) = access.next_entry::<ChannelId, Channel>()? {
                    channels.push((name, channel));
                }
                Ok(Scanlist { channels })
            }
        }

        deserializer.deserialize_map(ScanlistVisitor)
    }
}

impl Scanlist {
    /// Number of channels in the rotation.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the scanlist has no channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The channel data for `id`, if present.
    pub fn get(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|(name, _)| name == id).map(|(_, c)| c)
    }

    /// The channel names in rotation order.
    pub fn ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.channels.iter().map(|(name, _)| name)
    }

    /// The first channel in rotation order.
    pub fn first(&self) -> Option<&ChannelId> {
        self.channels.first().map(|(name, _)| name)
    }

    /// The channel that follows `current` in rotation order, wrapping
    /// around to the first channel.
    pub fn next_after(&self, current: &str) -> Option<&ChannelId> {
        let index = self.channels.iter().position(|(name, _)| name == current)?;
        let next_index = (index + 1) % self.channels.len();
        Some(&self.channels[next_index].0)
    }

    /// Inserts or replaces a channel, preserving existing rotation order for
    /// channels that are only being updated.
    pub fn set(&mut self, id: ChannelId, channel: Channel) {
        if let Some(entry) = self.channels.iter_mut().find(|(name, _)| *name == id) {
            entry.1 = channel;
        } else {
            self.channels.push((id, channel));
        }
    }
}

/// The named scanlist table persisted at `~/.ale/scanlists`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scanlists {
    lists: HashMap<String, Scanlist>,
}

impl Scanlists {
    /// A single default scanlist, matching the table the original
    /// implementation writes out on first run.
    pub fn default_table() -> Self {
        let mut default = Scanlist::default();
        default.set(
            "40A".into(),
            Channel {
                freq: 7_102_000,
                mode: Sideband::Usb,
            },
        );
        default.set(
            "40B".into(),
            Channel {
                freq: 7_104_000,
                mode: Sideband::Usb,
            },
        );
        default.set(
            "20A".into(),
            Channel {
                freq: 14_109_000,
                mode: Sideband::Usb,
            },
        );
        let mut lists = HashMap::new();
        lists.insert("default".to_string(), default);
        Self { lists }
    }

    /// Scanlist names, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.lists.keys().cloned().collect()
    }

    /// Inserts or replaces a named scanlist.
    pub fn insert(&mut self, name: String, list: Scanlist) {
        self.lists.insert(name, list);
    }

    /// Looks up a scanlist by name.
    pub fn get(&self, name: &str) -> Result<&Scanlist, AleError> {
        self.lists
            .get(name)
            .ok_or_else(|| AleError::UnknownScanlist(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_wraps() {
        let mut list = Scanlist::default();
        list.set("a".into(), Channel { freq: 1, mode: Sideband::Usb });
        list.set("b".into(), Channel { freq: 2, mode: Sideband::Lsb });
        list.set("c".into(), Channel { freq: 3, mode: Sideband::Usb });
        assert_eq!(list.next_after("a").unwrap(), "b");
        assert_eq!(list.next_after("c").unwrap(), "a");
    }

    #[test]
    fn scanlists_json_round_trip() {
        let table = Scanlists::default_table();
        let json = serde_json::to_string(&table).unwrap();
        let back: Scanlists = serde_json::from_str(&json).unwrap();
        assert_eq!(back.names().len(), table.names().len());
    }
}
