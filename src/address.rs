//! Station addresses.
//!
//! Unlike the fixed 3-byte Insteon address this engine's addresses are
//! arbitrary byte strings (callsigns, typically), so `Address` wraps a
//! `Vec<u8>` rather than a fixed-size array.

use std::fmt;

use crate::error::AleError;

/// Reserved destination meaning "anyone may answer, at most one should."
pub const ANY: &[u8] = b"ANY";
/// Reserved destination meaning "broadcast, never answered with a call handshake."
pub const ALL: &[u8] = b"ALL";

/// A station address.
///
/// May not contain the packet separator byte (`:`), since the codec uses
/// the first two `:` bytes in a frame to delimit origin and destination.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Address(Vec<u8>);

impl Address {
    /// Builds an address from raw bytes, rejecting empty addresses and
    /// addresses containing the `:` separator.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, AleError> {
        let bytes = bytes.into();
        if bytes.is_empty() || bytes.contains(&b':') {
            return Err(AleError::InvalidAddress);
        }
        Ok(Self(bytes))
    }

    /// The reserved `ANY` address.
    pub fn any() -> Self {
        Self(ANY.to_vec())
    }

    /// The reserved `ALL` address.
    pub fn all() -> Self {
        Self(ALL.to_vec())
    }

    /// Whether this is the reserved `ANY` address.
    pub fn is_any(&self) -> bool {
        self.0 == ANY
    }

    /// Whether this is the reserved `ALL` address.
    pub fn is_all(&self) -> bool {
        self.0 == ALL
    }

    /// The raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// An ordered collection of addresses with no implied uniqueness beyond
/// "don't add the same address twice."
///
/// Used identically for self-addresses, whitelist entries, and blacklist
/// entries (the three address sets a [`crate::station::Station`] holds).
#[derive(Clone, Debug, Default)]
pub struct AddressSet {
    addresses: Vec<Address>,
}

impl AddressSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set containing a single, primary address.
    pub fn with_primary(address: Address) -> Self {
        Self {
            addresses: vec![address],
        }
    }

    /// The first address added, if any.
    pub fn primary(&self) -> Option<&Address> {
        self.addresses.first()
    }

    /// Adds an address if it is not already present.
    pub fn add(&mut self, address: Address) {
        if !self.addresses.contains(&address) {
            self.addresses.push(address);
        }
    }

    /// Removes an address if present.
    pub fn remove(&mut self, address: &Address) {
        self.addresses.retain(|a| a != address);
    }

    /// Whether the set contains `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    /// Iterates the set in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter()
    }

    /// Whether the set holds no addresses.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
