//! The on-air ALE frame format.
//!
//! Wire format (no length prefix — framing is provided by the modem):
//!
//! ```text
//! PREAMBLE ("ALE") | command(2) | origin | ':' | destination | ':' | data
//! ```

use crate::address::Address;
use crate::error::AleError;
use crate::scanlist::ChannelId;

/// 3-byte frame preamble.
pub const PREAMBLE: &[u8] = b"ALE";
/// Field separator between origin/destination/data.
pub const SEPARATOR: u8 = b':';
/// Fixed modem framing overhead counted against the minimum-airtime padding rule.
pub const MODEM_FRAMING_OVERHEAD: usize = 6;

/// One of the four ALE commands.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Command {
    /// `CS` — sound.
    Sound,
    /// `CA` — acknowledge.
    Ack,
    /// `CC` — call.
    Call,
    /// `CE` — end.
    End,
}

impl Command {
    fn try_from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"CS" => Some(Command::Sound),
            b"CA" => Some(Command::Ack),
            b"CC" => Some(Command::Call),
            b"CE" => Some(Command::End),
            _ => None,
        }
    }

    fn as_bytes(self) -> &'static [u8; 2] {
        match self {
            Command::Sound => b"CS",
            Command::Ack => b"CA",
            Command::Call => b"CC",
            Command::End => b"CE",
        }
    }
}

/// A parsed or outgoing ALE packet.
///
/// `origin`/`destination`/`command`/`data` are immutable after [`Packet::pack`]
/// is taken; `timestamp`/`confidence`/`channel` are set exactly once, on
/// reception (see [`Packet::received`]).
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    pub origin: Address,
    pub destination: Address,
    pub command: Command,
    pub data: Vec<u8>,
    pub timestamp: f64,
    pub confidence: f64,
    pub channel: Option<ChannelId>,
}

impl Packet {
    /// Builds an outgoing packet. `timestamp`/`confidence`/`channel` are
    /// meaningless until the packet has been received back by a peer.
    pub fn new(origin: Address, destination: Address, command: Command, data: Vec<u8>) -> Self {
        Self {
            origin,
            destination,
            command,
            data,
            timestamp: 0.0,
            confidence: 0.0,
            channel: None,
        }
    }

    /// Fills in the reception-time fields. Called exactly once, by the
    /// station's receive path, immediately after a successful [`Packet::unpack`].
    pub fn received(&mut self, timestamp: f64, confidence: f64, channel: ChannelId) {
        self.timestamp = timestamp;
        self.confidence = confidence;
        self.channel = Some(channel);
    }

    /// Serializes the packet to its on-air representation.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            PREAMBLE.len() + 2 + self.origin.as_bytes().len() + 1 + self.destination.as_bytes().len() + 1 + self.data.len(),
        );
        out.extend_from_slice(PREAMBLE);
        out.extend_from_slice(self.command.as_bytes());
        out.extend_from_slice(self.origin.as_bytes());
        out.push(SEPARATOR);
        out.extend_from_slice(self.destination.as_bytes());
        out.push(SEPARATOR);
        out.extend_from_slice(&self.data);
        out
    }

    /// Parses a raw frame. Fails if the preamble doesn't match or either
    /// separator is missing — the caller (the station's receive path) drops
    /// the packet silently on error, per spec.
    pub fn unpack(raw: &[u8]) -> Result<Self, AleError> {
        if raw.len() < PREAMBLE.len() + 2 || &raw[..PREAMBLE.len()] != PREAMBLE {
            return Err(AleError::MalformedPacket);
        }
        let rest = &raw[PREAMBLE.len()..];
        let command = Command::try_from_bytes(&rest[..2]).ok_or(AleError::MalformedPacket)?;
        let rest = &rest[2..];

        let origin_sep = find(rest, SEPARATOR).ok_or(AleError::MalformedPacket)?;
        let origin = Address::new(rest[..origin_sep].to_vec()).map_err(|_| AleError::MalformedPacket)?;

        let after_origin = &rest[origin_sep + 1..];
        let dest_sep = find(after_origin, SEPARATOR).ok_or(AleError::MalformedPacket)?;
        let destination =
            Address::new(after_origin[..dest_sep].to_vec()).map_err(|_| AleError::MalformedPacket)?;

        let data = after_origin[dest_sep + 1..].to_vec();

        Ok(Self {
            origin,
            destination,
            command,
            data,
            timestamp: 0.0,
            confidence: 0.0,
            channel: None,
        })
    }
}

fn find(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}

/// Pads `data` with `#` so the packed length (including the fixed modem
/// framing overhead) is at least `floor(baudrate/8 * scan_window/3)` bytes.
///
/// Only applies to CALL and SOUND packets (§4.1); callers are expected to
/// check `command` before invoking this.
pub fn pad_for_min_airtime(packet: &mut Packet, baudrate: u32, scan_window_secs: f64) {
    let packed_len = packet.pack().len() + MODEM_FRAMING_OVERHEAD;
    let min_len = ((baudrate as f64 / 8.0) * (scan_window_secs / 3.0)) as usize;
    if packed_len < min_len {
        let pad = min_len - packed_len;
        packet.data.extend(std::iter::repeat_n(b'#', pad));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn round_trip() {
        let p = Packet::new(addr("AL1"), addr("AL2"), Command::Call, b"#####".to_vec());
        let packed = p.pack();
        assert_eq!(packed, b"ALECCAL1:AL2:#####");
        let unpacked = Packet::unpack(&packed).unwrap();
        assert_eq!(unpacked.origin, p.origin);
        assert_eq!(unpacked.destination, p.destination);
        assert_eq!(unpacked.command, p.command);
        assert_eq!(unpacked.data, p.data);
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(Packet::unpack(b"ALECCAL1AL2").is_err());
    }

    #[test]
    fn rejects_bad_preamble() {
        assert!(Packet::unpack(b"XYZCCAL1:AL2:").is_err());
    }

    #[test]
    fn empty_data_round_trips() {
        let p = Packet::new(addr("A"), addr("ANY"), Command::Sound, vec![]);
        let unpacked = Packet::unpack(&p.pack()).unwrap();
        assert_eq!(unpacked.data, Vec::<u8>::new());
    }

    #[test]
    fn padding_law() {
        let mut p = Packet::new(addr("AL1"), addr("AL2"), Command::Call, vec![]);
        pad_for_min_airtime(&mut p, 300, 3.0);
        let min_len = ((300.0_f64 / 8.0) * (3.0 / 3.0)) as usize;
        assert!(p.pack().len() + MODEM_FRAMING_OVERHEAD >= min_len);
    }
}
