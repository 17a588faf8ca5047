//! The interface states use to act on the station, passed as a parameter
//! rather than stored as a back-reference (§9 redesign notes).

use crate::address::{Address, AddressSet};
use crate::packet::Command;
use crate::scanlist::ChannelId;

/// Everything a [`crate::statemachine::StateHandler`] needs from the
/// station it belongs to.
pub trait Engine {
    /// Current wall-clock time, in fractional seconds.
    fn now(&self) -> f64;

    /// The station's self-addresses (primary + secondary).
    fn self_addresses(&self) -> &AddressSet;

    /// Number of channels in the current scanlist (used to derive
    /// call/sound timeouts).
    fn scanlist_len(&self) -> usize;

    /// The channel currently tuned.
    fn current_channel(&self) -> Option<ChannelId>;

    /// The channel that follows the current one in rotation order.
    fn next_channel(&self) -> Option<ChannelId>;

    /// Tunes to `channel` (assumed to be in the current scanlist).
    fn set_channel(&mut self, channel: &ChannelId);

    /// Builds, pads (for CALL/SOUND), and transmits an ALE packet from the
    /// primary self-address.
    fn send_ale(&mut self, command: Command, destination: Address, data: Vec<u8>);

    /// Whether carrier has been sensed within the last 10 ms.
    fn carrier_sensed_recently(&self) -> bool;

    /// Whether the modem's transmit buffer is currently empty.
    fn tx_buffer_empty(&self) -> bool;

    fn lqa_should_ack_sound(&self, channel: &ChannelId, origin: &Address) -> bool;
    fn lqa_channel_stale(&self, channel: &ChannelId) -> bool;
    fn lqa_set_next_sounding(&mut self, channel: ChannelId);
    fn lqa_best_channel(&self, address: Option<&Address>, exclude: &[ChannelId]) -> Option<ChannelId>;

    /// Appends a line to the station's log queue.
    fn log(&mut self, message: String);

    fn fire_on_incoming_call(&self, origin: Address);
    fn fire_on_connected(&self, peer: Address);
    fn fire_on_disconnected(&self, peer: Address, duration: i64);
}
