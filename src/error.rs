//! The crate's single error type.

use thiserror::Error;

/// Errors surfaced by the ALE engine.
///
/// Malformed packets and config/scanlist/LQA load failures are recovered
/// from internally (logged, defaults used) and never reach user code as an
/// `Err` — see the module-level docs on [`crate::station::Station`].
#[derive(Debug, Error)]
pub enum AleError {
    /// A received frame did not parse as an ALE packet.
    #[error("malformed packet")]
    MalformedPacket,
    /// The radio failed to carry out a tuning request.
    #[error("radio I/O failure: {0}")]
    RadioIo(String),
    /// `~/.ale/config` could not be read or parsed.
    #[error("failed to load config: {0}")]
    ConfigLoad(String),
    /// `~/.ale/scanlists` could not be read or parsed.
    #[error("failed to load scanlists: {0}")]
    ScanlistLoad(String),
    /// `~/.ale/lqa_history` could not be read or parsed.
    #[error("failed to load LQA history: {0}")]
    LqaLoad(String),
    /// A self-address, whitelist, or blacklist address was empty or invalid.
    #[error("invalid address")]
    InvalidAddress,
    /// `set_scanlist` was called with a name not present in `scanlists`.
    #[error("unknown scanlist: {0}")]
    UnknownScanlist(String),
    /// `set_channel` was called with a name not present in the current scanlist.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}
