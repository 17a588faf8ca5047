//! The radio collaborator contract (§6).

use crate::error::AleError;
use crate::scanlist::Sideband;

/// The radio-control collaborator: frequency and sideband only — no
/// standards-compliant wire protocol is specified here (§1 non-goals).
pub trait Radio: Send {
    /// Tunes VFO A to `freq_hz`.
    fn set_vfo_a(&mut self, freq_hz: u32) -> Result<(), AleError>;
    /// Selects upper or lower sideband.
    fn set_sideband(&mut self, sideband: Sideband) -> Result<(), AleError>;
}

/// A radio stand-in for text-mode stations and tests. Always succeeds and
/// remembers the last tuning request, for test assertions.
#[derive(Default)]
pub struct NullRadio {
    pub freq_hz: u32,
    pub sideband: Option<Sideband>,
}

impl Radio for NullRadio {
    fn set_vfo_a(&mut self, freq_hz: u32) -> Result<(), AleError> {
        self.freq_hz = freq_hz;
        Ok(())
    }

    fn set_sideband(&mut self, sideband: Sideband) -> Result<(), AleError> {
        self.sideband = Some(sideband);
        Ok(())
    }
}
