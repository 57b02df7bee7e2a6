//! Per-frame sub-stepping driver.
//!
//! Each frame hands a block one frame's worth of simulated time. The driver
//! splits it into [`DriverConfig::substeps`] equal ticks, which keeps the
//! closed-form decay accurate for nuclides whose half-life is short compared
//! to the frame, and decides when history is recorded:
//!
//! - while the block is young (`lifetime < fine_history_frames * frame_dt`,
//!   checked once at the start of the frame) a point is saved after every
//!   sub-step, so fast initial transients are captured at full resolution;
//! - afterwards one point is saved per frame.
//!
//! # Example
//!
//! ```
//! use halflife_engine::prelude::*;
//!
//! let table = NuclideTable::builder()
//!     .radioactive("Rn-218", 0.035, 1.0, 0.0)
//!     .stable("Po-214")
//!     .build()
//!     .unwrap();
//! let mut block = Block::new(&table, "Rn-218").unwrap();
//!
//! let config = DriverConfig::default();
//! let frame = advance_block(&mut block, &table, 1.0 / 60.0, &config).unwrap();
//! assert_eq!(frame.substeps_run, 16);
//! // Young block: one point per sub-step on top of the seed point.
//! assert_eq!(block.history().len(), 17);
//! ```

use halflife_nuclide::prelude::*;
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::decay::DecayConfig;
use crate::EngineError;

/// Default number of ticks per frame.
pub const DEFAULT_SUBSTEPS: u32 = 16;

// ---------------------------------------------------------------------------
// DriverConfig
// ---------------------------------------------------------------------------

/// Configuration for [`advance_block`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Equal ticks per frame. Must be at least 1.
    pub substeps: u32,
    /// Length of the fine-history window, in frames of simulated time.
    /// Must be finite and non-negative; zero disables fine history.
    pub fine_history_frames: f64,
    /// Passed to every tick.
    pub decay: DecayConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            substeps: DEFAULT_SUBSTEPS,
            fine_history_frames: 1.0,
            decay: DecayConfig::default(),
        }
    }
}

impl DriverConfig {
    /// # Panics
    ///
    /// Panics if `substeps` is zero, `fine_history_frames` is negative or
    /// not finite, or the decay config is invalid.
    pub fn validate(&self) {
        assert!(self.substeps >= 1, "substeps must be at least 1, got 0");
        self.decay.validate();
        assert!(
            self.fine_history_frames.is_finite() && self.fine_history_frames >= 0.0,
            "fine_history_frames must be finite and non-negative, got {}",
            self.fine_history_frames
        );
    }
}

// ---------------------------------------------------------------------------
// FrameReport
// ---------------------------------------------------------------------------

/// What one [`advance_block`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Ticks that actually ran (fewer than `substeps` if the block
    /// stabilized partway).
    pub substeps_run: u32,
    /// History points appended.
    pub history_points: u32,
    /// The block became stable during this frame.
    pub stabilized: bool,
    /// Ticks whose cascade hit the budget.
    pub truncated_steps: u32,
}

// ---------------------------------------------------------------------------
// advance_block
// ---------------------------------------------------------------------------

/// Advance `block` by one frame of `frame_dt` simulated seconds.
///
/// Stable blocks and zero-length frames are left untouched.
///
/// # Errors
///
/// [`EngineError::InvalidDelta`] if `frame_dt` is negative or not finite.
/// The block is not modified in that case.
pub fn advance_block(
    block: &mut Block,
    table: &NuclideTable,
    frame_dt: f64,
    config: &DriverConfig,
) -> Result<FrameReport, EngineError> {
    config.validate();
    if !frame_dt.is_finite() || frame_dt < 0.0 {
        return Err(EngineError::InvalidDelta(frame_dt));
    }

    let mut report = FrameReport::default();
    if block.is_stable() || frame_dt == 0.0 {
        return Ok(report);
    }

    let delta = frame_dt / config.substeps as f64;
    let fine = block.lifetime() < frame_dt * config.fine_history_frames;

    for _ in 0..config.substeps {
        let outcome = block.tick_with(table, delta, &config.decay)?;
        report.substeps_run += 1;
        if outcome.report.truncated {
            report.truncated_steps += 1;
        }
        if fine {
            block.save_history();
            report.history_points += 1;
        }
        if outcome.stabilized {
            report.stabilized = true;
            break;
        }
    }
    if !fine {
        block.save_history();
        report.history_points += 1;
    }

    Ok(report)
}
