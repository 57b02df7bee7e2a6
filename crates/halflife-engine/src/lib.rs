//! Halflife Engine -- Decay-chain simulation over continuous compositions.
//!
//! This crate builds on [`halflife_nuclide`] to simulate blocks of material
//! decaying in simulated time. Each block holds a conserved
//! [`Composition`](halflife_nuclide::composition::Composition); a tick
//! cascades alpha and beta decay across as many chain generations as the
//! step reaches, detects when nothing is left to decay, and the frame driver
//! records an adaptively sampled history for plotting.
//!
//! # Quick Start
//!
//! ```
//! use halflife_engine::prelude::*;
//!
//! let table = NuclideTable::bundled().unwrap();
//! let mut lab = Laboratory::new(table);
//! let id = lab.create_block("Rn-218").unwrap();
//!
//! // Rn-218 and Po-214 are gone within two seconds; Pb-210 lives 22 years.
//! for _ in 0..120 {
//!     lab.advance_frame(1.0 / 60.0).unwrap();
//! }
//!
//! let block = lab.block(id).unwrap();
//! let total = block.composition().total();
//! assert!((total - 1.0).abs() < 1e-9);
//! assert_eq!(display_label(block.composition()).nuclide().unwrap().to_string(), "Pb-210");
//! ```

#![deny(unsafe_code)]

pub mod block;
pub mod classify;
pub mod decay;
pub mod driver;
pub mod history;
pub mod lab;
pub mod replay;
pub mod snapshot;
pub mod timescale;
pub mod units;

use lab::BlockId;

/// Re-export the data crate for convenience.
pub use halflife_nuclide;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A block was requested for a nuclide the table does not know.
    #[error("unknown nuclide '{0}'")]
    UnknownNuclide(String),

    /// A time delta was negative, infinite or NaN.
    #[error("time delta must be finite and non-negative, got {0}")]
    InvalidDelta(f64),

    /// The handle refers to a block that has been removed.
    #[error("block {0} no longer exists")]
    StaleBlock(BlockId),

    /// A custom time scale was zero, negative or not finite.
    #[error("time scale must be positive and finite, got {0}")]
    InvalidTimeScale(f64),

    /// Loading or validating the nuclide table failed.
    #[error(transparent)]
    Table(#[from] halflife_nuclide::TableError),

    /// Snapshot or replay log (de)serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use halflife_nuclide::prelude::*;

    pub use crate::block::{Block, TickOutcome};
    pub use crate::classify::{
        approximate, can_decay, describe, display_label, BlockDescription, DisplayLabel,
        APPROXIMATE_THRESHOLD,
    };
    pub use crate::decay::{decay_step, DecayConfig, StepReport};
    pub use crate::driver::{advance_block, DriverConfig, FrameReport};
    pub use crate::history::{History, HistoryPoint, PlotSample, PlotSeries, DEFAULT_PLOT_WIDTH};
    pub use crate::lab::{BlockId, FrameDiagnostics, Laboratory};
    pub use crate::replay::{
        replay, ReplayDivergence, ReplayEntry, ReplayLog, ReplayRecorder, ReplayResult,
    };
    pub use crate::snapshot::BlockSnapshot;
    pub use crate::timescale::{Preset, TimeScale};
    pub use crate::units::{format_seconds, FormattedDuration};
    pub use crate::EngineError;
}
