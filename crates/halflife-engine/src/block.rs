//! Blocks: one decaying composition with its lifetime and history.
//!
//! A [`Block`] is created pure (`{original: 1.0}`), stable from the start if
//! the original nuclide has no half-life, and with its history seeded at
//! `t = 0`. It only changes through [`Block::tick`] and
//! [`Block::save_history`]. Once a tick makes no decay contribution the block
//! is marked stable for good and further ticks are no-ops.
//!
//! # Example
//!
//! ```
//! use halflife_engine::prelude::*;
//!
//! let table = NuclideTable::builder()
//!     .radioactive("Po-210", 10.0, 1.0, 0.0)
//!     .stable("Pb-206")
//!     .build()
//!     .unwrap();
//!
//! let mut block = Block::new(&table, "Po-210").unwrap();
//! block.tick(&table, 10.0).unwrap();
//!
//! let pb: NuclideId = "Pb-206".parse().unwrap();
//! assert!((block.composition().get(pb) - 0.5).abs() < 1e-12);
//! assert_eq!(block.lifetime(), 10.0);
//! ```

use std::collections::BTreeSet;

use halflife_nuclide::prelude::*;

use crate::classify::can_decay;
use crate::decay::{decay_step, DecayConfig, StepReport};
use crate::history::History;
use crate::EngineError;

// ---------------------------------------------------------------------------
// TickOutcome
// ---------------------------------------------------------------------------

/// Result of one [`Block::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The block was already stable; nothing changed.
    pub idle: bool,
    /// Cascade statistics. Default when `idle`.
    pub report: StepReport,
    /// This tick marked the block stable.
    pub stabilized: bool,
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// One simulated block of material.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    original: NuclideId,
    composition: Composition,
    is_stable: bool,
    lifetime: f64,
    history: History,
}

impl Block {
    /// Create a block made entirely of `symbol`.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownNuclide`] if `symbol` does not parse or is not
    /// in `table`.
    pub fn new(table: &NuclideTable, symbol: &str) -> Result<Self, EngineError> {
        let id: NuclideId = symbol
            .parse()
            .map_err(|_| EngineError::UnknownNuclide(symbol.to_string()))?;
        Self::from_id(table, id)
    }

    /// Create a block made entirely of `id`.
    pub fn from_id(table: &NuclideTable, id: NuclideId) -> Result<Self, EngineError> {
        if !table.contains(id) {
            return Err(EngineError::UnknownNuclide(id.to_string()));
        }

        let composition = Composition::pure(id);
        let is_stable = !can_decay(table, &composition);
        let mut history = History::new();
        history.record(0.0, &composition);

        tracing::debug!(nuclide = %id, stable = is_stable, "block created");
        Ok(Self {
            original: id,
            composition,
            is_stable,
            lifetime: 0.0,
            history,
        })
    }

    /// Reassemble a block from parts. Used by snapshot restore.
    pub(crate) fn from_parts(
        original: NuclideId,
        composition: Composition,
        is_stable: bool,
        lifetime: f64,
        history: History,
    ) -> Self {
        Self {
            original,
            composition,
            is_stable,
            lifetime,
            history,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The nuclide this block was created from.
    pub fn original(&self) -> NuclideId {
        self.original
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    /// Simulated seconds since creation.
    pub fn lifetime(&self) -> f64 {
        self.lifetime
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Every nuclide that has appeared in a recorded history point.
    pub fn all_seen(&self) -> &BTreeSet<NuclideId> {
        self.history.all_seen()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Advance by `delta` simulated seconds with the default [`DecayConfig`].
    pub fn tick(&mut self, table: &NuclideTable, delta: f64) -> Result<TickOutcome, EngineError> {
        self.tick_with(table, delta, &DecayConfig::default())
    }

    /// Advance by `delta` simulated seconds.
    ///
    /// A stable block is left untouched, lifetime included. Otherwise one
    /// decay step runs; if it made no decay contribution (and was not cut
    /// short by the cascade budget) the block becomes stable. Lifetime
    /// advances by `delta` on every non-idle tick, including the one that
    /// stabilizes the block.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidDelta`] if `delta` is negative or not finite.
    pub fn tick_with(
        &mut self,
        table: &NuclideTable,
        delta: f64,
        config: &DecayConfig,
    ) -> Result<TickOutcome, EngineError> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(EngineError::InvalidDelta(delta));
        }
        if self.is_stable {
            return Ok(TickOutcome {
                idle: true,
                ..Default::default()
            });
        }

        let report = decay_step(table, &mut self.composition, delta, config);
        let stabilized = report.is_terminal();
        if stabilized {
            self.is_stable = true;
            tracing::debug!(
                original = %self.original,
                lifetime = self.lifetime + delta,
                "block stabilized"
            );
        }
        self.lifetime += delta;

        Ok(TickOutcome {
            idle: false,
            report,
            stabilized,
        })
    }

    /// Append the current composition to the history at the current lifetime.
    pub fn save_history(&mut self) {
        self.history.record(self.lifetime, &self.composition);
    }
}
