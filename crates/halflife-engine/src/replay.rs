//! Deterministic replay of a block's tick sequence.
//!
//! A [`ReplayRecorder`] captures the initial [`BlockSnapshot`], every tick
//! delta, and a [`Block::state_hash`] checkpoint every few ticks. [`replay`]
//! rebuilds the block from the snapshot, feeds it the same deltas, and
//! compares hashes at each checkpoint. Since a tick is a pure function of the
//! block, the table, and the delta, any divergence means the table or the
//! decay configuration differs from the recording.
//!
//! ```
//! use halflife_engine::prelude::*;
//!
//! let table = NuclideTable::bundled().unwrap();
//! let mut block = Block::new(&table, "Po-218").unwrap();
//! let mut recorder = ReplayRecorder::new(&block, 4).unwrap();
//!
//! for _ in 0..32 {
//!     recorder.record(&block, 5.0);
//!     block.tick(&table, 5.0).unwrap();
//! }
//! let log = recorder.finish(&block);
//!
//! let result = replay(&table, &log, &DecayConfig::default()).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! ```

use std::collections::BTreeMap;

use anyhow::{anyhow, bail};
use halflife_nuclide::prelude::*;
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::decay::DecayConfig;
use crate::snapshot::BlockSnapshot;
use crate::EngineError;

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// A recorded run: initial snapshot plus the ordered tick deltas and
/// checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub initial: BlockSnapshot,
    /// Number of ticks recorded.
    pub total_ticks: u64,
    pub entries: Vec<ReplayEntry>,
    /// State hash after the last recorded tick.
    pub final_hash: Option<String>,
}

/// One entry in a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// Tick number `tick` advanced the block by `delta` seconds.
    Tick { tick: u64, delta: f64 },
    /// State hash before tick `tick` ran.
    Checkpoint { tick: u64, state_hash: String },
}

impl ReplayLog {
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// Outcome of [`replay`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Every tick ran and every checkpoint matched.
    pub completed: bool,
    pub ticks_replayed: u64,
    /// First checkpoint whose hash did not match. `None` on success.
    pub first_divergence: Option<ReplayDivergence>,
}

/// Where a replay stopped matching the recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    /// Tick at which the mismatch was detected. `total_ticks` when only the
    /// final hash differs.
    pub tick: u64,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Records ticks of one block into a [`ReplayLog`].
///
/// Call [`record`](Self::record) *before* each tick with the delta about to
/// be applied, then [`finish`](Self::finish) with the final block.
#[derive(Debug)]
pub struct ReplayRecorder {
    log: ReplayLog,
    checkpoint_interval: u64,
}

impl ReplayRecorder {
    /// Start recording from `block`'s current state.
    ///
    /// `checkpoint_interval` of `N` records a hash before ticks 0, N, 2N, ...;
    /// zero disables intermediate checkpoints.
    pub fn new(block: &Block, checkpoint_interval: u64) -> Result<Self, EngineError> {
        Ok(Self {
            log: ReplayLog {
                initial: block.capture_snapshot()?,
                total_ticks: 0,
                entries: Vec::new(),
                final_hash: None,
            },
            checkpoint_interval,
        })
    }

    /// Record the upcoming tick of `delta` seconds on `block`.
    pub fn record(&mut self, block: &Block, delta: f64) {
        let tick = self.log.total_ticks;
        if self.checkpoint_interval > 0 && tick % self.checkpoint_interval == 0 {
            self.log.entries.push(ReplayEntry::Checkpoint {
                tick,
                state_hash: block.state_hash(),
            });
        }
        self.log.entries.push(ReplayEntry::Tick { tick, delta });
        self.log.total_ticks += 1;
    }

    /// Finish recording. `block` is the state after the last tick.
    pub fn finish(mut self, block: &Block) -> ReplayLog {
        self.log.final_hash = Some(block.state_hash());
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Re-run `log` on a fresh block restored from its initial snapshot.
///
/// Stops at the first checkpoint mismatch and reports it.
///
/// # Errors
///
/// A malformed log (missing or duplicate tick entries, duplicate
/// checkpoints), an initial snapshot that fails verification, or a tick that
/// the engine rejects.
pub fn replay(table: &NuclideTable, log: &ReplayLog, config: &DecayConfig) -> anyhow::Result<ReplayResult> {
    let mut deltas: BTreeMap<u64, f64> = BTreeMap::new();
    let mut checkpoints: BTreeMap<u64, &str> = BTreeMap::new();
    for entry in &log.entries {
        match entry {
            ReplayEntry::Tick { tick, delta } => {
                if deltas.insert(*tick, *delta).is_some() {
                    bail!("replay log contains duplicate Tick entry at tick {tick}");
                }
            }
            ReplayEntry::Checkpoint { tick, state_hash } => {
                if checkpoints.insert(*tick, state_hash.as_str()).is_some() {
                    bail!("replay log contains duplicate Checkpoint entry at tick {tick}");
                }
            }
        }
    }

    let mut block = Block::from_snapshot(&log.initial)
        .map_err(|e| anyhow!("failed to restore initial snapshot for replay: {e}"))?;

    let mut ticks_replayed = 0;
    for tick in 0..log.total_ticks {
        if let Some(&expected) = checkpoints.get(&tick) {
            let actual = block.state_hash();
            if actual != expected {
                return Ok(diverged(tick, expected, actual, ticks_replayed));
            }
        }
        let delta = deltas
            .get(&tick)
            .copied()
            .ok_or_else(|| anyhow!("replay log has no Tick entry for tick {tick}"))?;
        block.tick_with(table, delta, config)?;
        ticks_replayed += 1;
    }

    if let Some(expected) = &log.final_hash {
        let actual = block.state_hash();
        if &actual != expected {
            return Ok(diverged(log.total_ticks, expected, actual, ticks_replayed));
        }
    }

    Ok(ReplayResult {
        completed: true,
        ticks_replayed,
        first_divergence: None,
    })
}

fn diverged(tick: u64, expected: &str, actual: String, ticks_replayed: u64) -> ReplayResult {
    tracing::warn!(tick, expected, actual = %actual, "replay diverged");
    ReplayResult {
        completed: false,
        ticks_replayed,
        first_divergence: Some(ReplayDivergence {
            tick,
            expected_hash: expected.to_string(),
            actual_hash: actual,
        }),
    }
}
