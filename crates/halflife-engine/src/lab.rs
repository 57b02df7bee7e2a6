//! The laboratory: every live block, the time scale, and the frame loop.
//!
//! Blocks are addressed by generational [`BlockId`]s. Removing a block bumps
//! the generation of its slot, so a handle kept after removal is reported as
//! stale instead of silently aliasing whatever block reuses the slot.
//!
//! ```
//! use halflife_engine::prelude::*;
//!
//! let table = NuclideTable::bundled().unwrap();
//! let mut lab = Laboratory::new(table);
//! let rn = lab.create_block("Rn-222").unwrap();
//!
//! lab.time_scale_mut().set_index(17); // 1 s = 1 day
//! for _ in 0..60 {
//!     lab.advance_frame(1.0 / 60.0).unwrap();
//! }
//!
//! let block = lab.block(rn).unwrap();
//! assert!((block.lifetime() - 86_400.0).abs() < 1e-6);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use halflife_nuclide::prelude::*;
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::driver::{advance_block, DriverConfig};
use crate::timescale::TimeScale;
use crate::EngineError;

// ---------------------------------------------------------------------------
// BlockId
// ---------------------------------------------------------------------------

/// Handle to a block in a [`Laboratory`].
///
/// Layout: `[generation: u32 | slot: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(u64);

impl BlockId {
    fn new(slot: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | slot as u64)
    }

    pub fn slot(self) -> u32 {
        self.0 as u32
    }

    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({self})")
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Occupant {
    block: Block,
    /// Held blocks are paused (the user is dragging them).
    held: bool,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    occupant: Option<Occupant>,
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Summary of one [`Laboratory::advance_frame`].
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Simulated seconds this frame covered.
    pub sim_dt: f64,
    /// Blocks that ran at least one tick.
    pub blocks_advanced: usize,
    /// Blocks that became stable this frame.
    pub blocks_stabilized: usize,
    /// Ticks cut short by the cascade budget, over all blocks.
    pub truncated_steps: u32,
    /// Wall-clock time spent in the frame.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// Laboratory
// ---------------------------------------------------------------------------

/// Owns the nuclide table, every block, and the time scale.
pub struct Laboratory {
    table: Arc<NuclideTable>,
    slots: Vec<Slot>,
    /// Vacant slot indices, oldest first so generations spread out.
    vacant: VecDeque<u32>,
    time_scale: TimeScale,
    config: DriverConfig,
    last_diagnostics: FrameDiagnostics,
}

impl Laboratory {
    /// Create an empty laboratory with the default [`DriverConfig`].
    pub fn new(table: impl Into<Arc<NuclideTable>>) -> Self {
        Self::with_config(table, DriverConfig::default())
    }

    /// # Panics
    ///
    /// Panics if `config` is invalid (see [`DriverConfig::validate`]).
    pub fn with_config(table: impl Into<Arc<NuclideTable>>, config: DriverConfig) -> Self {
        config.validate();
        Self {
            table: table.into(),
            slots: Vec::new(),
            vacant: VecDeque::new(),
            time_scale: TimeScale::default(),
            config,
            last_diagnostics: FrameDiagnostics::default(),
        }
    }

    pub fn table(&self) -> &NuclideTable {
        &self.table
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn time_scale(&self) -> &TimeScale {
        &self.time_scale
    }

    pub fn time_scale_mut(&mut self) -> &mut TimeScale {
        &mut self.time_scale
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }

    // -----------------------------------------------------------------------
    // Block lifecycle
    // -----------------------------------------------------------------------

    /// Create a block of pure `symbol`.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownNuclide`] if the table does not know `symbol`.
    pub fn create_block(&mut self, symbol: &str) -> Result<BlockId, EngineError> {
        let block = Block::new(&self.table, symbol)?;
        Ok(self.insert(block))
    }

    /// Add an existing block (e.g. one restored from a snapshot).
    pub fn insert(&mut self, block: Block) -> BlockId {
        let occupant = Some(Occupant { block, held: false });
        let id = match self.vacant.pop_front() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.occupant = occupant;
                BlockId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    occupant,
                });
                BlockId::new(index, 0)
            }
        };
        tracing::debug!(block = %id, "block inserted");
        id
    }

    /// Remove a block and return it.
    ///
    /// # Errors
    ///
    /// [`EngineError::StaleBlock`] if `id` was already removed.
    pub fn remove_block(&mut self, id: BlockId) -> Result<Block, EngineError> {
        let slot = self.live_slot_mut(id)?;
        let occupant = slot.occupant.take().ok_or(EngineError::StaleBlock(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push_back(id.slot());
        Ok(occupant.block)
    }

    /// Remove every block. All outstanding handles become stale.
    pub fn reset_all_blocks(&mut self) {
        let removed = self.block_count();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.occupant.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.vacant.push_back(index as u32);
            }
        }
        tracing::debug!(removed, "all blocks reset");
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.live_slot(id).is_ok()
    }

    pub fn block(&self, id: BlockId) -> Result<&Block, EngineError> {
        Ok(&self.occupant(id)?.block)
    }

    /// Pause or resume a block.
    pub fn set_held(&mut self, id: BlockId, held: bool) -> Result<(), EngineError> {
        self.occupant_mut(id)?.held = held;
        Ok(())
    }

    pub fn is_held(&self, id: BlockId) -> Result<bool, EngineError> {
        Ok(self.occupant(id)?.held)
    }

    /// Live blocks in slot order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.occupant
                .as_ref()
                .map(|o| (BlockId::new(index as u32, slot.generation), &o.block))
        })
    }

    pub fn block_count(&self) -> usize {
        self.slots.iter().filter(|s| s.occupant.is_some()).count()
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    /// Advance every non-stable, non-held block by `wall_dt` wall-clock
    /// seconds, converted through the time scale.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidDelta`] if `wall_dt` is negative or not finite,
    /// or if converting it through the time scale overflows. Nothing is
    /// advanced in that case, including the universe clock.
    pub fn advance_frame(&mut self, wall_dt: f64) -> Result<&FrameDiagnostics, EngineError> {
        let start = Instant::now();
        let sim_dt = self.time_scale.advance(wall_dt)?;

        let mut diagnostics = FrameDiagnostics {
            sim_dt,
            ..Default::default()
        };
        for slot in &mut self.slots {
            let Some(occupant) = slot.occupant.as_mut() else {
                continue;
            };
            if occupant.held {
                continue;
            }
            let report = advance_block(&mut occupant.block, &self.table, sim_dt, &self.config)?;
            if report.substeps_run > 0 {
                diagnostics.blocks_advanced += 1;
            }
            if report.stabilized {
                diagnostics.blocks_stabilized += 1;
            }
            diagnostics.truncated_steps += report.truncated_steps;
        }

        diagnostics.total_time = start.elapsed();
        tracing::trace!(
            sim_dt,
            advanced = diagnostics.blocks_advanced,
            stabilized = diagnostics.blocks_stabilized,
            "frame advanced"
        );
        self.last_diagnostics = diagnostics;
        Ok(&self.last_diagnostics)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn live_slot(&self, id: BlockId) -> Result<&Slot, EngineError> {
        self.slots
            .get(id.slot() as usize)
            .filter(|s| s.generation == id.generation() && s.occupant.is_some())
            .ok_or(EngineError::StaleBlock(id))
    }

    fn live_slot_mut(&mut self, id: BlockId) -> Result<&mut Slot, EngineError> {
        self.slots
            .get_mut(id.slot() as usize)
            .filter(|s| s.generation == id.generation() && s.occupant.is_some())
            .ok_or(EngineError::StaleBlock(id))
    }

    fn occupant(&self, id: BlockId) -> Result<&Occupant, EngineError> {
        self.live_slot(id)?
            .occupant
            .as_ref()
            .ok_or(EngineError::StaleBlock(id))
    }

    fn occupant_mut(&mut self, id: BlockId) -> Result<&mut Occupant, EngineError> {
        self.live_slot_mut(id)?
            .occupant
            .as_mut()
            .ok_or(EngineError::StaleBlock(id))
    }
}

impl fmt::Debug for Laboratory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Laboratory")
            .field("nuclides", &self.table.len())
            .field("blocks", &self.block_count())
            .field("time_scale", &self.time_scale.scale())
            .finish()
    }
}
