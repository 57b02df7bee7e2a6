//! Stability classification and dominant-isotope selection.
//!
//! These are read-only views over a [`Composition`]: which nuclide holds the
//! largest share, whether that share is large enough to name the block after
//! it, and whether anything in the composition can still decay.

use halflife_nuclide::prelude::*;

use crate::block::Block;
use crate::units::format_seconds;

/// Minimum share for a block to be labelled with a single nuclide.
pub const APPROXIMATE_THRESHOLD: f64 = 0.7;

// ---------------------------------------------------------------------------
// Dominant isotope
// ---------------------------------------------------------------------------

/// The nuclide with the largest amount, and that amount.
///
/// Ties go to the smallest [`NuclideId`], so the result does not depend on
/// insertion order. `None` for an empty composition.
pub fn approximate(composition: &Composition) -> Option<(NuclideId, f64)> {
    composition.max_entry()
}

/// What a block should be called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayLabel {
    /// One nuclide holds at least [`APPROXIMATE_THRESHOLD`] of the block.
    Explicit(NuclideId),
    /// No nuclide dominates.
    Mixed,
}

impl DisplayLabel {
    pub fn nuclide(self) -> Option<NuclideId> {
        match self {
            DisplayLabel::Explicit(id) => Some(id),
            DisplayLabel::Mixed => None,
        }
    }
}

/// Label for `composition`. The threshold is inclusive.
pub fn display_label(composition: &Composition) -> DisplayLabel {
    match approximate(composition) {
        Some((id, share)) if share >= APPROXIMATE_THRESHOLD => DisplayLabel::Explicit(id),
        _ => DisplayLabel::Mixed,
    }
}

// ---------------------------------------------------------------------------
// Stability
// ---------------------------------------------------------------------------

/// Whether any present nuclide is known to the table and has a half-life.
///
/// Nuclides missing from the table are treated as inert.
pub fn can_decay(table: &NuclideTable, composition: &Composition) -> bool {
    composition
        .ids()
        .filter_map(|id| table.lookup(id))
        .any(|nuclide| !nuclide.is_stable())
}

// ---------------------------------------------------------------------------
// Description
// ---------------------------------------------------------------------------

/// Text shown when inspecting a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescription {
    /// `"Block of Uranium-238"`, `"Block of various isotopes (originally U-238)"`.
    pub heading: String,
    /// Half-life of the dominant nuclide, when there is one.
    pub detail: Option<String>,
    /// Set for blocks that were stable from the start.
    pub note: Option<String>,
}

/// Describe `block` using the reference data in `table`.
pub fn describe(block: &Block, table: &NuclideTable) -> BlockDescription {
    let label = display_label(block.composition());
    let original = block.original();

    let mut heading = match label {
        DisplayLabel::Explicit(id) => format!("Block of {}", id.full_name()),
        DisplayLabel::Mixed => "Block of various isotopes".to_string(),
    };
    if label != DisplayLabel::Explicit(original) {
        heading.push_str(&format!(" (originally {original})"));
    }

    let detail = label.nuclide().map(|id| match table.lookup(id).and_then(|n| n.half_life) {
        Some(half_life) => format!("{id} has a half-life of {}", format_seconds(half_life)),
        None => format!("{id} is stable"),
    });

    let note = (block.is_stable() && block.history().len() <= 1)
        .then(|| format!("{original} is stable and won't decay."));

    BlockDescription {
        heading,
        detail,
        note,
    }
}
