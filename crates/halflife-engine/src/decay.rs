//! The per-step decay algorithm.
//!
//! [`decay_step`] advances a [`Composition`] by `dt` simulated seconds:
//!
//! 1. Every present nuclide that the table knows is pushed onto a work heap
//!    keyed by [`NuclideId::chain_depth`]. Unknown nuclides are inert.
//! 2. The deepest nuclide is popped, loses `amount * (1 - 2^(-dt / t½))`, and
//!    the lost amount is split between its alpha and beta products.
//! 3. Products the table knows, and that have not been queued during this
//!    step, are pushed onto the heap. Since every product is strictly
//!    shallower than its parent, a nuclide is only popped after all of its
//!    ancestors present in this step have been finalized, so a single step
//!    cascades through any number of generations.
//!
//! A per-step visited set bounds the work to the number of distinct nuclides
//! reachable from the composition, and [`DecayConfig::cascade_budget`] caps it
//! further. Hitting the budget truncates the step: unvisited nuclides keep
//! their amounts, so the sum invariant still holds.
//!
//! Tiny remainders are folded into the decay output once they fall below
//! `1e-3 * sqrt(1 - 2^(-dt / t½))`, so compositions do not carry an infinite
//! tail of dust.

use std::collections::{BinaryHeap, HashSet};

use halflife_nuclide::prelude::*;
use serde::{Deserialize, Serialize};

/// Scale of the adaptive residue threshold.
pub const FOLD_COEFFICIENT: f64 = 1e-3;

/// Default number of nuclide visits allowed in one step.
pub const DEFAULT_CASCADE_BUDGET: usize = 4096;

// ---------------------------------------------------------------------------
// DecayConfig
// ---------------------------------------------------------------------------

/// Tuning for [`decay_step`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    /// Maximum nuclides processed in one step before the cascade is cut off.
    pub cascade_budget: usize,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            cascade_budget: DEFAULT_CASCADE_BUDGET,
        }
    }
}

impl DecayConfig {
    /// # Panics
    ///
    /// Panics if `cascade_budget` is zero. A zero budget truncates every
    /// step before any work, so no block could ever stabilize.
    pub fn validate(&self) {
        assert!(self.cascade_budget >= 1, "cascade_budget must be at least 1, got 0");
    }
}

// ---------------------------------------------------------------------------
// StepReport
// ---------------------------------------------------------------------------

/// What happened during one [`decay_step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// At least one present nuclide has a half-life and was processed.
    pub decayed: bool,
    /// Nuclides popped from the work heap.
    pub visited: usize,
    /// The cascade budget ran out before the heap was empty.
    pub truncated: bool,
    /// Entries removed by residue folding.
    pub folded: usize,
    /// Decay products credited to nuclides missing from the table.
    pub unknown_products: usize,
}

impl StepReport {
    /// No decay contribution and no unfinished work: the composition is
    /// terminal.
    pub fn is_terminal(&self) -> bool {
        !self.decayed && !self.truncated
    }
}

// ---------------------------------------------------------------------------
// Work heap
// ---------------------------------------------------------------------------

/// Heap entry. Deepest first, ties broken by id so the order is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct WorkItem {
    depth: i64,
    id: NuclideId,
}

impl WorkItem {
    fn new(id: NuclideId) -> Self {
        Self {
            depth: id.chain_depth(),
            id,
        }
    }
}

// ---------------------------------------------------------------------------
// decay_step
// ---------------------------------------------------------------------------

/// Advance `composition` by `dt` seconds of simulated time.
///
/// `dt` must be finite and non-negative; callers validate it (see
/// [`Block::tick`](crate::block::Block::tick)).
pub fn decay_step(
    table: &NuclideTable,
    composition: &mut Composition,
    dt: f64,
    config: &DecayConfig,
) -> StepReport {
    debug_assert!(dt.is_finite() && dt >= 0.0, "invalid dt {dt}");
    config.validate();

    let mut report = StepReport::default();
    let mut visited: HashSet<NuclideId> = HashSet::with_capacity(composition.len() * 2);
    let mut heap: BinaryHeap<WorkItem> = BinaryHeap::with_capacity(composition.len());

    for id in composition.ids() {
        if table.contains(id) {
            visited.insert(id);
            heap.push(WorkItem::new(id));
        }
    }

    while let Some(item) = heap.pop() {
        if report.visited >= config.cascade_budget {
            report.truncated = true;
            tracing::warn!(
                budget = config.cascade_budget,
                pending = heap.len() + 1,
                "decay cascade truncated"
            );
            break;
        }
        report.visited += 1;

        let Some(nuclide) = table.lookup(item.id) else {
            continue;
        };
        if nuclide.is_stable() {
            continue;
        }
        report.decayed = true;

        let rate = nuclide.decayed_fraction(dt);
        let current = composition.get(item.id);
        let mut decayed = current * rate;
        let remaining = current - decayed;

        if remaining < FOLD_COEFFICIENT * rate.sqrt() {
            decayed = current;
            composition.remove(item.id);
            report.folded += 1;
            tracing::trace!(nuclide = %item.id, residue = remaining, "folded residue");
        } else {
            composition.set(item.id, remaining);
        }

        if decayed <= 0.0 {
            continue;
        }

        for (mode, portion) in split(decayed, nuclide) {
            let Some(product) = mode.product(item.id) else {
                // Table validation rules this out; keep the amount rather than
                // losing it.
                composition.add(item.id, portion);
                continue;
            };
            composition.add(product, portion);

            if table.contains(product) {
                if visited.insert(product) {
                    heap.push(WorkItem::new(product));
                }
            } else {
                report.unknown_products += 1;
                tracing::debug!(parent = %item.id, product = %product, "decay product not in table");
            }
        }
    }

    report
}

/// Split `decayed` between the two modes.
///
/// The beta share is computed as the remainder so the two portions add back
/// to exactly `decayed`, even though the table only guarantees the branching
/// fractions sum to 1 within tolerance.
fn split(decayed: f64, nuclide: &Nuclide) -> impl Iterator<Item = (DecayMode, f64)> {
    let (alpha, beta) = if nuclide.beta_fraction == 0.0 {
        (decayed, 0.0)
    } else if nuclide.alpha_fraction == 0.0 {
        (0.0, decayed)
    } else {
        let alpha = decayed * nuclide.alpha_fraction;
        (alpha, decayed - alpha)
    };
    [(DecayMode::Alpha, alpha), (DecayMode::Beta, beta)]
        .into_iter()
        .filter(|&(_, portion)| portion > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NuclideId {
        s.parse().unwrap()
    }

    fn step(table: &NuclideTable, c: &mut Composition, dt: f64) -> StepReport {
        decay_step(table, c, dt, &DecayConfig::default())
    }

    // -- 1. Single parent ---------------------------------------------------

    #[test]
    fn one_half_life_halves_the_parent() {
        let table = NuclideTable::builder()
            .radioactive("Po-210", 10.0, 1.0, 0.0)
            .stable("Pb-206")
            .build()
            .unwrap();
        let mut c = Composition::pure(id("Po-210"));

        let report = step(&table, &mut c, 10.0);
        assert!(report.decayed);
        assert!(!report.truncated);
        assert!((c.get(id("Po-210")) - 0.5).abs() < 1e-12);
        assert!((c.get(id("Pb-206")) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_dt_changes_nothing_but_counts_as_decay() {
        let table = NuclideTable::builder()
            .radioactive("Po-210", 10.0, 1.0, 0.0)
            .stable("Pb-206")
            .build()
            .unwrap();
        let mut c = Composition::pure(id("Po-210"));
        let report = step(&table, &mut c, 0.0);
        assert!(report.decayed);
        assert_eq!(c, Composition::pure(id("Po-210")));
    }

    // -- 2. Branching -------------------------------------------------------

    #[test]
    fn branch_split_is_exact() {
        let table = NuclideTable::builder()
            .radioactive("Bi-212", 1.0, 0.6, 0.4)
            .stable("Tl-208")
            .stable("Po-212")
            .build()
            .unwrap();
        let mut c = Composition::pure(id("Bi-212"));
        step(&table, &mut c, 1.0);

        assert!((c.get(id("Bi-212")) - 0.5).abs() < 1e-12);
        assert!((c.get(id("Tl-208")) - 0.3).abs() < 1e-12);
        assert!((c.get(id("Po-212")) - 0.2).abs() < 1e-12);
        assert!((c.total() - 1.0).abs() < 1e-15);
    }

    // -- 3. Terminal detection ----------------------------------------------

    #[test]
    fn all_stable_is_terminal() {
        let table = NuclideTable::builder().stable("Pb-206").build().unwrap();
        let mut c = Composition::pure(id("Pb-206"));
        let report = step(&table, &mut c, 100.0);
        assert!(report.is_terminal());
        assert_eq!(report.visited, 1);
    }

    #[test]
    fn unknown_nuclides_are_inert() {
        let table = NuclideTable::default();
        let mut c = Composition::pure(id("Og-294"));
        let report = step(&table, &mut c, 100.0);
        assert!(report.is_terminal());
        assert_eq!(report.visited, 0);
        assert_eq!(c.get(id("Og-294")), 1.0);
    }

    #[test]
    fn product_missing_from_table_still_gets_credit() {
        let table = NuclideTable::builder()
            .radioactive("Po-210", 1.0, 1.0, 0.0)
            .build()
            .unwrap();
        let mut c = Composition::pure(id("Po-210"));
        let report = step(&table, &mut c, 1.0);
        assert_eq!(report.unknown_products, 1);
        assert!((c.get(id("Pb-206")) - 0.5).abs() < 1e-12);
        assert!((c.total() - 1.0).abs() < 1e-15);
    }

    // -- 4. Cascade order ---------------------------------------------------

    #[test]
    fn cascade_reaches_grandchild_in_one_step() {
        let table = NuclideTable::builder()
            .radioactive("Rn-222", 1.0, 1.0, 0.0)
            .radioactive("Po-218", 1.0, 1.0, 0.0)
            .stable("Pb-214")
            .build()
            .unwrap();
        let mut c = Composition::pure(id("Rn-222"));
        let report = step(&table, &mut c, 1.0);

        assert_eq!(report.visited, 3);
        // Po-218 received 0.5 and lost half of it in the same step.
        assert!((c.get(id("Po-218")) - 0.25).abs() < 1e-12);
        assert!((c.get(id("Pb-214")) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn diamond_merge_is_finalized_after_both_parents() {
        // Bi-212 branches to Tl-208 (alpha) and Po-212 (beta); both reach
        // Pb-208. Pb-208 must only be processed once both have contributed.
        let table = NuclideTable::builder()
            .radioactive("Bi-212", 1.0, 0.5, 0.5)
            .radioactive("Tl-208", 1.0, 0.0, 1.0)
            .radioactive("Po-212", 1.0, 1.0, 0.0)
            .radioactive("Pb-208", 1.0, 0.0, 1.0)
            .stable("Bi-208")
            .build()
            .unwrap();
        let mut c = Composition::pure(id("Bi-212"));
        step(&table, &mut c, 1.0);

        // Bi-212: 0.5 left. Tl-208 and Po-212 each receive 0.25 and pass on
        // 0.125, so Pb-208 receives 0.25 and passes on 0.125.
        assert!((c.get(id("Bi-212")) - 0.5).abs() < 1e-12);
        assert!((c.get(id("Tl-208")) - 0.125).abs() < 1e-12);
        assert!((c.get(id("Po-212")) - 0.125).abs() < 1e-12);
        assert!((c.get(id("Pb-208")) - 0.125).abs() < 1e-12);
        assert!((c.get(id("Bi-208")) - 0.125).abs() < 1e-12);
    }

    // -- 5. Residue folding -------------------------------------------------

    #[test]
    fn residue_below_threshold_is_folded() {
        let table = NuclideTable::builder()
            .radioactive("Po-210", 1.0, 1.0, 0.0)
            .stable("Pb-206")
            .build()
            .unwrap();
        // rate = 0.5, threshold = 1e-3 * sqrt(0.5) ~ 7.07e-4.
        let mut c = Composition::new();
        c.set(id("Po-210"), 1e-3);
        c.set(id("Pb-206"), 1.0 - 1e-3);

        let report = step(&table, &mut c, 1.0);
        assert_eq!(report.folded, 1);
        assert!(!c.contains(id("Po-210")));
        assert!((c.get(id("Pb-206")) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn residue_above_threshold_is_kept() {
        let table = NuclideTable::builder()
            .radioactive("Po-210", 1.0, 1.0, 0.0)
            .stable("Pb-206")
            .build()
            .unwrap();
        let mut c = Composition::new();
        c.set(id("Po-210"), 1e-2);
        c.set(id("Pb-206"), 1.0 - 1e-2);

        let report = step(&table, &mut c, 1.0);
        assert_eq!(report.folded, 0);
        assert!((c.get(id("Po-210")) - 5e-3).abs() < 1e-15);
    }

    // -- 6. Budget ----------------------------------------------------------

    #[test]
    fn budget_truncates_and_conserves() {
        let table = NuclideTable::builder()
            .radioactive("Rn-222", 1.0, 1.0, 0.0)
            .radioactive("Po-218", 1.0, 1.0, 0.0)
            .stable("Pb-214")
            .build()
            .unwrap();
        let mut c = Composition::pure(id("Rn-222"));
        let report = decay_step(&table, &mut c, 1.0, &DecayConfig { cascade_budget: 1 });

        assert!(report.truncated);
        assert!(!report.is_terminal());
        assert_eq!(report.visited, 1);
        // Po-218 was credited but never processed.
        assert!((c.get(id("Po-218")) - 0.5).abs() < 1e-12);
        assert!(!c.contains(id("Pb-214")));
        assert!((c.total() - 1.0).abs() < 1e-15);
    }

    #[test]
    #[should_panic(expected = "cascade_budget must be at least 1")]
    fn zero_budget_is_rejected() {
        let table = NuclideTable::builder().stable("Pb-206").build().unwrap();
        let mut c = Composition::pure(id("Pb-206"));
        decay_step(&table, &mut c, 1.0, &DecayConfig { cascade_budget: 0 });
    }
}
