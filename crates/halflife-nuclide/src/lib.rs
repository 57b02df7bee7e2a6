//! Halflife Nuclide -- Nuclide reference data and isotopic compositions.
//!
//! This crate provides the static data layer for the Halflife decay engine:
//! interned [`NuclideId`](nuclide::NuclideId)s derived from `(protons, mass)`,
//! element symbols, the read-only [`NuclideTable`](table::NuclideTable) loaded
//! from JSON and validated up front, and the [`Composition`](composition::Composition)
//! type that maps nuclides to conserved fractions.
//!
//! # Quick Start
//!
//! ```
//! use halflife_nuclide::prelude::*;
//!
//! let table = NuclideTable::bundled().unwrap();
//! let u238 = table.lookup_symbol("U-238").unwrap();
//! assert_eq!(u238.protons(), 92);
//! assert!(!u238.is_stable());
//!
//! // Product symbols are derived, not looked up.
//! assert_eq!(table.symbol_for(234, 90), "Th-234");
//!
//! let composition = Composition::pure(u238.id);
//! assert_eq!(composition.total(), 1.0);
//! ```

#![deny(unsafe_code)]

pub mod composition;
pub mod element;
pub mod nuclide;
pub mod table;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while parsing symbols or loading a nuclide table.
///
/// Every variant other than the symbol errors is a data-integrity defect in
/// the reference data and is reported at load time, never during simulation.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The table file could not be read.
    #[error("failed to read nuclide table '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The table is not valid JSON or does not match the expected layout.
    #[error("malformed nuclide table: {0}")]
    Json(#[from] serde_json::Error),

    /// A symbol was not of the form `<Element>-<mass>`.
    #[error("invalid nuclide symbol '{0}', expected e.g. 'U-238'")]
    InvalidSymbol(String),

    /// The element part of a symbol is not a known element.
    #[error("unknown element '{element}' in nuclide symbol '{symbol}'")]
    UnknownElement { symbol: String, element: String },

    /// A table key disagrees with the entry's proton count and mass number.
    #[error("table key '{key}' does not match its protons/mass (which give '{derived}')")]
    SymbolMismatch { key: String, derived: String },

    /// Mass number smaller than the proton count.
    #[error("{symbol}: mass number {mass} is smaller than proton count {protons}")]
    InvalidNucleonCount { symbol: String, protons: u16, mass: u16 },

    /// Half-life that is not a positive finite number of seconds.
    #[error("{symbol}: half-life must be positive and finite, got {half_life}")]
    InvalidHalfLife { symbol: String, half_life: f64 },

    /// A branching fraction outside `[0, 1]`.
    #[error("{symbol}: branching fractions must lie in [0, 1], got alpha={alpha}, beta={beta}")]
    InvalidBranching { symbol: String, alpha: f64, beta: f64 },

    /// Branching fractions of an unstable nuclide do not sum to 1.
    #[error("{symbol}: alpha + beta must equal 1 for an unstable nuclide, got {alpha} + {beta} = {sum}")]
    BranchingSum {
        symbol: String,
        alpha: f64,
        beta: f64,
        sum: f64,
    },

    /// An alpha branch on a nuclide too light to emit an alpha particle.
    #[error("{symbol}: alpha branch requires at least 2 protons and mass number 4")]
    ImpossibleAlpha { symbol: String },

    /// The same nuclide was inserted twice.
    #[error("duplicate nuclide '{0}'")]
    DuplicateNuclide(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::composition::Composition;
    pub use crate::element::{Element, ELEMENTS};
    pub use crate::nuclide::{DecayMode, Nuclide, NuclideId};
    pub use crate::table::{NuclideTable, NuclideTableBuilder, BRANCHING_TOLERANCE};
    pub use crate::TableError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn id(s: &str) -> NuclideId {
        s.parse().unwrap()
    }

    #[test]
    fn bundled_table_walks_the_uranium_series() {
        let table = NuclideTable::bundled().unwrap();

        // Follow the dominant branch from U-238 until a stable nuclide.
        let mut current = id("U-238");
        let mut steps = 0;
        loop {
            let nuclide = table
                .lookup(current)
                .unwrap_or_else(|| panic!("{current} missing from bundled table"));
            if nuclide.is_stable() {
                break;
            }
            let mode = if nuclide.alpha_fraction >= nuclide.beta_fraction {
                DecayMode::Alpha
            } else {
                DecayMode::Beta
            };
            current = mode.product(current).unwrap();
            steps += 1;
            assert!(steps < 32, "chain did not terminate");
        }
        assert_eq!(current, id("Pb-206"));
        assert_eq!(steps, 14);
    }

    #[test]
    fn every_bundled_product_is_known() {
        let table = NuclideTable::bundled().unwrap();
        for nuclide in table.iter() {
            for mode in [DecayMode::Alpha, DecayMode::Beta] {
                if nuclide.is_stable() || nuclide.branching(mode) == 0.0 {
                    continue;
                }
                let product = mode.product(nuclide.id).unwrap();
                assert!(
                    table.contains(product),
                    "{} decays ({mode:?}) to {product}, which is not in the table",
                    nuclide.id
                );
            }
        }
    }

    #[test]
    fn composition_of_table_nuclides() {
        let table = NuclideTable::bundled().unwrap();
        let mut c = Composition::pure(id("Rn-222"));
        c.add(id("Po-218"), 0.25);
        c.set(id("Rn-222"), 0.75);
        assert!((c.total() - 1.0).abs() < 1e-12);
        assert!(c.ids().all(|i| table.contains(i)));
    }
}
