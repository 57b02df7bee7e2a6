//! The read-only nuclide reference table.
//!
//! A [`NuclideTable`] is loaded once (from JSON or a [`NuclideTableBuilder`])
//! and validated in full before it is handed to the engine. After that it is
//! never mutated, so it can be shared between any number of blocks.
//!
//! # JSON layout
//!
//! ```json
//! {
//!   "isotopes": {
//!     "U-238":  { "protons": 92, "mass": 238, "half_life": 1.41e17, "alpha": 1.0, "beta": 0.0, "abundance": 0.9927 },
//!     "Pb-206": { "protons": 82, "mass": 206, "half_life": null, "abundance": 0.241 }
//!   }
//! }
//! ```
//!
//! `decay_data` is accepted as an alias for `isotopes`. Missing `alpha`,
//! `beta` and `abundance` default to 0.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::nuclide::{Nuclide, NuclideId};
use crate::TableError;

/// Allowed deviation of `alpha + beta` from 1 for an unstable nuclide.
pub const BRANCHING_TOLERANCE: f64 = 1e-6;

const BUNDLED_JSON: &str = include_str!("../data/nuclides.json");

// ---------------------------------------------------------------------------
// Raw JSON layout
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTable {
    #[serde(alias = "decay_data")]
    isotopes: BTreeMap<String, RawNuclide>,
}

#[derive(Debug, Deserialize)]
struct RawNuclide {
    protons: u16,
    mass: u16,
    half_life: Option<f64>,
    #[serde(default)]
    alpha: f64,
    #[serde(default)]
    beta: f64,
    #[serde(default)]
    abundance: f64,
}

// ---------------------------------------------------------------------------
// NuclideTable
// ---------------------------------------------------------------------------

/// Static nuclide reference data keyed by [`NuclideId`].
#[derive(Debug, Clone, Default)]
pub struct NuclideTable {
    nuclides: BTreeMap<NuclideId, Nuclide>,
}

impl NuclideTable {
    /// Start building a table programmatically.
    pub fn builder() -> NuclideTableBuilder {
        NuclideTableBuilder::new()
    }

    /// The table shipped with the crate: the U-238 series plus a handful of
    /// short chains and their stable end products.
    pub fn bundled() -> Result<Self, TableError> {
        Self::from_json_str(BUNDLED_JSON)
    }

    /// Parse and validate a table from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, TableError> {
        let raw: RawTable = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Parse and validate a table from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let raw: RawTable = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    /// Read, parse and validate a table file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    fn from_raw(raw: RawTable) -> Result<Self, TableError> {
        let mut builder = NuclideTableBuilder::new();
        for (key, entry) in raw.isotopes {
            let id = NuclideId::new(entry.protons, entry.mass);
            let keyed: NuclideId = key.parse()?;
            if keyed != id {
                return Err(TableError::SymbolMismatch {
                    key,
                    derived: id.to_string(),
                });
            }
            builder = builder.insert(Nuclide {
                id,
                half_life: entry.half_life,
                alpha_fraction: entry.alpha,
                beta_fraction: entry.beta,
                abundance: entry.abundance,
            });
        }
        let table = builder.build()?;
        tracing::info!(nuclides = table.len(), "loaded nuclide table");
        Ok(table)
    }

    /// Look up a nuclide. `None` means the nuclide is unknown to the table,
    /// which the engine treats as inert rather than as an error.
    #[inline]
    pub fn lookup(&self, id: NuclideId) -> Option<&Nuclide> {
        self.nuclides.get(&id)
    }

    /// Look up a nuclide by symbol (`"U-238"`). Malformed symbols are absent.
    pub fn lookup_symbol(&self, symbol: &str) -> Option<&Nuclide> {
        symbol.parse().ok().and_then(|id| self.lookup(id))
    }

    #[inline]
    pub fn contains(&self, id: NuclideId) -> bool {
        self.nuclides.contains_key(&id)
    }

    /// Symbol for `(mass, protons)`. Pure derivation: the nuclide does not
    /// have to exist in the table.
    pub fn symbol_for(&self, mass: u16, protons: u16) -> String {
        NuclideId::new(protons, mass).to_string()
    }

    pub fn len(&self) -> usize {
        self.nuclides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nuclides.is_empty()
    }

    /// All nuclides in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Nuclide> + '_ {
        self.nuclides.values()
    }
}

// ---------------------------------------------------------------------------
// NuclideTableBuilder
// ---------------------------------------------------------------------------

/// Collects nuclides and validates them all in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct NuclideTableBuilder {
    pending: Vec<Nuclide>,
}

impl NuclideTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a nuclide for insertion.
    pub fn insert(mut self, nuclide: Nuclide) -> Self {
        self.pending.push(nuclide);
        self
    }

    /// Queue a stable nuclide by symbol.
    ///
    /// # Panics
    ///
    /// Panics if `symbol` does not parse. Intended for fixtures.
    pub fn stable(self, symbol: &str) -> Self {
        let id = parse_fixture_symbol(symbol);
        self.insert(Nuclide::stable(id))
    }

    /// Queue a radioactive nuclide by symbol.
    ///
    /// # Panics
    ///
    /// Panics if `symbol` does not parse. Intended for fixtures.
    pub fn radioactive(self, symbol: &str, half_life: f64, alpha: f64, beta: f64) -> Self {
        let id = parse_fixture_symbol(symbol);
        self.insert(Nuclide::radioactive(id, half_life, alpha, beta))
    }

    /// Validate every queued nuclide and produce the table.
    pub fn build(self) -> Result<NuclideTable, TableError> {
        let mut nuclides = BTreeMap::new();
        for mut nuclide in self.pending {
            validate(&nuclide)?;
            if nuclide.is_stable() {
                nuclide.alpha_fraction = 0.0;
                nuclide.beta_fraction = 0.0;
            }
            let id = nuclide.id;
            if nuclides.insert(id, nuclide).is_some() {
                return Err(TableError::DuplicateNuclide(id.to_string()));
            }
        }
        Ok(NuclideTable { nuclides })
    }
}

fn parse_fixture_symbol(symbol: &str) -> NuclideId {
    symbol
        .parse()
        .unwrap_or_else(|e| panic!("invalid fixture symbol {symbol:?}: {e}"))
}

/// Check the per-nuclide invariants the engine relies on.
fn validate(nuclide: &Nuclide) -> Result<(), TableError> {
    let symbol = || nuclide.id.to_string();

    if nuclide.mass() < nuclide.protons() {
        return Err(TableError::InvalidNucleonCount {
            symbol: symbol(),
            protons: nuclide.protons(),
            mass: nuclide.mass(),
        });
    }

    let Some(half_life) = nuclide.half_life else {
        return Ok(());
    };
    if !(half_life.is_finite() && half_life > 0.0) {
        return Err(TableError::InvalidHalfLife {
            symbol: symbol(),
            half_life,
        });
    }

    let (alpha, beta) = (nuclide.alpha_fraction, nuclide.beta_fraction);
    if !((0.0..=1.0).contains(&alpha) && (0.0..=1.0).contains(&beta)) {
        return Err(TableError::InvalidBranching {
            symbol: symbol(),
            alpha,
            beta,
        });
    }
    let sum = alpha + beta;
    if (sum - 1.0).abs() > BRANCHING_TOLERANCE {
        return Err(TableError::BranchingSum {
            symbol: symbol(),
            alpha,
            beta,
            sum,
        });
    }
    if alpha > 0.0 && (nuclide.protons() < 2 || nuclide.mass() < 4) {
        return Err(TableError::ImpossibleAlpha { symbol: symbol() });
    }
    Ok(())
}
