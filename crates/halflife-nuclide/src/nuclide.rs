//! Nuclide identifiers and decay properties.
//!
//! A [`NuclideId`] is a 32-bit handle that packs the *proton count* in the
//! high 16 bits and the *mass number* in the low 16 bits. Because the id is a
//! pure function of `(protons, mass)`, the product of any decay can be
//! computed without consulting the nuclide table, and products that the table
//! has never heard of still get a stable, comparable identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::element;
use crate::TableError;

// ---------------------------------------------------------------------------
// NuclideId
// ---------------------------------------------------------------------------

/// Interned nuclide identifier.
///
/// Layout: `[protons: u16 | mass: u16]`
///
/// Displays and serializes as its symbol (`"U-238"`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NuclideId(u32);

impl NuclideId {
    /// Construct an id from a proton count and mass number.
    #[inline]
    pub fn new(protons: u16, mass: u16) -> Self {
        Self((protons as u32) << 16 | mass as u32)
    }

    /// Proton count (atomic number Z).
    #[inline]
    pub fn protons(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Mass number A.
    #[inline]
    pub fn mass(self) -> u16 {
        self.0 as u16
    }

    /// Neutron count, `A - Z`. Saturates at zero for malformed ids.
    #[inline]
    pub fn neutrons(self) -> u16 {
        self.mass().saturating_sub(self.protons())
    }

    /// Ordering key for processing decay chains.
    ///
    /// `2A - Z` drops by 6 under alpha decay and by 1 under beta decay, so
    /// every decay product has a strictly smaller depth than its parent.
    #[inline]
    pub fn chain_depth(self) -> i64 {
        2 * self.mass() as i64 - self.protons() as i64
    }

    /// Raw `u32` representation.
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0
    }

    /// Reconstruct from a raw `u32`.
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Element symbol without the mass number (`"U"`).
    pub fn element_symbol(self) -> std::borrow::Cow<'static, str> {
        element::symbol(self.protons())
    }

    /// Human-readable name, e.g. `"Uranium-238"`.
    pub fn full_name(self) -> String {
        match element::element(self.protons()) {
            Some(e) => format!("{}-{}", e.name, self.mass()),
            None => self.to_string(),
        }
    }
}

impl fmt::Debug for NuclideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NuclideId({self})")
    }
}

impl fmt::Display for NuclideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.element_symbol(), self.mass())
    }
}

impl FromStr for NuclideId {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sym, mass) = s
            .rsplit_once('-')
            .ok_or_else(|| TableError::InvalidSymbol(s.to_owned()))?;
        let mass: u16 = mass
            .parse()
            .map_err(|_| TableError::InvalidSymbol(s.to_owned()))?;
        let protons = element::protons_for_symbol(sym).ok_or_else(|| TableError::UnknownElement {
            symbol: s.to_owned(),
            element: sym.to_owned(),
        })?;
        Ok(Self::new(protons, mass))
    }
}

impl Serialize for NuclideId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NuclideId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// DecayMode
// ---------------------------------------------------------------------------

/// The two decay pathways modelled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecayMode {
    /// Mass number -4, protons -2.
    Alpha,
    /// Mass number unchanged, protons +1.
    Beta,
}

impl DecayMode {
    /// Product of decaying `parent` through this mode.
    ///
    /// Returns `None` when the product would have a negative proton count or
    /// mass number (or overflow the id layout).
    pub fn product(self, parent: NuclideId) -> Option<NuclideId> {
        match self {
            DecayMode::Alpha => Some(NuclideId::new(
                parent.protons().checked_sub(2)?,
                parent.mass().checked_sub(4)?,
            )),
            DecayMode::Beta => Some(NuclideId::new(parent.protons().checked_add(1)?, parent.mass())),
        }
    }
}

// ---------------------------------------------------------------------------
// Nuclide
// ---------------------------------------------------------------------------

/// Physical properties of one nuclide, as stored in the reference table.
///
/// Invariant (checked when a table is built): for an unstable nuclide
/// `alpha_fraction + beta_fraction == 1` within `1e-6`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nuclide {
    pub id: NuclideId,
    /// Half-life in seconds. `None` means stable.
    pub half_life: Option<f64>,
    pub alpha_fraction: f64,
    pub beta_fraction: f64,
    /// Natural abundance. Only used for search ranking by callers.
    pub abundance: f64,
}

impl Nuclide {
    /// A stable (terminal) nuclide.
    pub fn stable(id: NuclideId) -> Self {
        Self {
            id,
            half_life: None,
            alpha_fraction: 0.0,
            beta_fraction: 0.0,
            abundance: 0.0,
        }
    }

    /// A radioactive nuclide with the given half-life (seconds) and branching.
    pub fn radioactive(id: NuclideId, half_life: f64, alpha_fraction: f64, beta_fraction: f64) -> Self {
        Self {
            id,
            half_life: Some(half_life),
            alpha_fraction,
            beta_fraction,
            abundance: 0.0,
        }
    }

    pub fn protons(&self) -> u16 {
        self.id.protons()
    }

    pub fn mass(&self) -> u16 {
        self.id.mass()
    }

    pub fn neutrons(&self) -> u16 {
        self.id.neutrons()
    }

    pub fn is_stable(&self) -> bool {
        self.half_life.is_none()
    }

    /// Fraction of the current amount that decays over `dt` seconds:
    /// `1 - 2^(-dt / half_life)`. Zero for stable nuclides.
    pub fn decayed_fraction(&self, dt: f64) -> f64 {
        match self.half_life {
            // exp_m1 keeps precision when dt is tiny relative to the half-life.
            Some(half_life) => -(-(dt / half_life) * std::f64::consts::LN_2).exp_m1(),
            None => 0.0,
        }
    }

    /// Branching fraction for `mode`.
    pub fn branching(&self, mode: DecayMode) -> f64 {
        match mode {
            DecayMode::Alpha => self.alpha_fraction,
            DecayMode::Beta => self.beta_fraction,
        }
    }
}
