//! Isotopic compositions.
//!
//! A [`Composition`] maps [`NuclideId`]s to non-negative fractions. The decay
//! engine keeps the fractions summing to 1; this type only stores them. A
//! `BTreeMap` keeps iteration (and therefore serialization, hashing and
//! dominant-isotope tie breaking) in id order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::nuclide::NuclideId;

/// Fractional mixture of nuclides making up one block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Composition {
    amounts: BTreeMap<NuclideId, f64>,
}

impl Composition {
    /// An empty composition.
    pub fn new() -> Self {
        Self::default()
    }

    /// A composition made entirely of `id`.
    pub fn pure(id: NuclideId) -> Self {
        let mut amounts = BTreeMap::new();
        amounts.insert(id, 1.0);
        Self { amounts }
    }

    /// Amount of `id`, or 0 if absent.
    #[inline]
    pub fn get(&self, id: NuclideId) -> f64 {
        self.amounts.get(&id).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn contains(&self, id: NuclideId) -> bool {
        self.amounts.contains_key(&id)
    }

    /// Overwrite the amount of `id`, inserting it if absent.
    pub fn set(&mut self, id: NuclideId, amount: f64) {
        self.amounts.insert(id, amount);
    }

    /// Add `amount` to `id`, inserting it if absent.
    pub fn add(&mut self, id: NuclideId, amount: f64) {
        *self.amounts.entry(id).or_insert(0.0) += amount;
    }

    /// Remove `id`, returning its amount.
    pub fn remove(&mut self, id: NuclideId) -> Option<f64> {
        self.amounts.remove(&id)
    }

    /// Sum of all fractions.
    pub fn total(&self) -> f64 {
        self.amounts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NuclideId, f64)> + '_ {
        self.amounts.iter().map(|(&id, &amount)| (id, amount))
    }

    /// Present nuclides in id order.
    pub fn ids(&self) -> impl Iterator<Item = NuclideId> + '_ {
        self.amounts.keys().copied()
    }

    /// The entry with the largest fraction. Ties go to the lowest id.
    pub fn max_entry(&self) -> Option<(NuclideId, f64)> {
        let mut best: Option<(NuclideId, f64)> = None;
        for (id, amount) in self.iter() {
            match best {
                Some((_, b)) if amount <= b => {}
                _ => best = Some((id, amount)),
            }
        }
        best
    }
}

impl FromIterator<(NuclideId, f64)> for Composition {
    fn from_iter<I: IntoIterator<Item = (NuclideId, f64)>>(iter: I) -> Self {
        let mut c = Composition::new();
        for (id, amount) in iter {
            c.add(id, amount);
        }
        c
    }
}
