//! Block snapshot and restore with BLAKE3 hashing.
//!
//! A [`BlockSnapshot`] is a serializable copy of everything a [`Block`]
//! holds, plus a BLAKE3 digest of its JSON encoding. Restore recomputes the
//! digest and refuses snapshots that were edited or corrupted.
//!
//! ```
//! use halflife_engine::prelude::*;
//!
//! let table = NuclideTable::bundled().unwrap();
//! let mut block = Block::new(&table, "Rn-222").unwrap();
//! block.tick(&table, 1000.0).unwrap();
//!
//! let snapshot = block.capture_snapshot().unwrap();
//! assert_eq!(snapshot.hash.len(), 64);
//!
//! block.tick(&table, 1000.0).unwrap();
//! block.restore_from_snapshot(&snapshot).unwrap();
//! assert_eq!(block.lifetime(), 1000.0);
//! ```
//!
//! [`Block::state_hash`] is a cheaper digest of the dynamic state only
//! (composition, lifetime, stability), used by replay checkpoints.

use anyhow::{bail, ensure};
use halflife_nuclide::prelude::*;
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::history::History;
use crate::EngineError;

// ---------------------------------------------------------------------------
// BlockSnapshot
// ---------------------------------------------------------------------------

/// Serializable copy of a [`Block`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub original: NuclideId,
    pub composition: Composition,
    pub lifetime: f64,
    pub is_stable: bool,
    pub history: History,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the fields above.
    pub hash: String,
}

impl BlockSnapshot {
    /// Recompute the digest from the snapshot's fields.
    pub fn compute_hash(&self) -> Result<String, EngineError> {
        compute_hash(
            self.original,
            &self.composition,
            self.lifetime,
            self.is_stable,
            &self.history,
        )
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn compute_hash(
    original: NuclideId,
    composition: &Composition,
    lifetime: f64,
    is_stable: bool,
    history: &History,
) -> Result<String, EngineError> {
    #[derive(Serialize)]
    struct Hashable<'a> {
        original: NuclideId,
        composition: &'a Composition,
        lifetime: f64,
        is_stable: bool,
        history: &'a History,
    }

    let bytes = serde_json::to_vec(&Hashable {
        original,
        composition,
        lifetime,
        is_stable,
        history,
    })?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// ---------------------------------------------------------------------------
// Block snapshot/restore methods
// ---------------------------------------------------------------------------

impl Block {
    /// Capture a hashed snapshot of this block.
    pub fn capture_snapshot(&self) -> Result<BlockSnapshot, EngineError> {
        let hash = compute_hash(
            self.original(),
            self.composition(),
            self.lifetime(),
            self.is_stable(),
            self.history(),
        )?;
        Ok(BlockSnapshot {
            original: self.original(),
            composition: self.composition().clone(),
            lifetime: self.lifetime(),
            is_stable: self.is_stable(),
            history: self.history().clone(),
            hash,
        })
    }

    /// Build a block from a snapshot after verifying it.
    pub fn from_snapshot(snapshot: &BlockSnapshot) -> anyhow::Result<Self> {
        verify(snapshot)?;
        Ok(Block::from_parts(
            snapshot.original,
            snapshot.composition.clone(),
            snapshot.is_stable,
            snapshot.lifetime,
            snapshot.history.clone(),
        ))
    }

    /// Replace this block's state with `snapshot`.
    ///
    /// The snapshot is verified first; on error the block is unchanged.
    pub fn restore_from_snapshot(&mut self, snapshot: &BlockSnapshot) -> anyhow::Result<()> {
        *self = Self::from_snapshot(snapshot)?;
        Ok(())
    }

    /// BLAKE3 hex digest of the dynamic state: original, composition,
    /// lifetime and stability. History is not included.
    ///
    /// Hashes the raw bit patterns, so two blocks share a hash only if they
    /// are bit-for-bit identical.
    pub fn state_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.original().to_raw().to_le_bytes());
        hasher.update(&self.lifetime().to_bits().to_le_bytes());
        hasher.update(&[self.is_stable() as u8]);
        hasher.update(&(self.composition().len() as u64).to_le_bytes());
        for (id, amount) in self.composition().iter() {
            hasher.update(&id.to_raw().to_le_bytes());
            hasher.update(&amount.to_bits().to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn verify(snapshot: &BlockSnapshot) -> anyhow::Result<()> {
    let actual = snapshot.compute_hash()?;
    if actual != snapshot.hash {
        bail!(
            "snapshot hash mismatch: expected {}, computed {actual}",
            snapshot.hash
        );
    }
    ensure!(
        snapshot.lifetime.is_finite() && snapshot.lifetime >= 0.0,
        "snapshot lifetime must be finite and non-negative, got {}",
        snapshot.lifetime
    );
    let points = snapshot.history.points();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        bail!("snapshot history is empty");
    };
    ensure!(
        first.time == 0.0,
        "snapshot history must start at t=0, starts at {}",
        first.time
    );
    ensure!(
        points.windows(2).all(|w| w[0].time <= w[1].time),
        "snapshot history times are not in order"
    );
    ensure!(
        last.time <= snapshot.lifetime,
        "snapshot history ends at {} but lifetime is {}",
        last.time,
        snapshot.lifetime
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> NuclideTable {
        NuclideTable::builder()
            .radioactive("Po-210", 10.0, 1.0, 0.0)
            .stable("Pb-206")
            .build()
            .unwrap()
    }

    // -- 1. Capture -----------------------------------------------------------

    #[test]
    fn identical_blocks_hash_identically() {
        let t = table();
        let mut a = Block::new(&t, "Po-210").unwrap();
        let mut b = Block::new(&t, "Po-210").unwrap();
        a.tick(&t, 3.0).unwrap();
        b.tick(&t, 3.0).unwrap();
        assert_eq!(a.capture_snapshot().unwrap().hash, b.capture_snapshot().unwrap().hash);
        assert_eq!(a.state_hash(), b.state_hash());

        b.tick(&t, 1.0).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn state_hash_ignores_history() {
        let t = table();
        let mut a = Block::new(&t, "Po-210").unwrap();
        a.tick(&t, 3.0).unwrap();
        let before = a.state_hash();
        a.save_history();
        assert_eq!(a.state_hash(), before);
    }

    // -- 2. Restore -----------------------------------------------------------

    #[test]
    fn json_round_trip_restores_exactly() {
        let t = table();
        let mut block = Block::new(&t, "Po-210").unwrap();
        block.tick(&t, 7.0).unwrap();
        block.save_history();

        let json = block.capture_snapshot().unwrap().to_json().unwrap();
        let restored = Block::from_snapshot(&BlockSnapshot::from_json(&json).unwrap()).unwrap();
        assert_eq!(restored, block);
    }

    #[test]
    fn tampered_snapshot_is_rejected() {
        let t = table();
        let mut block = Block::new(&t, "Po-210").unwrap();
        let mut snapshot = block.capture_snapshot().unwrap();
        snapshot.lifetime = 99.0;

        block.tick(&t, 1.0).unwrap();
        let before = block.clone();
        let err = block.restore_from_snapshot(&snapshot).unwrap_err();
        assert!(err.to_string().contains("hash mismatch"));
        assert_eq!(block, before);
    }

    // -- 3. Consistency -------------------------------------------------------

    /// Re-seal a hand-edited snapshot so only the consistency checks can
    /// reject it.
    fn reseal(snapshot: &mut BlockSnapshot) {
        snapshot.hash = snapshot.compute_hash().unwrap();
    }

    #[test]
    fn lifetime_before_last_history_point_is_rejected() {
        let t = table();
        let mut block = Block::new(&t, "Po-210").unwrap();
        block.tick(&t, 5.0).unwrap();
        block.save_history();

        let mut snapshot = block.capture_snapshot().unwrap();
        snapshot.lifetime = 1.0;
        reseal(&mut snapshot);

        let err = Block::from_snapshot(&snapshot).unwrap_err();
        assert!(err.to_string().contains("lifetime is 1"), "{err}");
    }

    #[test]
    fn out_of_order_history_is_rejected() {
        let t = table();
        let mut block = Block::new(&t, "Po-210").unwrap();
        for _ in 0..3 {
            block.tick(&t, 2.0).unwrap();
            block.save_history();
        }

        let mut value = serde_json::to_value(block.capture_snapshot().unwrap()).unwrap();
        value["history"]["points"][1]["time"] = serde_json::json!(5.0);
        let mut snapshot: BlockSnapshot = serde_json::from_value(value).unwrap();
        reseal(&mut snapshot);

        let err = Block::from_snapshot(&snapshot).unwrap_err();
        assert!(err.to_string().contains("not in order"), "{err}");
    }

    #[test]
    fn history_not_starting_at_zero_is_rejected() {
        let t = table();
        let block = Block::new(&t, "Po-210").unwrap();

        let mut value = serde_json::to_value(block.capture_snapshot().unwrap()).unwrap();
        value["history"]["points"][0]["time"] = serde_json::json!(0.5);
        value["lifetime"] = serde_json::json!(1.0);
        let mut snapshot: BlockSnapshot = serde_json::from_value(value).unwrap();
        reseal(&mut snapshot);

        let err = Block::from_snapshot(&snapshot).unwrap_err();
        assert!(err.to_string().contains("start at t=0"), "{err}");
    }

    #[test]
    fn restored_block_keeps_recording() {
        let t = table();
        let mut block = Block::new(&t, "Po-210").unwrap();
        block.tick(&t, 5.0).unwrap();
        block.save_history();

        let mut restored = Block::from_snapshot(&block.capture_snapshot().unwrap()).unwrap();
        restored.tick(&t, 1.0).unwrap();
        restored.save_history();
        assert_eq!(restored.history().len(), 3);
    }
}
