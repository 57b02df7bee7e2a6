//! Integration tests for the decay engine: single-step behaviour, full
//! chains from the bundled table, and cascade stress.

use halflife_engine::prelude::*;

fn id(s: &str) -> NuclideId {
    s.parse().unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

// ---------------------------------------------------------------------------
// Single-step behaviour
// ---------------------------------------------------------------------------

#[test]
fn each_half_life_halves_the_parent() {
    let table = NuclideTable::builder()
        .radioactive("Po-210", 10.0, 1.0, 0.0)
        .stable("Pb-206")
        .build()
        .unwrap();
    let mut block = Block::new(&table, "Po-210").unwrap();

    block.tick(&table, 10.0).unwrap();
    assert_close(block.composition().get(id("Po-210")), 0.5);
    assert_close(block.composition().get(id("Pb-206")), 0.5);

    block.tick(&table, 10.0).unwrap();
    assert_close(block.composition().get(id("Po-210")), 0.25);
    assert_close(block.composition().get(id("Pb-206")), 0.75);
}

#[test]
fn branching_splits_the_decayed_amount() {
    let table = NuclideTable::builder()
        .radioactive("Bi-212", 1.0, 0.6, 0.4)
        .stable("Tl-208")
        .stable("Po-212")
        .build()
        .unwrap();
    let mut block = Block::new(&table, "Bi-212").unwrap();
    block.tick(&table, 1.0).unwrap();

    let c = block.composition();
    assert_close(c.get(id("Bi-212")), 0.5);
    assert_close(c.get(id("Tl-208")), 0.3);
    assert_close(c.get(id("Po-212")), 0.2);
    assert_close(c.total(), 1.0);
}

#[test]
fn one_tick_cascades_through_generations() {
    let table = NuclideTable::builder()
        .radioactive("Rn-222", 1.0, 1.0, 0.0)
        .radioactive("Po-218", 1.0, 1.0, 0.0)
        .stable("Pb-214")
        .build()
        .unwrap();
    let mut block = Block::new(&table, "Rn-222").unwrap();
    block.tick(&table, 1.0).unwrap();

    assert!(block.composition().get(id("Pb-214")) > 0.0);
    assert_close(block.composition().total(), 1.0);
}

#[test]
fn negligible_residue_folds_into_product() {
    let table = NuclideTable::builder()
        .radioactive("Po-210", 1.0, 1.0, 0.0)
        .stable("Pb-206")
        .build()
        .unwrap();
    let mut block = Block::new(&table, "Po-210").unwrap();

    // 2^-10 is just above the fold threshold at one half-life per tick
    // (1e-3 * sqrt(0.5)); 2^-11 is below it.
    for _ in 0..10 {
        block.tick(&table, 1.0).unwrap();
        assert!(block.composition().contains(id("Po-210")));
    }
    let outcome = block.tick(&table, 1.0).unwrap();
    assert_eq!(outcome.report.folded, 1);
    assert!(!block.composition().contains(id("Po-210")));
    assert_close(block.composition().get(id("Pb-206")), 1.0);
    assert_close(block.composition().total(), 1.0);

    // Nothing left to decay: the next tick stabilizes the block.
    let outcome = block.tick(&table, 1.0).unwrap();
    assert!(outcome.stabilized);
}

// ---------------------------------------------------------------------------
// Bundled chains
// ---------------------------------------------------------------------------

#[test]
fn uranium_series_ends_in_lead() {
    let table = NuclideTable::bundled().unwrap();
    let mut block = Block::new(&table, "U-238").unwrap();

    // Each tick is dozens of U-238 half-lives, so everything folds through.
    let mut ticks = 0;
    while !block.is_stable() {
        block.tick(&table, 1e19).unwrap();
        ticks += 1;
        assert!(ticks < 10, "U-238 series did not settle");
    }

    let (dominant, share) = approximate(block.composition()).unwrap();
    assert_eq!(dominant, id("Pb-206"));
    assert!((share - 1.0).abs() < 1e-9);
    assert!((block.composition().total() - 1.0).abs() < 1e-9);
}

#[test]
fn radon_chain_passes_through_lead_210() {
    let table = NuclideTable::bundled().unwrap();
    let mut block = Block::new(&table, "Rn-222").unwrap();
    let config = DriverConfig::default();

    // Days-long frames: Rn-222 decays and the short-lived daughters fold
    // straight through to Pb-210.
    for _ in 0..10 {
        advance_block(&mut block, &table, 1e5, &config).unwrap();
    }
    assert!(block.composition().get(id("Pb-210")) > 0.8);

    // Centuries-long frames finish the chain.
    let mut frames = 0;
    while !block.is_stable() {
        advance_block(&mut block, &table, 1e10, &config).unwrap();
        frames += 1;
        assert!(frames < 50, "Pb-210 never settled");
    }

    for symbol in ["Rn-222", "Pb-210", "Pb-206"] {
        assert!(block.all_seen().contains(&id(symbol)), "{symbol} never seen");
    }
    assert_eq!(display_label(block.composition()), DisplayLabel::Explicit(id("Pb-206")));
    assert!((block.composition().total() - 1.0).abs() < 1e-9);
}

#[test]
fn free_neutron_decays_to_hydrogen() {
    let table = NuclideTable::bundled().unwrap();
    let mut block = Block::new(&table, "n-1").unwrap();
    block.tick(&table, 613.9).unwrap();
    assert_close(block.composition().get(id("H-1")), 0.5);
}

#[test]
fn bismuth_209_barely_moves() {
    let table = NuclideTable::bundled().unwrap();
    let mut block = Block::new(&table, "Bi-209").unwrap();
    // A billion years is nothing next to 2e19 years.
    block.tick(&table, 3.15576e16).unwrap();
    assert!(!block.is_stable());
    assert!(block.composition().get(id("Bi-209")) > 0.999_999_9);
    assert_eq!(display_label(block.composition()), DisplayLabel::Explicit(id("Bi-209")));
}

// ---------------------------------------------------------------------------
// Unknown products
// ---------------------------------------------------------------------------

#[test]
fn products_past_the_table_are_kept_but_inert() {
    let table = NuclideTable::builder()
        .radioactive("Og-294", 1.0, 1.0, 0.0)
        .build()
        .unwrap();
    let mut block = Block::new(&table, "Og-294").unwrap();

    let outcome = block.tick(&table, 1.0).unwrap();
    assert_eq!(outcome.report.unknown_products, 1);
    assert_close(block.composition().get(id("Lv-290")), 0.5);

    // Run until the parent folds away; Lv-290 then holds everything and the
    // block is stable even though Lv-290 has no data.
    while !block.is_stable() {
        block.tick(&table, 5.0).unwrap();
    }
    assert_close(block.composition().get(id("Lv-290")), 1.0);
}

// ---------------------------------------------------------------------------
// Cascade stress
// ---------------------------------------------------------------------------

const CHAIN_LENGTH: u16 = 2000;
const CHAIN_MASS: u16 = 5000;

/// A beta chain far longer than anything in nature: Z = 1 .. CHAIN_LENGTH,
/// all with a one-second half-life, ending in a stable nuclide.
fn long_chain() -> NuclideTable {
    let mut builder = NuclideTable::builder();
    for z in 1..=CHAIN_LENGTH {
        builder = builder.insert(Nuclide::radioactive(NuclideId::new(z, CHAIN_MASS), 1.0, 0.0, 1.0));
    }
    builder
        .insert(Nuclide::stable(NuclideId::new(CHAIN_LENGTH + 1, CHAIN_MASS)))
        .build()
        .unwrap()
}

#[test]
fn long_chain_cascades_in_one_step() {
    let table = long_chain();
    let mut block = Block::from_id(&table, NuclideId::new(1, CHAIN_MASS)).unwrap();

    let outcome = block.tick(&table, 1e6).unwrap();
    assert!(!outcome.report.truncated);
    assert_eq!(outcome.report.visited, CHAIN_LENGTH as usize + 1);
    assert_eq!(
        block.composition(),
        &Composition::pure(NuclideId::new(CHAIN_LENGTH + 1, CHAIN_MASS))
    );
}

#[test]
fn cascade_budget_truncates_recoverably() {
    let table = long_chain();
    let mut block = Block::from_id(&table, NuclideId::new(1, CHAIN_MASS)).unwrap();
    let config = DecayConfig { cascade_budget: 64 };

    let outcome = block.tick_with(&table, 1e6, &config).unwrap();
    assert!(outcome.report.truncated);
    assert!(!outcome.stabilized);
    assert_eq!(outcome.report.visited, 64);
    assert_close(block.composition().total(), 1.0);

    // Each truncated tick makes progress; the chain finishes eventually.
    let mut ticks = 1;
    while !block.is_stable() {
        let outcome = block.tick_with(&table, 1e6, &config).unwrap();
        assert_close(block.composition().total(), 1.0);
        if outcome.report.truncated {
            assert!(!block.is_stable());
        }
        ticks += 1;
        assert!(ticks < 100, "chain never finished");
    }
    assert_eq!(
        block.composition(),
        &Composition::pure(NuclideId::new(CHAIN_LENGTH + 1, CHAIN_MASS))
    );
}

#[test]
fn short_half_life_under_large_frames_stays_bounded() {
    // Rn-218 -> Po-214 -> Pb-210 with a frame hundreds of thousands of
    // half-lives long: the cascade must still terminate and conserve.
    let table = NuclideTable::bundled().unwrap();
    let mut block = Block::new(&table, "Rn-218").unwrap();
    let report = advance_block(&mut block, &table, 1e4, &DriverConfig::default()).unwrap();
    assert_eq!(report.truncated_steps, 0);
    assert!((block.composition().total() - 1.0).abs() < 1e-9);
    assert!(!block.composition().contains(id("Rn-218")));
}
