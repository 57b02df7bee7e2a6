//! Headless decay-chain demo -- drop one block into the laboratory and watch
//! it decay at a chosen time scale.
//!
//! Run with:
//!   cargo run --example decay_chain -p halflife-engine -- U-238 29 600
//!
//! Arguments (all optional):
//!   symbol  -- starting nuclide (default `Rn-222`)
//!   preset  -- time-scale ladder index (default: real time)
//!   frames  -- number of 60 Hz frames to run (default 600)
//!
//! Set `RUST_LOG=halflife_engine=debug` to see block lifecycle events.

use halflife_engine::prelude::*;
use halflife_engine::units::axis_unit;

const FRAME_DT: f64 = 1.0 / 60.0;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let symbol = args.next().unwrap_or_else(|| "Rn-222".to_string());
    let preset: Option<usize> = args.next().map(|s| s.parse()).transpose()?;
    let frames: u32 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(600);

    let table = NuclideTable::bundled()?;
    let mut lab = Laboratory::new(table);
    if let Some(index) = preset {
        lab.time_scale_mut().set_index(index);
    }
    let id = lab.create_block(&symbol)?;

    println!("{}", lab.time_scale().label());
    print_block(&lab, id)?;

    let report_every = (frames / 10).max(1);
    for frame in 1..=frames {
        let diagnostics = lab.advance_frame(FRAME_DT)?;
        if diagnostics.truncated_steps > 0 {
            println!("frame {frame}: {} truncated cascade steps", diagnostics.truncated_steps);
        }
        if frame % report_every == 0 {
            println!(
                "-- frame {frame}, universe time {}",
                format_seconds(lab.time_scale().universe_time())
            );
            print_block(&lab, id)?;
        }
        if lab.block(id)?.is_stable() {
            println!("stable after {frame} frames");
            break;
        }
    }

    let block = lab.block(id)?;
    let series = block.history().plot_series(DEFAULT_PLOT_WIDTH);
    let (multiplier, unit) = axis_unit(block.lifetime());
    println!(
        "history: {} points, {} plot samples over {:.3} {unit}, {} nuclides seen",
        block.history().len(),
        series.samples.len(),
        block.lifetime() * multiplier,
        series.palette.len(),
    );
    Ok(())
}

fn print_block(lab: &Laboratory, id: BlockId) -> Result<(), EngineError> {
    let block = lab.block(id)?;
    let description = describe(block, lab.table());
    println!("{}", description.heading);
    if let Some(detail) = &description.detail {
        println!("  {detail}");
    }
    if let Some(note) = &description.note {
        println!("  {note}");
    }
    for (nuclide, amount) in block.composition().iter() {
        println!("  {:>8} {:>10.6}%", nuclide.to_string(), amount * 100.0);
    }
    Ok(())
}
