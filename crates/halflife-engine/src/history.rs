//! Time-stamped composition history for plotting.
//!
//! A [`History`] is an append-only list of [`HistoryPoint`]s ordered by
//! non-decreasing time, plus the set of every nuclide that has ever appeared
//! in it (used to assign stable plot colors). The frame driver decides *when*
//! points are recorded; see [`crate::driver`].

use std::collections::BTreeSet;

use halflife_nuclide::prelude::*;
use serde::{Deserialize, Serialize};

/// Plot width used by callers that don't know their pixel width.
pub const DEFAULT_PLOT_WIDTH: u32 = 480;

/// Pixels per emitted plot sample.
const PIXELS_PER_SAMPLE: f64 = 2.0;

/// One recorded composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Block lifetime in simulated seconds when the point was recorded.
    pub time: f64,
    pub composition: Composition,
}

/// One row of plot data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotSample {
    pub nuclide: NuclideId,
    pub time: f64,
    /// Share of the composition in percent (0..=100).
    pub percentage: f64,
}

/// Downsampled history ready for a line plot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotSeries {
    pub samples: Vec<PlotSample>,
    /// Every nuclide ever seen, sorted, so color assignment is stable
    /// across redraws.
    pub palette: Vec<NuclideId>,
}

/// Append-only composition history of one block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    points: Vec<HistoryPoint>,
    seen: BTreeSet<NuclideId>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a deep copy of `composition` at `time`.
    ///
    /// # Panics
    ///
    /// Panics if `time` is earlier than the last recorded point.
    pub fn record(&mut self, time: f64, composition: &Composition) {
        if let Some(last) = self.points.last() {
            assert!(
                time >= last.time,
                "history must be non-decreasing: {time} recorded after {}",
                last.time
            );
        }
        self.seen.extend(composition.ids());
        self.points.push(HistoryPoint {
            time,
            composition: composition.clone(),
        });
    }

    pub fn points(&self) -> &[HistoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&HistoryPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&HistoryPoint> {
        self.points.last()
    }

    /// Every nuclide that has appeared in any recorded composition.
    pub fn all_seen(&self) -> &BTreeSet<NuclideId> {
        &self.seen
    }

    /// Downsample for a plot `width_px` pixels wide.
    ///
    /// At most one point is emitted per two pixels: a point is skipped when
    /// it falls within `lifetime / width_px * 2` seconds of the previous
    /// emitted point. The first point is always emitted.
    pub fn plot_series(&self, width_px: u32) -> PlotSeries {
        let lifetime = self.last().map_or(0.0, |p| p.time);
        let interval = if width_px == 0 {
            0.0
        } else {
            lifetime / width_px as f64 * PIXELS_PER_SAMPLE
        };

        let mut samples = Vec::new();
        let mut next_time = f64::NEG_INFINITY;
        for point in &self.points {
            if point.time < next_time {
                continue;
            }
            next_time = point.time + interval;
            samples.extend(point.composition.iter().map(|(nuclide, amount)| PlotSample {
                nuclide,
                time: point.time,
                percentage: amount * 100.0,
            }));
        }

        PlotSeries {
            samples,
            palette: self.seen.iter().copied().collect(),
        }
    }
}
