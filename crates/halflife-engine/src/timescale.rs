//! Wall-clock to simulated-time conversion.
//!
//! The [`TimeScale`] is a ladder of presets from one picosecond to 10^20
//! years of simulated time per wall-clock second. It is passed explicitly to
//! the frame driver rather than living in global state, so a tick is a pure
//! function of the block and the delta it is handed.

use crate::units::SECONDS_PER_YEAR;
use crate::EngineError;

/// Wrap period of the clock face, in simulated seconds.
pub const CLOCK_PERIOD: f64 = 60.0 * 60.0 * 12.0;

/// One rung of the ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    /// Simulated seconds per wall-clock second.
    pub scale: f64,
    /// `"10 min"`, `"1 week"`, `"10^6 years"`.
    pub display: String,
}

impl Preset {
    /// `"1s = 10 min"`.
    pub fn label(&self) -> String {
        format!("1s = {}", self.display)
    }
}

/// The full ladder, slowest first.
pub fn presets() -> Vec<Preset> {
    let mut ladder = Vec::new();
    let decades: [(f64, &str, u32); 9] = [
        (1e-12, "ps", 100),
        (1e-9, "ns", 100),
        (1e-6, "µs", 100),
        (1e-3, "ms", 100),
        (1.0, "s", 10),
        (60.0, "min", 10),
        (60.0 * 60.0, "h", 1),
        (60.0 * 60.0 * 24.0, "day", 1),
        (60.0 * 60.0 * 24.0 * 7.0, "week", 1),
    ];
    for (base, unit, max) in decades {
        let mut multiplier = 1;
        while multiplier <= max {
            ladder.push(Preset {
                scale: base * multiplier as f64,
                display: format!("{multiplier} {unit}"),
            });
            multiplier *= 10;
        }
    }

    // Up to Bi-209 territory.
    let exponents = (0..=10).chain(std::iter::once(20));
    for exponent in exponents {
        let multiplier = 10f64.powi(exponent);
        let amount = if exponent <= 3 {
            format!("{}", multiplier as u64)
        } else {
            format!("10^{exponent}")
        };
        let plural = if exponent > 0 { "s" } else { "" };
        ladder.push(Preset {
            scale: SECONDS_PER_YEAR * multiplier,
            display: format!("{amount} year{plural}"),
        });
    }
    ladder
}

// ---------------------------------------------------------------------------
// TimeScale
// ---------------------------------------------------------------------------

/// Current simulation speed and the accumulated universe clock.
#[derive(Debug, Clone)]
pub struct TimeScale {
    presets: Vec<Preset>,
    index: usize,
    /// Overrides the preset when set.
    custom: Option<f64>,
    universe_time: f64,
    clock: f64,
}

impl Default for TimeScale {
    /// Real time: one simulated second per wall-clock second.
    fn default() -> Self {
        let presets = presets();
        let index = presets
            .iter()
            .position(|p| p.scale == 1.0)
            .unwrap_or_default();
        Self {
            presets,
            index,
            custom: None,
            universe_time: 0.0,
            clock: 0.0,
        }
    }
}

impl TimeScale {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated seconds per wall-clock second.
    pub fn scale(&self) -> f64 {
        self.custom.unwrap_or(self.presets[self.index].scale)
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// Index of the selected preset. Still reported while a custom scale is
    /// active.
    pub fn index(&self) -> usize {
        self.index
    }

    /// `"1s = 1 s"`, or `"1s = 2.50 s"` for a custom scale.
    pub fn label(&self) -> String {
        match self.custom {
            Some(scale) => format!("1s = {}", crate::units::format_seconds(scale)),
            None => self.presets[self.index].label(),
        }
    }

    /// Select preset `index`, clamped to the ladder. Clears any custom scale.
    pub fn set_index(&mut self, index: usize) {
        self.index = index.min(self.presets.len() - 1);
        self.custom = None;
    }

    /// One rung faster. No-op at the top.
    pub fn step_up(&mut self) {
        self.set_index(self.index.saturating_add(1));
    }

    /// One rung slower. No-op at the bottom.
    pub fn step_down(&mut self) {
        self.set_index(self.index.saturating_sub(1));
    }

    /// Use an arbitrary scale instead of a preset.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidTimeScale`] unless `scale` is positive and finite.
    pub fn set_custom(&mut self, scale: f64) -> Result<(), EngineError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(EngineError::InvalidTimeScale(scale));
        }
        self.custom = Some(scale);
        Ok(())
    }

    /// Convert `wall_dt` wall-clock seconds into simulated seconds and add
    /// them to the universe clock.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidDelta`] if `wall_dt` is negative or not finite,
    /// or if the simulated delta or the advanced universe clock would
    /// overflow. The clock is unchanged in that case.
    pub fn advance(&mut self, wall_dt: f64) -> Result<f64, EngineError> {
        if !wall_dt.is_finite() || wall_dt < 0.0 {
            return Err(EngineError::InvalidDelta(wall_dt));
        }
        let sim_dt = wall_dt * self.scale();
        let universe_time = self.universe_time + sim_dt;
        if !universe_time.is_finite() {
            return Err(EngineError::InvalidDelta(sim_dt));
        }
        self.universe_time = universe_time;
        self.clock = (self.clock + sim_dt) % CLOCK_PERIOD;
        Ok(sim_dt)
    }

    /// Simulated seconds elapsed since the controller was created.
    pub fn universe_time(&self) -> f64 {
        self.universe_time
    }

    /// Clock-face time in `[0, 12 h)`.
    pub fn clock_seconds(&self) -> f64 {
        self.clock
    }
}
