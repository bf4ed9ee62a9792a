use crate::core_modules::hsl::hsl::Hsl;
use crate::error::{MeasureError, MeasureResult};

/// Maximum lightness step that still counts as "the same surface" for ray scans.
pub const RAY_THRESHOLD: i16 = 6;
/// Maximum lightness step that still joins a pixel to a flood-filled region.
pub const AREA_THRESHOLD: i16 = 6;
/// A ray scan whose four distances sum to this or less is considered degenerate
/// and is redone with the similar-colour streak heuristic.
pub const DEGENERATE_AREA: u32 = 6;
/// Length of the similar-colour streak that ends a fallback ray.
pub const SIMILAR_STREAK_LENGTH: u32 = 8;
/// Flood-fill stack pops per scheduling tick.
pub const TICK_BUDGET: usize = 500_000;
/// Per-channel (h, s, l) tolerance for matching the overlay line colour.
pub const LINE_COLOR_TOLERANCE: [f64; 3] = [0.2, 0.5, 0.2];

/// Configuration for the measurement engine, allowing for tunable behavior.
///
/// The defaults are the values the ruler was calibrated with on real pages.
#[derive(Debug, Clone, PartialEq)]
pub struct RulerConfig {
    pub ray_threshold: i16,
    pub area_threshold: i16,
    pub degenerate_area: u32,
    pub similar_streak_length: u32,
    pub tick_budget: usize,
    /// Colour of the overlay's axis lines, as sampled by the renderer.
    pub line_color: Option<Hsl>,
    pub line_color_tolerance: [f64; 3],
    /// Stream the flood fill's marking buffer to the renderer after every tick.
    pub debug_overlay: bool,
}

impl Default for RulerConfig {
    fn default() -> Self {
        Self {
            ray_threshold: RAY_THRESHOLD,
            area_threshold: AREA_THRESHOLD,
            degenerate_area: DEGENERATE_AREA,
            similar_streak_length: SIMILAR_STREAK_LENGTH,
            tick_budget: TICK_BUDGET,
            line_color: None,
            line_color_tolerance: LINE_COLOR_TOLERANCE,
            debug_overlay: false,
        }
    }
}

impl RulerConfig {
    /// The amount subtracted from a fallback ray once the streak completes:
    /// the streak itself plus the step that closed it.
    pub fn streak_correction(&self) -> u32 {
        self.similar_streak_length + 1
    }

    pub fn validate(&self) -> MeasureResult<()> {
        if self.ray_threshold <= 0 || self.area_threshold <= 0 {
            return Err(MeasureError::invalid_input(
                "lightness thresholds must be positive",
            ));
        }
        if self.similar_streak_length == 0 {
            return Err(MeasureError::invalid_input(
                "similar colour streak length must be at least 1",
            ));
        }
        if self.tick_budget == 0 {
            return Err(MeasureError::invalid_input("tick budget must be at least 1"));
        }
        if self.line_color_tolerance.iter().any(|t| *t < 0.0) {
            return Err(MeasureError::invalid_input(
                "line colour tolerance must not be negative",
            ));
        }
        Ok(())
    }
}
