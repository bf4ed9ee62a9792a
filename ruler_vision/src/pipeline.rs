// THEORY:
// The `pipeline` module is the top-level API of the measurement engine. A
// `MeasurementSession` owns everything derived from the current screenshot (the
// raw raster and its lightness map) and runs measurements against it, replacing
// the ambient per-page buffers a scripted implementation would keep in globals.
//
// Each pointer event selects one of two measurements:
// - plain move: a synchronous ray scan from the pointer (`measure_distances`);
// - modifier held: a flood fill of the surrounding region (`measure_area`, or
//   `spawn_area_task` for the budgeted, cancellable background version).
// Both produce a `MeasurementRecord`, the stable contract with the renderer: four
// directional extents, the anchor they are measured from, and the sampled colour.
//
// Buffers are shared with background tasks through `Arc`s and never mutated. A new
// screenshot swaps the `Arc`s, bumps the generation and cancels every area task
// still running against the old one.

use std::sync::Arc;

use crate::area_task::{AreaTaskHandle, CancelFlag, TickObserver, spawn_area_task};
use crate::config::RulerConfig;
use crate::core_modules::area_scanner::{AreaMeasurement, AreaScan};
use crate::core_modules::geometry::{BoundingBox, Extents, Point};
use crate::core_modules::hsl::hsl::Hsl;
use crate::core_modules::lightness_map::lightness_map::LightnessMap;
use crate::core_modules::ray_scanner::ray_scanner;
use crate::core_modules::screenshot::Screenshot;
use crate::error::{MeasureError, MeasureResult};

/// A pointer position reported by the input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub point: Point,
    /// Whether the area-measuring modifier key is held.
    pub modifier_held: bool,
}

impl PointerEvent {
    pub fn new(x: i64, y: i64, modifier_held: bool) -> Self {
        Self {
            point: Point::new(x, y),
            modifier_held,
        }
    }
}

/// Result of a ray scan. The anchor is always the query point.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceResult {
    pub anchor: Point,
    pub extents: Extents,
    pub background_color: Hsl,
}

/// Result of an area scan. Extents are measured from the resolved anchor, not
/// from the pointer that started the scan.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaResult {
    pub anchor: Point,
    pub extents: Extents,
    pub background_color: Hsl,
    pub bounds: BoundingBox,
    pub pixel_count: usize,
}

impl AreaResult {
    pub fn from_measurement(
        measurement: AreaMeasurement,
        screenshot: &Screenshot,
    ) -> MeasureResult<Self> {
        let anchor = measurement.anchor;
        Ok(Self {
            anchor,
            extents: measurement.extents,
            background_color: sample_color(screenshot, anchor)?,
            bounds: measurement.bounds,
            pixel_count: measurement.pixel_count,
        })
    }
}

/// What gets handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementRecord {
    Distances(DistanceResult),
    Area(AreaResult),
}

impl MeasurementRecord {
    pub fn anchor(&self) -> Point {
        match self {
            MeasurementRecord::Distances(result) => result.anchor,
            MeasurementRecord::Area(result) => result.anchor,
        }
    }

    pub fn extents(&self) -> Extents {
        match self {
            MeasurementRecord::Distances(result) => result.extents,
            MeasurementRecord::Area(result) => result.extents,
        }
    }

    pub fn background_color(&self) -> Hsl {
        match self {
            MeasurementRecord::Distances(result) => result.background_color,
            MeasurementRecord::Area(result) => result.background_color,
        }
    }

    /// Horizontal size in pixels, counting the pixel under the anchor.
    pub fn measured_width(&self) -> u32 {
        let extents = self.extents();
        extents.left + extents.right + 1
    }

    /// Vertical size in pixels, counting the pixel under the anchor.
    pub fn measured_height(&self) -> u32 {
        let extents = self.extents();
        extents.top + extents.bottom + 1
    }

    /// Tooltip text, e.g. `"120 x 32 px"`.
    pub fn label(&self) -> String {
        format!("{} x {} px", self.measured_width(), self.measured_height())
    }

    /// Whether the surface under the anchor is close enough to the overlay's line
    /// colour that the renderer should switch to its alternate colour.
    pub fn uses_alt_color(&self, line_color: &Hsl, tolerance: [f64; 3]) -> bool {
        self.background_color().within(line_color, tolerance)
    }
}

fn sample_color(screenshot: &Screenshot, point: Point) -> MeasureResult<Hsl> {
    screenshot.color_at(point).ok_or(MeasureError::OutOfRange {
        x: point.x,
        y: point.y,
    })
}

/// Owns one screenshot's derived buffers and measures against them.
pub struct MeasurementSession {
    config: RulerConfig,
    screenshot: Arc<Screenshot>,
    lightness: Arc<LightnessMap>,
    generation: u64,
    /// Raised when the screenshot is replaced, stopping every area task of this generation.
    generation_flag: CancelFlag,
}

impl MeasurementSession {
    pub fn new(screenshot: Screenshot, config: RulerConfig) -> MeasureResult<Self> {
        config.validate()?;
        let lightness = LightnessMap::from_screenshot(&screenshot)?;
        tracing::debug!(
            width = screenshot.width(),
            height = screenshot.height(),
            "measurement session created"
        );
        Ok(Self {
            config,
            screenshot: Arc::new(screenshot),
            lightness: Arc::new(lightness),
            generation: 0,
            generation_flag: CancelFlag::default(),
        })
    }

    /// Swaps in a new capture and returns the new generation. Area tasks started
    /// against the previous capture are cancelled. A rejected capture leaves the
    /// session untouched.
    pub fn replace_screenshot(&mut self, screenshot: Screenshot) -> MeasureResult<u64> {
        let lightness = LightnessMap::from_screenshot(&screenshot)?;
        self.generation_flag.cancel();
        self.generation_flag = CancelFlag::default();
        self.lightness = Arc::new(lightness);
        self.screenshot = Arc::new(screenshot);
        self.generation += 1;
        tracing::debug!(
            generation = self.generation,
            width = self.screenshot.width(),
            height = self.screenshot.height(),
            "screenshot replaced"
        );
        Ok(self.generation)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &RulerConfig {
        &self.config
    }

    pub fn screenshot(&self) -> &Screenshot {
        &self.screenshot
    }

    pub fn lightness(&self) -> &LightnessMap {
        &self.lightness
    }

    pub fn measure_distances(&self, point: Point) -> MeasureResult<DistanceResult> {
        let extents = ray_scanner::measure_distances(&self.lightness, point, &self.config)?;
        Ok(DistanceResult {
            anchor: point,
            extents,
            background_color: sample_color(&self.screenshot, point)?,
        })
    }

    /// Seeds a resumable area scan over a private copy of the lightness map.
    pub fn start_area_scan(&self, point: Point) -> MeasureResult<AreaScan> {
        AreaScan::new(&self.lightness, point, self.config.area_threshold)
    }

    /// Runs an area scan to completion on the calling thread.
    pub fn measure_area(&self, point: Point) -> MeasureResult<AreaResult> {
        let measurement = self
            .start_area_scan(point)?
            .run_to_completion(self.config.tick_budget);
        AreaResult::from_measurement(measurement, &self.screenshot)
    }

    /// Synchronous dispatch of a pointer event to the matching scanner.
    pub fn measure(&self, event: PointerEvent) -> MeasureResult<MeasurementRecord> {
        if event.modifier_held {
            self.measure_area(event.point).map(MeasurementRecord::Area)
        } else {
            self.measure_distances(event.point)
                .map(MeasurementRecord::Distances)
        }
    }

    /// Alt-colour decision against the configured line colour. Always `false`
    /// when no line colour is configured.
    pub fn wants_alt_color(&self, record: &MeasurementRecord) -> bool {
        self.config
            .line_color
            .as_ref()
            .is_some_and(|line| record.uses_alt_color(line, self.config.line_color_tolerance))
    }

    /// Starts a budgeted area scan as a cancellable tokio task. Must be called from
    /// within a tokio runtime.
    pub fn spawn_area_task(
        &self,
        point: Point,
        observer: Option<TickObserver>,
    ) -> MeasureResult<AreaTaskHandle> {
        let scan = self.start_area_scan(point)?;
        Ok(spawn_area_task(
            scan,
            Arc::clone(&self.screenshot),
            self.generation,
            self.generation_flag.clone(),
            self.config.tick_budget,
            observer,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// White 40x30 page with a gray 12x6 button at x 10..22, y 8..14.
    fn button_page() -> Screenshot {
        let (width, height) = (40u32, 30u32);
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let pixel = if (10..22).contains(&x) && (8..14).contains(&y) {
                    [120, 120, 120, 255]
                } else {
                    [255, 255, 255, 255]
                };
                data.extend_from_slice(&pixel);
            }
        }
        Screenshot::new(width, height, data).unwrap()
    }

    #[test]
    fn ray_scan_anchors_at_the_pointer() {
        let session = MeasurementSession::new(button_page(), RulerConfig::default()).unwrap();
        let result = session.measure_distances(Point::new(12, 10)).unwrap();
        assert_eq!(result.anchor, Point::new(12, 10));
        assert_eq!(
            result.extents,
            Extents {
                top: 2,
                right: 9,
                bottom: 3,
                left: 2
            }
        );
        assert_eq!(result.background_color.s, 0.0);
        assert!((result.background_color.l - 120.0 / 255.0).abs() < 1e-12);
    }

    #[test]
    fn area_scan_anchors_at_the_region_center() {
        let session = MeasurementSession::new(button_page(), RulerConfig::default()).unwrap();
        let result = session.measure_area(Point::new(11, 9)).unwrap();
        assert_eq!(
            result.bounds,
            BoundingBox {
                top: 8,
                right: 21,
                bottom: 13,
                left: 10
            }
        );
        assert_eq!(result.anchor, Point::new(15, 10));
        assert_eq!(
            result.extents,
            Extents {
                top: 2,
                right: 6,
                bottom: 3,
                left: 5
            }
        );
        assert_eq!(result.pixel_count, 72);
    }

    #[test]
    fn record_reports_size_label() {
        let session = MeasurementSession::new(button_page(), RulerConfig::default()).unwrap();
        let record = session.measure(PointerEvent::new(15, 10, true)).unwrap();
        assert_eq!(record.measured_width(), 12);
        assert_eq!(record.measured_height(), 6);
        assert_eq!(record.label(), "12 x 6 px");

        let record = session.measure(PointerEvent::new(15, 10, false)).unwrap();
        assert!(matches!(record, MeasurementRecord::Distances(_)));
        assert_eq!(record.label(), "12 x 6 px");
    }

    #[test]
    fn alt_color_kicks_in_near_the_line_color() {
        let session = MeasurementSession::new(button_page(), RulerConfig::default()).unwrap();
        let on_white = session.measure(PointerEvent::new(1, 1, false)).unwrap();
        let on_button = session.measure(PointerEvent::new(15, 10, false)).unwrap();
        let white_line = Hsl::new(0.0, 0.0, 1.0);
        let tolerance = session.config().line_color_tolerance;
        assert!(on_white.uses_alt_color(&white_line, tolerance));
        assert!(!on_button.uses_alt_color(&white_line, tolerance));
        assert!(!session.wants_alt_color(&on_white));

        let config = RulerConfig {
            line_color: Some(white_line),
            ..RulerConfig::default()
        };
        let session = MeasurementSession::new(button_page(), config).unwrap();
        assert!(session.wants_alt_color(&on_white));
        assert!(!session.wants_alt_color(&on_button));
    }

    #[test]
    fn pointer_outside_the_page_is_out_of_range() {
        let session = MeasurementSession::new(button_page(), RulerConfig::default()).unwrap();
        assert_eq!(
            session.measure(PointerEvent::new(40, 3, false)),
            Err(MeasureError::OutOfRange { x: 40, y: 3 })
        );
        assert_eq!(
            session.measure(PointerEvent::new(-2, 3, true)),
            Err(MeasureError::OutOfRange { x: -2, y: 3 })
        );
    }

    #[test]
    fn replacing_the_screenshot_bumps_the_generation() {
        let mut session = MeasurementSession::new(button_page(), RulerConfig::default()).unwrap();
        assert_eq!(session.generation(), 0);
        let uniform = Screenshot::new(4, 4, vec![0; 64]).unwrap();
        assert_eq!(session.replace_screenshot(uniform), Ok(1));
        assert_eq!(session.lightness().width(), 4);
        let result = session.measure_distances(Point::new(1, 1)).unwrap();
        assert_eq!(result.extents.total(), 6);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = RulerConfig {
            ray_threshold: 0,
            ..RulerConfig::default()
        };
        assert!(matches!(
            MeasurementSession::new(button_page(), config),
            Err(MeasureError::InvalidInput { .. })
        ));
    }
}
