// THEORY:
// The `area_scanner` answers the modifier-held question: which visually uniform
// region contains the pointer, and how far does it reach from its centre?
//
// It is a 4-connected flood fill with a *path-relative* tolerance: a candidate
// joins the region when its lightness differs by less than the area threshold
// from the pixel it was reached from, not from one global target. The fill can
// therefore drift across smooth gradients while still stopping at sharp edges.
//
// Key architectural principles:
// 1.  **Private marking**: the scan clones the shared lightness map and writes the
//     `VISITED` mark into its own copy. The shared map stays untouched no matter
//     how the scan ends.
// 2.  **Resumable**: `AreaScan` is a plain state machine. `step` pops at most
//     `budget` candidates and returns, leaving the stack intact for the next call.
//     Scheduling, yielding and cancellation are the caller's business (see
//     `crate::area_task`).
// 3.  **Single consumer**: once the stack drains, `into_measurement` classifies the
//     border pixels, resolves the anchor and reports distances from it.

use crate::core_modules::anchor::resolve_anchor;
use crate::core_modules::geometry::{BoundingBox, Direction, Extents, Point};
use crate::core_modules::lightness_map::lightness_map::{LightnessMap, VISITED};
use crate::core_modules::pixel::pixel::Lightness;
use crate::core_modules::region::Region;
use crate::error::{MeasureError, MeasureResult};

/// Neighbour push order. Popping reverses it, which only affects visiting order.
const NEIGHBOURS: [Direction; 4] = [
    Direction::Left,
    Direction::Right,
    Direction::Top,
    Direction::Bottom,
];

#[derive(Debug, Clone, Copy)]
struct Candidate {
    point: Point,
    /// Lightness of the pixel this candidate was reached from.
    reached_from: Lightness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProgress {
    /// Candidates remain on the stack; call `step` again.
    Pending,
    /// The stack drained; the region is final.
    Complete,
}

/// The finished geometry of an area scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaMeasurement {
    /// Representative point of the region, see `crate::core_modules::anchor`.
    pub anchor: Point,
    /// Distances from `anchor` to each edge of `bounds`.
    pub extents: Extents,
    pub bounds: BoundingBox,
    pub pixel_count: usize,
    /// Number of `step` calls the scan needed.
    pub ticks: u32,
}

/// A flood fill in progress.
pub struct AreaScan {
    marks: LightnessMap,
    stack: Vec<Candidate>,
    region: Region,
    threshold: Lightness,
    ticks: u32,
}

impl AreaScan {
    /// Seeds a scan at `seed`, taking a private copy of `shared`.
    pub fn new(shared: &LightnessMap, seed: Point, threshold: Lightness) -> MeasureResult<Self> {
        let start = shared.get_at(seed).ok_or(MeasureError::OutOfRange {
            x: seed.x,
            y: seed.y,
        })?;
        Ok(Self {
            marks: shared.clone(),
            stack: vec![Candidate {
                point: seed,
                reached_from: start,
            }],
            region: Region::seeded_at(seed),
            threshold,
            ticks: 0,
        })
    }

    /// Pops at most `budget` candidates.
    pub fn step(&mut self, budget: usize) -> ScanProgress {
        self.ticks += 1;
        let mut remaining = budget;

        while remaining > 0 {
            let Some(candidate) = self.stack.pop() else {
                break;
            };
            remaining -= 1;

            let Some(current) = self.marks.get_at(candidate.point) else {
                continue;
            };
            if current >= VISITED || (current - candidate.reached_from).abs() >= self.threshold {
                continue;
            }

            self.marks.mark_visited(candidate.point);
            self.region.add(candidate.point);

            for direction in NEIGHBOURS {
                self.stack.push(Candidate {
                    point: candidate.point.step(direction),
                    reached_from: current,
                });
            }
        }

        self.progress()
    }

    pub fn progress(&self) -> ScanProgress {
        if self.stack.is_empty() {
            ScanProgress::Complete
        } else {
            ScanProgress::Pending
        }
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// The private working copy, with visited pixels marked.
    pub fn marks(&self) -> &LightnessMap {
        &self.marks
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Drives the scan to completion synchronously.
    pub fn run_to_completion(mut self, budget: usize) -> AreaMeasurement {
        while self.step(budget) == ScanProgress::Pending {}
        self.measure()
    }

    /// Resolves the finished region into a measurement. `None` while the scan is
    /// still pending.
    pub fn into_measurement(self) -> Option<AreaMeasurement> {
        match self.progress() {
            ScanProgress::Complete => Some(self.measure()),
            ScanProgress::Pending => None,
        }
    }

    fn measure(&self) -> AreaMeasurement {
        let borders = self.region.border_pixels();
        // A seed is always claimed, so the border lists are never empty; fall back
        // to the collapsed box corner just in case.
        let anchor = resolve_anchor(&borders).unwrap_or(Point::new(
            self.region.bounds.left,
            self.region.bounds.top,
        ));
        AreaMeasurement {
            anchor,
            extents: self.region.bounds.extents_from(anchor),
            bounds: self.region.bounds,
            pixel_count: self.region.pixel_count(),
            ticks: self.ticks,
        }
    }
}
