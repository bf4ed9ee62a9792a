// THEORY:
// An area scan over a near-uniform page can touch every pixel of the screenshot,
// far more work than fits between two pointer events. The `area_task` module runs
// it as a cooperatively scheduled tokio task instead:
//
// 1.  **Budgeted ticks**: each tick pops at most `tick_budget` candidates from the
//     scan's stack, then yields back to the runtime with `yield_now`.
// 2.  **Cooperative cancellation**: two flags are checked at the top of every
//     tick: the task's own (raised when a newer pointer event supersedes it) and
//     its screenshot generation's (raised when a new capture arrives). A cancelled
//     task ends with `MeasureError::Cancelled` and its partial region is dropped.
// 3.  **Observability**: an optional observer sees the private marking buffer
//     after every tick. It has no influence on the result.
//
// The scan owns its private lightness copy and the screenshot is shared read-only
// through an `Arc`, so nothing here needs a lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;

use crate::core_modules::area_scanner::{AreaScan, ScanProgress};
use crate::core_modules::lightness_map::lightness_map::LightnessMap;
use crate::core_modules::screenshot::Screenshot;
use crate::error::{MeasureError, MeasureResult};
use crate::pipeline::AreaResult;

/// Called after every tick with the scan's marking buffer and the tick number.
pub type TickObserver = Box<dyn FnMut(&LightnessMap, u32) + Send + 'static>;

/// A shared stop flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    raised: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn cancel(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// Handle to a running area scan.
#[derive(Debug)]
pub struct AreaTaskHandle {
    cancel: CancelFlag,
    generation: u64,
    join: JoinHandle<MeasureResult<AreaResult>>,
}

impl AreaTaskHandle {
    /// Asks the task to stop at its next tick boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Screenshot generation the scan runs against.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Waits for the task. A cancelled scan yields `MeasureError::Cancelled`.
    pub async fn join(self) -> MeasureResult<AreaResult> {
        match self.join.await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(%error, "area task did not run to completion");
                Err(MeasureError::Cancelled)
            }
        }
    }
}

pub fn spawn_area_task(
    scan: AreaScan,
    screenshot: Arc<Screenshot>,
    generation: u64,
    generation_flag: CancelFlag,
    tick_budget: usize,
    observer: Option<TickObserver>,
) -> AreaTaskHandle {
    let cancel = CancelFlag::default();
    let join = tokio::spawn(run_area_task(
        scan,
        screenshot,
        cancel.clone(),
        generation_flag,
        tick_budget,
        observer,
    ));
    AreaTaskHandle {
        cancel,
        generation,
        join,
    }
}

async fn run_area_task(
    mut scan: AreaScan,
    screenshot: Arc<Screenshot>,
    cancel: CancelFlag,
    generation_flag: CancelFlag,
    tick_budget: usize,
    mut observer: Option<TickObserver>,
) -> MeasureResult<AreaResult> {
    loop {
        if cancel.is_cancelled() || generation_flag.is_cancelled() {
            tracing::debug!(
                ticks = scan.ticks(),
                claimed = scan.region().pixel_count(),
                "area scan cancelled"
            );
            return Err(MeasureError::Cancelled);
        }

        let progress = scan.step(tick_budget);
        if let Some(observer) = observer.as_mut() {
            observer(scan.marks(), scan.ticks());
        }
        tracing::trace!(
            tick = scan.ticks(),
            claimed = scan.region().pixel_count(),
            "area scan tick"
        );

        if progress == ScanProgress::Complete {
            break;
        }
        tokio::task::yield_now().await;
    }

    let ticks = scan.ticks();
    let measurement = scan.into_measurement().ok_or(MeasureError::Cancelled)?;
    tracing::debug!(
        ticks,
        pixels = measurement.pixel_count,
        x = measurement.anchor.x,
        y = measurement.anchor.y,
        "area scan complete"
    );
    AreaResult::from_measurement(measurement, &screenshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulerConfig;
    use crate::core_modules::geometry::Point;
    use crate::pipeline::MeasurementSession;
    use std::sync::Mutex;

    fn uniform_page(width: u32, height: u32) -> Screenshot {
        Screenshot::new(width, height, vec![200; (width * height * 4) as usize]).unwrap()
    }

    fn counting_observer() -> (TickObserver, Arc<Mutex<Vec<u32>>>) {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&ticks);
        let observer: TickObserver = Box::new(move |_marks: &LightnessMap, tick: u32| {
            seen.lock().unwrap().push(tick);
        });
        (observer, ticks)
    }

    #[tokio::test]
    async fn completes_and_reports_area() {
        let session = MeasurementSession::new(uniform_page(9, 7), RulerConfig::default()).unwrap();
        let handle = session.spawn_area_task(Point::new(2, 2), None).unwrap();
        assert_eq!(handle.generation(), 0);
        let result = handle.join().await.unwrap();
        assert_eq!(result.pixel_count, 63);
        assert_eq!(result.anchor, Point::new(4, 3));
    }

    #[tokio::test]
    async fn large_fill_needs_more_than_one_tick() {
        // 800 x 640 = 512 000 pixels: more visits than one default tick allows.
        let session =
            MeasurementSession::new(uniform_page(800, 640), RulerConfig::default()).unwrap();
        let (observer, ticks) = counting_observer();
        let result = session
            .spawn_area_task(Point::new(400, 320), Some(observer))
            .unwrap()
            .join()
            .await
            .unwrap();

        assert_eq!(result.pixel_count, 512_000);
        assert!(ticks.lock().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn cancelling_mid_scan_discards_the_result() {
        let config = RulerConfig {
            tick_budget: 16,
            ..RulerConfig::default()
        };
        let session = MeasurementSession::new(uniform_page(64, 64), config).unwrap();
        let shared_before = session.lightness().clone();

        let (observer, ticks) = counting_observer();
        let handle = session.spawn_area_task(Point::new(10, 10), Some(observer)).unwrap();
        while ticks.lock().unwrap().len() < 3 {
            tokio::task::yield_now().await;
        }
        handle.cancel();

        assert_eq!(handle.join().await, Err(MeasureError::Cancelled));
        assert!(ticks.lock().unwrap().len() >= 3);
        assert_eq!(session.lightness(), &shared_before);
        assert_eq!(session.lightness().visited_count(), 0);
    }

    #[tokio::test]
    async fn new_screenshot_cancels_stale_scans() {
        let config = RulerConfig {
            tick_budget: 8,
            ..RulerConfig::default()
        };
        let mut session = MeasurementSession::new(uniform_page(64, 64), config).unwrap();
        let handle = session.spawn_area_task(Point::new(5, 5), None).unwrap();
        session.replace_screenshot(uniform_page(8, 8)).unwrap();
        assert_eq!(handle.join().await, Err(MeasureError::Cancelled));

        let fresh = session.spawn_area_task(Point::new(5, 5), None).unwrap();
        assert_eq!(fresh.generation(), 1);
        assert_eq!(fresh.join().await.unwrap().pixel_count, 64);
    }

    #[tokio::test]
    async fn observer_sees_growing_marks() {
        let config = RulerConfig {
            tick_budget: 10,
            ..RulerConfig::default()
        };
        let session = MeasurementSession::new(uniform_page(6, 6), config).unwrap();
        let counts = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&counts);
        let observer: TickObserver = Box::new(move |marks: &LightnessMap, _tick: u32| {
            seen.lock().unwrap().push(marks.visited_count());
        });
        let result = session
            .spawn_area_task(Point::new(0, 0), Some(observer))
            .unwrap()
            .join()
            .await
            .unwrap();

        let counts = counts.lock().unwrap();
        assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(counts.last().copied(), Some(result.pixel_count));
    }
}
