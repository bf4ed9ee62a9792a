// THEORY:
// The `session` module connects the measurement engine to its host. Every page
// the ruler is active on gets one session: an actor task that owns that page's
// `MeasurementSession` and reacts to messages from the capture and input
// collaborators.
//
// Key architectural principles:
// 1.  **One owner per page**: the actor is the only code touching its session's
//     buffers. Callers talk to it through a `SessionHandle` and receive
//     `SessionEvent`s on an unbounded channel.
// 2.  **Newest input wins**: a pointer event or a new screenshot cancels any area
//     scan still in flight. A scan result that arrives after it was superseded is
//     dropped, never rendered.
// 3.  **Explicit registry**: `SessionRegistry` maps session ids to handles, with
//     toggle semantics for the host's "ruler on/off" action and a bulk shutdown
//     for when the host suspends.

use std::collections::HashMap;

use futures::future::join_all;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

use crate::area_task::{CancelFlag, TickObserver};
use crate::config::RulerConfig;
use crate::core_modules::lightness_map::lightness_map::LightnessMap;
use crate::core_modules::screenshot::Screenshot;
use crate::error::{MeasureError, MeasureResult};
use crate::pipeline::{AreaResult, MeasurementRecord, MeasurementSession, PointerEvent};

/// Identifies the page a session belongs to.
pub type SessionId = u64;

/// Messages a session actor understands.
#[derive(Debug)]
pub enum SessionMessage {
    /// A fresh capture of the page.
    Screenshot(Screenshot),
    Pointer(PointerEvent),
    Shutdown,
}

/// Messages a session actor emits for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ScreenshotProcessed { generation: u64 },
    Measurement(MeasurementRecord),
    /// Nothing to show, e.g. the pointer left the page or no capture exists yet.
    Cleared,
    /// Flood-fill progress for the debug overlay, emitted once per tick when
    /// `RulerConfig::debug_overlay` is set.
    DebugScreen {
        generation: u64,
        tick: u32,
        overlay: image::RgbaImage,
    },
}

/// Completion of a background area scan, routed back into the actor.
struct AreaDone {
    scan_id: u64,
    generation: u64,
    result: MeasureResult<AreaResult>,
}

struct InFlightScan {
    scan_id: u64,
    cancel: CancelFlag,
}

struct SessionActor {
    id: SessionId,
    config: RulerConfig,
    session: Option<MeasurementSession>,
    in_flight: Option<InFlightScan>,
    next_scan_id: u64,
    events: UnboundedSender<SessionEvent>,
    done_tx: UnboundedSender<AreaDone>,
}

impl SessionActor {
    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!(session = self.id, "event receiver dropped");
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(scan) = self.in_flight.take() {
            tracing::debug!(session = self.id, scan = scan.scan_id, "superseding area scan");
            scan.cancel.cancel();
        }
    }

    fn on_screenshot(&mut self, screenshot: Screenshot) {
        self.cancel_in_flight();
        let replaced = match self.session.as_mut() {
            Some(session) => session.replace_screenshot(screenshot),
            None => MeasurementSession::new(screenshot, self.config.clone()).map(|session| {
                let generation = session.generation();
                self.session = Some(session);
                generation
            }),
        };
        let generation = match replaced {
            Ok(generation) => generation,
            Err(error) => {
                tracing::warn!(session = self.id, %error, "rejected screenshot");
                return;
            }
        };
        self.emit(SessionEvent::ScreenshotProcessed { generation });
    }

    fn on_pointer(&mut self, event: PointerEvent) {
        self.cancel_in_flight();
        let Some(session) = self.session.as_ref() else {
            self.emit(SessionEvent::Cleared);
            return;
        };

        if !event.modifier_held {
            match session.measure_distances(event.point) {
                Ok(result) => self.emit(SessionEvent::Measurement(MeasurementRecord::Distances(
                    result,
                ))),
                Err(error) => self.report_failure(error),
            }
            return;
        }

        let generation = session.generation();
        let observer = self
            .config
            .debug_overlay
            .then(|| debug_observer(self.events.clone(), generation));

        let handle = match session.spawn_area_task(event.point, observer) {
            Ok(handle) => handle,
            Err(error) => {
                self.report_failure(error);
                return;
            }
        };

        let scan_id = self.next_scan_id;
        self.next_scan_id += 1;
        self.in_flight = Some(InFlightScan {
            scan_id,
            cancel: handle.cancel_flag(),
        });

        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = handle.join().await;
            if done_tx
                .send(AreaDone {
                    scan_id,
                    generation,
                    result,
                })
                .is_err()
            {
                tracing::debug!(scan = scan_id, "session closed before the area scan finished");
            }
        });
    }

    fn on_area_done(&mut self, done: AreaDone) {
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|scan| scan.scan_id == done.scan_id);
        let same_generation = self
            .session
            .as_ref()
            .is_some_and(|session| session.generation() == done.generation);

        if !current || !same_generation {
            if done.result.is_ok() {
                tracing::warn!(
                    session = self.id,
                    scan = done.scan_id,
                    "dropping result of a superseded area scan"
                );
            }
            return;
        }

        self.in_flight = None;
        match done.result {
            Ok(result) => self.emit(SessionEvent::Measurement(MeasurementRecord::Area(result))),
            Err(error) => self.report_failure(error),
        }
    }

    fn report_failure(&self, error: MeasureError) {
        match error {
            MeasureError::Cancelled => {}
            MeasureError::OutOfRange { .. } => {
                tracing::debug!(session = self.id, %error, "no measurement");
                self.emit(SessionEvent::Cleared);
            }
            MeasureError::InvalidInput { .. } => {
                tracing::warn!(session = self.id, %error, "measurement failed");
                self.emit(SessionEvent::Cleared);
            }
        }
    }
}

fn debug_observer(events: UnboundedSender<SessionEvent>, generation: u64) -> TickObserver {
    Box::new(move |marks: &LightnessMap, tick: u32| {
        let screen = SessionEvent::DebugScreen {
            generation,
            tick,
            overlay: marks.visited_overlay(),
        };
        if events.send(screen).is_err() {
            tracing::debug!(generation, tick, "debug screen dropped, event receiver is gone");
        }
    })
}

async fn session_loop(
    mut actor: SessionActor,
    mut messages: UnboundedReceiver<SessionMessage>,
    mut done_rx: UnboundedReceiver<AreaDone>,
) {
    tracing::debug!(session = actor.id, "session started");
    loop {
        tokio::select! {
            message = messages.recv() => match message {
                Some(SessionMessage::Screenshot(screenshot)) => actor.on_screenshot(screenshot),
                Some(SessionMessage::Pointer(event)) => actor.on_pointer(event),
                Some(SessionMessage::Shutdown) | None => break,
            },
            Some(done) = done_rx.recv() => actor.on_area_done(done),
        }
    }
    actor.cancel_in_flight();
    tracing::debug!(session = actor.id, "session stopped");
}

/// The caller's side of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    tx: UnboundedSender<SessionMessage>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Spawns a session actor. Returns the handle and the receiver for its events.
    pub fn spawn(id: SessionId, config: RulerConfig) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (tx, messages) = unbounded_channel();
        let (events, events_rx) = unbounded_channel();
        let (done_tx, done_rx) = unbounded_channel();
        let actor = SessionActor {
            id,
            config,
            session: None,
            in_flight: None,
            next_scan_id: 0,
            events,
            done_tx,
        };
        let task = tokio::spawn(session_loop(actor, messages, done_rx));
        (Self { id, tx, task }, events_rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queues a message. Returns `false` when the actor has already stopped.
    pub fn send(&self, message: SessionMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn screenshot(&self, screenshot: Screenshot) -> bool {
        self.send(SessionMessage::Screenshot(screenshot))
    }

    pub fn pointer(&self, event: PointerEvent) -> bool {
        self.send(SessionMessage::Pointer(event))
    }

    /// Stops the actor and waits for it to exit.
    pub async fn shutdown(self) {
        self.send(SessionMessage::Shutdown);
        if let Err(error) = self.task.await {
            tracing::warn!(session = self.id, %error, "session task failed");
        }
    }
}

/// Outcome of `SessionRegistry::toggle`.
#[derive(Debug)]
pub enum Toggled {
    Activated(UnboundedReceiver<SessionEvent>),
    Deactivated,
}

/// Session id -> running session.
pub struct SessionRegistry {
    config: RulerConfig,
    sessions: HashMap<SessionId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new(config: RulerConfig) -> MeasureResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: HashMap::new(),
        })
    }

    /// Starts a session for `id`. `None` if one is already running.
    pub fn activate(&mut self, id: SessionId) -> Option<UnboundedReceiver<SessionEvent>> {
        if self.sessions.contains_key(&id) {
            return None;
        }
        let (handle, events) = SessionHandle::spawn(id, self.config.clone());
        self.sessions.insert(id, handle);
        tracing::info!(session = id, "ruler activated");
        Some(events)
    }

    /// Stops and forgets the session for `id`. Returns whether one existed.
    pub async fn deactivate(&mut self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some(handle) => {
                handle.shutdown().await;
                tracing::info!(session = id, "ruler deactivated");
                true
            }
            None => false,
        }
    }

    /// The host's on/off action: activates an idle id, deactivates an active one.
    pub async fn toggle(&mut self, id: SessionId) -> Toggled {
        match self.activate(id) {
            Some(events) => Toggled::Activated(events),
            None => {
                self.deactivate(id).await;
                Toggled::Deactivated
            }
        }
    }

    pub fn get(&self, id: SessionId) -> Option<&SessionHandle> {
        self.sessions.get(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Stops every session, e.g. when the host suspends.
    pub async fn shutdown_all(&mut self) {
        let handles: Vec<SessionHandle> = self.sessions.drain().map(|(_, handle)| handle).collect();
        tracing::info!(count = handles.len(), "shutting down all sessions");
        join_all(handles.into_iter().map(SessionHandle::shutdown)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::geometry::{Extents, Point};

    fn uniform_page(width: u32, height: u32, value: u8) -> Screenshot {
        Screenshot::new(width, height, vec![value; (width * height * 4) as usize]).unwrap()
    }

    async fn next_event(events: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
        events.recv().await.expect("session still running")
    }

    #[tokio::test]
    async fn pointer_before_screenshot_clears() {
        let (handle, mut events) = SessionHandle::spawn(1, RulerConfig::default());
        handle.pointer(PointerEvent::new(1, 1, false));
        assert_eq!(next_event(&mut events).await, SessionEvent::Cleared);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn ray_and_area_measurements_are_emitted() {
        let (handle, mut events) = SessionHandle::spawn(7, RulerConfig::default());
        handle.screenshot(uniform_page(10, 10, 90));
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::ScreenshotProcessed { generation: 0 }
        );

        handle.pointer(PointerEvent::new(5, 5, false));
        match next_event(&mut events).await {
            SessionEvent::Measurement(MeasurementRecord::Distances(result)) => {
                assert_eq!(result.anchor, Point::new(5, 5));
                assert_eq!(
                    result.extents,
                    Extents {
                        top: 5,
                        right: 4,
                        bottom: 4,
                        left: 5
                    }
                );
            }
            other => panic!("unexpected event {other:?}"),
        }

        handle.pointer(PointerEvent::new(2, 3, true));
        match next_event(&mut events).await {
            SessionEvent::Measurement(MeasurementRecord::Area(result)) => {
                assert_eq!(result.pixel_count, 100);
                assert_eq!(result.anchor, Point::new(4, 4));
            }
            other => panic!("unexpected event {other:?}"),
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn pointer_outside_the_page_clears() {
        let (handle, mut events) = SessionHandle::spawn(2, RulerConfig::default());
        handle.screenshot(uniform_page(4, 4, 0));
        next_event(&mut events).await;
        handle.pointer(PointerEvent::new(9, 9, true));
        assert_eq!(next_event(&mut events).await, SessionEvent::Cleared);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn newer_pointer_supersedes_a_running_scan() {
        let config = RulerConfig {
            tick_budget: 4,
            ..RulerConfig::default()
        };
        let (handle, mut events) = SessionHandle::spawn(3, config);
        handle.screenshot(uniform_page(48, 48, 30));
        next_event(&mut events).await;

        handle.pointer(PointerEvent::new(1, 1, true));
        handle.pointer(PointerEvent::new(3, 3, false));

        // Only the ray scan is reported; the area scan was cancelled.
        match next_event(&mut events).await {
            SessionEvent::Measurement(MeasurementRecord::Distances(result)) => {
                assert_eq!(result.anchor, Point::new(3, 3));
            }
            other => panic!("unexpected event {other:?}"),
        }
        handle.shutdown().await;
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn debug_overlay_streams_ticks() {
        let config = RulerConfig {
            tick_budget: 50,
            debug_overlay: true,
            ..RulerConfig::default()
        };
        let (handle, mut events) = SessionHandle::spawn(4, config);
        handle.screenshot(uniform_page(8, 8, 10));
        next_event(&mut events).await;
        handle.pointer(PointerEvent::new(0, 0, true));

        let mut ticks = 0;
        loop {
            match next_event(&mut events).await {
                SessionEvent::DebugScreen { overlay, .. } => {
                    assert_eq!(overlay.dimensions(), (8, 8));
                    ticks += 1;
                }
                SessionEvent::Measurement(MeasurementRecord::Area(result)) => {
                    assert_eq!(result.pixel_count, 64);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(ticks >= 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn session_outlives_a_dropped_event_receiver() {
        let config = RulerConfig {
            tick_budget: 50,
            debug_overlay: true,
            ..RulerConfig::default()
        };
        let (handle, events) = SessionHandle::spawn(5, config);
        drop(events);

        assert!(handle.screenshot(uniform_page(16, 16, 10)));
        assert!(handle.pointer(PointerEvent::new(3, 3, true)));
        for _ in 0..64 {
            tokio::task::yield_now().await;
        }

        // Debug screens and the finished scan had nowhere to go, yet the actor
        // keeps taking messages.
        assert!(handle.pointer(PointerEvent::new(4, 4, false)));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn registry_toggles_sessions() {
        let mut registry = SessionRegistry::new(RulerConfig::default()).unwrap();
        assert!(registry.is_empty());

        let mut events = match registry.toggle(11).await {
            Toggled::Activated(events) => events,
            Toggled::Deactivated => panic!("expected activation"),
        };
        assert!(registry.contains(11));

        let handle = registry.get(11).unwrap();
        assert_eq!(handle.id(), 11);
        handle.screenshot(uniform_page(3, 3, 0));
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::ScreenshotProcessed { generation: 0 })
        );

        assert!(matches!(registry.toggle(11).await, Toggled::Deactivated));
        assert!(!registry.contains(11));
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_all_stops_every_session() {
        let mut registry = SessionRegistry::new(RulerConfig::default()).unwrap();
        let mut receivers: Vec<_> = (0..3).filter_map(|id| registry.activate(id)).collect();
        assert_eq!(registry.len(), 3);
        assert!(registry.activate(1).is_none());

        registry.shutdown_all().await;
        assert!(registry.is_empty());
        for events in &mut receivers {
            assert!(events.recv().await.is_none());
        }
        assert!(!registry.deactivate(0).await);
    }
}
