use crate::touch::compositor::{LayeredCompositor, PresentTarget};
use crate::touch::model::{Point, TouchEvent};
use crate::touch::render::DirtyRect;
use crate::touch::shutdown::CancellationToken;
use crate::touch::state::TouchStateMachine;
use crate::touch::trace::CoordinateTrace;
use std::io::Write;
use std::time::Duration;

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    /// Part of the window needs repainting; `None` means all of it.
    Expose(Option<DirtyRect>),
    Touch(TouchEvent),
    CloseRequested,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// Events were queued and have been drained.
    Ready,
    /// The timeout expired with nothing to read.
    Idle,
    /// The connection to the window system is gone.
    Disconnected,
}

/// Window-system side of the loop.
pub trait EventSource {
    /// Waits at most `timeout` for input, then appends every queued event to `events`.
    fn pump(&mut self, timeout: Duration, events: &mut Vec<SessionEvent>) -> SourceStatus;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchControl {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Cancelled,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub poll_timeout: Duration,
    pub contact_markers: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            contact_markers: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    pub cycles: u64,
    pub events: u64,
    pub touches: u64,
    pub dropped: u64,
    pub anomalies: u64,
    pub exposes: u64,
    pub frames: u64,
}

pub struct Dispatcher {
    machine: TouchStateMachine,
    compositor: LayeredCompositor,
    trace: Option<CoordinateTrace<Box<dyn Write>>>,
    config: DispatchConfig,
    stats: DispatchStats,
    markers_dirty: bool,
    queue: Vec<SessionEvent>,
}

impl Dispatcher {
    pub fn new(
        machine: TouchStateMachine,
        compositor: LayeredCompositor,
        config: DispatchConfig,
    ) -> Self {
        Self {
            machine,
            compositor,
            trace: None,
            config,
            stats: DispatchStats::default(),
            markers_dirty: false,
            queue: Vec::new(),
        }
    }

    pub fn with_trace(mut self, out: Box<dyn Write>) -> Self {
        self.trace = Some(CoordinateTrace::new(out));
        self
    }

    pub fn machine(&self) -> &TouchStateMachine {
        &self.machine
    }

    pub fn compositor(&self) -> &LayeredCompositor {
        &self.compositor
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Runs until `token` is cancelled or the source disconnects.
    ///
    /// Each cycle drains everything the source has queued before recompositing once.
    pub fn run<S, P>(
        &mut self,
        source: &mut S,
        target: &mut P,
        token: &CancellationToken,
    ) -> DispatchOutcome
    where
        S: EventSource + ?Sized,
        P: PresentTarget + ?Sized,
    {
        self.compositor.request_full_redraw();
        loop {
            if token.is_cancelled() {
                return DispatchOutcome::Cancelled;
            }

            let mut events = std::mem::take(&mut self.queue);
            let status = source.pump(self.config.poll_timeout, &mut events);
            self.stats.cycles += 1;

            for event in events.drain(..) {
                if self.dispatch(event) == DispatchControl::Stop {
                    token.cancel();
                }
            }
            self.queue = events;
            self.finish_cycle(target);

            if status == SourceStatus::Disconnected {
                tracing::warn!("window system connection lost");
                return DispatchOutcome::Disconnected;
            }
        }
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> DispatchControl {
        self.stats.events += 1;
        match event {
            SessionEvent::Expose(region) => {
                self.stats.exposes += 1;
                match region {
                    Some(region) => self.compositor.request_redraw(region),
                    None => self.compositor.request_full_redraw(),
                }
            }
            SessionEvent::Touch(touch) => self.dispatch_touch(touch),
            SessionEvent::CloseRequested => {
                tracing::info!("window close requested");
                return DispatchControl::Stop;
            }
            SessionEvent::Other => {}
        }
        DispatchControl::Continue
    }

    /// Refreshes contact markers if needed and presents pending damage.
    pub fn finish_cycle<P: PresentTarget + ?Sized>(&mut self, target: &mut P) {
        if self.markers_dirty && self.config.contact_markers {
            let points: Vec<Point> = self
                .machine
                .active_positions()
                .into_iter()
                .map(|(_, point)| point)
                .collect();
            self.compositor.set_contact_markers(&points);
        }
        self.markers_dirty = false;

        match self.compositor.flush(target) {
            Ok(true) => self.stats.frames += 1,
            Ok(false) => {}
            Err(err) => tracing::error!(?err, "failed to present frame"),
        }
    }

    /// Forced cleanup of contacts still live at exit.
    pub fn shutdown(&mut self) -> usize {
        let released = self.machine.cancel_all();
        if released > 0 {
            tracing::info!(released, "released touches still active at shutdown");
        }
        released
    }

    fn dispatch_touch(&mut self, touch: TouchEvent) {
        self.stats.touches += 1;
        tracing::trace!(id = %touch.id, kind = %touch.kind, x = touch.position.x, y = touch.position.y, "touch event");

        if let Some(trace) = self.trace.as_mut() {
            if let Err(err) = trace.record(&touch) {
                self.stats.anomalies += 1;
                tracing::warn!(id = %touch.id, kind = %touch.kind, %err, "touch sequence anomaly");
            }
        }

        match self.machine.handle(touch) {
            Ok(transition) => {
                if transition.replaced_stale {
                    self.stats.anomalies += 1;
                    tracing::warn!(
                        id = %touch.id,
                        "touch began while already active; stale slot replaced"
                    );
                }
                if let Some(intent) = transition.intent {
                    self.compositor.draw(&intent);
                }
                self.markers_dirty = true;
            }
            Err(err) => {
                self.stats.dropped += 1;
                tracing::warn!(id = %touch.id, kind = %touch.kind, %err, "dropped touch event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touch::compositor::CompositorStyle;
    use crate::touch::model::{Color, TouchId};
    use crate::touch::render::Surface;
    use crate::touch::state::MarkerGeometry;
    use std::collections::VecDeque;

    struct ScriptedSource {
        batches: VecDeque<(SourceStatus, Vec<SessionEvent>)>,
        timeouts: Vec<Duration>,
    }

    impl ScriptedSource {
        fn new(batches: Vec<(SourceStatus, Vec<SessionEvent>)>) -> Self {
            Self {
                batches: batches.into(),
                timeouts: Vec::new(),
            }
        }
    }

    impl EventSource for ScriptedSource {
        fn pump(&mut self, timeout: Duration, events: &mut Vec<SessionEvent>) -> SourceStatus {
            self.timeouts.push(timeout);
            match self.batches.pop_front() {
                Some((status, batch)) => {
                    events.extend(batch);
                    status
                }
                None => SourceStatus::Disconnected,
            }
        }
    }

    #[derive(Default)]
    struct CountingTarget {
        regions: Vec<DirtyRect>,
        last_front: Option<Surface>,
    }

    impl PresentTarget for CountingTarget {
        fn present(&mut self, front: &Surface, region: DirtyRect) -> anyhow::Result<()> {
            self.regions.push(region);
            self.last_front = Some(front.clone());
            Ok(())
        }
    }

    fn dispatcher(contact_markers: bool) -> Dispatcher {
        let compositor =
            LayeredCompositor::new(300, 300, CompositorStyle::default()).expect("compositor");
        Dispatcher::new(
            TouchStateMachine::new(10, MarkerGeometry::default()),
            compositor,
            DispatchConfig {
                poll_timeout: Duration::from_millis(5),
                contact_markers,
            },
        )
    }

    fn touch(event: TouchEvent) -> SessionEvent {
        SessionEvent::Touch(event)
    }

    #[test]
    fn cancelled_token_stops_before_first_pump() {
        let mut dispatcher = dispatcher(false);
        let mut source = ScriptedSource::new(vec![]);
        let mut target = CountingTarget::default();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = dispatcher.run(&mut source, &mut target, &token);

        assert_eq!(outcome, DispatchOutcome::Cancelled);
        assert!(source.timeouts.is_empty());
    }

    #[test]
    fn disconnect_ends_loop_after_draining_last_batch() {
        let mut dispatcher = dispatcher(false);
        let mut source = ScriptedSource::new(vec![(
            SourceStatus::Disconnected,
            vec![touch(TouchEvent::begin(5, 100.0, 100.0))],
        )]);
        let mut target = CountingTarget::default();

        let outcome = dispatcher.run(&mut source, &mut target, &CancellationToken::new());

        assert_eq!(outcome, DispatchOutcome::Disconnected);
        assert_eq!(dispatcher.machine().registry().active_count(), 1);
        assert_eq!(target.regions.len(), 1);
    }

    #[test]
    fn loop_uses_configured_poll_timeout_and_tolerates_idle_cycles() {
        let mut dispatcher = dispatcher(false);
        let mut source = ScriptedSource::new(vec![
            (SourceStatus::Idle, vec![]),
            (SourceStatus::Idle, vec![]),
        ]);
        let mut target = CountingTarget::default();

        dispatcher.run(&mut source, &mut target, &CancellationToken::new());

        assert_eq!(source.timeouts, vec![Duration::from_millis(5); 3]);
        assert_eq!(dispatcher.stats().cycles, 3);
        // The initial full-surface frame only.
        assert_eq!(target.regions.len(), 1);
    }

    #[test]
    fn burst_of_events_is_presented_once_per_cycle() {
        let mut dispatcher = dispatcher(false);
        let mut source = ScriptedSource::new(vec![(
            SourceStatus::Ready,
            vec![
                touch(TouchEvent::begin(5, 100.0, 100.0)),
                touch(TouchEvent::update(5, 120.0, 110.0)),
                touch(TouchEvent::update(5, 140.0, 120.0)),
                touch(TouchEvent::end(5, 150.0, 130.0)),
            ],
        )]);
        let mut target = CountingTarget::default();

        dispatcher.run(&mut source, &mut target, &CancellationToken::new());

        assert_eq!(target.regions.len(), 1);
        assert_eq!(dispatcher.stats().touches, 4);
        assert_eq!(dispatcher.stats().dropped, 0);
        assert_eq!(dispatcher.machine().registry().active_count(), 0);
    }

    #[test]
    fn unknown_identifiers_are_dropped_without_stopping() {
        let mut dispatcher = dispatcher(false);
        let mut source = ScriptedSource::new(vec![
            (
                SourceStatus::Ready,
                vec![
                    touch(TouchEvent::end(9, 1.0, 1.0)),
                    touch(TouchEvent::update(8, 1.0, 1.0)),
                ],
            ),
            (
                SourceStatus::Ready,
                vec![touch(TouchEvent::begin(1, 50.0, 50.0))],
            ),
        ]);
        let mut target = CountingTarget::default();

        dispatcher.run(&mut source, &mut target, &CancellationToken::new());

        assert_eq!(dispatcher.stats().dropped, 2);
        assert_eq!(
            dispatcher.machine().active_positions(),
            vec![(TouchId(1), Point::new(50.0, 50.0))]
        );
    }

    #[test]
    fn close_request_cancels_token() {
        let mut dispatcher = dispatcher(false);
        let mut source = ScriptedSource::new(vec![
            (SourceStatus::Ready, vec![SessionEvent::CloseRequested]),
            (SourceStatus::Ready, vec![touch(TouchEvent::begin(1, 0.0, 0.0))]),
        ]);
        let mut target = CountingTarget::default();
        let token = CancellationToken::new();

        let outcome = dispatcher.run(&mut source, &mut target, &token);

        assert_eq!(outcome, DispatchOutcome::Cancelled);
        assert!(token.is_cancelled());
        assert_eq!(dispatcher.machine().registry().active_count(), 0);
    }

    #[test]
    fn expose_presents_only_the_exposed_region() {
        let mut dispatcher = dispatcher(false);
        let mut target = CountingTarget::default();
        dispatcher.finish_cycle(&mut target);
        target.regions.clear();

        let region = DirtyRect {
            x: 10,
            y: 20,
            width: 30,
            height: 40,
        };
        dispatcher.dispatch(SessionEvent::Expose(Some(region)));
        dispatcher.finish_cycle(&mut target);

        assert_eq!(target.regions, vec![region]);
    }

    #[test]
    fn contact_markers_follow_live_touches_but_ink_persists() {
        let mut dispatcher = dispatcher(true);
        let mut target = CountingTarget::default();
        let background = CompositorStyle::default().background;

        dispatcher.dispatch(touch(TouchEvent::begin(5, 100.0, 100.0)));
        dispatcher.finish_cycle(&mut target);
        let front = target.last_front.clone().expect("frame");
        assert_ne!(front.pixel(100, 100), Some(background));

        dispatcher.dispatch(touch(TouchEvent::end(5, 100.0, 100.0)));
        dispatcher.finish_cycle(&mut target);
        let front = target.last_front.clone().expect("frame");
        assert_eq!(front.pixel(100, 100), Some(background));
        assert_ne!(front.pixel(129, 100), Some(background));
        assert!(dispatcher
            .compositor()
            .overlay()
            .pixels()
            .chunks_exact(4)
            .all(|px| px[3] == 0));
    }

    #[test]
    fn trace_underflow_is_counted_as_anomaly() {
        let mut dispatcher = dispatcher(false).with_trace(Box::new(std::io::sink()));
        dispatcher.dispatch(touch(TouchEvent::end(2, 0.0, 0.0)));

        let stats = dispatcher.stats();
        assert_eq!(stats.anomalies, 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn shutdown_releases_live_touches() {
        let mut dispatcher = dispatcher(false);
        dispatcher.dispatch(touch(TouchEvent::begin(1, 0.0, 0.0)));
        dispatcher.dispatch(touch(TouchEvent::begin(2, 0.0, 0.0)));

        assert_eq!(dispatcher.shutdown(), 2);
        assert_eq!(dispatcher.machine().registry().active_count(), 0);
    }

    #[test]
    fn failing_present_target_does_not_stop_the_loop() {
        struct Failing;
        impl PresentTarget for Failing {
            fn present(&mut self, _: &Surface, _: DirtyRect) -> anyhow::Result<()> {
                anyhow::bail!("display gone")
            }
        }

        let mut dispatcher = dispatcher(false);
        let mut source = ScriptedSource::new(vec![(
            SourceStatus::Ready,
            vec![touch(TouchEvent::begin(1, 10.0, 10.0))],
        )]);

        let outcome = dispatcher.run(&mut source, &mut Failing, &CancellationToken::new());

        assert_eq!(outcome, DispatchOutcome::Disconnected);
        assert_eq!(dispatcher.stats().frames, 0);
        assert_eq!(dispatcher.compositor().ink().pixel(10, 10), Some(Color::rgba(217, 217, 217, 255)));
    }

    #[test]
    fn extreme_coordinates_are_survivable() {
        let mut dispatcher = dispatcher(true);
        let mut target = CountingTarget::default();

        dispatcher.dispatch(touch(TouchEvent::begin(1, 3.0e9, 10.0)));
        dispatcher.dispatch(touch(TouchEvent::begin(2, -3.0e9, 10.0)));
        dispatcher.dispatch(touch(TouchEvent::update(2, 3.0e9, 10.0)));
        dispatcher.dispatch(touch(TouchEvent::begin(3, f64::INFINITY, 10.0)));
        dispatcher.dispatch(touch(TouchEvent::update(3, 50.0, f64::NAN)));
        dispatcher.finish_cycle(&mut target);

        assert_eq!(dispatcher.stats().dropped, 0);
        assert_eq!(dispatcher.machine().registry().active_count(), 3);
        // The segment crossing the whole window was still drawn.
        assert_ne!(
            dispatcher.compositor().ink().pixel(150, 10),
            Some(CompositorStyle::default().background)
        );
    }
}
