//! The capture cycle state machine.
//!
//! ```text
//! Idle ──trigger──▶ CountingDown(3) ─1s─▶ (2) ─1s─▶ (1) ─1s─▶ Capturing
//!  ▲                                                            │
//!  │                                                   capture duration
//!  │                                                            ▼
//!  └──── cooldown ──── Cooldown ◀──────────────────────── Finalizing
//! ```
//!
//! All mutation happens through [`handle`](CaptureStateMachine::handle) and
//! [`fire_due`](CaptureStateMachine::fire_due), called from one thread. Both
//! take the current instant explicitly.

use crate::capture::scheduler::Scheduler;
use crate::capture::session::CaptureSession;
use crate::config::{Config, TimingConfig};
use crate::feedback::{Cue, CuePlayer, DisplayEvent, StatusDisplay};
use crate::queue::{CompletionSink, Event, SampleSink};
use crate::sensor::{MotionSample, SensorRole, SensorSampler};
use crate::stats::SharedCaptureStats;
use crate::upload::{UploadConfig, UploadDispatch, UploadError, UploadOutcome, UploadRequest};
use crossbeam_channel::Sender;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Where the capture cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    CountingDown(u8),
    Capturing,
    Finalizing,
    Cooldown,
}

/// A timed step of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Countdown(u8),
    BeginCapture,
    Finalize,
    ReturnToIdle,
}

/// External collaborators the machine drives.
pub struct Collaborators {
    pub sampler: Box<dyn SensorSampler>,
    pub uploader: Box<dyn UploadDispatch>,
    pub display: Box<dyn StatusDisplay>,
    pub cues: Box<dyn CuePlayer>,
}

pub struct CaptureStateMachine {
    timing: TimingConfig,
    sampling_interval: Duration,
    upload: UploadConfig,
    state: CaptureState,
    scheduler: Scheduler<Step>,
    session: Option<CaptureSession>,
    /// Index the next uploaded session will carry
    next_index: u64,
    parts: Collaborators,
    /// Used to mint sinks that post back onto the serial queue
    queue: Sender<Event>,
    stats: SharedCaptureStats,
}

impl CaptureStateMachine {
    pub fn new(
        config: &Config,
        parts: Collaborators,
        queue: Sender<Event>,
        stats: SharedCaptureStats,
    ) -> Self {
        Self {
            timing: config.timing.clone(),
            sampling_interval: config.sampling_interval,
            upload: config.upload.clone(),
            state: CaptureState::Idle,
            scheduler: Scheduler::new(),
            session: None,
            next_index: config.first_session_index,
            parts,
            queue,
            stats,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn next_session_index(&self) -> u64 {
        self.next_index
    }

    /// Rows buffered by the open session, if one is open.
    pub fn session_row_count(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.row_count())
    }

    /// When the next timed step is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn pending_steps(&self) -> usize {
        self.scheduler.len()
    }

    /// Apply one queued event. Returns false once the machine has shut down.
    pub fn handle(&mut self, event: Event, now: Instant) -> bool {
        match event {
            Event::Trigger => {
                self.trigger(now);
            }
            Event::Sample { role, sample } => self.on_sample(role, sample, now),
            Event::UploadFinished {
                session_index,
                outcome,
            } => self.on_upload_finished(session_index, outcome),
            Event::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    /// Run every step that is due at `now`, in deadline order.
    pub fn fire_due(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while let Some(step) = self.scheduler.pop_due(now) {
            self.apply(step, now);
            fired += 1;
        }
        fired
    }

    /// Start a cycle. Ignored unless idle; returns whether a cycle started.
    pub fn trigger(&mut self, now: Instant) -> bool {
        if self.state != CaptureState::Idle {
            debug!(state = ?self.state, "Trigger ignored, cycle already running");
            return false;
        }

        self.stats.record_cycle_started();
        self.parts.display.keep_awake(true);

        let from = self.timing.countdown_from;
        self.enter(CaptureState::CountingDown(from));
        for k in 1..from {
            let at = now + self.timing.countdown_step * u32::from(k);
            self.scheduler.schedule(at, Step::Countdown(from - k));
        }
        self.scheduler
            .schedule(now + self.timing.countdown_total(), Step::BeginCapture);
        true
    }

    /// Stop everything: cancel pending steps, release the sensors and drop
    /// any open session without uploading it.
    pub fn shutdown(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        self.parts.sampler.deactivate();
        if let Some(session) = self.session.take() {
            warn!(
                session = session.index(),
                rows = session.row_count(),
                "Shutting down mid-capture, session discarded"
            );
        }
        if self.state != CaptureState::Idle {
            self.parts.display.keep_awake(false);
        }
        debug!(cancelled, "Capture machine shut down");
        self.state = CaptureState::Idle;
    }

    fn apply(&mut self, step: Step, now: Instant) {
        trace!(?step, "Step due");
        match step {
            Step::Countdown(n) => self.enter(CaptureState::CountingDown(n)),
            Step::BeginCapture => self.begin_capture(now),
            Step::Finalize => self.finalize(now),
            Step::ReturnToIdle => self.enter(CaptureState::Idle),
        }
    }

    fn enter(&mut self, next: CaptureState) {
        debug!(from = ?self.state, to = ?next, "State transition");
        self.state = next;

        let event = match next {
            CaptureState::Idle => DisplayEvent::ShowIdle,
            CaptureState::CountingDown(n) => DisplayEvent::ShowCountdown(n),
            CaptureState::Capturing => DisplayEvent::ShowCapturing,
            CaptureState::Cooldown => DisplayEvent::ShowDone,
            CaptureState::Finalizing => return,
        };
        self.parts.display.show(event);
    }

    fn begin_capture(&mut self, now: Instant) {
        let sink = SampleSink::new(self.queue.clone());
        if let Err(e) = self.parts.sampler.activate(self.sampling_interval, sink) {
            warn!(error = %e, "Capture aborted");
            self.abort(e.user_message());
            return;
        }

        self.play_cue(Cue::CaptureStart);
        self.session = Some(CaptureSession::new(self.next_index, now));
        self.enter(CaptureState::Capturing);
        self.scheduler
            .schedule(now + self.timing.capture_duration, Step::Finalize);
    }

    fn abort(&mut self, message: String) {
        self.scheduler.cancel_all();
        self.parts.sampler.deactivate();
        self.session = None;
        self.stats.record_cycle_aborted();

        self.parts.display.show(DisplayEvent::ShowError(message));
        self.parts.display.keep_awake(false);
        self.enter(CaptureState::Idle);
    }

    fn finalize(&mut self, now: Instant) {
        self.enter(CaptureState::Finalizing);
        self.parts.sampler.deactivate();
        self.play_cue(Cue::CaptureEnd);
        self.parts.display.keep_awake(false);

        match self.session.take() {
            Some(mut session) => match session.seal(now) {
                Ok((rows, summary)) => {
                    info!("Captured {summary}");
                    self.stats.record_session(rows.len() as u64);
                    if summary.went_still {
                        info!(
                            session = summary.index,
                            still_ms = summary.trailing_still_ms,
                            "Gesture ended with the wrist still"
                        );
                        self.stats.record_still_ending();
                    }

                    if rows.is_empty() {
                        info!(session = summary.index, "Session is empty, skipping upload");
                    } else {
                        let request = UploadRequest::new(&rows, summary.index, &self.upload);
                        self.parts
                            .uploader
                            .dispatch(request, CompletionSink::new(self.queue.clone()));
                        self.stats.record_upload_dispatched();
                        self.next_index += 1;
                    }
                }
                Err(e) => error!(error = %e, "Session buffer contract broken at finalize"),
            },
            None => error!("Finalize reached without an open session"),
        }

        self.enter(CaptureState::Cooldown);
        self.scheduler
            .schedule(now + self.timing.cooldown, Step::ReturnToIdle);
    }

    fn on_sample(&mut self, role: SensorRole, sample: MotionSample, now: Instant) {
        let session = match (self.state, self.session.as_mut()) {
            (CaptureState::Capturing, Some(session)) => session,
            _ => {
                trace!(?role, state = ?self.state, "Reading outside capture dropped");
                self.stats.record_sample_dropped();
                return;
            }
        };

        if let Err(e) = session.record(role, sample, now) {
            error!(error = %e, "Reading arrived for a sealed session");
        }
    }

    fn on_upload_finished(&mut self, session_index: u64, outcome: UploadOutcome) {
        match outcome {
            Ok(receipt) => {
                info!(
                    session = session_index,
                    status = receipt.status,
                    "Upload delivered"
                );
                self.stats.record_upload_succeeded();
            }
            Err(e) => {
                warn!(session = session_index, error = %e, "Upload lost");
                match e {
                    UploadError::ServerRejected { .. } => self.stats.record_upload_rejected(),
                    _ => self.stats.record_upload_failed(),
                }
                self.parts.display.show(DisplayEvent::ShowError(e.user_message()));
            }
        }
    }

    fn play_cue(&self, cue: Cue) {
        if let Err(e) = self.parts.cues.play(cue) {
            warn!(?cue, error = %e, "Cue failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::CueError;
    use crate::sensor::SensorError;
    use crate::stats::create_shared_stats;
    use crate::upload::UploadReceipt;
    use crossbeam_channel::{unbounded, Receiver};
    use std::sync::{Arc, Mutex};

    type Log<T> = Arc<Mutex<Vec<T>>>;

    struct FakeSampler {
        missing: Option<SensorRole>,
        active: bool,
        calls: Log<&'static str>,
    }

    impl SensorSampler for FakeSampler {
        fn activate(&mut self, _interval: Duration, _sink: SampleSink) -> Result<(), SensorError> {
            self.calls.lock().unwrap().push("activate");
            if let Some(role) = self.missing {
                return Err(SensorError::SensorUnavailable(role));
            }
            self.active = true;
            Ok(())
        }

        fn deactivate(&mut self) {
            self.calls.lock().unwrap().push("deactivate");
            self.active = false;
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    struct FakeUploader(Log<UploadRequest>);

    impl UploadDispatch for FakeUploader {
        fn dispatch(&self, request: UploadRequest, _completion: CompletionSink) {
            self.0.lock().unwrap().push(request);
        }
    }

    struct FakeDisplay {
        events: Log<DisplayEvent>,
        awake: Log<bool>,
    }

    impl StatusDisplay for FakeDisplay {
        fn show(&self, event: DisplayEvent) {
            self.events.lock().unwrap().push(event);
        }

        fn keep_awake(&self, on: bool) {
            self.awake.lock().unwrap().push(on);
        }
    }

    struct FakeCues {
        played: Log<Cue>,
        fail: bool,
    }

    impl CuePlayer for FakeCues {
        fn play(&self, cue: Cue) -> Result<(), CueError> {
            self.played.lock().unwrap().push(cue);
            if self.fail {
                return Err(CueError("no audio device".to_string()));
            }
            Ok(())
        }
    }

    struct Harness {
        machine: CaptureStateMachine,
        t0: Instant,
        sampler_calls: Log<&'static str>,
        uploads: Log<UploadRequest>,
        display: Log<DisplayEvent>,
        awake: Log<bool>,
        cues: Log<Cue>,
        stats: SharedCaptureStats,
        _rx: Receiver<Event>,
    }

    impl Harness {
        fn new() -> Self {
            Self::build(None, false, 0)
        }

        fn build(missing: Option<SensorRole>, cues_fail: bool, first_index: u64) -> Self {
            let sampler_calls = Log::default();
            let uploads = Log::default();
            let display = Log::default();
            let awake = Log::default();
            let cues = Log::default();
            let stats = create_shared_stats();
            let (tx, rx) = unbounded();

            let parts = Collaborators {
                sampler: Box::new(FakeSampler {
                    missing,
                    active: false,
                    calls: sampler_calls.clone(),
                }),
                uploader: Box::new(FakeUploader(uploads.clone())),
                display: Box::new(FakeDisplay {
                    events: display.clone(),
                    awake: awake.clone(),
                }),
                cues: Box::new(FakeCues {
                    played: cues.clone(),
                    fail: cues_fail,
                }),
            };

            let config = Config {
                first_session_index: first_index,
                ..Config::default()
            };

            Self {
                machine: CaptureStateMachine::new(&config, parts, tx, stats.clone()),
                t0: Instant::now(),
                sampler_calls,
                uploads,
                display,
                awake,
                cues,
                stats,
                _rx: rx,
            }
        }

        fn at(&self, ms: u64) -> Instant {
            self.t0 + Duration::from_millis(ms)
        }

        fn fire(&mut self, ms: u64) {
            let now = self.at(ms);
            self.machine.fire_due(now);
        }

        fn sample(&mut self, role: SensorRole, v: f32, ms: u64) {
            let now = self.at(ms);
            self.machine.handle(
                Event::Sample {
                    role,
                    sample: MotionSample::new(v, v, v),
                },
                now,
            );
        }

        /// Trigger at 0 ms and run until capture has begun at 3000 ms.
        fn start_capture(&mut self) {
            assert!(self.machine.trigger(self.t0));
            self.fire(3000);
            assert_eq!(self.machine.state(), CaptureState::Capturing);
        }
    }

    #[test]
    fn test_full_cycle_timeline() {
        let mut h = Harness::new();
        assert_eq!(h.machine.state(), CaptureState::Idle);

        assert!(h.machine.trigger(h.t0));
        assert_eq!(h.machine.state(), CaptureState::CountingDown(3));

        h.fire(999);
        assert_eq!(h.machine.state(), CaptureState::CountingDown(3));
        h.fire(1000);
        assert_eq!(h.machine.state(), CaptureState::CountingDown(2));
        h.fire(2000);
        assert_eq!(h.machine.state(), CaptureState::CountingDown(1));
        assert!(h.sampler_calls.lock().unwrap().is_empty());

        h.fire(3000);
        assert_eq!(h.machine.state(), CaptureState::Capturing);
        assert_eq!(*h.sampler_calls.lock().unwrap(), vec!["activate"]);
        assert_eq!(*h.cues.lock().unwrap(), vec![Cue::CaptureStart]);

        h.sample(SensorRole::Gyroscope, 0.5, 3005);
        h.sample(SensorRole::Accelerometer, 1.0, 3010);
        h.sample(SensorRole::Accelerometer, 2.0, 3020);
        assert_eq!(h.machine.session_row_count(), Some(2));

        h.fire(5999);
        assert_eq!(h.machine.state(), CaptureState::Capturing);
        h.fire(6000);
        assert_eq!(h.machine.state(), CaptureState::Cooldown);
        assert_eq!(
            *h.sampler_calls.lock().unwrap(),
            vec!["activate", "deactivate"]
        );
        assert_eq!(
            *h.cues.lock().unwrap(),
            vec![Cue::CaptureStart, Cue::CaptureEnd]
        );

        let uploads = h.uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].session_index, 0);
        assert_eq!(uploads[0].file_name, "gesture_0.csv");
        assert_eq!(
            uploads[0].value,
            "timestamp,accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z\n\
             10,1,1,1,0.5,0.5,0.5\n\
             20,2,2,2,0.5,0.5,0.5\n"
        );
        assert_eq!(h.machine.next_session_index(), 1);

        h.fire(6499);
        assert_eq!(h.machine.state(), CaptureState::Cooldown);
        h.fire(6500);
        assert_eq!(h.machine.state(), CaptureState::Idle);
        assert_eq!(h.machine.pending_steps(), 0);

        assert_eq!(
            *h.display.lock().unwrap(),
            vec![
                DisplayEvent::ShowCountdown(3),
                DisplayEvent::ShowCountdown(2),
                DisplayEvent::ShowCountdown(1),
                DisplayEvent::ShowCapturing,
                DisplayEvent::ShowDone,
                DisplayEvent::ShowIdle,
            ]
        );
        assert_eq!(*h.awake.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_retrigger_outside_idle_is_noop() {
        let mut h = Harness::new();
        h.machine.trigger(h.t0);

        // Countdown
        assert!(!h.machine.trigger(h.at(500)));
        assert_eq!(h.machine.state(), CaptureState::CountingDown(3));
        assert_eq!(h.machine.pending_steps(), 3);

        // Capturing
        h.fire(3000);
        h.sample(SensorRole::Gyroscope, 1.0, 3001);
        h.sample(SensorRole::Accelerometer, 1.0, 3002);
        assert!(!h.machine.trigger(h.at(3003)));
        assert_eq!(h.machine.state(), CaptureState::Capturing);
        assert_eq!(h.machine.session_row_count(), Some(1));
        assert_eq!(h.machine.next_session_index(), 0);

        // Cooldown
        h.fire(6000);
        assert!(!h.machine.trigger(h.at(6100)));
        assert_eq!(h.machine.state(), CaptureState::Cooldown);
        assert_eq!(h.machine.next_session_index(), 1);
        assert_eq!(h.stats.stats().cycles_started, 1);

        // Idle again: accepted
        h.fire(6500);
        assert!(h.machine.trigger(h.at(6600)));
    }

    #[test]
    fn test_missing_sensor_aborts_to_idle() {
        let mut h = Harness::build(Some(SensorRole::Gyroscope), false, 0);
        h.machine.trigger(h.t0);
        h.fire(3000);

        assert_eq!(h.machine.state(), CaptureState::Idle);
        assert_eq!(h.machine.session_row_count(), None);
        assert_eq!(h.machine.pending_steps(), 0);
        assert!(h.cues.lock().unwrap().is_empty());
        assert!(h.uploads.lock().unwrap().is_empty());
        assert_eq!(
            *h.sampler_calls.lock().unwrap(),
            vec!["activate", "deactivate"]
        );

        let display = h.display.lock().unwrap().clone();
        assert_eq!(
            &display[3..],
            &[
                DisplayEvent::ShowError("Gyroscope not available".to_string()),
                DisplayEvent::ShowIdle,
            ]
        );
        assert_eq!(*h.awake.lock().unwrap(), vec![true, false]);
        assert_eq!(h.stats.stats().cycles_aborted, 1);

        // Nothing left to fire, and a new trigger is accepted.
        h.fire(10_000);
        assert_eq!(h.machine.state(), CaptureState::Idle);
        assert!(h.machine.trigger(h.at(10_001)));
    }

    #[test]
    fn test_readings_outside_capture_are_dropped() {
        let mut h = Harness::new();
        h.sample(SensorRole::Gyroscope, 1.0, 0);
        h.machine.trigger(h.t0);
        h.sample(SensorRole::Accelerometer, 1.0, 100);
        assert_eq!(h.machine.session_row_count(), None);

        h.fire(3000);
        h.sample(SensorRole::Gyroscope, 1.0, 3001);
        h.sample(SensorRole::Accelerometer, 1.0, 3002);
        h.fire(6000);

        // In-flight delivery racing the deactivate
        h.sample(SensorRole::Accelerometer, 9.0, 6001);
        assert_eq!(h.stats.stats().samples_dropped, 3);

        let uploads = h.uploads.lock().unwrap();
        assert_eq!(uploads[0].row_count, 1);
        assert!(!uploads[0].value.contains('9'));
    }

    #[test]
    fn test_gyro_state_does_not_leak_between_sessions() {
        let mut h = Harness::new();
        h.start_capture();
        h.sample(SensorRole::Gyroscope, 1.0, 3001);
        h.sample(SensorRole::Accelerometer, 1.0, 3002);
        h.fire(6000);
        h.fire(6500);

        h.machine.trigger(h.at(7000));
        h.fire(10_000);
        // No gyroscope reading in this session yet.
        h.sample(SensorRole::Accelerometer, 2.0, 10_001);
        assert_eq!(h.machine.session_row_count(), Some(0));
    }

    #[test]
    fn test_row_timestamps_non_decreasing_from_zero() {
        let mut h = Harness::new();
        h.start_capture();
        h.sample(SensorRole::Gyroscope, 0.1, 3000);
        for ms in [3000, 3010, 3010, 3025, 3040] {
            h.sample(SensorRole::Accelerometer, 1.0, ms);
        }
        h.fire(6000);

        let uploads = h.uploads.lock().unwrap();
        let stamps: Vec<u64> = uploads[0]
            .value
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(stamps, vec![0, 10, 10, 25, 40]);
    }

    #[test]
    fn test_empty_session_skips_upload_and_keeps_index() {
        let mut h = Harness::build(None, false, 5);
        h.start_capture();
        // Accelerometer only: no row can be formed.
        h.sample(SensorRole::Accelerometer, 1.0, 3010);
        h.fire(6000);

        assert_eq!(h.machine.state(), CaptureState::Cooldown);
        assert!(h.uploads.lock().unwrap().is_empty());
        assert_eq!(h.machine.next_session_index(), 5);
        assert_eq!(h.stats.stats().empty_sessions, 1);

        h.fire(6500);
        h.machine.trigger(h.at(7000));
        h.fire(10_000);
        h.sample(SensorRole::Gyroscope, 1.0, 10_001);
        h.sample(SensorRole::Accelerometer, 1.0, 10_002);
        h.fire(13_000);

        let uploads = h.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].session_index, 5);
        assert_eq!(uploads[0].file_name, "gesture_5.csv");
        assert_eq!(h.machine.next_session_index(), 6);
    }

    #[test]
    fn test_still_ending_is_counted() {
        let mut h = Harness::new();
        h.start_capture();
        h.sample(SensorRole::Gyroscope, 1.0, 3001);
        h.sample(SensorRole::Accelerometer, 1.0, 3010);
        h.sample(SensorRole::Accelerometer, 0.05, 4000);
        h.fire(6000);
        assert_eq!(h.stats.stats().still_endings, 1);

        // Moving until shortly before the end.
        h.fire(6500);
        h.machine.trigger(h.at(7000));
        h.fire(10_000);
        h.sample(SensorRole::Gyroscope, 1.0, 10_001);
        h.sample(SensorRole::Accelerometer, 1.0, 12_500);
        h.fire(13_000);
        assert_eq!(h.stats.stats().still_endings, 1);
        assert_eq!(h.uploads.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_upload_failures_only_notify() {
        let mut h = Harness::new();
        let now = h.at(0);

        h.machine.handle(
            Event::UploadFinished {
                session_index: 0,
                outcome: Err(UploadError::Network("connection refused".to_string())),
            },
            now,
        );
        h.machine.handle(
            Event::UploadFinished {
                session_index: 1,
                outcome: Err(UploadError::ServerRejected {
                    status: 500,
                    body: String::new(),
                }),
            },
            now,
        );
        h.machine.handle(
            Event::UploadFinished {
                session_index: 2,
                outcome: Ok(UploadReceipt {
                    status: 200,
                    body: "ok".to_string(),
                }),
            },
            now,
        );

        assert_eq!(h.machine.state(), CaptureState::Idle);
        assert_eq!(h.machine.pending_steps(), 0);
        assert_eq!(
            *h.display.lock().unwrap(),
            vec![
                DisplayEvent::ShowError("Network error: connection refused".to_string()),
                DisplayEvent::ShowError("Server error: 500".to_string()),
            ]
        );

        let stats = h.stats.stats();
        assert_eq!(stats.uploads_failed, 1);
        assert_eq!(stats.uploads_rejected, 1);
        assert_eq!(stats.uploads_succeeded, 1);
    }

    #[test]
    fn test_shutdown_mid_capture_discards_session() {
        let mut h = Harness::new();
        h.start_capture();
        h.sample(SensorRole::Gyroscope, 1.0, 3001);
        h.sample(SensorRole::Accelerometer, 1.0, 3002);

        let keep_running = h.machine.handle(Event::Shutdown, h.at(3500));
        assert!(!keep_running);
        assert_eq!(h.machine.state(), CaptureState::Idle);
        assert_eq!(h.machine.pending_steps(), 0);
        assert_eq!(h.machine.session_row_count(), None);
        assert_eq!(
            h.sampler_calls.lock().unwrap().last(),
            Some(&"deactivate")
        );

        h.fire(10_000);
        assert!(h.uploads.lock().unwrap().is_empty());
        assert_eq!(*h.awake.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_cue_failure_does_not_disturb_cycle() {
        let mut h = Harness::build(None, true, 0);
        h.start_capture();
        h.sample(SensorRole::Gyroscope, 1.0, 3001);
        h.sample(SensorRole::Accelerometer, 1.0, 3002);
        h.fire(6000);
        h.fire(6500);

        assert_eq!(h.machine.state(), CaptureState::Idle);
        assert_eq!(h.cues.lock().unwrap().len(), 2);
        assert_eq!(h.uploads.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_late_timer_measures_capture_from_entry() {
        let mut h = Harness::new();
        h.machine.trigger(h.t0);
        // The queue was busy; capture begins 40 ms late.
        h.fire(3040);
        assert_eq!(h.machine.state(), CaptureState::Capturing);
        assert_eq!(h.machine.next_deadline(), Some(h.at(6040)));
    }
}
