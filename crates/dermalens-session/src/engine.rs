//! Camera session runtime.
//!
//! A session runs on its own OS thread with a single-threaded tokio runtime.
//! The loop owns three timers: the detection interval, the countdown
//! interval (only while counting) and the capture delay (only after the
//! countdown reaches zero). Closing the session drops all of them together
//! with the frame source, so no callback can fire after teardown.

use dermalens_core::{
    CaptureConfig, Directive, DistanceHint, FaceBox, FramePipeline, LandmarkSource, LightingHint,
    Phase, TickReport, ValidationSnapshot,
};
use dermalens_hw::{compose_capture, render_guide, CaptureError, CapturedImage, Frame, FrameSource, GuideStyle};
use serde::Serialize;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to spawn session thread: {0}")]
    Spawn(std::io::Error),
    #[error("failed to build session runtime: {0}")]
    Runtime(std::io::Error),
    #[error("no frame available to capture")]
    NoFrame,
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("session closed before capture")]
    Closed,
}

/// Read-only projection of the session state, refreshed after every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub snapshot: ValidationSnapshot,
    pub brightness: f32,
    pub stability_progress: f32,
    pub countdown: Option<u8>,
    pub phase: Phase,
    pub face_box: Option<FaceBox>,
    pub lighting: Option<LightingHint>,
    pub distance: Option<DistanceHint>,
    pub glasses_ratio: f32,
    pub resolution_mismatch: bool,
    /// Detection ticks processed so far.
    pub ticks: u64,
}

impl Default for Feedback {
    fn default() -> Self {
        Self {
            snapshot: ValidationSnapshot::no_face(),
            brightness: 0.0,
            stability_progress: 0.0,
            countdown: None,
            phase: Phase::Idle,
            face_box: None,
            lighting: None,
            distance: None,
            glasses_ratio: 0.0,
            resolution_mismatch: false,
            ticks: 0,
        }
    }
}

impl Feedback {
    fn from_report(report: &TickReport, ticks: u64) -> Self {
        Self {
            snapshot: report.snapshot,
            brightness: report.brightness,
            stability_progress: report.stability_progress,
            countdown: report.countdown,
            phase: report.phase,
            face_box: report.face_box,
            lighting: report.lighting,
            distance: report.distance,
            glasses_ratio: report.glasses_ratio,
            resolution_mismatch: report.resolution_mismatch,
            ticks,
        }
    }
}

type Outcome = Result<CapturedImage, SessionError>;

/// Owner of a running session. Dropping it closes the session.
pub struct SessionHandle {
    feedback: watch::Receiver<Feedback>,
    outcome: Option<oneshot::Receiver<Outcome>>,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl SessionHandle {
    /// Latest feedback.
    pub fn feedback(&self) -> Feedback {
        self.feedback.borrow().clone()
    }

    /// Receiver notified after every tick.
    pub fn subscribe(&self) -> watch::Receiver<Feedback> {
        self.feedback.clone()
    }

    /// Wait for the capture artifact (or the session's terminal error).
    pub async fn wait_capture(&mut self) -> Outcome {
        let rx = self.outcome.take().ok_or(SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Blocking variant of [`wait_capture`](Self::wait_capture) for non-async callers.
    pub fn blocking_wait_capture(&mut self) -> Outcome {
        let rx = self.outcome.take().ok_or(SessionError::Closed)?;
        rx.blocking_recv().map_err(|_| SessionError::Closed)?
    }

    /// Stop the loop and wait for the session thread to release its resources.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("session thread panicked");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start a session with the default eyewear heuristic.
pub fn spawn_session<F, L>(frames: F, landmarks: L, config: CaptureConfig) -> Result<SessionHandle, SessionError>
where
    F: FrameSource + 'static,
    L: LandmarkSource + Send + 'static,
{
    spawn_session_with(frames, landmarks, FramePipeline::new(config))
}

/// Start a session around a prepared pipeline.
pub fn spawn_session_with<F, L>(
    frames: F,
    landmarks: L,
    pipeline: FramePipeline,
) -> Result<SessionHandle, SessionError>
where
    F: FrameSource + 'static,
    L: LandmarkSource + Send + 'static,
{
    let (feedback_tx, feedback_rx) = watch::channel(Feedback::default());
    let (outcome_tx, outcome_rx) = oneshot::channel::<Outcome>();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let thread = std::thread::Builder::new()
        .name("dermalens-session".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = outcome_tx.send(Err(SessionError::Runtime(e)));
                    return;
                }
            };
            tracing::info!("session thread started");

            let session = Session {
                frames,
                landmarks,
                pipeline,
                feedback: feedback_tx,
                started: std::time::Instant::now(),
                last_frame: None,
                last_face: None,
                ticks: 0,
            };
            if let Some(outcome) = runtime.block_on(session.run(stop_rx)) {
                let _ = outcome_tx.send(outcome);
            }
            tracing::info!("session thread exiting");
        })
        .map_err(SessionError::Spawn)?;

    Ok(SessionHandle {
        feedback: feedback_rx,
        outcome: Some(outcome_rx),
        stop: Some(stop_tx),
        thread: Some(thread),
    })
}

enum Event {
    Stop,
    Detect,
    Countdown,
    CaptureDelay,
}

struct Session<F, L> {
    frames: F,
    landmarks: L,
    pipeline: FramePipeline,
    feedback: watch::Sender<Feedback>,
    started: std::time::Instant,
    /// Last frame that went through analysis; capture falls back to it.
    last_frame: Option<Frame>,
    last_face: Option<FaceBox>,
    ticks: u64,
}

impl<F: FrameSource, L: LandmarkSource> Session<F, L> {
    /// Returns `None` when stopped from outside, otherwise the capture outcome.
    async fn run(mut self, mut stop: oneshot::Receiver<()>) -> Option<Outcome> {
        let timing = self.pipeline.config().timing.clone();
        let countdown_period = Duration::from_millis(timing.countdown_interval_ms);
        let capture_delay_period = Duration::from_millis(timing.capture_delay_ms);

        let mut detect = time::interval(Duration::from_millis(timing.detection_interval_ms));
        detect.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut countdown: Option<Interval> = None;
        let mut capture_delay: Option<Pin<Box<Sleep>>> = None;

        tracing::info!(
            detection_ms = timing.detection_interval_ms,
            countdown_ms = timing.countdown_interval_ms,
            "session started"
        );

        loop {
            let event = tokio::select! {
                biased;
                _ = &mut stop => Event::Stop,
                _ = elapsed(&mut capture_delay) => Event::CaptureDelay,
                _ = next_tick(&mut countdown) => Event::Countdown,
                _ = detect.tick() => Event::Detect,
            };

            let directive = match event {
                Event::Stop => {
                    tracing::info!(ticks = self.ticks, "session closed");
                    return None;
                }
                Event::Detect => match self.detect_tick() {
                    Some(directive) => directive,
                    None => continue,
                },
                Event::Countdown => {
                    let directive = self.pipeline.tick_countdown();
                    self.publish_phase();
                    directive
                }
                Event::CaptureDelay => {
                    capture_delay = None;
                    if !self.pipeline.fire_capture() {
                        continue;
                    }
                    self.publish_phase();
                    let outcome = self.capture(timing.jpeg_quality);
                    if let Err(e) = &outcome {
                        tracing::error!(error = %e, "capture failed");
                    }
                    return Some(outcome);
                }
            };

            match directive {
                Directive::StartCountdown(_) => {
                    countdown = Some(time::interval_at(Instant::now() + countdown_period, countdown_period));
                }
                Directive::Abort => {
                    countdown = None;
                    capture_delay = None;
                }
                Directive::CaptureDue => {
                    countdown = None;
                    capture_delay = Some(Box::pin(time::sleep(capture_delay_period)));
                }
                Directive::Continue(_) | Directive::KeepWaiting => {}
            }
        }
    }

    /// One detection tick. `None` when the tick was skipped.
    fn detect_tick(&mut self) -> Option<Directive> {
        let frame = match self.frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::trace!("frame not ready, skipping tick");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "frame read failed, skipping tick");
                return None;
            }
        };
        let view = match frame.view() {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!(error = %e, "unusable frame, skipping tick");
                return None;
            }
        };

        let timestamp_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let landmarks = match self.landmarks.detect(view, timestamp_ms) {
            Ok(landmarks) => landmarks,
            Err(e) => {
                tracing::debug!(error = %e, "landmark detection failed, treating as no face");
                None
            }
        };

        let report = self.pipeline.process(view, landmarks.as_ref());
        self.ticks += 1;
        self.last_face = report.face_box;
        self.last_frame = Some(frame);

        tracing::debug!(
            tick = self.ticks,
            face = report.snapshot.face_detected,
            centered = report.snapshot.centered,
            lighting = report.snapshot.lighting,
            distance = report.snapshot.distance,
            straight = report.snapshot.looking_straight,
            no_glasses = report.snapshot.no_glasses,
            progress = report.stability_progress,
            "validation"
        );
        self.feedback.send_replace(Feedback::from_report(&report, self.ticks));
        Some(report.directive)
    }

    fn publish_phase(&self) {
        let readiness = self.pipeline.readiness();
        let (phase, countdown, progress) = (readiness.phase(), readiness.countdown(), readiness.progress());
        self.feedback.send_modify(|f| {
            f.phase = phase;
            f.countdown = countdown;
            f.stability_progress = progress;
        });
    }

    /// Snapshot a frame, mirror it, bake in the guide and encode.
    fn capture(&mut self, quality: u8) -> Outcome {
        let frame = match self.frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => self.last_frame.take().ok_or(SessionError::NoFrame)?,
            Err(e) => {
                tracing::warn!(error = %e, "fresh capture frame unavailable, using last analyzed frame");
                self.last_frame.take().ok_or(SessionError::NoFrame)?
            }
        };

        let style = GuideStyle::from_ready(self.pipeline.readiness().latest().all_passed());
        let overlay = self
            .last_face
            .map(|face| render_guide(frame.width, frame.height, &face, style));
        let image = compose_capture(&frame, overlay.as_ref(), quality)?;

        tracing::info!(
            width = image.width,
            height = image.height,
            bytes = image.jpeg.len(),
            "capture complete"
        );
        Ok(image)
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn elapsed(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
