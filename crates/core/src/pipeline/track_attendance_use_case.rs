use std::time::Instant;

use crate::attendance::attendance_session::AttendanceSession;
use crate::config::AttendanceConfig;
use crate::pipeline::identity_resolver::{IdentityResolver, Resolution};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::frame::Frame;
use crate::tracking::domain::face_detector::FaceDetector;
use crate::tracking::domain::track::TrackSnapshot;
use crate::tracking::infrastructure::iou_tracker::IouTracker;
use crate::video::domain::frame_source::FrameSource;

/// Called with every processed frame and the live tracks after it.
/// Returning `false` cancels the run.
pub type FrameCallback = Box<dyn FnMut(&Frame, &[TrackSnapshot]) -> bool + Send>;

/// Totals for one run of [`TrackAttendanceUseCase::execute`].
#[derive(Clone, Debug, Default)]
pub struct AttendanceRun {
    pub frames_seen: usize,
    pub frames_processed: usize,
    pub resolutions: Vec<Resolution>,
}

/// Runs a frame source through detection, tracking and identity resolution,
/// recording everyone recognised in the session.
///
/// Every `frame_skip + 1`th frame is processed, starting with the first.
/// The tracker sees every processed frame; embeddings are dispatched every
/// `resolve_every`th processed frame and collected on every one.
pub struct TrackAttendanceUseCase {
    source: Box<dyn FrameSource>,
    state: FrameLoop,
    on_frame: Option<FrameCallback>,
}

impl TrackAttendanceUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        resolver: IdentityResolver,
        config: &AttendanceConfig,
    ) -> Self {
        let tracker = IouTracker::new(
            config.tracker.iou_threshold,
            config.tracker.track_timeout(),
        );
        Self {
            source,
            state: FrameLoop {
                detector,
                tracker,
                resolver,
                session: AttendanceSession::new(),
                logger: Box::new(NullPipelineLogger),
                frame_stride: config.pipeline.frame_skip + 1,
                resolve_every: config.recognition.resolve_every.max(1),
                origin: Instant::now(),
                frames_seen: 0,
                frames_processed: 0,
            },
            on_frame: None,
        }
    }

    pub fn with_session(mut self, session: AttendanceSession) -> Self {
        self.state.session = session;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.state.logger = logger;
        self
    }

    pub fn with_on_frame(mut self, on_frame: FrameCallback) -> Self {
        self.on_frame = Some(on_frame);
        self
    }

    pub fn session(&self) -> &AttendanceSession {
        &self.state.session
    }

    pub fn into_session(self) -> AttendanceSession {
        self.state.session
    }

    pub fn tracker(&self) -> &IouTracker {
        &self.state.tracker
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.state.resolver
    }

    /// Processes every frame, then waits for embeddings still in flight.
    ///
    /// Only a failing source ends the run with an error. A frame the detector
    /// fails on is logged and tracked as having no faces.
    pub fn execute(&mut self) -> Result<AttendanceRun, Box<dyn std::error::Error>> {
        let total = self.source.len_hint();
        let mut resolutions = Vec::new();

        for frame in self.source.frames() {
            let frame = frame?;
            let Some(resolved) = self.state.process(&frame) else {
                continue;
            };
            resolutions.extend(resolved);
            self.state.logger.progress(self.state.frames_seen, total);

            if let Some(callback) = self.on_frame.as_mut() {
                if !callback(&frame, &self.state.tracker.snapshot()) {
                    return Err("Cancelled".into());
                }
            }
        }
        self.source.close();

        resolutions.extend(self.state.finish());
        self.state.logger.summary();

        Ok(AttendanceRun {
            frames_seen: self.state.frames_seen,
            frames_processed: self.state.frames_processed,
            resolutions,
        })
    }
}

struct FrameLoop {
    detector: Box<dyn FaceDetector>,
    tracker: IouTracker,
    resolver: IdentityResolver,
    session: AttendanceSession,
    logger: Box<dyn PipelineLogger>,
    frame_stride: usize,
    resolve_every: usize,
    origin: Instant,
    frames_seen: usize,
    frames_processed: usize,
}

impl FrameLoop {
    /// `None` when the frame is skipped.
    fn process(&mut self, frame: &Frame) -> Option<Vec<Resolution>> {
        let seen = self.frames_seen;
        self.frames_seen += 1;
        if seen % self.frame_stride != 0 {
            return None;
        }
        let now = self.origin + frame.timestamp();

        let t = Instant::now();
        let detections = match self.detector.detect(frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Detection failed on frame {}: {e}", frame.index());
                Vec::new()
            }
        };
        self.logger.timing("detect", elapsed_ms(t));

        let t = Instant::now();
        self.tracker.update(&detections, frame.size(), now);
        self.logger.timing("track", elapsed_ms(t));

        let t = Instant::now();
        if self.frames_processed % self.resolve_every == 0 {
            self.resolver.dispatch(&self.tracker, frame);
        }
        let resolutions = self.resolver.collect(&mut self.tracker, &mut self.session);
        self.logger.timing("resolve", elapsed_ms(t));

        self.frames_processed += 1;
        self.report(&resolutions);
        Some(resolutions)
    }

    fn finish(&mut self) -> Vec<Resolution> {
        let resolutions = self.resolver.finish(&mut self.tracker, &mut self.session);
        self.report(&resolutions);
        self.logger.info(&format!(
            "Processed {} of {} frames, {} present",
            self.frames_processed,
            self.frames_seen,
            self.session.len()
        ));
        resolutions
    }

    fn report(&mut self, resolutions: &[Resolution]) {
        for resolution in resolutions {
            self.logger.resolved(resolution);
        }
        self.logger.metric("tracks", self.tracker.len() as f64);
        self.logger.metric("pending", self.resolver.pending() as f64);
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
