use std::collections::HashMap;
use std::time::Instant;

use crate::pipeline::identity_resolver::{Resolution, ResolutionKind};

/// Cross-cutting logger for attendance pipeline events.
///
/// Keeps the use case free of any particular output mechanism; the CLI
/// reports to the `log` facade, tests discard everything.
pub trait PipelineLogger: Send {
    /// Frames seen so far; `total` is `None` for live sources.
    fn progress(&mut self, current: usize, total: Option<usize>);

    /// How long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A point-in-time metric such as live track count.
    fn metric(&mut self, name: &str, value: f64);

    /// A track was given an identity.
    fn resolved(&mut self, resolution: &Resolution);

    fn info(&mut self, message: &str);

    /// End-of-run summary. Default: no-op.
    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: Option<usize>) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn resolved(&mut self, _resolution: &Resolution) {}
    fn info(&mut self, _message: &str) {}
}

/// Logger for the CLI: per-stage timings, averaged metrics and a count of
/// identities resolved, summarised at the end of the run.
///
/// Progress is logged every `throttle_frames` frames.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames_seen: usize,
    matched: usize,
    enrolled: usize,
    attached: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
            matched: 0,
            enrolled: 0,
            attached: 0,
        }
    }

    pub fn resolved_count(&self) -> usize {
        self.matched + self.enrolled + self.attached
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() && self.resolved_count() == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames_seen;
        let mut lines = vec![format!(
            "Attendance summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            lines.push(format!(
                "  {stage:8}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let peak = values.iter().copied().fold(0.0, f64::max);
            lines.push(format!("  {name}: avg {:.1}, peak {peak:.0}", mean(values)));
        }

        lines.push(format!(
            "  Identities resolved: {} (matched {}, enrolled {}, attached {})",
            self.resolved_count(),
            self.matched,
            self.enrolled,
            self.attached
        ));

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(50)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: Option<usize>) {
        self.frames_seen = current;
        let due = current % self.throttle_frames == 0;
        match total {
            Some(total) if total > 0 && (due || current == total) => {
                let pct = current as f64 / total as f64 * 100.0;
                log::info!("Processing: {current}/{total} frames ({pct:.1}%)");
            }
            None if due => log::info!("Processing: {current} frames"),
            _ => {}
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn resolved(&mut self, resolution: &Resolution) {
        match resolution.kind {
            ResolutionKind::Matched => self.matched += 1,
            ResolutionKind::Enrolled => self.enrolled += 1,
            ResolutionKind::Attached => self.attached += 1,
        }
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn resolution(kind: ResolutionKind) -> Resolution {
        Resolution {
            track_id: 0,
            name: "Alice".into(),
            group: "A1".into(),
            kind,
        }
    }

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, None);
        logger.timing("detect", 5.0);
        logger.metric("tracks", 3.0);
        logger.resolved(&resolution(ResolutionKind::Matched));
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("resolve", 5.0);

        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.len(), 2);
        assert_relative_eq!(mean(detect), 25.0);
        assert_eq!(logger.timings_for("resolve").unwrap().len(), 1);
        assert!(logger.timings_for("track").is_none());
    }

    #[test]
    fn test_summary_includes_stages_metrics_and_peak() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.progress(10, Some(10));
        logger.timing("detect", 20.0);
        logger.timing("track", 1.0);
        logger.metric("tracks", 2.0);
        logger.metric("tracks", 5.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Attendance summary (10 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("track"));
        assert!(summary.contains("tracks: avg 3.5, peak 5"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_summary_counts_resolutions_by_kind() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.resolved(&resolution(ResolutionKind::Matched));
        logger.resolved(&resolution(ResolutionKind::Matched));
        logger.resolved(&resolution(ResolutionKind::Enrolled));

        assert_eq!(logger.resolved_count(), 3);
        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Identities resolved: 3 (matched 2, enrolled 1, attached 0)"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = StdoutPipelineLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_frames_for_live_source() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 1..=25 {
            logger.progress(i, None);
        }
        assert_eq!(logger.frames_seen, 25);
    }

    #[test]
    fn test_default_throttle() {
        assert_eq!(StdoutPipelineLogger::default().throttle_frames, 50);
    }
}
