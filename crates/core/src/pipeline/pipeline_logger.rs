use std::collections::BTreeMap;
use std::time::Instant;

/// Stage names used for per-frame timings.
pub mod stage {
    pub const READ: &str = "read";
    pub const DETECT: &str = "detect";
    pub const ANALYZE: &str = "analyze";
    pub const GAZE: &str = "gaze";
    pub const RECORD: &str = "record";
}

/// Cross-cutting logger for pipeline orchestration events.
///
/// Lets each front end observe the worker without changing the loop.
pub trait PipelineLogger: Send {
    /// A new input is about to be processed.
    fn begin_input(&mut self, _name: &str) {}

    /// Frame-level progress; `total` is `None` when the source length is
    /// unknown.
    fn progress(&mut self, current: u64, total: Option<u64>);

    /// How long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A point-in-time metric (e.g. faces per frame).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-input summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event. Used by the desktop app and tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: u64, _total: Option<u64>) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger: throttled progress through `log::info!` and a per-stage
/// timing summary with throughput at the end of each input.
pub struct StdoutPipelineLogger {
    throttle_frames: u64,
    input: Option<String>,
    timings: BTreeMap<String, Vec<f64>>,
    metrics: BTreeMap<String, Vec<f64>>,
    start_time: Instant,
    frames: u64,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            input: None,
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Formatted summary for the current input, or `None` if nothing was
    /// recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let name = self.input.as_deref().unwrap_or("input");
        let mut lines = vec![format!(
            "Summary for {name} ({} frames, {:.1}s):",
            self.frames,
            elapsed_ms / 1000.0
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:8}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }
        for (name, values) in &self.metrics {
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            lines.push(format!("  {name}: avg {avg:.2}"));
        }
        if self.frames > 0 && elapsed_ms > 0.0 {
            let fps = self.frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }
        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(Vec::as_slice)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(Vec::as_slice)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn begin_input(&mut self, name: &str) {
        self.input = Some(name.to_string());
        self.timings.clear();
        self.metrics.clear();
        self.start_time = Instant::now();
        self.frames = 0;
    }

    fn progress(&mut self, current: u64, total: Option<u64>) {
        self.frames = current;
        let last = total == Some(current);
        if current % self.throttle_frames != 0 && !last {
            return;
        }
        match total.filter(|t| *t > 0) {
            Some(total) => {
                let pct = current as f64 / total as f64 * 100.0;
                log::info!("Processing: {current}/{total} frames ({pct:.1}%)");
            }
            None => log::info!("Processing: {current} frames"),
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
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
