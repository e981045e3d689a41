use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{select, Receiver};

use facetrace_core::detection::domain::landmark_detector::DetectionParams;
use facetrace_core::pipeline::components::{InputSpec, RunOptions};
use facetrace_core::pipeline::control_state::PlaybackState;
use facetrace_core::pipeline::controller::PipelineController;
use facetrace_core::pipeline::infrastructure::default_components::DefaultComponents;
use facetrace_core::presentation::presenter::presentation_channel;
use facetrace_core::presentation::snapshot::{Control, ControlSet, FrameSnapshot, SessionEvent, UiMode};
use facetrace_core::recording::domain::recorder::RecordingFlags;
use facetrace_core::shared::camera_intrinsics::IntrinsicsSetting;
use facetrace_core::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};
use facetrace_core::shared::model_resolver;
use facetrace_core::source::infrastructure::image_file_source::list_images;

/// Facial landmark, head pose and gaze analysis for videos and images.
///
/// While running, type `p` to pause or resume, `s [n]` to step n frames
/// while paused, and `q` to stop.
#[derive(Parser)]
#[command(name = "facetrace", version)]
struct Cli {
    #[command(subcommand)]
    input: InputCommand,
}

#[derive(Subcommand)]
enum InputCommand {
    /// Process video files one after another.
    Video {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Process still images as an independent batch.
    Images {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Process a directory of images as one continuous stream.
    Sequence {
        dir: PathBuf,
        #[command(flatten)]
        options: OptionArgs,
    },
}

#[derive(Args)]
struct OptionArgs {
    /// Directory for recordings (default: next to each input).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.25")]
    confidence: f64,

    /// Maximum number of faces per frame.
    #[arg(long, default_value = "1")]
    max_faces: usize,

    /// Focal length x in pixels. Intrinsics are estimated from the frame
    /// size unless all of --fx, --fy, --cx, --cy are given.
    #[arg(long)]
    fx: Option<f64>,
    #[arg(long)]
    fy: Option<f64>,
    #[arg(long)]
    cx: Option<f64>,
    #[arg(long)]
    cy: Option<f64>,

    /// Do not write recordings.
    #[arg(long)]
    no_record: bool,
    #[arg(long)]
    no_pose: bool,
    #[arg(long)]
    no_landmarks: bool,
    #[arg(long)]
    no_action_units: bool,
    #[arg(long)]
    no_gaze: bool,
    #[arg(long)]
    no_timestamps: bool,
    /// Write each frame's aligned face crop next to the recording.
    #[arg(long)]
    aligned_faces: bool,

    /// Do not publish per-frame readouts.
    #[arg(long)]
    no_visualize: bool,

    /// Log progress and a per-stage timing summary every N frames.
    #[arg(long)]
    timing: Option<u64>,

    /// Landmark model file (default: cached download).
    #[arg(long)]
    model: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    TogglePause,
    Step(usize),
    Stop,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (inputs, args) = match cli.input {
        InputCommand::Video { paths, options } => (InputSpec::Videos(paths), options),
        InputCommand::Images { paths, options } => (InputSpec::Images(paths), options),
        InputCommand::Sequence { dir, options } => (InputSpec::Sequence(dir), options),
    };
    validate(&inputs, &args)?;

    let model_path = match &args.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {YOLO_MODEL_NAME}");
            let path = model_resolver::resolve(
                YOLO_MODEL_NAME,
                YOLO_MODEL_URL,
                None,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };

    let mut components = DefaultComponents::new(&model_path);
    if let Some(every) = args.timing {
        components = components.with_stdout_logger(every);
    }

    let (presenter, mut receiver) = presentation_channel();
    let mut controller = PipelineController::new(Arc::new(components), presenter);
    controller.start(inputs, build_options(&args))?;

    let ready = receiver.snapshot_ready().clone();
    let modes = receiver.mode_requests().clone();
    let events = receiver.events().clone();
    let ticker = crossbeam_channel::tick(Duration::from_millis(250));
    let mut commands = spawn_command_reader();
    let mut mode = UiMode::Idle;
    let mut readouts = ReadoutLog::new(Duration::from_secs(1));

    loop {
        let mut commands_closed = false;
        let mut ended = false;
        select! {
            recv(commands) -> msg => match msg {
                Ok(command) => apply_command(&controller, mode, command),
                Err(_) => commands_closed = true,
            },
            recv(modes) -> msg => {
                if let Ok(request) = msg {
                    let request = receiver.accept_mode(request);
                    mode = request.mode;
                    log::debug!("Mode: {mode:?}");
                    request.acknowledge();
                }
            },
            recv(events) -> msg => match msg {
                Ok(SessionEvent::SessionEnded) | Err(_) => ended = true,
                Ok(event) => log_event(&event),
            },
            recv(ready) -> _ => {
                if let Some(snapshot) = receiver.take_snapshot() {
                    readouts.offer(&snapshot);
                }
            },
            recv(ticker) -> _ => {
                if let Some(snapshot) = receiver.take_snapshot() {
                    readouts.offer(&snapshot);
                }
            },
        }
        if commands_closed {
            commands = crossbeam_channel::never();
        }
        if ended {
            break;
        }
    }

    match controller.join() {
        Some(Ok(summary)) => {
            log::info!(
                "Done: {} input(s), {} skipped, {} frames{}",
                summary.inputs_processed,
                summary.inputs_skipped,
                summary.frames,
                if summary.stopped { " (stopped)" } else { "" }
            );
            Ok(())
        }
        Some(Err(e)) => Err(e.into()),
        None => Ok(()),
    }
}

fn build_options(args: &OptionArgs) -> RunOptions {
    RunOptions {
        output_dir: args.output_dir.clone(),
        record: !args.no_record,
        recording: RecordingFlags {
            pose: !args.no_pose,
            landmarks: !args.no_landmarks,
            action_units: !args.no_action_units,
            gaze: !args.no_gaze,
            aligned_faces: args.aligned_faces,
            timestamps: !args.no_timestamps,
        },
        visualize: !args.no_visualize,
        intrinsics: IntrinsicsSetting::from_parts(args.fx, args.fy, args.cx, args.cy),
        detection: DetectionParams {
            confidence: args.confidence,
            max_faces: args.max_faces,
        },
        ..RunOptions::default()
    }
}

fn validate(inputs: &InputSpec, args: &OptionArgs) -> Result<(), Box<dyn std::error::Error>> {
    match inputs {
        InputSpec::Videos(paths) | InputSpec::Images(paths) => {
            if let Some(missing) = paths.iter().find(|p| !p.exists()) {
                return Err(format!("Input file not found: {}", missing.display()).into());
            }
        }
        InputSpec::Sequence(dir) => {
            if !dir.is_dir() {
                return Err(format!("Sequence directory not found: {}", dir.display()).into());
            }
            if list_images(dir)?.is_empty() {
                return Err(format!("No images in {}", dir.display()).into());
            }
        }
    }
    if !(0.0..=1.0).contains(&args.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            args.confidence
        )
        .into());
    }
    if args.max_faces == 0 {
        return Err("--max-faces must be at least 1".into());
    }
    let given = [args.fx, args.fy, args.cx, args.cy]
        .iter()
        .filter(|v| v.is_some())
        .count();
    if given != 0 && given != 4 {
        return Err("--fx, --fy, --cx and --cy must be given together".into());
    }
    if args.fx.is_some_and(|f| f <= 0.0) || args.fy.is_some_and(|f| f <= 0.0) {
        return Err("Focal lengths must be positive".into());
    }
    if let Some(model) = &args.model {
        if !model.is_file() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    Ok(())
}

/// Parses one line of interactive input.
fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "p" | "pause" => Some(Command::TogglePause),
        "s" | "step" => {
            let n = match parts.next() {
                Some(n) => n.parse().ok().filter(|n| *n > 0)?,
                None => 1,
            };
            Some(Command::Step(n))
        }
        "q" | "quit" | "stop" => Some(Command::Stop),
        _ => None,
    }
}

fn spawn_command_reader() -> Receiver<Command> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!("Commands: p (pause/resume), s [n] (step), q (stop)"),
            }
        }
    });
    rx
}

fn apply_command(controller: &PipelineController, mode: UiMode, command: Command) {
    let paused = controller.playback_state() == PlaybackState::Paused;
    let enabled = ControlSet::for_mode(mode, paused);
    match command {
        Command::TogglePause if enabled.is_enabled(Control::Pause) => {
            if let Some(paused) = controller.toggle_pause() {
                log::info!("{}", if paused { "Paused" } else { "Resumed" });
            }
        }
        Command::Step(n) if enabled.is_enabled(Control::Step) => {
            if controller.step(n) {
                log::info!("Stepping {n} frame(s)");
            }
        }
        Command::Stop if enabled.is_enabled(Control::Stop) => {
            if controller.stop() {
                log::info!("Stopping");
            }
        }
        other => log::warn!("{other:?} is not available right now"),
    }
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::InputStarted { input } => log::info!("Processing {}", input.display()),
        SessionEvent::InputFinished { input, frames } => {
            log::info!("Finished {} ({frames} frames)", input.display())
        }
        SessionEvent::SourceOpenFailed { input, reason } => {
            log::warn!("Skipping {}: {reason}", input.display())
        }
        SessionEvent::SessionFailed { reason } => log::error!("Run failed: {reason}"),
        SessionEvent::SessionEnded => {}
    }
}

/// Prints at most one readout line per interval.
struct ReadoutLog {
    interval: Duration,
    last: Option<Instant>,
}

impl ReadoutLog {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    fn offer(&mut self, snapshot: &FrameSnapshot) {
        let now = Instant::now();
        if self.last.is_some_and(|last| now.duration_since(last) < self.interval) {
            return;
        }
        self.last = Some(now);
        log::info!("{}", format_readouts(snapshot));
    }
}

fn format_readouts(snapshot: &FrameSnapshot) -> String {
    let r = &snapshot.readouts;
    let mut line = format!(
        "frame {} t={:.2}s {:.1} fps",
        snapshot.frame_index, r.timestamp, r.fps
    );
    if !r.success {
        line.push_str(" | no face");
    } else {
        line.push_str(&format!(" | conf {:.2}", r.confidence));
    }
    if let Some(pose) = r.pose {
        line.push_str(&format!(
            " | pose p={:.1} y={:.1} r={:.1} deg",
            pose.pitch.to_degrees(),
            pose.yaw.to_degrees(),
            pose.roll.to_degrees()
        ));
    }
    if let Some(gaze) = r.gaze {
        line.push_str(&format!(" | gaze {:.2},{:.2}", gaze.x, gaze.y));
    }
    if let Some(progress) = r.progress {
        line.push_str(&format!(" | {:.1}%", progress * 100.0));
    }
    line
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading landmark model... {pct}%");
    } else {
        eprint!("\rDownloading landmark model... {downloaded} bytes");
    }
}
