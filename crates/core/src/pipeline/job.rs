//! One run on the worker thread: mode transitions, per-input sessions with
//! their own source and recorder, the still-image batch wrapper, and error
//! reporting.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use crate::pipeline::components::{InputSpec, PipelineComponents, PipelineStages, RunOptions};
use crate::pipeline::control_state::ControlState;
use crate::pipeline::error::{PipelineError, Stage};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::pipeline_loop::{run_pipeline, LoopExit, LoopSettings};
use crate::pipeline::session::{FrameClock, Session};
use crate::presentation::presenter::Presenter;
use crate::presentation::snapshot::{SessionEvent, UiMode};
use crate::recording::domain::recorder::{output_path, unclaimed_output_path, Recorder};
use crate::source::domain::frame_source::MediaInput;

/// Totals for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobSummary {
    /// Inputs whose loop ran (to the end or until stopped).
    pub inputs_processed: usize,
    /// Inputs skipped because their source failed to open.
    pub inputs_skipped: usize,
    pub frames: u64,
    pub stopped: bool,
}

/// Runs every input of `inputs`, bracketed by the processing and idle mode
/// transitions. The idle transition and the end-of-session event happen on
/// every exit path.
pub fn run_job(
    components: &dyn PipelineComponents,
    inputs: &InputSpec,
    options: &mut RunOptions,
    control: &ControlState,
    presenter: &Presenter,
) -> Result<JobSummary, PipelineError> {
    let presenter = presenter.with_budgets(options.frame_budget, options.mode_budget);
    presenter.set_mode(UiMode::Processing {
        pausable: !inputs.is_batch(),
    });

    let mut logger = components.logger();
    let result = run_inputs(components, inputs, options, control, &presenter, logger.as_mut());

    if let Err(e) = &result {
        log::error!("Run failed: {e}");
        presenter.notify(SessionEvent::SessionFailed {
            reason: e.to_string(),
        });
    }

    control.resume_for_exit();
    control.finish();
    presenter.post_mode(UiMode::Idle);
    presenter.notify(SessionEvent::SessionEnded);
    result
}

fn run_inputs(
    components: &dyn PipelineComponents,
    inputs: &InputSpec,
    options: &mut RunOptions,
    control: &ControlState,
    presenter: &Presenter,
    logger: &mut dyn PipelineLogger,
) -> Result<JobSummary, PipelineError> {
    let mut stages = PipelineStages::create(components)?;
    let mut runner = InputRunner {
        components,
        stages: &mut stages,
        control,
        presenter,
        logger,
        summary: JobSummary::default(),
        claimed_outputs: HashSet::new(),
    };

    match inputs {
        InputSpec::Videos(_) | InputSpec::Sequence(_) => {
            for input in inputs.inputs() {
                if !control.is_running() {
                    break;
                }
                runner.run_input(input, FrameClock::Stream, true, options)?;
            }
        }
        InputSpec::Images(_) => {
            let batch = BatchOverrides::apply(options);
            for input in inputs.inputs() {
                if !control.is_running() {
                    break;
                }
                runner.run_input(input, FrameClock::Still, false, &batch)?;
            }
        }
    }

    let mut summary = runner.summary;
    summary.stopped |= !control.is_running();
    Ok(summary)
}

struct InputRunner<'a> {
    components: &'a dyn PipelineComponents,
    stages: &'a mut PipelineStages,
    control: &'a ControlState,
    presenter: &'a Presenter,
    logger: &'a mut dyn PipelineLogger,
    summary: JobSummary,
    /// Recording paths already used in this run.
    claimed_outputs: HashSet<PathBuf>,
}

impl InputRunner<'_> {
    /// Reserves a recording path, renaming it when an earlier input of the
    /// run already wrote there.
    fn claim_output(&mut self, path: PathBuf) -> PathBuf {
        let claimed = unclaimed_output_path(path.clone(), &self.claimed_outputs);
        if claimed != path {
            log::warn!(
                "{} already recorded in this run; writing {} instead",
                path.display(),
                claimed.display()
            );
        }
        self.claimed_outputs.insert(claimed.clone());
        claimed
    }

    /// Opens, runs, and tears down one input. A source that fails to open is
    /// reported and skipped; the source is closed and the recorder finished
    /// exactly once whatever the loop's exit.
    fn run_input(
        &mut self,
        input: MediaInput,
        clock: FrameClock,
        playback_control: bool,
        options: &RunOptions,
    ) -> Result<(), PipelineError> {
        let mut source = match self.components.open_source(&input) {
            Ok(source) => source,
            Err(e) => {
                let err = PipelineError::SourceOpen {
                    input: input.path().to_path_buf(),
                    reason: e.to_string(),
                };
                log::warn!("{err}");
                self.presenter.notify(SessionEvent::SourceOpenFailed {
                    input: input.path().to_path_buf(),
                    reason: e.to_string(),
                });
                self.summary.inputs_skipped += 1;
                return Ok(());
            }
        };

        self.stages.reset();
        self.logger.begin_input(&input.path().display().to_string());
        self.presenter.notify(SessionEvent::InputStarted {
            input: input.path().to_path_buf(),
        });

        let out_path = options
            .record
            .then(|| self.claim_output(output_path(&input, options.output_dir.as_deref())));
        let opened = out_path
            .as_deref()
            .map(|path| open_recorder(self.components, path, options));
        let mut recorder = match opened {
            Some(Ok(recorder)) => Some(recorder),
            Some(Err(e)) => {
                source.close();
                return Err(e);
            }
            None => None,
        };

        let mut session = Session::new(
            input.clone(),
            options.intrinsics,
            out_path,
            source.fps(),
            clock,
        );
        let settings = LoopSettings {
            playback_control,
            visualize: options.visualize,
            visualization: options.visualization.clone(),
            detection: options.detection.clone(),
            poll_interval: options.poll_interval,
            publish_interval: options.publish_interval,
        };

        let active_recorder: Option<&mut dyn Recorder> = match recorder.as_mut() {
            Some(recorder) => Some(&mut **recorder),
            None => None,
        };
        let outcome = run_pipeline(
            source.as_mut(),
            self.stages,
            active_recorder,
            &mut session,
            self.control,
            self.presenter,
            &mut *self.logger,
            &settings,
        );

        source.close();
        let finished = match recorder.as_mut() {
            Some(recorder) => recorder
                .finish()
                .map_err(|e| PipelineError::stage(Stage::Recording, session.frames(), e)),
            None => Ok(()),
        };
        self.logger.summary();

        let outcome = outcome?;
        finished?;

        if outcome.exit == LoopExit::Stopped {
            self.summary.stopped = true;
        }
        self.summary.inputs_processed += 1;
        self.summary.frames += outcome.frames;
        log::info!(
            "Finished {} ({} frames, {:?})",
            input.path().display(),
            outcome.frames,
            outcome.exit
        );
        self.presenter.notify(SessionEvent::InputFinished {
            input: input.path().to_path_buf(),
            frames: outcome.frames,
        });
        Ok(())
    }
}

fn open_recorder(
    components: &dyn PipelineComponents,
    path: &std::path::Path,
    options: &RunOptions,
) -> Result<Box<dyn Recorder>, PipelineError> {
    let mut recorder = components
        .recorder()
        .map_err(|e| PipelineError::Setup(format!("recorder: {e}")))?;
    recorder
        .open(path, &options.recording)
        .map_err(|e| PipelineError::stage(Stage::Recording, 0, e))?;
    Ok(recorder)
}

/// Overrides applied for the duration of a still-image batch: per-frame
/// timestamps are not recorded and the descriptor is not visualized.
/// The previous values come back when the guard drops, on every exit path.
pub struct BatchOverrides<'a> {
    options: &'a mut RunOptions,
    timestamps: bool,
    descriptor: bool,
}

impl<'a> BatchOverrides<'a> {
    pub fn apply(options: &'a mut RunOptions) -> Self {
        let timestamps = std::mem::replace(&mut options.recording.timestamps, false);
        let descriptor = std::mem::replace(&mut options.visualization.descriptor, false);
        Self {
            options,
            timestamps,
            descriptor,
        }
    }
}

impl Deref for BatchOverrides<'_> {
    type Target = RunOptions;

    fn deref(&self) -> &RunOptions {
        self.options
    }
}

impl DerefMut for BatchOverrides<'_> {
    fn deref_mut(&mut self) -> &mut RunOptions {
        self.options
    }
}

impl Drop for BatchOverrides<'_> {
    fn drop(&mut self) {
        self.options.recording.timestamps = self.timestamps;
        self.options.visualization.descriptor = self.descriptor;
    }
}
