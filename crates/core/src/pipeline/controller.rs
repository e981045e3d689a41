//! UI-thread facade over the worker: start, pause, step, stop.
//!
//! At most one run is active per controller. Starting a new run stops and
//! joins the previous worker first, so two workers never share the
//! presenter.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::pipeline::components::{InputSpec, PipelineComponents, RunOptions};
use crate::pipeline::control_state::{ControlState, PlaybackState};
use crate::pipeline::error::PipelineError;
use crate::pipeline::job::{run_job, JobSummary};
use crate::presentation::presenter::Presenter;

type RunHandle = JoinHandle<Result<JobSummary, PipelineError>>;

struct ActiveRun {
    control: Arc<ControlState>,
    handle: RunHandle,
}

pub struct PipelineController {
    components: Arc<dyn PipelineComponents>,
    presenter: Presenter,
    active: Option<ActiveRun>,
}

impl PipelineController {
    pub fn new(components: Arc<dyn PipelineComponents>, presenter: Presenter) -> Self {
        Self {
            components,
            presenter,
            active: None,
        }
    }

    /// Starts a run on a fresh worker thread. Any previous run is stopped
    /// and joined first.
    pub fn start(&mut self, inputs: InputSpec, options: RunOptions) -> Result<(), PipelineError> {
        if let Some(Err(e)) = self.stop_and_join() {
            log::warn!("Previous run ended with error: {e}");
        }

        let control = Arc::new(ControlState::new());
        let worker_control = Arc::clone(&control);
        let components = Arc::clone(&self.components);
        let presenter = self.presenter.clone();

        log::info!("Starting run over {} input(s)", inputs.inputs().len());
        let handle = thread::Builder::new()
            .name("facetrace-worker".into())
            .spawn(move || {
                let mut options = options;
                run_job(
                    components.as_ref(),
                    &inputs,
                    &mut options,
                    &worker_control,
                    &presenter,
                )
            })
            .map_err(|e| PipelineError::Setup(format!("failed to spawn worker: {e}")))?;

        self.active = Some(ActiveRun { control, handle });
        Ok(())
    }

    pub fn start_videos(&mut self, paths: Vec<PathBuf>, options: RunOptions) -> Result<(), PipelineError> {
        self.start(InputSpec::Videos(paths), options)
    }

    pub fn start_images(&mut self, paths: Vec<PathBuf>, options: RunOptions) -> Result<(), PipelineError> {
        self.start(InputSpec::Images(paths), options)
    }

    pub fn start_sequence(&mut self, dir: PathBuf, options: RunOptions) -> Result<(), PipelineError> {
        self.start(InputSpec::Sequence(dir), options)
    }

    /// Flips pause. Returns the new paused value, or `None` when no run is
    /// active.
    pub fn toggle_pause(&self) -> Option<bool> {
        let run = self.active.as_ref()?;
        let paused = run.control.toggle_pause();
        log::debug!("Paused: {paused}");
        Some(paused)
    }

    /// Requests `n` single-frame advances. Ignored unless a run is active
    /// and paused.
    pub fn step(&self, n: usize) -> bool {
        self.active
            .as_ref()
            .is_some_and(|run| run.control.request_steps(n))
    }

    /// Asks the active worker to stop. Returns immediately; the worker exits
    /// within one iteration.
    pub fn stop(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|run| run.control.request_stop())
    }

    /// Waits for the active worker. `None` when nothing was started.
    pub fn join(&mut self) -> Option<Result<JobSummary, PipelineError>> {
        let run = self.active.take()?;
        Some(
            run.handle
                .join()
                .unwrap_or(Err(PipelineError::WorkerPanicked)),
        )
    }

    pub fn stop_and_join(&mut self) -> Option<Result<JobSummary, PipelineError>> {
        self.stop();
        self.join()
    }

    /// Whether a worker is still executing.
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.active
            .as_ref()
            .map_or(PlaybackState::Stopped, |run| run.control.state())
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        if let Some(Err(e)) = self.stop_and_join() {
            log::warn!("Run ended with error: {e}");
        }
    }
}
