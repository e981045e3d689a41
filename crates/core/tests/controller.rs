mod common;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use facetrace_core::pipeline::components::RunOptions;
use facetrace_core::pipeline::control_state::PlaybackState;
use facetrace_core::pipeline::controller::PipelineController;
use facetrace_core::presentation::presenter::{presentation_channel, PresentationReceiver};
use facetrace_core::presentation::snapshot::{SessionEvent, UiMode};

use common::{drain_events, drain_modes, fast_options, wait_until, StubComponents};

/// Stands in for the UI thread: acknowledges modes and keeps the last
/// events and snapshot indices it saw.
struct FakeUi {
    done: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<(Vec<UiMode>, Vec<SessionEvent>, Vec<u64>)>>,
}

impl FakeUi {
    fn spawn(mut receiver: PresentationReceiver) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        let handle = thread::spawn(move || {
            let mut modes = Vec::new();
            let mut events = Vec::new();
            let mut frames = Vec::new();
            while !flag.load(Ordering::Acquire) {
                while let Some(request) = receiver.try_mode() {
                    modes.push(request.mode);
                    request.acknowledge();
                }
                while let Some(event) = receiver.try_event() {
                    events.push(event);
                }
                if let Some(snapshot) = receiver.take_snapshot() {
                    frames.push(snapshot.frame_index);
                }
                thread::sleep(Duration::from_millis(1));
            }
            while let Some(event) = receiver.try_event() {
                events.push(event);
            }
            (modes, events, frames)
        });
        Self {
            done,
            handle: Some(handle),
        }
    }

    fn finish(mut self) -> (Vec<UiMode>, Vec<SessionEvent>, Vec<u64>) {
        self.done.store(true, Ordering::Release);
        self.handle.take().unwrap().join().unwrap()
    }
}

fn slow_components() -> StubComponents {
    StubComponents::new(100_000, 25.0).with_frame_delay(Duration::from_millis(1))
}

#[test]
fn test_stop_exits_promptly_with_single_teardown() {
    let components = slow_components();
    let (presenter, receiver) = presentation_channel();
    let ui = FakeUi::spawn(receiver);
    let mut controller = PipelineController::new(Arc::new(components.clone()), presenter);

    controller
        .start_videos(vec![PathBuf::from("/v/a.mp4")], fast_options())
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || components.recorded_count() >= 5));
    assert_eq!(controller.playback_state(), PlaybackState::Running);

    let stopped_at = Instant::now();
    assert!(controller.stop());
    let summary = controller.join().unwrap().unwrap();
    assert!(stopped_at.elapsed() < Duration::from_millis(500));
    assert!(summary.stopped);
    assert!(!controller.is_active());

    let probe = components.probe();
    assert_eq!(probe.closed.len(), 1);
    assert_eq!(probe.finished.len(), 1);
    assert_eq!(probe.recorded.len() as u64, summary.frames);
    drop(probe);

    let (modes, events, frames) = ui.finish();
    assert_eq!(
        modes,
        vec![UiMode::Processing { pausable: true }, UiMode::Idle]
    );
    assert_eq!(events.last(), Some(&SessionEvent::SessionEnded));
    assert!(frames.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_stop_and_join_on_ui_thread_is_not_held_by_idle_transition() {
    let components = slow_components();
    let (presenter, receiver) = presentation_channel();
    let mut controller = PipelineController::new(Arc::new(components.clone()), presenter);
    let options = RunOptions {
        mode_budget: RunOptions::default().mode_budget,
        ..fast_options()
    };

    controller
        .start_videos(vec![PathBuf::from("/v/a.mp4")], options)
        .unwrap();
    let request = receiver
        .mode_requests()
        .recv_timeout(Duration::from_secs(2))
        .unwrap();
    assert_eq!(request.mode, UiMode::Processing { pausable: true });
    receiver.accept_mode(request).acknowledge();
    assert!(wait_until(Duration::from_secs(2), || components.recorded_count() >= 2));

    // This thread owns the receiver and cannot acknowledge while joining.
    let stopped_at = Instant::now();
    let summary = controller.stop_and_join().unwrap().unwrap();
    assert!(stopped_at.elapsed() < Duration::from_millis(500));
    assert!(summary.stopped);

    assert_eq!(drain_modes(&receiver), vec![UiMode::Idle]);
    assert_eq!(
        drain_events(&receiver).last(),
        Some(&SessionEvent::SessionEnded)
    );
}

#[test]
fn test_pause_holds_frames_and_step_advances() {
    let components = slow_components();
    let (presenter, receiver) = presentation_channel();
    let ui = FakeUi::spawn(receiver);
    let mut controller = PipelineController::new(Arc::new(components.clone()), presenter);

    controller
        .start_videos(vec![PathBuf::from("/v/a.mp4")], fast_options())
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || components.recorded_count() >= 2));

    assert_eq!(controller.toggle_pause(), Some(true));
    thread::sleep(Duration::from_millis(30));
    let held = components.recorded_count();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(components.recorded_count(), held);
    assert_eq!(controller.playback_state(), PlaybackState::Paused);

    assert!(controller.step(3));
    assert!(wait_until(Duration::from_secs(2), || components.recorded_count() == held + 3));
    thread::sleep(Duration::from_millis(30));
    assert_eq!(components.recorded_count(), held + 3);

    assert_eq!(controller.toggle_pause(), Some(false));
    assert!(!controller.step(1));
    assert!(wait_until(Duration::from_secs(2), || components.recorded_count() > held + 3));

    controller.stop_and_join().unwrap().unwrap();
    ui.finish();
}

#[test]
fn test_stop_while_paused_exits() {
    let components = slow_components();
    let (presenter, receiver) = presentation_channel();
    let ui = FakeUi::spawn(receiver);
    let mut controller = PipelineController::new(Arc::new(components.clone()), presenter);

    controller
        .start_videos(vec![PathBuf::from("/v/a.mp4")], fast_options())
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || components.recorded_count() >= 1));
    controller.toggle_pause();

    let summary = controller.stop_and_join().unwrap().unwrap();
    assert!(summary.stopped);
    assert_eq!(components.probe().finished.len(), 1);
    ui.finish();
}

#[test]
fn test_restart_joins_previous_run_first() {
    let components = slow_components();
    let (presenter, receiver) = presentation_channel();
    let ui = FakeUi::spawn(receiver);
    let mut controller = PipelineController::new(Arc::new(components.clone()), presenter);

    controller
        .start_videos(vec![PathBuf::from("/v/first.mp4")], fast_options())
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || components.recorded_count() >= 1));

    controller
        .start_videos(vec![PathBuf::from("/v/second.mp4")], fast_options())
        .unwrap();
    {
        let probe = components.probe();
        assert_eq!(probe.closed, vec![PathBuf::from("/v/first.mp4")]);
        assert_eq!(probe.finished, vec![PathBuf::from("/out/first.jsonl")]);
    }

    assert!(wait_until(Duration::from_secs(2), || components
        .probe()
        .recorded
        .iter()
        .any(|r| r.output.ends_with("second.jsonl"))));
    controller.stop_and_join().unwrap().unwrap();

    let probe = components.probe();
    let second: Vec<u64> = probe
        .recorded
        .iter()
        .filter(|r| r.output.ends_with("second.jsonl"))
        .map(|r| r.index)
        .collect();
    assert_eq!(second[0], 1);
    assert!(second.windows(2).all(|w| w[1] == w[0] + 1));
    drop(probe);
    ui.finish();
}

#[test]
fn test_controls_without_run_are_noops() {
    let (presenter, _receiver) = presentation_channel();
    let mut controller = PipelineController::new(Arc::new(StubComponents::new(1, 25.0)), presenter);

    assert_eq!(controller.toggle_pause(), None);
    assert!(!controller.step(1));
    assert!(!controller.stop());
    assert!(controller.join().is_none());
    assert_eq!(controller.playback_state(), PlaybackState::Stopped);
}

#[test]
fn test_finished_run_reports_stopped_state() {
    let components = StubComponents::new(3, 25.0);
    let (presenter, receiver) = presentation_channel();
    let ui = FakeUi::spawn(receiver);
    let mut controller = PipelineController::new(Arc::new(components.clone()), presenter);

    controller
        .start_images(vec![PathBuf::from("/img/a.png")], fast_options())
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || !controller.is_active()));
    assert_eq!(controller.playback_state(), PlaybackState::Stopped);

    let summary = controller.join().unwrap().unwrap();
    assert_eq!(summary.frames, 3);
    assert!(!summary.stopped);
    let (modes, _, _) = ui.finish();
    assert_eq!(modes[0], UiMode::Processing { pausable: false });
}
