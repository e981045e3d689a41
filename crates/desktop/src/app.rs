use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use iced::widget::{button, checkbox, column, container, image, pick_list, row, scrollable, text, Space};
use iced::{Element, Length, Subscription, Task, Theme};

use facetrace_core::pipeline::components::InputSpec;
use facetrace_core::pipeline::control_state::PlaybackState;
use facetrace_core::pipeline::controller::PipelineController;
use facetrace_core::pipeline::infrastructure::default_components::DefaultComponents;
use facetrace_core::presentation::layout::Panel;
use facetrace_core::presentation::presenter::{presentation_channel, PresentationReceiver, Presenter};
use facetrace_core::presentation::snapshot::{Control, ControlSet, Readouts, SessionEvent, UiMode};
use facetrace_core::shared::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

use crate::model_cache::{ModelCache, ModelStatus};
use crate::render;
use crate::settings::{Appearance, Settings};

const TICK_INTERVAL: Duration = Duration::from_millis(16);
const MAX_LOG_LINES: usize = 6;

#[derive(Debug, Clone)]
pub enum Message {
    OpenVideos,
    VideosPicked(Option<Vec<PathBuf>>),
    OpenImages,
    ImagesPicked(Option<Vec<PathBuf>>),
    OpenSequence,
    SequencePicked(Option<PathBuf>),
    SelectOutputDir,
    OutputDirPicked(Option<PathBuf>),
    TogglePause,
    Step(usize),
    Stop,
    PanelToggled(Panel, bool),
    RecordToggled(bool),
    OpenOutputFolder,
    AppearanceChanged(Appearance),
    Tick,
}

/// What the panels currently show. Replaced wholesale per snapshot and
/// reset to empty when the run ends.
#[derive(Default)]
struct View {
    frame_index: u64,
    video: Option<image::Handle>,
    aligned_face: Option<image::Handle>,
    descriptor: Option<image::Handle>,
    readouts: Option<Readouts>,
}

pub struct App {
    settings: Settings,
    model: ModelCache,
    presenter: Presenter,
    receiver: PresentationReceiver,
    controller: Option<PipelineController>,
    mode: UiMode,
    paused: bool,
    view: View,
    last_inputs: Vec<PathBuf>,
    log: Vec<String>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let (presenter, receiver) = presentation_channel();
        (
            Self {
                settings: Settings::load(),
                model: ModelCache::new(),
                presenter,
                receiver,
                controller: None,
                mode: UiMode::Idle,
                paused: false,
                view: View::default(),
                last_inputs: Vec::new(),
                log: Vec::new(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenVideos => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .set_title("Select videos")
                            .add_filter("Videos", VIDEO_EXTENSIONS)
                            .pick_files()
                            .await
                            .map(|files| files.iter().map(|h| h.path().to_path_buf()).collect())
                    },
                    Message::VideosPicked,
                );
            }
            Message::VideosPicked(Some(paths)) if !paths.is_empty() => {
                self.start(InputSpec::Videos(paths));
            }
            Message::OpenImages => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .set_title("Select images")
                            .add_filter("Images", IMAGE_EXTENSIONS)
                            .pick_files()
                            .await
                            .map(|files| files.iter().map(|h| h.path().to_path_buf()).collect())
                    },
                    Message::ImagesPicked,
                );
            }
            Message::ImagesPicked(Some(paths)) if !paths.is_empty() => {
                self.start(InputSpec::Images(paths));
            }
            Message::OpenSequence => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .set_title("Select image sequence folder")
                            .pick_folder()
                            .await
                            .map(|h| h.path().to_path_buf())
                    },
                    Message::SequencePicked,
                );
            }
            Message::SequencePicked(Some(dir)) => {
                self.start(InputSpec::Sequence(dir));
            }
            Message::VideosPicked(_) | Message::ImagesPicked(_) | Message::SequencePicked(None) => {}
            Message::SelectOutputDir => {
                let start_dir = self.settings.output_dir.clone();
                return Task::perform(
                    async move {
                        let mut dialog = rfd::AsyncFileDialog::new().set_title("Recording folder");
                        if let Some(dir) = start_dir {
                            dialog = dialog.set_directory(dir);
                        }
                        dialog.pick_folder().await.map(|h| h.path().to_path_buf())
                    },
                    Message::OutputDirPicked,
                );
            }
            Message::OutputDirPicked(Some(dir)) => {
                self.settings.output_dir = Some(dir);
                self.settings.save();
            }
            Message::OutputDirPicked(None) => {}
            Message::TogglePause => {
                if let Some(paused) = self.controller.as_ref().and_then(PipelineController::toggle_pause) {
                    self.paused = paused;
                }
            }
            Message::Step(n) => {
                if let Some(controller) = &self.controller {
                    controller.step(n);
                }
            }
            Message::Stop => {
                if let Some(controller) = &self.controller {
                    controller.stop();
                }
            }
            Message::PanelToggled(panel, visible) => {
                let refresh = self.settings.layout.set_visible(panel, visible);
                if refresh.changed {
                    self.settings.save();
                }
            }
            Message::RecordToggled(record) => {
                self.settings.record = record;
                self.settings.save();
            }
            Message::OpenOutputFolder => {
                if let Some(dir) = self.output_folder() {
                    if let Err(e) = open::that(&dir) {
                        log::warn!("Failed to open {}: {e}", dir.display());
                    }
                }
            }
            Message::AppearanceChanged(appearance) => {
                self.settings.appearance = appearance;
                self.settings.save();
            }
            Message::Tick => self.drain_presentation(),
        }
        Task::none()
    }

    fn start(&mut self, inputs: InputSpec) {
        let Some(model_path) = self.model.ready_path() else {
            self.push_log("Landmark model is not ready yet".into());
            return;
        };
        let presenter = self.presenter.clone();
        let controller = self.controller.get_or_insert_with(|| {
            PipelineController::new(Arc::new(DefaultComponents::new(&model_path)), presenter)
        });

        self.last_inputs = inputs.inputs().iter().map(|i| i.path().to_path_buf()).collect();
        self.paused = false;
        if let Err(e) = controller.start(inputs, self.settings.run_options()) {
            log::error!("Failed to start: {e}");
            self.push_log(format!("Failed to start: {e}"));
        }
    }

    /// Runs on every tick: applies mode requests, session events, and the
    /// latest snapshot, all on the UI thread.
    fn drain_presentation(&mut self) {
        while let Some(request) = self.receiver.try_mode() {
            self.mode = request.mode;
            if self.mode == UiMode::Idle {
                self.view = View::default();
                self.paused = false;
            }
            request.acknowledge();
        }
        while let Some(event) = self.receiver.try_event() {
            self.on_event(event);
        }
        if let Some(snapshot) = self.receiver.take_snapshot() {
            self.view = View {
                frame_index: snapshot.frame_index,
                video: snapshot
                    .image
                    .as_ref()
                    .map(|frame| render::frame_handle(frame, &snapshot.faces)),
                aligned_face: snapshot.aligned_face.as_ref().map(render::plain_handle),
                descriptor: snapshot.descriptor.as_ref().map(render::plain_handle),
                readouts: Some(snapshot.readouts),
            };
        }
        if let Some(controller) = &self.controller {
            self.paused = controller.playback_state() == PlaybackState::Paused;
        }
    }

    fn on_event(&mut self, event: SessionEvent) {
        let line = match event {
            SessionEvent::InputStarted { input } => format!("Processing {}", input.display()),
            SessionEvent::InputFinished { input, frames } => {
                format!("Finished {} ({frames} frames)", input.display())
            }
            SessionEvent::SourceOpenFailed { input, reason } => {
                format!("Skipped {}: {reason}", input.display())
            }
            SessionEvent::SessionFailed { reason } => format!("Failed: {reason}"),
            SessionEvent::SessionEnded => "Done".to_string(),
        };
        self.push_log(line);
    }

    fn push_log(&mut self, line: String) {
        self.log.push(line);
        if self.log.len() > MAX_LOG_LINES {
            self.log.remove(0);
        }
    }

    fn output_folder(&self) -> Option<PathBuf> {
        self.settings.output_dir.clone().or_else(|| {
            self.last_inputs
                .first()
                .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        })
    }

    pub fn view(&self) -> Element<'_, Message> {
        let controls = ControlSet::for_mode(self.mode, self.paused);
        let model_ready = self.model.ready_path().is_some();
        let can_start = controls.is_enabled(Control::Start) && model_ready;
        let can_configure = controls.is_enabled(Control::Configure);

        let inputs = row![
            button(text("Open videos")).on_press_maybe(can_start.then_some(Message::OpenVideos)),
            button(text("Open images")).on_press_maybe(can_start.then_some(Message::OpenImages)),
            button(text("Open sequence")).on_press_maybe(can_start.then_some(Message::OpenSequence)),
        ]
        .spacing(8);

        let pause_label = if self.paused { "Resume" } else { "Pause" };
        let playback = row![
            button(text(pause_label))
                .on_press_maybe(controls.is_enabled(Control::Pause).then_some(Message::TogglePause)),
            button(text("Step 1"))
                .on_press_maybe(controls.is_enabled(Control::Step).then_some(Message::Step(1))),
            button(text("Step 5"))
                .on_press_maybe(controls.is_enabled(Control::Step).then_some(Message::Step(5))),
            button(text("Stop"))
                .style(button::danger)
                .on_press_maybe(controls.is_enabled(Control::Stop).then_some(Message::Stop)),
        ]
        .spacing(8);

        let config = row![
            checkbox(self.settings.record)
                .label("Record")
                .on_toggle_maybe(can_configure.then_some(Message::RecordToggled)),
            button(text("Recording folder"))
                .style(button::secondary)
                .on_press_maybe(can_configure.then_some(Message::SelectOutputDir)),
            button(text("Open output folder"))
                .style(button::secondary)
                .on_press_maybe(self.output_folder().map(|_| Message::OpenOutputFolder)),
            Space::new().width(Length::Fill),
            pick_list(Appearance::ALL, Some(self.settings.appearance), Message::AppearanceChanged),
        ]
        .spacing(8)
        .align_y(iced::Alignment::Center);

        let panels = row(Panel::ALL
            .iter()
            .map(|&panel| {
                checkbox(self.settings.layout.is_visible(panel))
                    .label(panel.label())
                    .on_toggle(move |visible| Message::PanelToggled(panel, visible))
                    .into()
            })
            .collect::<Vec<_>>())
        .spacing(16);

        column![
            row![inputs, Space::new().width(Length::Fill), playback],
            config,
            panels,
            self.panels_view(),
            self.status_view(),
        ]
        .spacing(12)
        .padding(16)
        .height(Length::Fill)
        .into()
    }

    fn panels_view(&self) -> Element<'_, Message> {
        let layout = &self.settings.layout;
        let mut main = row![].spacing(12).height(Length::Fill);

        if layout.video {
            let video: Element<'_, Message> = match &self.view.video {
                Some(handle) => image(handle.clone()).width(Length::Fill).into(),
                None => text("No video").into(),
            };
            main = main.push(container(video).width(Length::FillPortion(3)).center_x(Length::FillPortion(3)));
        }

        let mut side = column![].spacing(12).width(Length::FillPortion(1));
        if layout.aligned_face {
            side = side.push(thumbnail("Aligned face", self.view.aligned_face.as_ref()));
        }
        if layout.descriptor {
            side = side.push(thumbnail("Descriptor", self.view.descriptor.as_ref()));
        }
        if layout.readouts {
            side = side.push(readouts_view(self.view.frame_index, self.view.readouts.as_ref()));
        }
        main.push(scrollable(side)).into()
    }

    fn status_view(&self) -> Element<'_, Message> {
        let model_line = match self.model.status() {
            ModelStatus::Ready(_) => None,
            ModelStatus::Resolving { downloaded, total } if total > 0 => Some(format!(
                "Downloading landmark model... {}%",
                downloaded * 100 / total
            )),
            ModelStatus::Resolving { .. } => Some("Preparing landmark model...".to_string()),
            ModelStatus::Failed(e) => Some(format!("Landmark model unavailable: {e}")),
        };
        let lines = model_line
            .into_iter()
            .chain(self.log.iter().cloned())
            .map(|line| text(line).size(12).into())
            .collect::<Vec<Element<'_, Message>>>();
        column(lines).spacing(2).into()
    }

    pub fn theme(&self) -> Theme {
        match self.settings.appearance {
            Appearance::Dark => Theme::Dark,
            Appearance::Light => Theme::Light,
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        iced::time::every(TICK_INTERVAL).map(|_| Message::Tick)
    }
}

fn thumbnail<'a>(label: &'a str, handle: Option<&image::Handle>) -> Element<'a, Message> {
    let body: Element<'a, Message> = match handle {
        Some(handle) => image(handle.clone()).width(160).height(160).into(),
        None => container(text("-")).width(160).height(160).center(Length::Fixed(160.0)).into(),
    };
    column![text(label).size(13), body].spacing(4).into()
}

fn readouts_view<'a>(frame_index: u64, readouts: Option<&Readouts>) -> Element<'a, Message> {
    let Some(r) = readouts else {
        return text("No readouts").size(13).into();
    };
    let mut lines = vec![
        format!("Frame {frame_index}  t={:.2}s", r.timestamp),
        format!("{:.1} fps  elapsed {:.1}s", r.fps, r.elapsed.as_secs_f64()),
        if r.success {
            format!("Face {:.0}%", r.confidence * 100.0)
        } else {
            "No face".to_string()
        },
    ];
    if let Some(pose) = r.pose {
        lines.push(format!(
            "Pitch {:.1}  Yaw {:.1}  Roll {:.1}",
            pose.pitch.to_degrees(),
            pose.yaw.to_degrees(),
            pose.roll.to_degrees()
        ));
        lines.push(format!("Position {:.0}, {:.0}, {:.0} mm", pose.tx, pose.ty, pose.tz));
    }
    if let Some(gaze) = r.gaze {
        lines.push(format!(
            "Gaze {:.1}, {:.1}",
            gaze.x.to_degrees(),
            gaze.y.to_degrees()
        ));
    }
    for (name, value) in &r.action_units {
        lines.push(format!("{name}: {value:.2}"));
    }
    if let Some(progress) = r.progress {
        lines.push(format!("{:.1}%", progress * 100.0));
    }
    column(lines.into_iter().map(|l| text(l).size(13).into()).collect::<Vec<_>>())
        .spacing(2)
        .into()
}
