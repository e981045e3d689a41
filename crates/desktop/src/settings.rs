use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use facetrace_core::detection::domain::landmark_detector::DetectionParams;
use facetrace_core::pipeline::components::{RunOptions, VisualizationFlags};
use facetrace_core::presentation::layout::PanelLayout;
use facetrace_core::recording::domain::recorder::RecordingFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    Dark,
    Light,
}

impl Appearance {
    pub const ALL: &[Appearance] = &[Appearance::Dark, Appearance::Light];
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Appearance::Dark => write!(f, "Dark"),
            Appearance::Light => write!(f, "Light"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Recordings go here; `None` writes next to each input.
    pub output_dir: Option<PathBuf>,
    /// Detection confidence threshold in percent.
    pub confidence: u32,
    pub record: bool,
    pub recording: RecordingFlags,
    pub visualization: VisualizationFlags,
    pub layout: PanelLayout,
    pub appearance: Appearance,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: None,
            confidence: 25,
            record: true,
            recording: RecordingFlags::default(),
            visualization: VisualizationFlags::default(),
            layout: PanelLayout::default(),
            appearance: Appearance::Dark,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceTrace").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            match serde_json::to_string_pretty(self) {
                Ok(json) => {
                    if let Err(e) = fs::write(&path, json) {
                        log::warn!("Failed to save settings to {}: {e}", path.display());
                    }
                }
                Err(e) => log::warn!("Failed to serialize settings: {e}"),
            }
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            output_dir: self.output_dir.clone(),
            record: self.record,
            recording: self.recording.clone(),
            visualization: self.visualization.clone(),
            detection: DetectionParams {
                confidence: f64::from(self.confidence.min(100)) / 100.0,
                ..DetectionParams::default()
            },
            ..RunOptions::default()
        }
    }
}
