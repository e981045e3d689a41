use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use crate::pipeline::frame_result::FrameResult;
use crate::recording::domain::recorder::{Recorder, RecordingFlags};

/// Writes one JSON object per frame to a `.jsonl` file, and optionally each
/// aligned face crop as a PNG in `<stem>_aligned/`.
#[derive(Default)]
pub struct JsonLinesRecorder {
    writer: Option<BufWriter<File>>,
    flags: RecordingFlags,
    aligned_dir: Option<PathBuf>,
    frames_written: u64,
    finished: bool,
}

impl JsonLinesRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn record(&self, frame_index: u64, timestamp: f64, result: &FrameResult) -> Value {
        let mut obj = Map::new();
        obj.insert("frame".into(), json!(frame_index));
        if self.flags.timestamps {
            obj.insert("timestamp".into(), json!(timestamp));
        }
        obj.insert("success".into(), json!(result.success()));
        obj.insert("confidence".into(), json!(result.detection.confidence()));

        if self.flags.pose {
            obj.insert("pose".into(), json!(result.analysis.pose));
        }
        if self.flags.landmarks {
            let points = result.detection.primary().map(|face| {
                face.landmarks
                    .points()
                    .iter()
                    .map(|&(x, y)| [x, y])
                    .collect::<Vec<_>>()
            });
            obj.insert("landmarks".into(), json!(points));
        }
        if self.flags.action_units {
            obj.insert("action_units".into(), json!(result.analysis.action_units));
        }
        if self.flags.gaze {
            obj.insert("gaze".into(), json!(result.gaze));
        }
        Value::Object(obj)
    }

    fn write_aligned(&self, frame_index: u64, result: &FrameResult) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(dir), Some(face)) = (&self.aligned_dir, &result.analysis.aligned_face) else {
            return Ok(());
        };
        let img = face.to_rgb_image().ok_or("Aligned face has inconsistent size")?;
        img.save(dir.join(format!("frame_{frame_index:06}.png")))?;
        Ok(())
    }
}

impl Recorder for JsonLinesRecorder {
    fn open(&mut self, path: &Path, flags: &RecordingFlags) -> Result<(), Box<dyn std::error::Error>> {
        if self.writer.is_some() {
            return Err("JsonLinesRecorder: already open".into());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .map_err(|e| format!("Failed to create {}: {e}", path.display()))?;

        self.aligned_dir = if flags.aligned_faces {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "output".to_string());
            let dir = path.with_file_name(format!("{stem}_aligned"));
            std::fs::create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };

        self.writer = Some(BufWriter::new(file));
        self.flags = flags.clone();
        self.frames_written = 0;
        self.finished = false;
        log::debug!("Recording to {}", path.display());
        Ok(())
    }

    fn record_frame(
        &mut self,
        frame_index: u64,
        timestamp: f64,
        result: &FrameResult,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let line = serde_json::to_string(&self.record(frame_index, timestamp, result))?;
        let writer = self
            .writer
            .as_mut()
            .ok_or("JsonLinesRecorder: record_frame before open")?;
        writeln!(writer, "{line}")?;
        self.write_aligned(frame_index, result)?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.finished {
            return Err("JsonLinesRecorder: finish called twice".into());
        }
        let mut writer = self
            .writer
            .take()
            .ok_or("JsonLinesRecorder: finish before open")?;
        writer.flush()?;
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::features::{FaceAnalysis, GazeAngle, HeadPose};
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::detection::domain::landmark_detector::{Detection, FaceDetection};
    use crate::shared::frame::Frame;

    fn detected_result(with_crop: bool) -> FrameResult {
        FrameResult {
            frame: Frame::new(vec![0; 12], 2, 2, 0),
            detection: Detection {
                faces: vec![FaceDetection {
                    bbox: [0.0, 0.0, 2.0, 2.0],
                    confidence: 0.75,
                    landmarks: FaceLandmarks::new([(1.0, 2.0); 5]),
                }],
            },
            analysis: FaceAnalysis {
                pose: Some(HeadPose {
                    yaw: 0.5,
                    ..HeadPose::default()
                }),
                aligned_face: with_crop.then(|| Frame::new(vec![9; 4 * 4 * 3], 4, 4, 0)),
                ..FaceAnalysis::neutral()
            },
            gaze: Some(GazeAngle { x: 0.5, y: 0.0 }),
        }
    }

    fn failed_result() -> FrameResult {
        FrameResult {
            frame: Frame::new(vec![0; 12], 2, 2, 0),
            detection: Detection::failed(),
            analysis: FaceAnalysis::neutral(),
            gaze: None,
        }
    }

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_line_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.jsonl");
        let mut recorder = JsonLinesRecorder::new();
        recorder.open(&path, &RecordingFlags::default()).unwrap();
        recorder.record_frame(1, 0.0, &detected_result(false)).unwrap();
        recorder.record_frame(2, 1.0 / 30.0, &failed_result()).unwrap();
        recorder.finish().unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["frame"], 1);
        assert_eq!(lines[0]["success"], true);
        assert_eq!(lines[0]["pose"]["yaw"], 0.5);
        assert_eq!(lines[0]["landmarks"][4][1], 2.0);
        assert_eq!(lines[0]["gaze"]["x"], 0.5);
        assert_eq!(lines[1]["success"], false);
        assert!(lines[1]["pose"].is_null());
        assert_eq!(recorder.frames_written(), 2);
    }

    #[test]
    fn test_disabled_fields_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.jsonl");
        let flags = RecordingFlags {
            timestamps: false,
            gaze: false,
            ..RecordingFlags::default()
        };
        let mut recorder = JsonLinesRecorder::new();
        recorder.open(&path, &flags).unwrap();
        recorder.record_frame(1, 0.0, &detected_result(false)).unwrap();
        recorder.finish().unwrap();

        let line = &read_lines(&path)[0];
        assert!(line.get("timestamp").is_none());
        assert!(line.get("gaze").is_none());
        assert!(line.get("pose").is_some());
    }

    #[test]
    fn test_aligned_faces_written_to_sibling_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.jsonl");
        let flags = RecordingFlags {
            aligned_faces: true,
            ..RecordingFlags::default()
        };
        let mut recorder = JsonLinesRecorder::new();
        recorder.open(&path, &flags).unwrap();
        recorder.record_frame(7, 0.0, &detected_result(true)).unwrap();
        recorder.record_frame(8, 0.0, &failed_result()).unwrap();
        recorder.finish().unwrap();

        let aligned = dir.path().join("clip_aligned");
        assert!(aligned.join("frame_000007.png").exists());
        assert!(!aligned.join("frame_000008.png").exists());
    }

    #[test]
    fn test_finish_twice_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = JsonLinesRecorder::new();
        recorder
            .open(&dir.path().join("a.jsonl"), &RecordingFlags::default())
            .unwrap();
        recorder.finish().unwrap();
        assert!(recorder.finish().is_err());
    }

    #[test]
    fn test_record_before_open_fails() {
        let mut recorder = JsonLinesRecorder::new();
        assert!(recorder.record_frame(1, 0.0, &failed_result()).is_err());
    }

    #[test]
    fn test_open_creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");
        let mut recorder = JsonLinesRecorder::new();
        recorder.open(&path, &RecordingFlags::default()).unwrap();
        recorder.finish().unwrap();
        assert!(path.exists());
    }
}
