use std::time::Duration;

pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Frame rate assumed when a source reports none.
pub const DEFAULT_FPS: f64 = 30.0;

/// Focal length per pixel of image width for auto-estimated intrinsics
/// (500 px at 640 px wide).
pub const FOCAL_LENGTH_PER_WIDTH: f64 = 500.0 / 640.0;

/// Interval at which a paused worker re-checks the control flags.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long a per-frame snapshot stays deliverable before it is dropped.
pub const FRAME_DELIVERY_BUDGET: Duration = Duration::from_millis(200);

/// How long the worker waits for the UI to apply a mode transition.
pub const MODE_CHANGE_BUDGET: Duration = Duration::from_secs(1);

/// Minimum spacing between published snapshots while running freely.
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_millis(33);

/// Mean adult inter-ocular distance, used to recover head depth.
pub const INTEROCULAR_DISTANCE_MM: f64 = 63.0;

/// Side length of the aligned face crop.
pub const ALIGNED_FACE_SIZE: u32 = 112;

/// Frames in the sliding window of the processing-rate tracker.
pub const FPS_WINDOW: usize = 30;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "webm"];
