use std::collections::BTreeMap;

use serde::Serialize;

use crate::shared::frame::Frame;

/// Head orientation in radians and position in millimetres (camera frame).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HeadPose {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
}

/// Gaze direction in radians: `x` horizontal (positive right), `y` vertical
/// (positive down).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct GazeAngle {
    pub x: f64,
    pub y: f64,
}

/// Appearance/geometry features for one frame.
///
/// A frame whose detection failed yields [`FaceAnalysis::neutral`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceAnalysis {
    pub pose: Option<HeadPose>,
    /// Action-unit intensities keyed by AU name (e.g. `"AU12"`).
    pub action_units: BTreeMap<String, f64>,
    /// Face crop aligned on the eye line.
    pub aligned_face: Option<Frame>,
    /// Visualization of the appearance descriptor.
    pub descriptor: Option<Frame>,
}

impl FaceAnalysis {
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn is_neutral(&self) -> bool {
        self.pose.is_none()
            && self.action_units.is_empty()
            && self.aligned_face.is_none()
            && self.descriptor.is_none()
    }
}
