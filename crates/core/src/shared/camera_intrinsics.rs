use serde::{Deserialize, Serialize};

use crate::shared::constants::FOCAL_LENGTH_PER_WIDTH;

/// Pinhole camera parameters in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Estimates intrinsics from frame dimensions alone.
    ///
    /// `fx == fy`, proportional to width; the principal point is the
    /// image centre. Deterministic for a given size.
    pub fn estimate(width: u32, height: u32) -> Self {
        let focal = FOCAL_LENGTH_PER_WIDTH * width as f64;
        Self {
            fx: focal,
            fy: focal,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
        }
    }
}

/// User-facing intrinsics configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntrinsicsSetting {
    #[default]
    Auto,
    Fixed(CameraIntrinsics),
}

impl IntrinsicsSetting {
    /// Builds a setting from optional per-parameter overrides. Any missing
    /// parameter, or a non-positive focal length, means "auto".
    pub fn from_parts(fx: Option<f64>, fy: Option<f64>, cx: Option<f64>, cy: Option<f64>) -> Self {
        match (fx, fy, cx, cy) {
            (Some(fx), Some(fy), Some(cx), Some(cy)) if fx > 0.0 && fy > 0.0 => {
                Self::Fixed(CameraIntrinsics { fx, fy, cx, cy })
            }
            _ => Self::Auto,
        }
    }

    pub fn resolve(&self, width: u32, height: u32) -> CameraIntrinsics {
        match self {
            Self::Auto => CameraIntrinsics::estimate(width, height),
            Self::Fixed(intrinsics) => *intrinsics,
        }
    }
}
