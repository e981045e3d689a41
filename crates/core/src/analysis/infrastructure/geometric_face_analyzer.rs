//! Head pose and appearance artifacts from the five detector landmarks.
//!
//! Pose follows a weak-perspective model: roll from the eye line, yaw from
//! the nose offset against the eye span, pitch from where the nose sits
//! between the eye and mouth lines, and depth from the pixel eye distance
//! against a fixed inter-ocular distance.

use std::collections::BTreeMap;

use crate::analysis::domain::face_analyzer::FaceAnalyzer;
use crate::analysis::domain::features::{FaceAnalysis, HeadPose};
use crate::detection::domain::face_landmarks::{FaceLandmarks, Keypoint};
use crate::detection::domain::landmark_detector::Detection;
use crate::shared::camera_intrinsics::CameraIntrinsics;
use crate::shared::constants::{ALIGNED_FACE_SIZE, INTEROCULAR_DISTANCE_MM};
use crate::shared::frame::Frame;

/// Nose position between eye line (0) and mouth line (1) for a level head.
const NEUTRAL_NOSE_FRACTION: f64 = 0.55;

/// Aligned crop side length in units of eye distance.
const CROP_EYE_DISTANCES: f64 = 2.5;

pub struct GeometricFaceAnalyzer {
    aligned_size: u32,
}

impl GeometricFaceAnalyzer {
    pub fn new(aligned_size: u32) -> Self {
        Self { aligned_size }
    }
}

impl Default for GeometricFaceAnalyzer {
    fn default() -> Self {
        Self::new(ALIGNED_FACE_SIZE)
    }
}

impl FaceAnalyzer for GeometricFaceAnalyzer {
    fn analyze(
        &mut self,
        frame: &Frame,
        detection: &Detection,
        intrinsics: &CameraIntrinsics,
    ) -> Result<FaceAnalysis, Box<dyn std::error::Error>> {
        let Some(face) = detection.primary() else {
            return Ok(FaceAnalysis::neutral());
        };
        let Some(pose) = estimate_pose(&face.landmarks, intrinsics) else {
            return Ok(FaceAnalysis::neutral());
        };

        let aligned_face = align_face(frame, &face.landmarks, pose.roll, self.aligned_size);
        let descriptor = aligned_face.as_ref().map(gradient_magnitude);

        Ok(FaceAnalysis {
            pose: Some(pose),
            action_units: BTreeMap::new(),
            aligned_face,
            descriptor,
        })
    }

    fn reset(&mut self) {}
}

/// Head pose from complete landmarks, or `None` when any keypoint is hidden
/// or the eyes coincide.
pub fn estimate_pose(landmarks: &FaceLandmarks, k: &CameraIntrinsics) -> Option<HeadPose> {
    if !landmarks.is_complete() {
        return None;
    }
    let left = landmarks.point(Keypoint::LeftEye)?;
    let right = landmarks.point(Keypoint::RightEye)?;
    let nose = landmarks.point(Keypoint::Nose)?;
    let eye_mid = landmarks.eye_midpoint()?;
    let mouth_mid = landmarks.mouth_midpoint()?;
    let eye_dist = landmarks.eye_distance()?;
    if eye_dist <= f64::EPSILON {
        return None;
    }

    let roll = (right.1 - left.1).atan2(right.0 - left.0);

    // De-rotate so the eye line is horizontal.
    let (sin, cos) = (-roll).sin_cos();
    let derotate = |p: (f64, f64)| {
        let (dx, dy) = (p.0 - eye_mid.0, p.1 - eye_mid.1);
        (dx * cos - dy * sin, dx * sin + dy * cos)
    };
    let nose_r = derotate(nose);
    let mouth_r = derotate(mouth_mid);

    let yaw = (nose_r.0 / eye_dist).clamp(-1.0, 1.0).asin();

    let pitch = if mouth_r.1 > f64::EPSILON {
        let fraction = nose_r.1 / mouth_r.1;
        ((fraction - NEUTRAL_NOSE_FRACTION) * 2.0).clamp(-1.0, 1.0).asin()
    } else {
        0.0
    };

    let tz = k.fx * INTEROCULAR_DISTANCE_MM / eye_dist;
    let tx = (eye_mid.0 - k.cx) * tz / k.fx;
    let ty = (eye_mid.1 - k.cy) * tz / k.fy;

    Some(HeadPose {
        pitch,
        yaw,
        roll,
        tx,
        ty,
        tz,
    })
}

/// Square crop centred on the landmarks, rotated so the eyes are level,
/// bilinearly resampled to `size × size`.
fn align_face(frame: &Frame, landmarks: &FaceLandmarks, roll: f64, size: u32) -> Option<Frame> {
    let (cx, cy) = landmarks.center()?;
    let eye_dist = landmarks.eye_distance()?;
    if frame.is_empty() || size == 0 {
        return None;
    }

    let side = eye_dist * CROP_EYE_DISTANCES;
    let step = side / size as f64;
    let (sin, cos) = roll.sin_cos();
    let half = size as f64 / 2.0;
    let src = frame.as_ndarray();
    let (fw, fh) = (frame.width() as f64, frame.height() as f64);

    let mut data = Vec::with_capacity((size * size) as usize * Frame::CHANNELS);
    for v in 0..size {
        for u in 0..size {
            let ox = (u as f64 + 0.5 - half) * step;
            let oy = (v as f64 + 0.5 - half) * step;
            let sx = (cx + ox * cos - oy * sin).clamp(0.0, fw - 1.0);
            let sy = (cy + ox * sin + oy * cos).clamp(0.0, fh - 1.0);

            let (x0, y0) = (sx.floor() as usize, sy.floor() as usize);
            let x1 = (x0 + 1).min(frame.width() as usize - 1);
            let y1 = (y0 + 1).min(frame.height() as usize - 1);
            let (ax, ay) = (sx - x0 as f64, sy - y0 as f64);
            for c in 0..Frame::CHANNELS {
                let top = src[[y0, x0, c]] as f64 * (1.0 - ax) + src[[y0, x1, c]] as f64 * ax;
                let bottom = src[[y1, x0, c]] as f64 * (1.0 - ax) + src[[y1, x1, c]] as f64 * ax;
                data.push((top * (1.0 - ay) + bottom * ay).round() as u8);
            }
        }
    }
    Some(Frame::new(data, size, size, frame.index()))
}

/// Sobel gradient magnitude of the crop's luma, normalised to 0-255 and
/// replicated to three channels for display.
fn gradient_magnitude(face: &Frame) -> Frame {
    let gray = face.to_gray();
    let luma = gray.as_ndarray();
    let (w, h) = (face.width() as usize, face.height() as usize);

    let mut mags = vec![0.0f32; w * h];
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let p = |dx: isize, dy: isize| {
                luma[[(y as isize + dy) as usize, (x as isize + dx) as usize]] as f32
            };
            let gx = p(1, -1) + 2.0 * p(1, 0) + p(1, 1) - p(-1, -1) - 2.0 * p(-1, 0) - p(-1, 1);
            let gy = p(-1, 1) + 2.0 * p(0, 1) + p(1, 1) - p(-1, -1) - 2.0 * p(0, -1) - p(1, -1);
            mags[y * w + x] = (gx * gx + gy * gy).sqrt();
        }
    }

    let max = mags.iter().copied().fold(0.0f32, f32::max);
    let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
    let data = mags
        .iter()
        .flat_map(|m| {
            let v = (m * scale).round() as u8;
            [v, v, v]
        })
        .collect();
    Frame::new(data, face.width(), face.height(), face.index())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::landmark_detector::FaceDetection;
    use approx::assert_relative_eq;

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics::estimate(640, 480)
    }

    /// Level, frontal face with the nose at the neutral fraction.
    fn frontal() -> FaceLandmarks {
        FaceLandmarks::new([
            (290.0, 200.0),
            (350.0, 200.0),
            (320.0, 233.0),
            (300.0, 260.0),
            (340.0, 260.0),
        ])
    }

    fn detection(landmarks: FaceLandmarks) -> Detection {
        Detection {
            faces: vec![FaceDetection {
                bbox: [250.0, 150.0, 390.0, 300.0],
                confidence: 0.9,
                landmarks,
            }],
        }
    }

    fn textured_frame(w: u32, h: u32) -> Frame {
        let data = (0..w * h)
            .flat_map(|i| {
                let v = ((i % w) * 7 % 256) as u8;
                [v, v, v]
            })
            .collect();
        Frame::new(data, w, h, 3)
    }

    #[test]
    fn test_frontal_face_has_near_zero_angles() {
        let pose = estimate_pose(&frontal(), &intrinsics()).unwrap();
        assert_relative_eq!(pose.roll, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pose.yaw, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pose.pitch, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_depth_from_eye_distance() {
        // fx = 500, eye distance 60 px -> 500 * 63 / 60
        let pose = estimate_pose(&frontal(), &intrinsics()).unwrap();
        assert_relative_eq!(pose.tz, 525.0, epsilon = 1e-9);
        // Eye midpoint sits on the principal point horizontally.
        assert_relative_eq!(pose.tx, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pose.ty, (200.0 - 240.0) * 525.0 / 500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_roll_follows_eye_line() {
        let lm = FaceLandmarks::new([
            (300.0, 200.0),
            (350.0, 250.0),
            (310.0, 250.0),
            (290.0, 280.0),
            (320.0, 300.0),
        ]);
        let pose = estimate_pose(&lm, &intrinsics()).unwrap();
        assert_relative_eq!(pose.roll, std::f64::consts::FRAC_PI_4, epsilon = 1e-9);
    }

    #[test]
    fn test_nose_offset_sign_gives_yaw_sign() {
        let mut pts = *frontal().points();
        pts[Keypoint::Nose as usize].0 = 335.0;
        let right = estimate_pose(&FaceLandmarks::new(pts), &intrinsics()).unwrap();
        assert_relative_eq!(right.yaw, (15.0f64 / 60.0).asin(), epsilon = 1e-9);

        pts[Keypoint::Nose as usize].0 = 305.0;
        let left = estimate_pose(&FaceLandmarks::new(pts), &intrinsics()).unwrap();
        assert!(left.yaw < 0.0);
    }

    #[test]
    fn test_incomplete_landmarks_have_no_pose() {
        let mut pts = *frontal().points();
        pts[Keypoint::LeftMouth as usize] = (0.0, 0.0);
        assert!(estimate_pose(&FaceLandmarks::new(pts), &intrinsics()).is_none());
    }

    #[test]
    fn test_failed_detection_is_neutral() {
        let mut analyzer = GeometricFaceAnalyzer::default();
        let frame = textured_frame(64, 48);
        let analysis = analyzer
            .analyze(&frame, &Detection::failed(), &intrinsics())
            .unwrap();
        assert!(analysis.is_neutral());
    }

    #[test]
    fn test_artifacts_have_aligned_size() {
        let mut analyzer = GeometricFaceAnalyzer::new(32);
        let frame = textured_frame(640, 480);
        let analysis = analyzer
            .analyze(&frame, &detection(frontal()), &intrinsics())
            .unwrap();

        let aligned = analysis.aligned_face.unwrap();
        assert_eq!((aligned.width(), aligned.height()), (32, 32));
        assert_eq!(aligned.index(), 3);
        let descriptor = analysis.descriptor.unwrap();
        assert_eq!((descriptor.width(), descriptor.height()), (32, 32));
        assert!(descriptor.data().iter().any(|&v| v > 0));
        assert!(analysis.action_units.is_empty());
    }

    #[test]
    fn test_gradient_of_flat_image_is_zero() {
        let flat = Frame::new(vec![90; 8 * 8 * 3], 8, 8, 0);
        assert!(gradient_magnitude(&flat).data().iter().all(|&v| v == 0));
    }
}
