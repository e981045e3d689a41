/// YOLO face-pose landmark detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing of the grayscale frame, inference, NMS,
/// confidence filtering, and temporal smoothing of the primary face.
use std::path::Path;

use crate::detection::domain::face_landmarks::{FaceLandmarks, NUM_KEYPOINTS};
use crate::detection::domain::landmark_detector::{
    Detection, DetectionParams, FaceDetection, LandmarkDetector,
};
use crate::detection::domain::landmark_smoother::LandmarkSmoother;
use crate::shared::frame::GrayFrame;

use super::execution_provider::preferred_execution_providers;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// Keypoint values per detection row: 5 landmarks × (x, y, conf).
const NUM_KEYPOINT_VALUES: usize = NUM_KEYPOINTS * 3;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// Letterbox pad value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxLandmarkDetector {
    session: ort::session::Session,
    smoother: LandmarkSmoother,
    input_size: u32,
}

impl OnnxLandmarkDetector {
    /// Loads a YOLO face-pose ONNX model.
    ///
    /// The input resolution is read from the model's NCHW input shape, falling
    /// back to 640 when the shape is dynamic.
    pub fn new(model_path: &Path, smoother: LandmarkSmoother) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!("Loaded landmark model {} ({input_size}px)", model_path.display());

        Ok(Self {
            session,
            smoother,
            input_size,
        })
    }
}

impl LandmarkDetector for OnnxLandmarkDetector {
    fn detect(
        &mut self,
        frame: &GrayFrame,
        params: &DetectionParams,
    ) -> Result<Detection, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Detection::failed());
        }

        let (input_tensor, geometry) = letterbox(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Landmark model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = parse_rows(data, &shape, &geometry, params.confidence)?;
        let mut faces = nms(&mut raw, NMS_IOU_THRESH);
        faces.truncate(params.max_faces.max(1));

        if let Some(primary) = faces.first_mut() {
            primary.landmarks = self.smoother.smooth(&primary.landmarks);
        }

        Ok(Detection { faces })
    }

    fn reset(&mut self) {
        self.smoother.reset();
    }
}

/// Mapping from letterboxed model coordinates back to frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LetterboxGeometry {
    scale: f64,
    pad_x: f64,
    pad_y: f64,
}

impl LetterboxGeometry {
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Letterbox-resizes a grayscale frame into a `1×3×S×S` tensor with the luma
/// value replicated across the three channels.
fn letterbox(frame: &GrayFrame, target_size: u32) -> (ndarray::Array4<f32>, LetterboxGeometry) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let size = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), PAD_VALUE);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let v = src[[src_y, src_x]] as f32 / 255.0;
            let (ty, tx) = (pad_y as usize + y, pad_x as usize + x);
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = v;
            }
        }
    }

    (
        tensor,
        LetterboxGeometry {
            scale,
            pad_x: pad_x as f64,
            pad_y: pad_y as f64,
        },
    )
}

/// Parses raw model output into face detections above `confidence`.
///
/// Output is `[1, features, detections]` (transposed) or
/// `[1, detections, features]`; rows are
/// `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
fn parse_rows(
    data: &[f32],
    shape: &[usize],
    geometry: &LetterboxGeometry,
    confidence: f64,
) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected landmark output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 + NUM_KEYPOINT_VALUES {
        return Err(format!("Landmark output has {num_feats} features per row").into());
    }
    if data.len() < num_dets * num_feats {
        return Err("Landmark output shorter than its shape".into());
    }

    let value = |det: usize, feat: usize| -> f64 {
        let i = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[i] as f64
    };

    let mut faces = Vec::new();
    for i in 0..num_dets {
        let conf = value(i, 4);
        if conf < confidence {
            continue;
        }
        let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        let (x1, y1) = geometry.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = geometry.to_frame(cx + w / 2.0, cy + h / 2.0);

        let mut points = [(0.0f64, 0.0f64); NUM_KEYPOINTS];
        for (k, point) in points.iter_mut().enumerate() {
            let base = 5 + k * 3;
            if value(i, base + 2) >= KEYPOINT_CONF_THRESH {
                *point = geometry.to_frame(value(i, base), value(i, base + 1));
            }
        }

        faces.push(FaceDetection {
            bbox: [x1, y1, x2, y2],
            confidence: conf,
            landmarks: FaceLandmarks::new(points),
        });
    }
    Ok(faces)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [FaceDetection], iou_thresh: f64) -> Vec<FaceDetection> {
    dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceDetection> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| bbox_iou(&k.bbox, &det.bbox) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const IDENTITY: LetterboxGeometry = LetterboxGeometry {
        scale: 1.0,
        pad_x: 0.0,
        pad_y: 0.0,
    };

    fn row(cx: f32, cy: f32, conf: f32, kp_conf: f32) -> Vec<f32> {
        let mut r = vec![cx, cy, 20.0, 20.0, conf];
        for k in 0..NUM_KEYPOINTS {
            r.extend_from_slice(&[cx + k as f32, cy, kp_conf]);
        }
        r
    }

    fn face(bbox: [f64; 4], confidence: f64) -> FaceDetection {
        FaceDetection {
            bbox,
            confidence,
            landmarks: FaceLandmarks::new([(1.0, 1.0); NUM_KEYPOINTS]),
        }
    }

    #[test]
    fn test_letterbox_wide_frame_pads_vertically() {
        let frame = GrayFrame::new(vec![255u8; 200 * 100], 200, 100);
        let (tensor, geom) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(geom.scale, 3.2, epsilon = 1e-9);
        assert_eq!(geom.pad_x, 0.0);
        assert_eq!(geom.pad_y, 160.0);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], PAD_VALUE);
        for c in 0..3 {
            assert_relative_eq!(tensor[[0, c, 161, 1]], 1.0);
        }
    }

    #[test]
    fn test_geometry_maps_back_to_frame() {
        let geom = LetterboxGeometry {
            scale: 2.0,
            pad_x: 10.0,
            pad_y: 20.0,
        };
        assert_eq!(geom.to_frame(30.0, 60.0), (10.0, 20.0));
    }

    #[test]
    fn test_parse_rows_row_major() {
        let mut data = row(50.0, 60.0, 0.9, 0.9);
        data.extend(row(10.0, 10.0, 0.1, 0.9));
        let faces = parse_rows(&data, &[1, 2, 20], &IDENTITY, 0.25).unwrap();

        assert_eq!(faces.len(), 1);
        assert_relative_eq!(faces[0].confidence, 0.9, epsilon = 1e-6);
        assert_eq!(faces[0].bbox, [40.0, 50.0, 60.0, 70.0]);
        assert_eq!(faces[0].landmarks.points()[2], (52.0, 60.0));
    }

    #[test]
    fn test_parse_rows_transposed_layout() {
        let a = row(50.0, 60.0, 0.9, 0.9);
        let b = row(150.0, 60.0, 0.8, 0.9);
        // [1, 20 features, 2 detections], feature-major.
        let data: Vec<f32> = (0..20).flat_map(|f| [a[f], b[f]]).collect();
        let faces = parse_rows(&data, &[1, 20, 2], &IDENTITY, 0.25).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[1].bbox[0], 140.0);
    }

    #[test]
    fn test_low_confidence_keypoints_are_invisible() {
        let data = row(50.0, 60.0, 0.9, 0.1);
        let faces = parse_rows(&data, &[1, 1, 20], &IDENTITY, 0.25).unwrap();
        assert!(!faces[0].landmarks.has_visible());
    }

    #[test]
    fn test_parse_rows_rejects_bad_shape() {
        assert!(parse_rows(&[0.0; 4], &[4], &IDENTITY, 0.25).is_err());
        assert!(parse_rows(&[0.0; 6], &[1, 1, 6], &IDENTITY, 0.25).is_err());
    }

    #[test]
    fn test_nms_keeps_highest_confidence_of_overlap() {
        let mut dets = vec![
            face([0.0, 0.0, 100.0, 100.0], 0.5),
            face([2.0, 2.0, 102.0, 102.0], 0.9),
            face([300.0, 300.0, 350.0, 350.0], 0.7),
        ];
        let kept = nms(&mut dets, 0.3);
        let confs: Vec<f64> = kept.iter().map(|f| f.confidence).collect();
        assert_eq!(confs, vec![0.9, 0.7]);
    }

    #[test]
    fn test_bbox_iou() {
        let b = [0.0, 0.0, 10.0, 10.0];
        assert_relative_eq!(bbox_iou(&b, &b), 1.0);
        assert_eq!(bbox_iou(&b, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert_relative_eq!(bbox_iou(&b, &[5.0, 5.0, 15.0, 15.0]), 25.0 / 175.0);
    }
}
