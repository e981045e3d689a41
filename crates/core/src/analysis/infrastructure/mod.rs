pub mod geometric_face_analyzer;
pub mod head_pose_gaze_analyzer;
