pub mod face_analyzer;
pub mod features;
