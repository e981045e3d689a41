//! Real-time facial behavior analysis: frame sources, landmark detection,
//! head pose and gaze, per-frame recording, and a controllable worker that
//! hands snapshots to a UI thread.

pub mod analysis;
pub mod detection;
pub mod pipeline;
pub mod presentation;
pub mod recording;
pub mod shared;
pub mod source;
