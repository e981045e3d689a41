pub mod components;
pub mod control_state;
pub mod controller;
pub mod error;
pub mod fps_tracker;
pub mod frame_result;
pub mod infrastructure;
pub mod job;
pub mod pipeline_logger;
pub mod pipeline_loop;
pub mod publish_throttle;
pub mod session;
