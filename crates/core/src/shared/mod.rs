pub mod camera_intrinsics;
pub mod constants;
pub mod frame;
pub mod model_resolver;
pub mod source_metadata;
