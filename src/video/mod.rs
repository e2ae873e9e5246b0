pub mod arbiter;
pub mod frames;
pub mod screen;
pub mod source;
pub mod webcam;

pub use arbiter::StreamArbiter;
pub use frames::{encode_jpeg_frame, FrameConfig, FrameScheduler};
pub use screen::ScreenController;
pub use source::VideoSource;
pub use webcam::WebcamController;
