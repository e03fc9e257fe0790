//! dermalens-hw — Camera frames and imaging for the capture gate.
//!
//! Provides V4L2-based camera access, the guide overlay drawn over the
//! preview, and the mirrored, overlay-composited JPEG capture.

pub mod camera;
pub mod capture;
pub mod frame;
pub mod overlay;
pub mod source;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use capture::{compose_capture, CaptureError, CapturedImage};
pub use frame::{Frame, FrameError};
pub use overlay::{render_guide, GuideStyle};
pub use source::{FrameSequence, FrameSource};
