//! Capture export backend.
//!
//! Slides are mounted on an off-screen [`CaptureSurface`] one at a time,
//! rasterized at a fixed canvas size once the surface reports a committed
//! render, JPEG-encoded and appended as full-page pictures.

pub mod exporter;
pub mod surface;

pub use exporter::{encode_jpeg, CaptureRasterExporter, CaptureState};
pub use surface::{
    commit_channel, CanvasSize, CaptureSurface, CommitNotifier, CommitSignal, SoftwareSurface,
    SurfaceGuard, TargetId,
};
