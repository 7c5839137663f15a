//! Off-screen capture surfaces.
//!
//! A surface mounts one slide layout at a time, reports through a
//! [`CommitSignal`] once the slide has been committed to its render target,
//! and rasterizes the committed slide on request.

use image::{Rgb as Pixel, RgbImage};
use opsdeck_core::layout::{Align, Frame, LayoutElement, Rgb, CANVAS_HEIGHT, CANVAS_WIDTH};
use opsdeck_core::{Error, Result, SlideKey, SlideLayout};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Pixel size of the capture canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

/// Handle to the capturable element of a mounted slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetId(pub u64);

/// Sending half of a commit signal, held by the rendering side.
#[derive(Debug)]
pub struct CommitNotifier {
    sender: Sender<()>,
}

impl CommitNotifier {
    /// Report that the mounted slide has committed to the render target.
    pub fn committed(self) {
        // The exporter may have given up waiting; nothing to do then.
        let _ = self.sender.send(());
    }
}

/// Receiving half of a commit signal, awaited by the exporter.
#[derive(Debug)]
pub struct CommitSignal {
    receiver: Receiver<()>,
}

impl CommitSignal {
    /// Block until the slide has committed. Fails on timeout, or when the
    /// notifier is dropped without committing.
    pub fn wait(self, key: &SlideKey, timeout: Duration) -> Result<()> {
        match self.receiver.recv_timeout(timeout) {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout) => Err(Error::RenderCommitTimeout {
                key: key.to_string(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Surface(format!(
                "Renderer dropped slide '{}' before committing",
                key
            ))),
        }
    }
}

/// A new commit signal pair.
pub fn commit_channel() -> (CommitNotifier, CommitSignal) {
    let (sender, receiver) = mpsc::channel();
    (CommitNotifier { sender }, CommitSignal { receiver })
}

/// The rendering layer as seen by the capture exporter.
pub trait CaptureSurface {
    /// Mount a slide into the off-screen container, replacing nothing: the
    /// exporter unmounts the previous slide first.
    fn mount(&mut self, layout: &SlideLayout) -> Result<CommitSignal>;

    /// The capture target of the mounted slide, if it can be found.
    fn find_target(&self, key: &SlideKey) -> Option<TargetId>;

    /// Rasterize a committed target at the given canvas size.
    fn rasterize(&mut self, target: TargetId, size: CanvasSize) -> Result<RgbImage>;

    /// Remove the mounted slide, if any.
    fn unmount(&mut self);

    /// Drop the off-screen container and any temporary handles.
    fn release(&mut self);
}

/// Unmounts and releases the surface when dropped, however the capture loop
/// ends.
pub struct SurfaceGuard<'a, S: CaptureSurface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: CaptureSurface + ?Sized> SurfaceGuard<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        Self { surface }
    }
}

impl<S: CaptureSurface + ?Sized> std::ops::Deref for SurfaceGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: CaptureSurface + ?Sized> std::ops::DerefMut for SurfaceGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: CaptureSurface + ?Sized> Drop for SurfaceGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.unmount();
        self.surface.release();
        log::debug!("Capture surface released");
    }
}

fn pixel(color: Rgb) -> Pixel<u8> {
    Pixel([color.0, color.1, color.2])
}

/// In-process surface that paints layouts directly into an RGB buffer.
///
/// Text is greeked: each glyph becomes a solid block in the text color, at
/// the glyph's approximate advance. Good enough for previews and tests;
/// hosts with a real renderer implement [`CaptureSurface`] themselves.
#[derive(Debug)]
pub struct SoftwareSurface {
    size: CanvasSize,
    default_text: Rgb,
    container: Option<RgbImage>,
    mounted: Option<SlideKey>,
    next_target: u64,
}

impl SoftwareSurface {
    pub fn new(size: CanvasSize) -> Self {
        Self {
            size,
            default_text: Rgb::INK,
            container: None,
            mounted: None,
            next_target: 0,
        }
    }

    pub fn with_default_text(mut self, color: Rgb) -> Self {
        self.default_text = color;
        self
    }

    pub fn default_text(&self) -> Rgb {
        self.default_text
    }

    /// Whether an off-screen container is currently allocated.
    pub fn has_container(&self) -> bool {
        self.container.is_some()
    }

    fn paint(&self, layout: &SlideLayout, canvas: &mut RgbImage) {
        let scale_x = canvas.width() as f32 / CANVAS_WIDTH;
        let scale_y = canvas.height() as f32 / CANVAS_HEIGHT;
        let scaled = |frame: &Frame| {
            Frame::new(
                frame.x * scale_x,
                frame.y * scale_y,
                frame.width * scale_x,
                frame.height * scale_y,
            )
        };

        for element in &layout.elements {
            match element {
                LayoutElement::Fill { color } => {
                    for p in canvas.pixels_mut() {
                        *p = pixel(*color);
                    }
                }
                LayoutElement::Rect { frame, color, rounded } => {
                    let frame = scaled(frame);
                    let radius = if *rounded {
                        frame.width.min(frame.height) * 0.08
                    } else {
                        0.0
                    };
                    fill_rect(canvas, &frame, radius, pixel(*color));
                }
                LayoutElement::Text { frame, text, style } => {
                    let frame = scaled(frame);
                    let size = style.size * scale_y;
                    let color = pixel(style.color.unwrap_or(self.default_text));
                    greek_text(canvas, &frame, text, size, style.align, color);
                }
            }
        }
    }
}

impl CaptureSurface for SoftwareSurface {
    fn mount(&mut self, layout: &SlideLayout) -> Result<CommitSignal> {
        let size = self.size;
        let mut canvas = self
            .container
            .take()
            .unwrap_or_else(|| RgbImage::new(size.width, size.height));
        self.paint(layout, &mut canvas);
        self.container = Some(canvas);
        self.mounted = Some(layout.key.clone());

        let (notifier, signal) = commit_channel();
        notifier.committed();
        Ok(signal)
    }

    fn find_target(&self, key: &SlideKey) -> Option<TargetId> {
        match &self.mounted {
            Some(mounted) if mounted == key => Some(TargetId(self.next_target)),
            _ => None,
        }
    }

    fn rasterize(&mut self, _target: TargetId, size: CanvasSize) -> Result<RgbImage> {
        let canvas = self
            .container
            .as_ref()
            .ok_or_else(|| Error::Surface("Nothing is mounted".to_string()))?;
        self.next_target += 1;
        if canvas.width() == size.width && canvas.height() == size.height {
            Ok(canvas.clone())
        } else {
            Ok(image::imageops::resize(
                canvas,
                size.width,
                size.height,
                image::imageops::FilterType::Triangle,
            ))
        }
    }

    fn unmount(&mut self) {
        self.mounted = None;
    }

    fn release(&mut self) {
        self.mounted = None;
        self.container = None;
    }
}

fn fill_rect(canvas: &mut RgbImage, frame: &Frame, radius: f32, color: Pixel<u8>) {
    let x0 = frame.x.max(0.0) as u32;
    let y0 = frame.y.max(0.0) as u32;
    let x1 = ((frame.x + frame.width).max(0.0) as u32).min(canvas.width());
    let y1 = ((frame.y + frame.height).max(0.0) as u32).min(canvas.height());

    for y in y0..y1 {
        for x in x0..x1 {
            if radius > 0.0 && outside_corner(x as f32 + 0.5, y as f32 + 0.5, frame, radius) {
                continue;
            }
            canvas.put_pixel(x, y, color);
        }
    }
}

fn outside_corner(px: f32, py: f32, frame: &Frame, radius: f32) -> bool {
    let left = frame.x + radius;
    let right = frame.x + frame.width - radius;
    let top = frame.y + radius;
    let bottom = frame.y + frame.height - radius;
    let cx = if px < left {
        left
    } else if px > right {
        right
    } else {
        return false;
    };
    let cy = if py < top {
        top
    } else if py > bottom {
        bottom
    } else {
        return false;
    };
    (px - cx).powi(2) + (py - cy).powi(2) > radius * radius
}

fn greek_text(canvas: &mut RgbImage, frame: &Frame, text: &str, size: f32, align: Align, color: Pixel<u8>) {
    let advance = size * 0.55;
    let glyph_width = (advance * 0.8).max(1.0);
    let glyph_height = (size * 0.7).max(1.0);
    let run_width = text.chars().count() as f32 * advance;

    let start_x = match align {
        Align::Left => frame.x,
        Align::Center => frame.x + (frame.width - run_width) / 2.0,
        Align::Right => frame.x + frame.width - run_width,
    };
    let top = frame.y + (frame.height - glyph_height) / 2.0;
    let right_edge = frame.x + frame.width;

    for (i, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            continue;
        }
        let x = start_x + i as f32 * advance;
        if x + glyph_width > right_edge {
            break;
        }
        let glyph = Frame::new(x, top, glyph_width, glyph_height);
        fill_rect(canvas, &glyph, 0.0, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_core::layout::TextStyle;

    fn layout() -> SlideLayout {
        SlideLayout {
            key: SlideKey::new("summary"),
            elements: vec![
                LayoutElement::Fill { color: Rgb::PAPER },
                LayoutElement::Rect {
                    frame: Frame::new(0.0, 0.0, 960.0, 540.0),
                    color: Rgb::BRAND,
                    rounded: false,
                },
                LayoutElement::Text {
                    frame: Frame::new(960.0, 540.0, 960.0, 540.0),
                    text: "ABC".to_string(),
                    style: TextStyle::new(200.0).align(Align::Center),
                },
            ],
        }
    }

    #[test]
    fn test_commit_signal_wait() {
        let key = SlideKey::new("k");
        let (notifier, signal) = commit_channel();
        notifier.committed();
        assert!(signal.wait(&key, Duration::from_millis(10)).is_ok());

        let (_notifier, signal) = commit_channel();
        assert!(matches!(
            signal.wait(&key, Duration::from_millis(10)),
            Err(Error::RenderCommitTimeout { .. })
        ));

        let (notifier, signal) = commit_channel();
        drop(notifier);
        assert!(matches!(signal.wait(&key, Duration::from_millis(10)), Err(Error::Surface(_))));
    }

    #[test]
    fn test_software_surface_paints_layout() {
        let mut surface = SoftwareSurface::new(CanvasSize::new(192, 108));
        let layout = layout();
        surface
            .mount(&layout)
            .unwrap()
            .wait(&layout.key, Duration::from_millis(10))
            .unwrap();

        let target = surface.find_target(&layout.key).unwrap();
        let image = surface.rasterize(target, CanvasSize::new(192, 108)).unwrap();
        assert_eq!(image.dimensions(), (192, 108));
        assert_eq!(*image.get_pixel(10, 10), pixel(Rgb::BRAND));
        assert_eq!(*image.get_pixel(100, 20), pixel(Rgb::PAPER));
        // Center glyph of the greeked text.
        assert_eq!(*image.get_pixel(144, 81), pixel(Rgb::INK));
    }

    #[test]
    fn test_target_only_for_mounted_slide() {
        let mut surface = SoftwareSurface::new(CanvasSize::new(16, 9));
        assert!(surface.find_target(&SlideKey::new("summary")).is_none());
        surface.mount(&layout()).unwrap();
        assert!(surface.find_target(&SlideKey::new("summary")).is_some());
        assert!(surface.find_target(&SlideKey::new("cover")).is_none());
        surface.unmount();
        assert!(surface.find_target(&SlideKey::new("summary")).is_none());
        assert!(surface.has_container());
        surface.release();
        assert!(!surface.has_container());
    }

    #[test]
    fn test_rasterize_scales_to_requested_size() {
        let mut surface = SoftwareSurface::new(CanvasSize::new(64, 36));
        surface.mount(&layout()).unwrap();
        let target = surface.find_target(&SlideKey::new("summary")).unwrap();
        let image = surface.rasterize(target, CanvasSize::new(32, 18)).unwrap();
        assert_eq!(image.dimensions(), (32, 18));
    }

    #[test]
    fn test_rounded_corner_is_skipped() {
        let frame = Frame::new(0.0, 0.0, 100.0, 100.0);
        assert!(outside_corner(0.5, 0.5, &frame, 10.0));
        assert!(!outside_corner(50.0, 0.5, &frame, 10.0));
        assert!(!outside_corner(9.0, 9.0, &frame, 10.0));
    }
}
