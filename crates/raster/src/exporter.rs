//! Sequential capture exporter.
//!
//! Each slide goes through `MountingTarget → AwaitingRenderCommit →
//! Rasterizing → Encoding → PageAppended` before the next one is mounted.
//! The surface is released when the loop ends, whether it finished or not.

use crate::surface::{CanvasSize, CaptureSurface, SoftwareSurface, SurfaceGuard};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use opsdeck_core::export::capture_file_name;
use opsdeck_core::{
    CaptureOptions, DeckExporter, DeckOptions, Error, ExportProgress, ExportRequest, ExportedDocument,
    MissingTargetPolicy, Result, SlideKey, SlideLayout,
};
use opsdeck_pptx::{PptxWriter, SlideContent};

/// Where the capture loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    MountingTarget,
    AwaitingRenderCommit,
    Rasterizing,
    Encoding,
    PageAppended,
}

fn enter(state: &mut CaptureState, next: CaptureState, key: &SlideKey) {
    log::trace!("[{}] {:?} -> {:?}", key, state, next);
    *state = next;
}

/// Encode a frame as baseline JPEG.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode_image(image)
        .map_err(|e| Error::Encoding(format!("JPEG encoding failed: {}", e)))?;
    Ok(bytes)
}

/// Renders every slide through a [`CaptureSurface`] and stores the frames
/// as full-page pictures.
pub struct CaptureRasterExporter<S: CaptureSurface> {
    surface: S,
    options: CaptureOptions,
    state: CaptureState,
}

impl CaptureRasterExporter<SoftwareSurface> {
    /// Exporter over the built-in software surface, painting text in the
    /// deck's default text color.
    pub fn software(options: &DeckOptions) -> Self {
        let capture = options.capture.clone();
        let size = CanvasSize::new(capture.canvas_width, capture.canvas_height);
        let surface = SoftwareSurface::new(size).with_default_text(options.text_color());
        Self::new(surface, capture)
    }
}

impl<S: CaptureSurface> CaptureRasterExporter<S> {
    pub fn new(surface: S, options: CaptureOptions) -> Self {
        Self {
            surface,
            options,
            state: CaptureState::Idle,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    fn canvas_size(&self) -> CanvasSize {
        CanvasSize::new(self.options.canvas_width, self.options.canvas_height)
    }

    /// Runs the capture loop. Returns the captured and the skipped keys.
    fn capture_pages(
        &mut self,
        layouts: &[SlideLayout],
        writer: &mut PptxWriter,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> Result<(Vec<SlideKey>, Vec<SlideKey>)> {
        let size = self.canvas_size();
        let timeout = self.options.commit_timeout();
        let quality = self.options.jpeg_quality();
        let total = layouts.len();
        let mut captured = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        let mut surface = SurfaceGuard::new(&mut self.surface);

        for (index, layout) in layouts.iter().enumerate() {
            let key = &layout.key;

            enter(&mut self.state, CaptureState::MountingTarget, key);
            let signal = surface.mount(layout)?;

            enter(&mut self.state, CaptureState::AwaitingRenderCommit, key);
            signal.wait(key, timeout)?;

            match surface.find_target(key) {
                Some(target) => {
                    enter(&mut self.state, CaptureState::Rasterizing, key);
                    let frame = surface.rasterize(target, size)?;

                    enter(&mut self.state, CaptureState::Encoding, key);
                    let jpeg = encode_jpeg(&frame, quality)?;
                    drop(frame);

                    writer.add_slide(key.as_str(), SlideContent::Picture { jpeg });
                    captured.push(key.clone());
                    enter(&mut self.state, CaptureState::PageAppended, key);
                }
                None => match self.options.missing_target {
                    MissingTargetPolicy::Skip => {
                        log::warn!("No capture target for slide '{}', skipping it", key);
                        skipped.push(key.clone());
                    }
                    MissingTargetPolicy::Abort => {
                        return Err(Error::RasterizationTargetMissing { key: key.to_string() });
                    }
                },
            }

            surface.unmount();
            progress(ExportProgress {
                current: index + 1,
                total,
            });
        }

        Ok((captured, skipped))
    }
}

impl<S: CaptureSurface> DeckExporter for CaptureRasterExporter<S> {
    fn name(&self) -> &'static str {
        "capture"
    }

    fn export(
        &mut self,
        request: &ExportRequest,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> Result<ExportedDocument> {
        let layouts = request.layouts();
        let file_name = capture_file_name(&request.weeks);
        log::info!("Capturing {} slides into {}", layouts.len(), file_name);

        let mut writer = PptxWriter::new().with_title(file_name.trim_end_matches(".pptx"));
        let result = self.capture_pages(&layouts, &mut writer, progress);
        self.state = CaptureState::Idle;
        let (page_keys, skipped) = result?;

        if page_keys.is_empty() {
            return Err(Error::DocumentAssembly(
                "No slide could be captured".to_string(),
            ));
        }

        let bytes = writer.finish()?;
        log::info!(
            "Captured {} pages ({} skipped), {} bytes",
            page_keys.len(),
            skipped.len(),
            bytes.len()
        );

        Ok(ExportedDocument {
            file_name,
            bytes,
            page_keys,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{commit_channel, CommitNotifier, CommitSignal, TargetId};
    use image::Rgb;
    use opsdeck_core::{CategoryRecord, DeckPipeline, WeekId, WeeklySnapshot};
    use opsdeck_pptx::read_package;
    use std::time::Duration;

    /// Surface that records every call and commits from another thread.
    #[derive(Default)]
    struct ScriptedSurface {
        calls: Vec<String>,
        mounted: Option<SlideKey>,
        missing: Vec<&'static str>,
        never_commits: Vec<&'static str>,
        broken: Vec<&'static str>,
        pending: Vec<CommitNotifier>,
    }

    impl CaptureSurface for ScriptedSurface {
        fn mount(&mut self, layout: &SlideLayout) -> Result<CommitSignal> {
            assert!(self.mounted.is_none(), "two slides mounted at once");
            self.calls.push(format!("mount {}", layout.key));
            self.mounted = Some(layout.key.clone());

            let (notifier, signal) = commit_channel();
            if self.never_commits.contains(&layout.key.as_str()) {
                self.pending.push(notifier);
            } else {
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(2));
                    notifier.committed();
                });
            }
            Ok(signal)
        }

        fn find_target(&self, key: &SlideKey) -> Option<TargetId> {
            if self.missing.contains(&key.as_str()) {
                return None;
            }
            (self.mounted.as_ref() == Some(key)).then_some(TargetId(1))
        }

        fn rasterize(&mut self, _target: TargetId, size: CanvasSize) -> Result<RgbImage> {
            let key = self.mounted.clone().unwrap();
            self.calls.push(format!("rasterize {}", key));
            if self.broken.contains(&key.as_str()) {
                return Err(Error::Surface("context lost".to_string()));
            }
            Ok(RgbImage::from_pixel(size.width, size.height, Rgb([15, 61, 94])))
        }

        fn unmount(&mut self) {
            if let Some(key) = self.mounted.take() {
                self.calls.push(format!("unmount {}", key));
            }
        }

        fn release(&mut self) {
            self.calls.push("release".to_string());
            self.pending.clear();
        }
    }

    fn options() -> CaptureOptions {
        CaptureOptions {
            canvas_width: 64,
            canvas_height: 36,
            ..Default::default()
        }
        .with_commit_timeout(Duration::from_millis(500))
    }

    fn request() -> ExportRequest {
        let mut w44 = WeeklySnapshot::new("W44");
        w44.totals.adherence_percent = 80.0;
        w44.sub_regions = vec![CategoryRecord {
            name: "Centro".to_string(),
            adherence_percent: 80.0,
            ..Default::default()
        }];
        let mut w45 = WeeklySnapshot::new("W45");
        w45.totals.adherence_percent = 90.0;

        let weeks = vec![WeekId::new("W44"), WeekId::new("W45")];
        let pipeline = DeckPipeline::new(&DeckOptions::default());
        let mut deck = pipeline.build_deck(&[w44, w45], &weeks).unwrap();
        deck.reorder(0, 2);
        ExportRequest::from_deck(&deck).unwrap()
    }

    fn export_with(surface: ScriptedSurface, options: CaptureOptions) -> (Result<ExportedDocument>, ScriptedSurface) {
        let mut exporter = CaptureRasterExporter::new(surface, options);
        let result = exporter.export(&request(), &mut |_| {});
        assert_eq!(exporter.state(), CaptureState::Idle);
        (result, exporter.into_surface())
    }

    #[test]
    fn test_page_order_follows_reordered_deck() {
        let request = request();
        let expected: Vec<String> = request.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(&expected[..3], &["summary", "subregion-0", "cover"]);

        let mut exporter = CaptureRasterExporter::new(ScriptedSurface::default(), options());
        let document = exporter.export(&request, &mut |_| {}).unwrap();

        assert_eq!(document.file_name, "Comparativo_Semana44_vs_Semana45.pptx");
        let pages = read_package(&document.bytes).unwrap();
        let names: Vec<String> = pages.iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, expected);
        assert!(pages.iter().all(|p| p.has_picture));
    }

    #[test]
    fn test_one_slide_mounted_at_a_time() {
        let (result, surface) = export_with(ScriptedSurface::default(), options());
        assert!(result.is_ok());
        assert_eq!(&surface.calls[..3], &["mount summary", "rasterize summary", "unmount summary"]);
        assert_eq!(surface.calls.last().unwrap(), "release");
        assert_eq!(surface.calls.iter().filter(|c| *c == "release").count(), 1);
    }

    #[test]
    fn test_progress_after_each_slide() {
        let request = request();
        let total = request.slides.len();
        let mut seen = Vec::new();
        let mut exporter = CaptureRasterExporter::new(ScriptedSurface::default(), options());
        exporter.export(&request, &mut |p| seen.push((p.current, p.total))).unwrap();

        let expected: Vec<(usize, usize)> = (1..=total).map(|i| (i, total)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_missing_target_is_skipped_by_default() {
        let surface = ScriptedSurface {
            missing: vec!["cover"],
            ..Default::default()
        };
        let (result, surface) = export_with(surface, options());
        let document = result.unwrap();

        assert_eq!(document.skipped, vec![SlideKey::cover()]);
        assert!(!document.page_keys.contains(&SlideKey::cover()));
        let pages = read_package(&document.bytes).unwrap();
        assert!(pages.iter().all(|p| p.name != "cover"));
        assert!(surface.calls.contains(&"unmount cover".to_string()));
    }

    #[test]
    fn test_missing_target_aborts_under_abort_policy() {
        let surface = ScriptedSurface {
            missing: vec!["cover"],
            ..Default::default()
        };
        let options = options().with_missing_target(MissingTargetPolicy::Abort);
        let (result, surface) = export_with(surface, options);

        assert!(matches!(
            result,
            Err(Error::RasterizationTargetMissing { ref key }) if key == "cover"
        ));
        assert!(surface.calls.iter().all(|c| c != "mount closing"));
        assert_eq!(&surface.calls[surface.calls.len() - 2..], &["unmount cover", "release"]);
    }

    #[test]
    fn test_commit_timeout_aborts_and_releases() {
        let surface = ScriptedSurface {
            never_commits: vec!["subregion-0"],
            ..Default::default()
        };
        let options = options().with_commit_timeout(Duration::from_millis(20));
        let (result, surface) = export_with(surface, options);

        assert!(matches!(result, Err(Error::RenderCommitTimeout { ref key }) if key == "subregion-0"));
        assert!(surface.calls.iter().all(|c| c != "rasterize subregion-0"));
        assert_eq!(surface.calls.last().unwrap(), "release");
        assert!(surface.pending.is_empty());
    }

    #[test]
    fn test_rasterize_failure_releases_surface() {
        let surface = ScriptedSurface {
            broken: vec!["summary"],
            ..Default::default()
        };
        let (result, surface) = export_with(surface, options());

        assert!(matches!(result, Err(Error::Surface(_))));
        assert_eq!(
            surface.calls,
            vec!["mount summary", "rasterize summary", "unmount summary", "release"]
        );
    }

    #[test]
    fn test_software_surface_export() {
        let deck_options = DeckOptions {
            capture: options(),
            text_color: "123456".to_string(),
            ..Default::default()
        };
        let mut exporter = CaptureRasterExporter::software(&deck_options);
        assert_eq!(exporter.surface().default_text(), opsdeck_core::Rgb(0x12, 0x34, 0x56));
        assert_eq!(exporter.options().canvas_width, 64);
        let document = exporter.export(&request(), &mut |_| {}).unwrap();
        assert!(document.skipped.is_empty());
        assert!(!exporter.surface().has_container());

        let pages = read_package(&document.bytes).unwrap();
        assert_eq!(pages.len(), document.page_keys.len());
    }

    #[test]
    fn test_encode_jpeg() {
        let image = RgbImage::from_pixel(8, 8, Rgb([255, 0, 0]));
        let jpeg = encode_jpeg(&image, 80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
