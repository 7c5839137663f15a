//! Deck and export options.
//!
//! Options can be built in code with the `with_*` methods or loaded from a
//! JSON file. Missing fields fall back to their defaults.

use crate::error::{Error, Result};
use crate::layout::Rgb;
use crate::paginate::PageSizes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What the capture exporter does when a mounted slide has no capture target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingTargetPolicy {
    /// Log the slide, leave it out of the document and continue.
    #[default]
    Skip,
    /// Stop the export with [`Error::RasterizationTargetMissing`].
    Abort,
}

/// Settings for the capture backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureOptions {
    /// Virtual canvas width in pixels, identical for every slide.
    pub canvas_width: u32,
    /// Virtual canvas height in pixels, identical for every slide.
    pub canvas_height: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    pub missing_target: MissingTargetPolicy,
    /// How long to wait for the surface to report a committed render.
    pub commit_timeout_ms: u64,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            canvas_width: 1920,
            canvas_height: 1080,
            jpeg_quality: 92,
            missing_target: MissingTargetPolicy::Skip,
            commit_timeout_ms: 5_000,
        }
    }
}

impl CaptureOptions {
    pub fn with_missing_target(mut self, policy: MissingTargetPolicy) -> Self {
        self.missing_target = policy;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

/// Options for assembling and exporting a deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeckOptions {
    pub page_sizes: PageSizes,
    pub capture: CaptureOptions,
    /// Default text color of exported documents, as `RRGGBB`.
    pub text_color: String,
}

impl Default for DeckOptions {
    fn default() -> Self {
        Self {
            page_sizes: PageSizes::default(),
            capture: CaptureOptions::default(),
            text_color: "1F2937".to_string(),
        }
    }
}

impl DeckOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse options from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid options: {}", e)))
    }

    pub fn with_page_sizes(mut self, sizes: PageSizes) -> Self {
        self.page_sizes = sizes;
        self
    }

    pub fn with_capture(mut self, capture: CaptureOptions) -> Self {
        self.capture = capture;
        self
    }

    /// Default text color, falling back to near-black on a malformed value.
    pub fn text_color(&self) -> Rgb {
        Rgb::from_hex(&self.text_color).unwrap_or(Rgb::INK)
    }
}
