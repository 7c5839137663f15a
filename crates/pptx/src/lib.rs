//! PPTX (Office Open XML) package writer shared by the export backends.
//!
//! Slides are 16:9 landscape. A slide is either a full-bleed picture or a set
//! of native shapes over a solid background.

pub mod parts;
pub mod reader;
pub mod writer;

pub use reader::{read_package, PackageSlide};
pub use writer::{Bounds, PptxWriter, Shape, SlideContent, TextAlign, SLIDE_HEIGHT_EMU, SLIDE_WIDTH_EMU};
