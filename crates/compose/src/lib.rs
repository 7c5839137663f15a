//! Declarative export backend.
//!
//! Builds a typed document tree (pages of text blocks and shapes over a
//! background, separated by page breaks) straight from the slide layouts and
//! writes it with native shapes, without rasterizing anything.

pub mod compose;
pub mod document;
pub mod exporter;

pub use compose::{compose, compose_page, render, CanvasMapping};
pub use document::{Block, Document, Node, Orientation, Page, PageSetup, ShapeNode, TextBlock};
pub use exporter::DeclarativeDocumentExporter;
