//! Core domain types, normalization, deltas, pagination and the slide deck
//! model for weekly operations comparison decks.

pub mod config;
pub mod deck;
pub mod diff;
pub mod error;
pub mod export;
pub mod format;
pub mod layout;
pub mod normalize;
pub mod paginate;
pub mod pipeline;
pub mod types;

pub use config::{CaptureOptions, DeckOptions, MissingTargetPolicy};
pub use deck::{
    Deck, DeckSlide, MediaSlide, Override, ResolvedSlide, SlideAssembler, SlideKey, SlidePayload,
    VisibilityFlags,
};
pub use diff::{delta_percent, headline_variation, Comparison, ComparisonItem, Delta, DiffEngine};
pub use error::{Error, Result};
pub use export::{DeckExporter, ExportProgress, ExportRequest, ExportedDocument};
pub use layout::{LayoutElement, Rgb, SlideLayout};
pub use normalize::DataNormalizer;
pub use paginate::{paginate, PageSizes, Paginator, SlidePage};
pub use pipeline::DeckPipeline;
pub use types::{CategoryRecord, Dimension, Metric, WeekId, WeeklySnapshot, UNNAMED_CATEGORY};
