//! Contract shared by the export backends.
//!
//! An export works on an [`ExportRequest`], an owned snapshot of the deck
//! taken when the export starts. Changes made to the deck afterwards do not
//! affect an export in flight.

use crate::deck::{Deck, ResolvedSlide, SlideKey};
use crate::error::{Error, Result};
use crate::layout::{layout_deck, SlideLayout};
use crate::types::WeekId;

/// File extension of exported documents.
pub const DOCUMENT_EXTENSION: &str = "pptx";

/// A week label made safe for a file name: anything but letters, digits
/// and `-` becomes `_`.
fn file_name_part(week: Option<&WeekId>) -> String {
    week.map(|w| w.label())
        .unwrap_or("")
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn week_bounds(weeks: &[WeekId]) -> (String, String) {
    (file_name_part(weeks.first()), file_name_part(weeks.last()))
}

/// `Comparativo_Semana44_vs_Semana45.pptx`
pub fn capture_file_name(weeks: &[WeekId]) -> String {
    let (first, last) = week_bounds(weeks);
    format!(
        "Comparativo_Semana{}_vs_Semana{}.{}",
        first, last, DOCUMENT_EXTENSION
    )
}

/// `Relatorio_Semanas_44_45.pptx`
pub fn declarative_file_name(weeks: &[WeekId]) -> String {
    let (first, last) = week_bounds(weeks);
    format!("Relatorio_Semanas_{}_{}.{}", first, last, DOCUMENT_EXTENSION)
}

/// The deck as read at export start.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub weeks: Vec<WeekId>,
    pub slides: Vec<ResolvedSlide>,
}

impl ExportRequest {
    /// Snapshot the deck's resolved slides.
    pub fn from_deck(deck: &Deck) -> Result<Self> {
        Self::new(deck.weeks().to_vec(), deck.resolved())
    }

    pub fn new(weeks: Vec<WeekId>, slides: Vec<ResolvedSlide>) -> Result<Self> {
        if weeks.is_empty() {
            return Err(Error::InvalidInput("No weeks selected".to_string()));
        }
        if slides.is_empty() {
            return Err(Error::InvalidInput("The deck has no visible slides".to_string()));
        }
        Ok(Self { weeks, slides })
    }

    /// Abstract layout of every slide, in export order.
    pub fn layouts(&self) -> Vec<SlideLayout> {
        layout_deck(&self.slides)
    }

    pub fn keys(&self) -> Vec<SlideKey> {
        self.slides.iter().map(|s| s.key.clone()).collect()
    }
}

/// `(current, total)` progress, reported after each slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
}

/// A finished document ready to be handed to the user.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Keys of the slides in the document, in page order.
    pub page_keys: Vec<SlideKey>,
    /// Slides left out under the skip policy.
    pub skipped: Vec<SlideKey>,
}

/// An export backend. Both backends fail the same way: an error aborts the
/// export and nothing partial is returned.
pub trait DeckExporter {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn export(
        &mut self,
        request: &ExportRequest,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> Result<ExportedDocument>;
}
