//! Declarative export backend.

use crate::compose::{compose, render};
use crate::document::PageSetup;
use opsdeck_core::export::declarative_file_name;
use opsdeck_core::{
    DeckExporter, DeckOptions, ExportProgress, ExportRequest, ExportedDocument, Result, Rgb,
};

/// Builds a document tree from the slide layouts and writes it out as native
/// shapes. Runs synchronously; nothing is rasterized.
#[derive(Debug, Clone)]
pub struct DeclarativeDocumentExporter {
    setup: PageSetup,
    default_text_color: Rgb,
}

impl Default for DeclarativeDocumentExporter {
    fn default() -> Self {
        Self {
            setup: PageSetup::default(),
            default_text_color: Rgb::INK,
        }
    }
}

impl DeclarativeDocumentExporter {
    pub fn new(options: &DeckOptions) -> Self {
        Self {
            default_text_color: options.text_color(),
            ..Default::default()
        }
    }

    pub fn with_page_setup(mut self, setup: PageSetup) -> Self {
        self.setup = setup;
        self
    }

    pub fn page_setup(&self) -> &PageSetup {
        &self.setup
    }
}

impl DeckExporter for DeclarativeDocumentExporter {
    fn name(&self) -> &'static str {
        "declarative"
    }

    fn export(
        &mut self,
        request: &ExportRequest,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> Result<ExportedDocument> {
        let layouts = request.layouts();
        let file_name = declarative_file_name(&request.weeks);
        log::info!("Composing {} pages into {}", layouts.len(), file_name);

        let document = compose(&layouts, self.setup, self.default_text_color);
        let total = document.page_count();
        for current in 1..=total {
            progress(ExportProgress { current, total });
        }

        let bytes = render(&document, file_name.trim_end_matches(".pptx"))?;
        log::info!("Composed {} pages, {} bytes", total, bytes.len());

        Ok(ExportedDocument {
            file_name,
            bytes,
            page_keys: request.keys(),
            skipped: Vec::new(),
        })
    }
}
