//! Declarative document tree.
//!
//! A [`Document`] is a flat list of pages separated by explicit page breaks.
//! Every page shares one physical size, orientation and margin, and text
//! without its own color uses the document's default text color.

use opsdeck_core::layout::{Align, Rgb};
use opsdeck_core::{Error, Result};
use opsdeck_pptx::{Bounds, SLIDE_HEIGHT_EMU, SLIDE_WIDTH_EMU};

/// EMU per inch.
pub const EMU_PER_INCH: i64 = 914_400;
/// EMU per typographic point.
pub const EMU_PER_POINT: i64 = 12_700;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

/// Physical page format shared by every page of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSetup {
    /// Long edge in EMU.
    pub long_edge: i64,
    /// Short edge in EMU.
    pub short_edge: i64,
    pub orientation: Orientation,
    /// Margin on every side, in EMU.
    pub margin: i64,
}

impl Default for PageSetup {
    /// 13.333 x 7.5 in landscape, quarter-inch margins.
    fn default() -> Self {
        Self {
            long_edge: SLIDE_WIDTH_EMU,
            short_edge: SLIDE_HEIGHT_EMU,
            orientation: Orientation::Landscape,
            margin: EMU_PER_INCH / 4,
        }
    }
}

impl PageSetup {
    pub fn width(&self) -> i64 {
        match self.orientation {
            Orientation::Landscape => self.long_edge,
            Orientation::Portrait => self.short_edge,
        }
    }

    pub fn height(&self) -> i64 {
        match self.orientation {
            Orientation::Landscape => self.short_edge,
            Orientation::Portrait => self.long_edge,
        }
    }

    /// The area inside the margins.
    pub fn content_box(&self) -> Bounds {
        Bounds::new(
            self.margin,
            self.margin,
            (self.width() - 2 * self.margin).max(0),
            (self.height() - 2 * self.margin).max(0),
        )
    }
}

/// A positioned solid shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeNode {
    pub bounds: Bounds,
    pub color: Rgb,
    pub rounded: bool,
}

/// A positioned block of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub bounds: Bounds,
    pub text: String,
    pub size_pt: f32,
    pub bold: bool,
    /// `None` uses the document default.
    pub color: Option<Rgb>,
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Shape(ShapeNode),
    Text(TextBlock),
}

/// One page and everything drawn on it, back to front.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Identifies the page in the output package.
    pub name: String,
    pub background: Option<Rgb>,
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            background: None,
            blocks: Vec::new(),
        }
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Text(t) => Some(t),
            Block::Shape(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Page(Page),
    PageBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub setup: PageSetup,
    pub default_text_color: Rgb,
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(setup: PageSetup, default_text_color: Rgb) -> Self {
        Self {
            setup,
            default_text_color,
            children: Vec::new(),
        }
    }

    /// Append a page, inserting a page break if the document already has
    /// content.
    pub fn push_page(&mut self, page: Page) {
        if !self.children.is_empty() {
            self.children.push(Node::PageBreak);
        }
        self.children.push(Node::Page(page));
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.children.iter().filter_map(|n| match n {
            Node::Page(p) => Some(p),
            Node::PageBreak => None,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages().count()
    }

    /// Check that the tree alternates page, break, page, ... and is not empty.
    pub fn validate(&self) -> Result<()> {
        if self.children.is_empty() {
            return Err(Error::DocumentAssembly("Document has no pages".to_string()));
        }
        let mut expect_page = true;
        for (i, node) in self.children.iter().enumerate() {
            match (node, expect_page) {
                (Node::Page(_), true) | (Node::PageBreak, false) => expect_page = !expect_page,
                (Node::Page(_), false) => {
                    return Err(Error::DocumentAssembly(format!(
                        "Missing page break before node {}",
                        i
                    )))
                }
                (Node::PageBreak, true) => {
                    return Err(Error::DocumentAssembly(format!(
                        "Page break at node {} has no page before or after it",
                        i
                    )))
                }
            }
        }
        if expect_page {
            return Err(Error::DocumentAssembly(
                "Document ends with a page break".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_setup_orientation() {
        let landscape = PageSetup::default();
        assert!(landscape.width() > landscape.height());

        let portrait = PageSetup {
            orientation: Orientation::Portrait,
            ..landscape
        };
        assert_eq!(portrait.width(), landscape.height());

        let content = landscape.content_box();
        assert_eq!(content.x, EMU_PER_INCH / 4);
        assert_eq!(content.cx, SLIDE_WIDTH_EMU - EMU_PER_INCH / 2);
    }

    #[test]
    fn test_push_page_inserts_breaks() {
        let mut doc = Document::new(PageSetup::default(), Rgb::INK);
        doc.push_page(Page::new("a"));
        doc.push_page(Page::new("b"));
        assert_eq!(doc.children.len(), 3);
        assert_eq!(doc.children[1], Node::PageBreak);
        assert_eq!(doc.page_count(), 2);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_trees() {
        let mut doc = Document::new(PageSetup::default(), Rgb::INK);
        assert!(doc.validate().is_err());

        doc.children = vec![Node::Page(Page::new("a")), Node::PageBreak];
        assert!(matches!(doc.validate(), Err(Error::DocumentAssembly(_))));

        doc.children = vec![Node::Page(Page::new("a")), Node::Page(Page::new("b"))];
        assert!(doc.validate().is_err());

        doc.children = vec![Node::PageBreak, Node::Page(Page::new("a"))];
        assert!(doc.validate().is_err());
    }
}
