//! Layout to document tree, and document tree to package.

use crate::document::{Block, Document, Node, Page, PageSetup, ShapeNode, TextBlock, EMU_PER_POINT};
use opsdeck_core::layout::{Align, Frame, LayoutElement, Rgb, CANVAS_HEIGHT, CANVAS_WIDTH};
use opsdeck_core::{Result, SlideLayout};
use opsdeck_pptx::{Bounds, PptxWriter, Shape, SlideContent, TextAlign};

/// Maps layout units onto the content box of a page with a uniform scale,
/// centering the canvas inside the margins.
#[derive(Debug, Clone, Copy)]
pub struct CanvasMapping {
    /// EMU per layout unit.
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl CanvasMapping {
    pub fn new(setup: &PageSetup) -> Self {
        let content = setup.content_box();
        let scale = (content.cx as f64 / CANVAS_WIDTH as f64).min(content.cy as f64 / CANVAS_HEIGHT as f64);
        Self {
            scale,
            offset_x: content.x as f64 + (content.cx as f64 - CANVAS_WIDTH as f64 * scale) / 2.0,
            offset_y: content.y as f64 + (content.cy as f64 - CANVAS_HEIGHT as f64 * scale) / 2.0,
        }
    }

    pub fn bounds(&self, frame: &Frame) -> Bounds {
        Bounds::new(
            (self.offset_x + frame.x as f64 * self.scale).round() as i64,
            (self.offset_y + frame.y as f64 * self.scale).round() as i64,
            (frame.width as f64 * self.scale).round() as i64,
            (frame.height as f64 * self.scale).round() as i64,
        )
    }

    /// Font size in points for a size in layout units.
    pub fn points(&self, size: f32) -> f32 {
        (size as f64 * self.scale / EMU_PER_POINT as f64) as f32
    }
}

/// Build the page for one slide layout.
pub fn compose_page(layout: &SlideLayout, mapping: &CanvasMapping) -> Page {
    let mut page = Page::new(layout.key.as_str());
    for element in &layout.elements {
        match element {
            LayoutElement::Fill { color } => page.background = Some(*color),
            LayoutElement::Rect { frame, color, rounded } => page.blocks.push(Block::Shape(ShapeNode {
                bounds: mapping.bounds(frame),
                color: *color,
                rounded: *rounded,
            })),
            LayoutElement::Text { frame, text, style } => page.blocks.push(Block::Text(TextBlock {
                bounds: mapping.bounds(frame),
                text: text.clone(),
                size_pt: mapping.points(style.size),
                bold: style.bold,
                color: style.color,
                align: style.align,
            })),
        }
    }
    page
}

/// Build a document with one page per layout, in order.
pub fn compose(layouts: &[SlideLayout], setup: PageSetup, default_text_color: Rgb) -> Document {
    let mapping = CanvasMapping::new(&setup);
    let mut document = Document::new(setup, default_text_color);
    for layout in layouts {
        document.push_page(compose_page(layout, &mapping));
    }
    document
}

fn text_align(align: Align) -> TextAlign {
    match align {
        Align::Left => TextAlign::Left,
        Align::Center => TextAlign::Center,
        Align::Right => TextAlign::Right,
    }
}

fn page_shapes(page: &Page, default_text_color: Rgb) -> Vec<Shape> {
    page.blocks
        .iter()
        .map(|block| match block {
            Block::Shape(shape) => Shape::Rect {
                bounds: shape.bounds,
                color: shape.color.to_hex(),
                rounded: shape.rounded,
            },
            Block::Text(text) => Shape::Text {
                bounds: text.bounds,
                text: text.text.clone(),
                size: (text.size_pt * 100.0).round().max(100.0) as u32,
                bold: text.bold,
                color: text.color.unwrap_or(default_text_color).to_hex(),
                align: text_align(text.align),
            },
        })
        .collect()
}

/// Write a validated document out as a package.
pub fn render(document: &Document, title: &str) -> Result<Vec<u8>> {
    document.validate()?;

    let mut writer = PptxWriter::new().with_title(title);
    for node in &document.children {
        if let Node::Page(page) = node {
            writer.add_slide(
                page.name.as_str(),
                SlideContent::Shapes {
                    background: page.background.map(|c| c.to_hex()),
                    shapes: page_shapes(page, document.default_text_color),
                },
            );
        }
    }
    log::debug!("Rendering {} pages", writer.slide_count());
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_core::layout::TextStyle;
    use opsdeck_core::SlideKey;
    use opsdeck_pptx::read_package;

    fn layout(key: &str) -> SlideLayout {
        SlideLayout {
            key: SlideKey::new(key),
            elements: vec![
                LayoutElement::Fill { color: Rgb::PAPER },
                LayoutElement::Rect {
                    frame: Frame::new(0.0, 0.0, CANVAS_WIDTH, 160.0),
                    color: Rgb::BRAND,
                    rounded: false,
                },
                LayoutElement::Text {
                    frame: Frame::new(80.0, 40.0, 1200.0, 80.0),
                    text: format!("Título {}", key),
                    style: TextStyle::new(56.0).bold().color(Rgb::WHITE),
                },
                LayoutElement::Text {
                    frame: Frame::new(80.0, 300.0, 800.0, 60.0),
                    text: "corpo".to_string(),
                    style: TextStyle::new(30.0),
                },
            ],
        }
    }

    #[test]
    fn test_mapping_without_margins_is_exact() {
        let setup = PageSetup {
            margin: 0,
            ..Default::default()
        };
        let mapping = CanvasMapping::new(&setup);
        assert!((mapping.scale - 6350.0).abs() < 1e-9);
        assert_eq!(
            mapping.bounds(&Frame::new(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT)),
            Bounds::full_slide()
        );
        // 1 layout unit is half a point on a 13.333 in wide page.
        assert!((mapping.points(56.0) - 28.0).abs() < 1e-4);
    }

    #[test]
    fn test_mapping_respects_margins() {
        let setup = PageSetup::default();
        let mapping = CanvasMapping::new(&setup);
        let full = mapping.bounds(&Frame::new(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT));
        let content = setup.content_box();
        assert!(full.x >= content.x && full.y >= content.y);
        assert!(full.x + full.cx <= content.x + content.cx + 1);
        assert!(full.y + full.cy <= content.y + content.cy + 1);
    }

    #[test]
    fn test_compose_builds_pages_with_breaks() {
        let doc = compose(&[layout("cover"), layout("summary")], PageSetup::default(), Rgb::INK);
        assert_eq!(doc.page_count(), 2);
        assert!(matches!(doc.children[1], Node::PageBreak));

        let first = doc.pages().next().unwrap();
        assert_eq!(first.name, "cover");
        assert_eq!(first.background, Some(Rgb::PAPER));
        assert_eq!(first.blocks.len(), 3);
        assert_eq!(first.texts().count(), 2);
    }

    #[test]
    fn test_text_without_color_uses_document_default() {
        let doc = compose(&[layout("cover")], PageSetup::default(), Rgb(0x12, 0x34, 0x56));
        let page = doc.pages().next().unwrap();
        let shapes = page_shapes(page, doc.default_text_color);
        let colors: Vec<&str> = shapes
            .iter()
            .filter_map(|s| match s {
                Shape::Text { color, .. } => Some(color.as_str()),
                Shape::Rect { .. } => None,
            })
            .collect();
        assert_eq!(colors, vec!["FFFFFF", "123456"]);
    }

    #[test]
    fn test_render_keeps_page_order_and_text() {
        let doc = compose(&[layout("demand"), layout("cover")], PageSetup::default(), Rgb::INK);
        let bytes = render(&doc, "Relatorio").unwrap();
        let pages = read_package(&bytes).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].name, "demand");
        assert_eq!(pages[1].name, "cover");
        assert!(pages[0].texts.contains(&"Título demand".to_string()));
        assert!(pages.iter().all(|p| !p.has_picture));
    }

    #[test]
    fn test_render_rejects_empty_document() {
        let doc = compose(&[], PageSetup::default(), Rgb::INK);
        assert!(render(&doc, "vazio").is_err());
    }
}
