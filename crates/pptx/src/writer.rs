//! PPTX package writer.

use crate::parts;
use opsdeck_core::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Slide width in EMU (13.333 in, 16:9 landscape).
pub const SLIDE_WIDTH_EMU: i64 = 12_192_000;
/// Slide height in EMU (7.5 in).
pub const SLIDE_HEIGHT_EMU: i64 = 6_858_000;

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    fn as_attr(&self) -> &'static str {
        match self {
            TextAlign::Left => "l",
            TextAlign::Center => "ctr",
            TextAlign::Right => "r",
        }
    }
}

/// Position and size in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Bounds {
    pub fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self { x, y, cx, cy }
    }

    /// The whole slide.
    pub fn full_slide() -> Self {
        Self::new(0, 0, SLIDE_WIDTH_EMU, SLIDE_HEIGHT_EMU)
    }
}

/// A native shape on a slide.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A solid rectangle.
    Rect {
        bounds: Bounds,
        /// `RRGGBB`.
        color: String,
        rounded: bool,
    },
    /// A text box. Lines split on `\n` become paragraphs.
    Text {
        bounds: Bounds,
        text: String,
        /// Font size in hundredths of a point.
        size: u32,
        bold: bool,
        /// `RRGGBB`.
        color: String,
        align: TextAlign,
    },
}

/// Content of one slide.
#[derive(Debug, Clone, PartialEq)]
pub enum SlideContent {
    /// A full-bleed JPEG image.
    Picture { jpeg: Vec<u8> },
    /// Native shapes over an optional solid background.
    Shapes {
        background: Option<String>,
        shapes: Vec<Shape>,
    },
}

#[derive(Debug, Clone)]
struct PendingSlide {
    name: String,
    content: SlideContent,
}

/// Accumulates slides and writes them out as a `.pptx` package.
#[derive(Debug, Clone, Default)]
pub struct PptxWriter {
    title: String,
    slides: Vec<PendingSlide>,
}

impl PptxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document title stored in the core properties.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Append a slide. `name` is stored as the slide name and identifies the
    /// page when the package is read back.
    pub fn add_slide(&mut self, name: impl Into<String>, content: SlideContent) {
        self.slides.push(PendingSlide {
            name: name.into(),
            content,
        });
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Write the package into memory.
    pub fn finish(self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);

        add_part(&mut zip, "[Content_Types].xml", &self.content_types()?, deflated)?;
        add_part(&mut zip, "_rels/.rels", &package_rels()?, deflated)?;
        add_part(&mut zip, "docProps/core.xml", &self.core_properties()?, deflated)?;
        add_part(&mut zip, "ppt/presentation.xml", &self.presentation()?, deflated)?;
        add_part(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            &self.presentation_rels()?,
            deflated,
        )?;
        add_part(&mut zip, "ppt/slideMasters/slideMaster1.xml", parts::SLIDE_MASTER.as_bytes(), deflated)?;
        add_part(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            parts::SLIDE_MASTER_RELS.as_bytes(),
            deflated,
        )?;
        add_part(&mut zip, "ppt/slideLayouts/slideLayout1.xml", parts::SLIDE_LAYOUT.as_bytes(), deflated)?;
        add_part(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            parts::SLIDE_LAYOUT_RELS.as_bytes(),
            deflated,
        )?;
        add_part(&mut zip, "ppt/theme/theme1.xml", parts::THEME.as_bytes(), deflated)?;

        for (index, slide) in self.slides.iter().enumerate() {
            let number = index + 1;
            let has_picture = matches!(slide.content, SlideContent::Picture { .. });
            add_part(
                &mut zip,
                &format!("ppt/slides/slide{}.xml", number),
                &slide_xml(slide)?,
                deflated,
            )?;
            add_part(
                &mut zip,
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                &slide_rels(number, has_picture)?,
                deflated,
            )?;
            if let SlideContent::Picture { jpeg } = &slide.content {
                // JPEG data is already compressed.
                add_part(&mut zip, &format!("ppt/media/image{}.jpeg", number), jpeg, stored)?;
            }
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish package: {}", e)))?;
        log::debug!("Wrote PPTX package with {} slides", self.slides.len());
        Ok(cursor.into_inner())
    }

    fn content_types(&self) -> Result<Vec<u8>> {
        let mut xml = Xml::new()?;
        xml.open("Types", &[("xmlns", parts::NS_CONTENT_TYPES)])?;
        xml.empty("Default", &[("Extension", "rels"), ("ContentType", parts::CT_RELATIONSHIPS)])?;
        xml.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
        xml.empty("Default", &[("Extension", "jpeg"), ("ContentType", "image/jpeg")])?;
        xml.empty(
            "Override",
            &[("PartName", "/ppt/presentation.xml"), ("ContentType", parts::CT_PRESENTATION)],
        )?;
        xml.empty(
            "Override",
            &[
                ("PartName", "/ppt/slideMasters/slideMaster1.xml"),
                ("ContentType", parts::CT_SLIDE_MASTER),
            ],
        )?;
        xml.empty(
            "Override",
            &[
                ("PartName", "/ppt/slideLayouts/slideLayout1.xml"),
                ("ContentType", parts::CT_SLIDE_LAYOUT),
            ],
        )?;
        xml.empty(
            "Override",
            &[("PartName", "/ppt/theme/theme1.xml"), ("ContentType", parts::CT_THEME)],
        )?;
        xml.empty(
            "Override",
            &[("PartName", "/docProps/core.xml"), ("ContentType", parts::CT_CORE_PROPERTIES)],
        )?;
        for number in 1..=self.slides.len() {
            let part = format!("/ppt/slides/slide{}.xml", number);
            xml.empty("Override", &[("PartName", part.as_str()), ("ContentType", parts::CT_SLIDE)])?;
        }
        xml.close("Types")?;
        Ok(xml.into_bytes())
    }

    fn core_properties(&self) -> Result<Vec<u8>> {
        let mut xml = Xml::new()?;
        xml.open(
            "cp:coreProperties",
            &[
                (
                    "xmlns:cp",
                    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
                ),
                ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ],
        )?;
        xml.open("dc:title", &[])?;
        xml.text(&self.title)?;
        xml.close("dc:title")?;
        xml.close("cp:coreProperties")?;
        Ok(xml.into_bytes())
    }

    fn presentation(&self) -> Result<Vec<u8>> {
        let mut xml = Xml::new()?;
        xml.open(
            "p:presentation",
            &[("xmlns:a", parts::NS_A), ("xmlns:r", parts::NS_R), ("xmlns:p", parts::NS_P)],
        )?;
        xml.open("p:sldMasterIdLst", &[])?;
        xml.empty("p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
        xml.close("p:sldMasterIdLst")?;

        if !self.slides.is_empty() {
            xml.open("p:sldIdLst", &[])?;
            for index in 0..self.slides.len() {
                let id = (256 + index).to_string();
                let rel = slide_rel_id(index);
                xml.empty("p:sldId", &[("id", id.as_str()), ("r:id", rel.as_str())])?;
            }
            xml.close("p:sldIdLst")?;
        }

        let cx = SLIDE_WIDTH_EMU.to_string();
        let cy = SLIDE_HEIGHT_EMU.to_string();
        xml.empty("p:sldSz", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
        xml.empty("p:notesSz", &[("cx", "6858000"), ("cy", "9144000")])?;
        xml.close("p:presentation")?;
        Ok(xml.into_bytes())
    }

    fn presentation_rels(&self) -> Result<Vec<u8>> {
        let mut xml = Xml::new()?;
        xml.open("Relationships", &[("xmlns", parts::NS_RELS)])?;
        relationship(&mut xml, "rId1", parts::REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml")?;
        relationship(&mut xml, "rId2", parts::REL_THEME, "theme/theme1.xml")?;
        for index in 0..self.slides.len() {
            let target = format!("slides/slide{}.xml", index + 1);
            relationship(&mut xml, &slide_rel_id(index), parts::REL_SLIDE, &target)?;
        }
        xml.close("Relationships")?;
        Ok(xml.into_bytes())
    }
}

/// Relationship id of the slide at `index` in the presentation part. `rId1`
/// and `rId2` belong to the master and the theme.
fn slide_rel_id(index: usize) -> String {
    format!("rId{}", index + 3)
}

fn add_part<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    path: &str,
    bytes: &[u8],
    options: FileOptions,
) -> Result<()> {
    zip.start_file(path, options)
        .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", path, e)))?;
    zip.write_all(bytes)?;
    Ok(())
}

fn package_rels() -> Result<Vec<u8>> {
    let mut xml = Xml::new()?;
    xml.open("Relationships", &[("xmlns", parts::NS_RELS)])?;
    relationship(&mut xml, "rId1", parts::REL_OFFICE_DOCUMENT, "ppt/presentation.xml")?;
    relationship(&mut xml, "rId2", parts::REL_CORE_PROPERTIES, "docProps/core.xml")?;
    xml.close("Relationships")?;
    Ok(xml.into_bytes())
}

fn slide_rels(number: usize, has_picture: bool) -> Result<Vec<u8>> {
    let mut xml = Xml::new()?;
    xml.open("Relationships", &[("xmlns", parts::NS_RELS)])?;
    relationship(&mut xml, "rId1", parts::REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml")?;
    if has_picture {
        let target = format!("../media/image{}.jpeg", number);
        relationship(&mut xml, "rId2", parts::REL_IMAGE, &target)?;
    }
    xml.close("Relationships")?;
    Ok(xml.into_bytes())
}

fn relationship(xml: &mut Xml, id: &str, rel_type: &str, target: &str) -> Result<()> {
    xml.empty("Relationship", &[("Id", id), ("Type", rel_type), ("Target", target)])
}

fn slide_xml(slide: &PendingSlide) -> Result<Vec<u8>> {
    let mut xml = Xml::new()?;
    xml.open(
        "p:sld",
        &[("xmlns:a", parts::NS_A), ("xmlns:r", parts::NS_R), ("xmlns:p", parts::NS_P)],
    )?;
    xml.open("p:cSld", &[("name", slide.name.as_str())])?;

    if let SlideContent::Shapes {
        background: Some(color),
        ..
    } = &slide.content
    {
        xml.open("p:bg", &[])?;
        xml.open("p:bgPr", &[])?;
        solid_fill(&mut xml, color)?;
        xml.empty("a:effectLst", &[])?;
        xml.close("p:bgPr")?;
        xml.close("p:bg")?;
    }

    xml.open("p:spTree", &[])?;
    xml.open("p:nvGrpSpPr", &[])?;
    xml.empty("p:cNvPr", &[("id", "1"), ("name", "")])?;
    xml.empty("p:cNvGrpSpPr", &[])?;
    xml.empty("p:nvPr", &[])?;
    xml.close("p:nvGrpSpPr")?;
    xml.open("p:grpSpPr", &[])?;
    xml.open("a:xfrm", &[])?;
    xml.empty("a:off", &[("x", "0"), ("y", "0")])?;
    xml.empty("a:ext", &[("cx", "0"), ("cy", "0")])?;
    xml.empty("a:chOff", &[("x", "0"), ("y", "0")])?;
    xml.empty("a:chExt", &[("cx", "0"), ("cy", "0")])?;
    xml.close("a:xfrm")?;
    xml.close("p:grpSpPr")?;

    match &slide.content {
        SlideContent::Picture { .. } => picture(&mut xml)?,
        SlideContent::Shapes { shapes, .. } => {
            for (index, shape) in shapes.iter().enumerate() {
                // Id 1 is the group, 2.. are shapes.
                write_shape(&mut xml, index + 2, shape)?;
            }
        }
    }

    xml.close("p:spTree")?;
    xml.close("p:cSld")?;
    xml.open("p:clrMapOvr", &[])?;
    xml.empty("a:masterClrMapping", &[])?;
    xml.close("p:clrMapOvr")?;
    xml.close("p:sld")?;
    Ok(xml.into_bytes())
}

fn transform(xml: &mut Xml, bounds: &Bounds) -> Result<()> {
    let (x, y, cx, cy) = (
        bounds.x.to_string(),
        bounds.y.to_string(),
        bounds.cx.max(0).to_string(),
        bounds.cy.max(0).to_string(),
    );
    xml.open("a:xfrm", &[])?;
    xml.empty("a:off", &[("x", x.as_str()), ("y", y.as_str())])?;
    xml.empty("a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    xml.close("a:xfrm")
}

fn geometry(xml: &mut Xml, preset: &str) -> Result<()> {
    xml.open("a:prstGeom", &[("prst", preset)])?;
    xml.empty("a:avLst", &[])?;
    xml.close("a:prstGeom")
}

fn solid_fill(xml: &mut Xml, color: &str) -> Result<()> {
    xml.open("a:solidFill", &[])?;
    xml.empty("a:srgbClr", &[("val", color)])?;
    xml.close("a:solidFill")
}

fn picture(xml: &mut Xml) -> Result<()> {
    xml.open("p:pic", &[])?;
    xml.open("p:nvPicPr", &[])?;
    xml.empty("p:cNvPr", &[("id", "2"), ("name", "Slide capture")])?;
    xml.open("p:cNvPicPr", &[])?;
    xml.empty("a:picLocks", &[("noChangeAspect", "1")])?;
    xml.close("p:cNvPicPr")?;
    xml.empty("p:nvPr", &[])?;
    xml.close("p:nvPicPr")?;
    xml.open("p:blipFill", &[])?;
    xml.empty("a:blip", &[("r:embed", "rId2")])?;
    xml.open("a:stretch", &[])?;
    xml.empty("a:fillRect", &[])?;
    xml.close("a:stretch")?;
    xml.close("p:blipFill")?;
    xml.open("p:spPr", &[])?;
    transform(xml, &Bounds::full_slide())?;
    geometry(xml, "rect")?;
    xml.close("p:spPr")?;
    xml.close("p:pic")
}

fn write_shape(xml: &mut Xml, id: usize, shape: &Shape) -> Result<()> {
    let id = id.to_string();
    xml.open("p:sp", &[])?;
    xml.open("p:nvSpPr", &[])?;

    match shape {
        Shape::Rect { bounds, color, rounded } => {
            let name = format!("Shape {}", id);
            xml.empty("p:cNvPr", &[("id", id.as_str()), ("name", name.as_str())])?;
            xml.empty("p:cNvSpPr", &[])?;
            xml.empty("p:nvPr", &[])?;
            xml.close("p:nvSpPr")?;
            xml.open("p:spPr", &[])?;
            transform(xml, bounds)?;
            geometry(xml, if *rounded { "roundRect" } else { "rect" })?;
            solid_fill(xml, color)?;
            xml.open("a:ln", &[])?;
            xml.empty("a:noFill", &[])?;
            xml.close("a:ln")?;
            xml.close("p:spPr")?;
        }
        Shape::Text {
            bounds,
            text,
            size,
            bold,
            color,
            align,
        } => {
            let name = format!("Text {}", id);
            xml.empty("p:cNvPr", &[("id", id.as_str()), ("name", name.as_str())])?;
            xml.empty("p:cNvSpPr", &[("txBox", "1")])?;
            xml.empty("p:nvPr", &[])?;
            xml.close("p:nvSpPr")?;
            xml.open("p:spPr", &[])?;
            transform(xml, bounds)?;
            geometry(xml, "rect")?;
            xml.empty("a:noFill", &[])?;
            xml.close("p:spPr")?;

            let size = size.to_string();
            let bold = if *bold { "1" } else { "0" };
            xml.open("p:txBody", &[])?;
            xml.empty(
                "a:bodyPr",
                &[
                    ("wrap", "square"),
                    ("lIns", "0"),
                    ("tIns", "0"),
                    ("rIns", "0"),
                    ("bIns", "0"),
                    ("anchor", "ctr"),
                ],
            )?;
            xml.empty("a:lstStyle", &[])?;
            for line in text.split('\n') {
                xml.open("a:p", &[])?;
                xml.empty("a:pPr", &[("algn", align.as_attr())])?;
                xml.open("a:r", &[])?;
                xml.open("a:rPr", &[("lang", "pt-BR"), ("sz", size.as_str()), ("b", bold), ("dirty", "0")])?;
                solid_fill(xml, color)?;
                xml.close("a:rPr")?;
                xml.open("a:t", &[])?;
                xml.text(line)?;
                xml.close("a:t")?;
                xml.close("a:r")?;
                xml.close("a:p")?;
            }
            xml.close("p:txBody")?;
        }
    }

    xml.close("p:sp")
}

/// Thin wrapper over the quick-xml writer that maps errors into ours.
struct Xml {
    writer: Writer<Vec<u8>>,
}

impl Xml {
    fn new() -> Result<Self> {
        let mut xml = Self {
            writer: Writer::new(Vec::new()),
        };
        xml.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(xml)
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::XmlError(format!("Failed to write XML: {}", e)))
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.write(Event::Start(BytesStart::new(name).with_attributes(attrs.iter().copied())))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.write(Event::Empty(BytesStart::new(name).with_attributes(attrs.iter().copied())))
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.write(Event::Text(BytesText::new(text)))
    }

    fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}
