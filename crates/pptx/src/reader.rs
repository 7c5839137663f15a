//! Reads an exported package back into a slide summary.
//!
//! Used to verify exported documents: page order, slide names and text.

use opsdeck_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

/// What a slide of a package contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSlide {
    /// 1-based slide number in presentation order.
    pub number: usize,
    /// Slide name (`p:cSld/@name`).
    pub name: String,
    /// Text runs, one entry per paragraph.
    pub texts: Vec<String>,
    pub has_picture: bool,
}

/// Read every slide of a package, in presentation order.
pub fn read_package(bytes: &[u8]) -> Result<Vec<PackageSlide>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

    let slide_order = slide_order(&mut archive)?;
    slide_order
        .iter()
        .enumerate()
        .map(|(idx, path)| {
            let content = read_file_from_archive(&mut archive, path)?;
            parse_slide(&content, idx + 1)
        })
        .collect()
}

/// Slide paths from the presentation relationships, sorted by relationship id.
fn slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let rels_content = read_file_from_archive(archive, "ppt/_rels/presentation.xml.rels")?;
    let mut slides: Vec<(String, Option<usize>)> = Vec::new();

    let mut reader = Reader::from_str(&rels_content);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"Relationship" => {
                let mut rel_type = String::new();
                let mut target = String::new();
                let mut id = String::new();

                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Type" => rel_type = value,
                        b"Target" => target = value,
                        b"Id" => id = value,
                        _ => {}
                    }
                }

                if rel_type.ends_with("/slide") {
                    slides.push((format!("ppt/{}", target), trailing_number(&id)));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    Ok(slides.into_iter().map(|(path, _)| path).collect())
}

fn parse_slide(xml_content: &str, number: usize) -> Result<PackageSlide> {
    let mut slide = PackageSlide {
        number,
        name: String::new(),
        texts: Vec::new(),
        has_picture: false,
    };

    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(false);
    let mut in_text = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"cSld" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"name" {
                            slide.name = String::from_utf8_lossy(&attr.value).to_string();
                        }
                    }
                }
                b"pic" => slide.has_picture = true,
                b"p" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::XmlError(format!("Bad text in slide {}: {}", number, e)))?;
                current.push_str(&text);
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_text = false,
                b"p" if !current.is_empty() => slide.texts.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing slide {}: {}", number, e)));
            }
            _ => {}
        }
    }

    Ok(slide)
}

fn read_file_from_archive<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Digits at the end of a string like `rId12`.
fn trailing_number(s: &str) -> Option<usize> {
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.chars().rev().collect::<String>().parse().ok()
}
