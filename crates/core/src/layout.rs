//! Abstract slide layout shared by both export backends.
//!
//! Every resolved slide is turned into a flat list of positioned elements on
//! a fixed 1920x1080 virtual canvas. The capture backend paints these
//! elements into pixels; the compositor maps them onto document nodes. Only
//! that last step differs between the two.

use crate::deck::{ResolvedSlide, SlideKey, SlidePayload};
use crate::diff::{headline_variation, ComparisonItem, Delta};
use crate::format::{self, Trend};
use crate::paginate::SlidePage;
use crate::types::{CategoryRecord, Metric, WeekId};
use serde::{Deserialize, Serialize};

/// Virtual canvas width in layout units.
pub const CANVAS_WIDTH: f32 = 1920.0;
/// Virtual canvas height in layout units.
pub const CANVAS_HEIGHT: f32 = 1080.0;

const MARGIN: f32 = 80.0;
const GAP: f32 = 40.0;
const HEADER_HEIGHT: f32 = 160.0;
const BODY_TOP: f32 = 220.0;
const BODY_BOTTOM: f32 = 960.0;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);
    pub const INK: Rgb = Rgb(0x1F, 0x29, 0x37);
    pub const MUTED: Rgb = Rgb(0x64, 0x74, 0x8B);
    pub const PAPER: Rgb = Rgb(0xF1, 0xF5, 0xF9);
    pub const BRAND: Rgb = Rgb(0x0F, 0x3D, 0x5E);
    pub const BRAND_LIGHT: Rgb = Rgb(0xCB, 0xD5, 0xE1);
    pub const ACCENT: Rgb = Rgb(0xF5, 0x9E, 0x0B);
    pub const UP: Rgb = Rgb(0x16, 0xA3, 0x4A);
    pub const DOWN: Rgb = Rgb(0xDC, 0x26, 0x26);
    pub const NEUTRAL: Rgb = Rgb(0x94, 0xA3, 0xB8);

    /// Parse `RRGGBB`, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Uppercase `RRGGBB`.
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    fn for_trend(trend: Trend) -> Self {
        match trend {
            Trend::Up => Rgb::UP,
            Trend::Down => Rgb::DOWN,
            Trend::Neutral => Rgb::NEUTRAL,
        }
    }
}

/// A rectangle in layout units, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Frame {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font size in layout units.
    pub size: f32,
    pub bold: bool,
    /// `None` uses the document's default text color.
    pub color: Option<Rgb>,
    pub align: Align,
}

impl TextStyle {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            bold: false,
            color: None,
            align: Align::Left,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }
}

/// One positioned element of a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayoutElement {
    /// Background fill covering the whole slide.
    Fill { color: Rgb },
    Rect { frame: Frame, color: Rgb, rounded: bool },
    Text { frame: Frame, text: String, style: TextStyle },
}

/// The laid-out form of one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideLayout {
    pub key: SlideKey,
    pub elements: Vec<LayoutElement>,
}

impl SlideLayout {
    /// All text on the slide, in element order.
    pub fn texts(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                LayoutElement::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

struct Canvas {
    elements: Vec<LayoutElement>,
}

impl Canvas {
    fn new(background: Rgb) -> Self {
        Self {
            elements: vec![LayoutElement::Fill { color: background }],
        }
    }

    fn rect(&mut self, frame: Frame, color: Rgb, rounded: bool) {
        self.elements.push(LayoutElement::Rect { frame, color, rounded });
    }

    fn text(&mut self, frame: Frame, text: impl Into<String>, style: TextStyle) {
        self.elements.push(LayoutElement::Text {
            frame,
            text: text.into(),
            style,
        });
    }

    /// Colored badge with centered white text.
    fn badge(&mut self, frame: Frame, text: String, trend: Trend, size: f32) {
        self.rect(frame, Rgb::for_trend(trend), true);
        self.text(
            frame,
            text,
            TextStyle::new(size).bold().color(Rgb::WHITE).align(Align::Center),
        );
    }
}

fn week_label(weeks: &[WeekId], index: usize) -> String {
    weeks
        .get(index)
        .map(|w| format!("Semana {}", w.label()))
        .unwrap_or_else(|| format!("Semana #{}", index + 1))
}

fn short_week(weeks: &[WeekId], index: usize) -> String {
    weeks
        .get(index)
        .map(|w| w.label().to_string())
        .unwrap_or_else(|| format!("#{}", index + 1))
}

/// Lay out one slide. `position` is 0-based within a deck of `total` slides.
pub fn layout_slide(slide: &ResolvedSlide, position: usize, total: usize) -> SlideLayout {
    let elements = match &slide.payload {
        SlidePayload::Cover { .. } | SlidePayload::Closing => title_slide(slide),
        SlidePayload::Summary { weeks, totals } => {
            let mut canvas = standard_slide(slide, position, total);
            summary_body(&mut canvas, weeks, totals);
            canvas.elements
        }
        SlidePayload::Page { weeks, page } => {
            let mut canvas = standard_slide(slide, position, total);
            page_body(&mut canvas, weeks, page);
            canvas.elements
        }
        SlidePayload::Demand { weeks, totals } => {
            let mut canvas = standard_slide(slide, position, total);
            demand_body(&mut canvas, weeks, totals);
            canvas.elements
        }
        SlidePayload::Media(media) => {
            let mut canvas = standard_slide(slide, position, total);
            let frame = Frame::new(240.0, BODY_TOP, 1440.0, BODY_BOTTOM - BODY_TOP);
            canvas.rect(frame, Rgb::WHITE, true);
            canvas.text(
                frame,
                media.uri.clone(),
                TextStyle::new(28.0).color(Rgb::MUTED).align(Align::Center),
            );
            canvas.elements
        }
    };

    SlideLayout {
        key: slide.key.clone(),
        elements,
    }
}

/// Lay out a whole deck in order.
pub fn layout_deck(slides: &[ResolvedSlide]) -> Vec<SlideLayout> {
    slides
        .iter()
        .enumerate()
        .map(|(i, slide)| layout_slide(slide, i, slides.len()))
        .collect()
}

fn title_slide(slide: &ResolvedSlide) -> Vec<LayoutElement> {
    let mut canvas = Canvas::new(Rgb::BRAND);
    canvas.text(
        Frame::new(160.0, 360.0, 1600.0, 140.0),
        slide.title.clone(),
        TextStyle::new(80.0).bold().color(Rgb::WHITE).align(Align::Center),
    );
    canvas.rect(Frame::new(860.0, 520.0, 200.0, 8.0), Rgb::ACCENT, false);
    if let Some(sub_title) = &slide.sub_title {
        canvas.text(
            Frame::new(160.0, 560.0, 1600.0, 70.0),
            sub_title.clone(),
            TextStyle::new(40.0).color(Rgb::BRAND_LIGHT).align(Align::Center),
        );
    }
    canvas.elements
}

fn standard_slide(slide: &ResolvedSlide, position: usize, total: usize) -> Canvas {
    let mut canvas = Canvas::new(Rgb::PAPER);
    canvas.rect(Frame::new(0.0, 0.0, CANVAS_WIDTH, HEADER_HEIGHT), Rgb::BRAND, false);
    canvas.text(
        Frame::new(MARGIN, 28.0, 1500.0, 70.0),
        slide.title.clone(),
        TextStyle::new(54.0).bold().color(Rgb::WHITE),
    );
    if let Some(sub_title) = &slide.sub_title {
        canvas.text(
            Frame::new(MARGIN, 100.0, 1500.0, 44.0),
            sub_title.clone(),
            TextStyle::new(28.0).color(Rgb::BRAND_LIGHT),
        );
    }
    canvas.text(
        Frame::new(CANVAS_WIDTH - MARGIN - 240.0, 1010.0, 240.0, 40.0),
        format!("{} / {}", position + 1, total),
        TextStyle::new(22.0).color(Rgb::MUTED).align(Align::Right),
    );
    canvas
}

/// Split the body width into `count` equal columns.
fn columns(count: usize) -> Vec<(f32, f32)> {
    let count = count.max(1);
    let width = (CANVAS_WIDTH - 2.0 * MARGIN - GAP * (count as f32 - 1.0)) / count as f32;
    (0..count)
        .map(|i| (MARGIN + i as f32 * (width + GAP), width))
        .collect()
}

/// Rows of `label  value` inside a card, shrinking the row height as weeks
/// are added.
fn week_rows(canvas: &mut Canvas, x: f32, y: f32, width: f32, space: f32, rows: &[(String, String)]) {
    if rows.is_empty() {
        return;
    }
    let row_height = (space / rows.len() as f32).min(56.0);
    let size = (row_height * 0.55).min(30.0);
    for (i, (label, value)) in rows.iter().enumerate() {
        let row_y = y + i as f32 * row_height;
        canvas.text(
            Frame::new(x, row_y, width * 0.55, row_height),
            label.clone(),
            TextStyle::new(size).color(Rgb::MUTED),
        );
        canvas.text(
            Frame::new(x + width * 0.55, row_y, width * 0.45, row_height),
            value.clone(),
            TextStyle::new(size).bold().align(Align::Right),
        );
    }
}

const SUMMARY_METRICS: [Metric; 4] = [
    Metric::Adherence,
    Metric::PlannedHours,
    Metric::DeliveredHours,
    Metric::Completed,
];

fn summary_body(canvas: &mut Canvas, weeks: &[WeekId], totals: &[CategoryRecord]) {
    let height = BODY_BOTTOM - BODY_TOP;
    for ((x, width), metric) in columns(SUMMARY_METRICS.len()).into_iter().zip(SUMMARY_METRICS) {
        canvas.rect(Frame::new(x, BODY_TOP, width, height), Rgb::WHITE, true);
        canvas.text(
            Frame::new(x + 24.0, BODY_TOP + 24.0, width - 48.0, 44.0),
            metric.label(),
            TextStyle::new(30.0).bold(),
        );

        let values: Vec<f64> = totals.iter().map(|r| r.value(metric)).collect();
        let rows: Vec<(String, String)> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (week_label(weeks, i), format::format_metric_value(metric, *v)))
            .collect();
        week_rows(canvas, x + 24.0, BODY_TOP + 100.0, width - 48.0, height - 340.0, &rows);

        if let Some(headline) = headline_variation(&values) {
            canvas.text(
                Frame::new(x + 24.0, BODY_BOTTOM - 180.0, width - 48.0, 40.0),
                format::format_metric_delta(metric, &headline),
                TextStyle::new(26.0).color(Rgb::MUTED).align(Align::Center),
            );
            canvas.badge(
                Frame::new(x + 24.0, BODY_BOTTOM - 120.0, width - 48.0, 88.0),
                format::format_percent_delta(headline.percent),
                format::percent_trend(headline.percent),
                40.0,
            );
        }
    }
}

fn page_body(canvas: &mut Canvas, weeks: &[WeekId], page: &SlidePage) {
    let height = BODY_BOTTOM - BODY_TOP;
    for ((x, width), item) in columns(page.items.len()).into_iter().zip(&page.items) {
        canvas.rect(Frame::new(x, BODY_TOP, width, height), Rgb::WHITE, true);
        canvas.text(
            Frame::new(x + 24.0, BODY_TOP + 24.0, width - 48.0, 50.0),
            item.display_name(),
            TextStyle::new(36.0).bold(),
        );
        item_card(canvas, weeks, item, x + 24.0, width - 48.0);
    }
}

fn item_card(canvas: &mut Canvas, weeks: &[WeekId], item: &ComparisonItem, x: f32, width: f32) {
    let adherence: Vec<(String, String)> = item
        .values(Metric::Adherence)
        .iter()
        .enumerate()
        .map(|(i, v)| (week_label(weeks, i), format::format_percent(*v)))
        .collect();
    week_rows(canvas, x, BODY_TOP + 96.0, width, 240.0, &adherence);

    // One badge per consecutive week pair.
    let deltas_top = BODY_TOP + 356.0;
    let badge_height = (200.0 / item.deltas.len().max(1) as f32).min(64.0);
    for (i, delta) in item.deltas.iter().enumerate() {
        let y = deltas_top + i as f32 * badge_height;
        canvas.text(
            Frame::new(x, y, width * 0.4, badge_height - 8.0),
            format!("{} → {}", short_week(weeks, i), short_week(weeks, i + 1)),
            TextStyle::new(24.0).color(Rgb::MUTED),
        );
        canvas.badge(
            Frame::new(x + width * 0.4, y, width * 0.6, badge_height - 8.0),
            delta_badge_text(delta),
            format::percent_trend(delta.percent),
            26.0,
        );
    }

    let last = item.per_week_values.len().saturating_sub(1);
    if let Some(record) = item.per_week_values.get(last) {
        let mut hours = vec![
            ("Planejado".to_string(), format::format_hours(record.value(Metric::PlannedHours))),
            ("Entregue".to_string(), format::format_hours(record.value(Metric::DeliveredHours))),
        ];
        if let Some(delta) = item.deltas_for(Metric::DeliveredHours).last() {
            hours.push(("Δ Entregue".to_string(), format::format_hours_delta(delta.absolute)));
        }
        week_rows(canvas, x, BODY_TOP + 580.0, width, 150.0, &hours);
    }
}

fn delta_badge_text(delta: &Delta) -> String {
    format!(
        "{}  ({})",
        format::format_percent_delta(delta.percent),
        format::format_points_delta(delta.absolute)
    )
}

const DEMAND_METRICS: [Metric; 4] = [
    Metric::Offered,
    Metric::Accepted,
    Metric::Rejected,
    Metric::Completed,
];

fn demand_body(canvas: &mut Canvas, weeks: &[WeekId], totals: &[CategoryRecord]) {
    // Label column, one column per week, variation column.
    let label_width = 420.0;
    let variation_width = 320.0;
    let week_count = totals.len().max(1);
    let week_width =
        (CANVAS_WIDTH - 2.0 * MARGIN - label_width - variation_width) / week_count as f32;
    let row_height = 110.0;

    let header_y = BODY_TOP;
    canvas.rect(
        Frame::new(MARGIN, header_y, CANVAS_WIDTH - 2.0 * MARGIN, row_height * 6.0),
        Rgb::WHITE,
        true,
    );
    canvas.text(
        Frame::new(MARGIN + 24.0, header_y, label_width, row_height),
        "Indicador",
        TextStyle::new(28.0).bold().color(Rgb::MUTED),
    );
    for i in 0..totals.len() {
        canvas.text(
            Frame::new(MARGIN + label_width + i as f32 * week_width, header_y, week_width, row_height),
            week_label(weeks, i),
            TextStyle::new(28.0).bold().color(Rgb::MUTED).align(Align::Center),
        );
    }
    let variation_x = CANVAS_WIDTH - MARGIN - variation_width;
    canvas.text(
        Frame::new(variation_x, header_y, variation_width - 24.0, row_height),
        "Variação",
        TextStyle::new(28.0).bold().color(Rgb::MUTED).align(Align::Center),
    );

    let mut rows: Vec<(String, Vec<String>, Option<(String, Trend)>)> = DEMAND_METRICS
        .iter()
        .map(|metric| {
            let values: Vec<f64> = totals.iter().map(|r| r.value(*metric)).collect();
            let cells: Vec<String> = values
                .iter()
                .map(|v| format::format_metric_value(*metric, *v))
                .collect();
            let variation = headline_variation(&values).map(|d| {
                (
                    format::format_percent_delta(d.percent),
                    format::percent_trend(d.percent),
                )
            });
            (metric.label().to_string(), cells, variation)
        })
        .collect();

    let rates: Vec<f64> = totals.iter().map(|r| r.rejection_rate()).collect();
    rows.push((
        "Taxa de Rejeição".to_string(),
        rates.iter().map(|r| format::format_percent(*r)).collect(),
        headline_variation(&rates).map(|d| {
            // A rising rejection rate is bad news, so the badge color flips.
            let trend = match format::percent_trend(d.absolute) {
                Trend::Up => Trend::Down,
                Trend::Down => Trend::Up,
                Trend::Neutral => Trend::Neutral,
            };
            (format::format_points_delta(d.absolute), trend)
        }),
    ));

    for (row, (label, cells, variation)) in rows.into_iter().enumerate() {
        let y = header_y + (row as f32 + 1.0) * row_height;
        canvas.text(
            Frame::new(MARGIN + 24.0, y, label_width, row_height),
            label,
            TextStyle::new(32.0).bold(),
        );
        for (i, cell) in cells.into_iter().enumerate() {
            canvas.text(
                Frame::new(MARGIN + label_width + i as f32 * week_width, y, week_width, row_height),
                cell,
                TextStyle::new(32.0).align(Align::Center),
            );
        }
        if let Some((text, trend)) = variation {
            canvas.badge(
                Frame::new(variation_x + 24.0, y + 18.0, variation_width - 72.0, row_height - 36.0),
                text,
                trend,
                28.0,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::MediaSlide;
    use crate::types::Dimension;

    fn resolved(payload: SlidePayload) -> ResolvedSlide {
        ResolvedSlide {
            key: SlideKey::new("k"),
            title: "Título".to_string(),
            sub_title: Some("Sub".to_string()),
            payload,
        }
    }

    fn weeks() -> Vec<WeekId> {
        vec![WeekId::new("W44"), WeekId::new("W45")]
    }

    fn totals() -> Vec<CategoryRecord> {
        vec![
            CategoryRecord {
                adherence_percent: 80.0,
                offered: 100,
                accepted: 90,
                rejected: 10,
                ..Default::default()
            },
            CategoryRecord {
                adherence_percent: 90.0,
                offered: 100,
                accepted: 95,
                rejected: 5,
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_hex_round_trip_and_rejects_garbage() {
        assert_eq!(Rgb::from_hex("#0f3d5e"), Some(Rgb::BRAND));
        assert_eq!(Rgb::BRAND.to_hex(), "0F3D5E");
        assert_eq!(Rgb::from_hex("12345"), None);
        assert_eq!(Rgb::from_hex("GG0000"), None);
    }

    #[test]
    fn test_every_layout_starts_with_background() {
        let payloads = vec![
            SlidePayload::Cover { weeks: weeks() },
            SlidePayload::Summary { weeks: weeks(), totals: totals() },
            SlidePayload::Demand { weeks: weeks(), totals: totals() },
            SlidePayload::Closing,
            SlidePayload::Media(MediaSlide {
                title: "Foto".to_string(),
                uri: "file:///tmp/a.png".to_string(),
            }),
        ];
        for payload in payloads {
            let layout = layout_slide(&resolved(payload), 0, 1);
            assert!(matches!(layout.elements[0], LayoutElement::Fill { .. }));
            assert!(layout.texts().contains(&"Título"));
        }
    }

    #[test]
    fn test_summary_shows_headline_badges() {
        let layout = layout_slide(
            &resolved(SlidePayload::Summary { weeks: weeks(), totals: totals() }),
            1,
            8,
        );
        let texts = layout.texts();
        assert!(texts.contains(&"+12.5%"));
        assert!(texts.contains(&"Semana 44"));
        assert!(texts.contains(&"2 / 8"));
    }

    #[test]
    fn test_page_layout_has_one_card_per_item() {
        let item = ComparisonItem::from_category(crate::normalize::NormalizedCategory {
            name: "Centro".to_string(),
            per_week: vec![
                CategoryRecord {
                    adherence_percent: 80.0,
                    ..Default::default()
                },
                CategoryRecord {
                    adherence_percent: 90.0,
                    ..Default::default()
                },
            ],
        });
        let page = SlidePage {
            dimension: Dimension::SubRegion,
            page_index: 0,
            total_pages: 1,
            items: vec![item.clone(), item],
        };
        let layout = layout_slide(&resolved(SlidePayload::Page { weeks: weeks(), page }), 2, 8);

        let cards = layout
            .elements
            .iter()
            .filter(|e| matches!(e, LayoutElement::Rect { color: Rgb::WHITE, .. }))
            .count();
        assert_eq!(cards, 2);
        let texts = layout.texts();
        assert_eq!(texts.iter().filter(|t| **t == "CENTRO").count(), 2);
        assert!(texts.contains(&"+12.5%  (+10.0 p.p.)"));
        assert!(texts.contains(&"44 → 45"));
    }

    #[test]
    fn test_demand_rejection_rate_row() {
        let layout = layout_slide(
            &resolved(SlidePayload::Demand { weeks: weeks(), totals: totals() }),
            0,
            1,
        );
        let texts = layout.texts();
        assert!(texts.contains(&"Taxa de Rejeição"));
        assert!(texts.contains(&"10.0%"));
        assert!(texts.contains(&"-5.0 p.p."));
        assert!(texts.contains(&"-50.0%"));
    }

    #[test]
    fn test_layout_deck_numbers_slides() {
        let slides = vec![
            resolved(SlidePayload::Summary { weeks: weeks(), totals: totals() }),
            resolved(SlidePayload::Demand { weeks: weeks(), totals: totals() }),
        ];
        let layouts = layout_deck(&slides);
        assert!(layouts[1].texts().contains(&"2 / 2"));
    }
}
