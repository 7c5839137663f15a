//! Slide deck model: default slide assembly, ordering, overrides and
//! per-dimension visibility.
//!
//! Slide content lives in an arena addressed by stable keys. The order list
//! only holds keys, so content can be rebuilt (for example when the selected
//! weeks change) without losing the user's ordering or overrides.
//!
//! Keys whose content disappears stay in the order list and are filtered out
//! when the deck is resolved. If the content comes back, so does the slide, in
//! its old position. [`Deck::prune_orphans`] removes them eagerly.

use crate::diff::Comparison;
use crate::paginate::{Paginator, SlidePage};
use crate::types::{CategoryRecord, Dimension, WeekId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identity of a slide within a deck.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlideKey(String);

impl SlideKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn cover() -> Self {
        Self::new("cover")
    }

    pub fn summary() -> Self {
        Self::new("summary")
    }

    pub fn demand() -> Self {
        Self::new("demand")
    }

    pub fn closing() -> Self {
        Self::new("closing")
    }

    /// Key of a dimension page, e.g. `subregion-0`.
    pub fn page(dimension: Dimension, page_index: usize) -> Self {
        Self(format!("{}-{}", dimension.slug(), page_index))
    }

    pub fn media(id: usize) -> Self {
        Self(format!("media-{}", id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlideKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A user-added slide showing external media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSlide {
    pub title: String,
    pub uri: String,
}

/// What a slide shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SlidePayload {
    Cover { weeks: Vec<WeekId> },
    Summary { weeks: Vec<WeekId>, totals: Vec<CategoryRecord> },
    Page { weeks: Vec<WeekId>, page: SlidePage },
    Demand { weeks: Vec<WeekId>, totals: Vec<CategoryRecord> },
    Closing,
    Media(MediaSlide),
}

/// A slide in the content arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckSlide {
    pub key: SlideKey,
    pub payload: SlidePayload,
}

impl DeckSlide {
    /// Dimension of a page slide; `None` for every other slide.
    pub fn dimension(&self) -> Option<Dimension> {
        match &self.payload {
            SlidePayload::Page { page, .. } => Some(page.dimension),
            _ => None,
        }
    }

    pub fn default_title(&self) -> String {
        match &self.payload {
            SlidePayload::Cover { .. } => "Comparativo Semanal de Operações".to_string(),
            SlidePayload::Summary { .. } => "Resumo Geral".to_string(),
            SlidePayload::Page { page, .. } => page.dimension.title().to_string(),
            SlidePayload::Demand { .. } => "Demanda e Rejeições".to_string(),
            SlidePayload::Closing => "Obrigado".to_string(),
            SlidePayload::Media(media) => media.title.clone(),
        }
    }

    pub fn default_subtitle(&self) -> Option<String> {
        match &self.payload {
            SlidePayload::Cover { weeks } => weeks_subtitle(weeks),
            SlidePayload::Summary { weeks, .. } | SlidePayload::Demand { weeks, .. } => {
                weeks_subtitle(weeks)
            }
            SlidePayload::Page { page, .. } if page.total_pages > 1 => {
                Some(format!("Página {}", page.page_label()))
            }
            _ => None,
        }
    }
}

fn weeks_subtitle(weeks: &[WeekId]) -> Option<String> {
    let labels: Vec<String> = weeks.iter().map(|w| format!("Semana {}", w.label())).collect();
    if labels.is_empty() {
        None
    } else {
        Some(labels.join(" vs "))
    }
}

/// Sparse per-slide text overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Override {
    pub title: Option<String>,
    pub sub_title: Option<String>,
}

impl Override {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            sub_title: None,
        }
    }

    pub fn sub_title(sub_title: impl Into<String>) -> Self {
        Self {
            title: None,
            sub_title: Some(sub_title.into()),
        }
    }

    /// Fields set in `partial` replace ours; unset fields are kept.
    pub fn merge(&mut self, partial: Override) {
        if partial.title.is_some() {
            self.title = partial.title;
        }
        if partial.sub_title.is_some() {
            self.sub_title = partial.sub_title;
        }
    }
}

/// Whether each dimension's pages are part of the rendered deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisibilityFlags {
    pub sub_region: bool,
    pub day_of_week: bool,
    pub shift: bool,
    pub origin: bool,
}

impl Default for VisibilityFlags {
    fn default() -> Self {
        Self {
            sub_region: true,
            day_of_week: true,
            shift: true,
            origin: true,
        }
    }
}

impl VisibilityFlags {
    fn flag_mut(&mut self, dimension: Dimension) -> &mut bool {
        match dimension {
            Dimension::SubRegion => &mut self.sub_region,
            Dimension::DayOfWeek => &mut self.day_of_week,
            Dimension::Shift => &mut self.shift,
            Dimension::Origin => &mut self.origin,
        }
    }

    pub fn is_visible(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::SubRegion => self.sub_region,
            Dimension::DayOfWeek => self.day_of_week,
            Dimension::Shift => self.shift,
            Dimension::Origin => self.origin,
        }
    }

    pub fn set(&mut self, dimension: Dimension, visible: bool) {
        *self.flag_mut(dimension) = visible;
    }

    /// Flip a dimension's flag and return the new value.
    pub fn toggle(&mut self, dimension: Dimension) -> bool {
        let flag = self.flag_mut(dimension);
        *flag = !*flag;
        *flag
    }
}

/// Builds the default slide sequence from a comparison.
#[derive(Debug, Clone, Default)]
pub struct SlideAssembler {
    paginator: Paginator,
}

impl SlideAssembler {
    pub fn new(paginator: Paginator) -> Self {
        Self { paginator }
    }

    /// Cover, summary, dimension pages in deck order, demand, closing.
    pub fn assemble(&self, weeks: &[WeekId], comparison: &Comparison) -> Vec<DeckSlide> {
        let weeks = weeks.to_vec();
        let mut slides = vec![
            DeckSlide {
                key: SlideKey::cover(),
                payload: SlidePayload::Cover {
                    weeks: weeks.clone(),
                },
            },
            DeckSlide {
                key: SlideKey::summary(),
                payload: SlidePayload::Summary {
                    weeks: weeks.clone(),
                    totals: comparison.totals.clone(),
                },
            },
        ];

        for dimension in Dimension::ALL {
            for page in self.paginator.pages(dimension, comparison.items(dimension)) {
                slides.push(DeckSlide {
                    key: SlideKey::page(dimension, page.page_index),
                    payload: SlidePayload::Page {
                        weeks: weeks.clone(),
                        page,
                    },
                });
            }
        }

        slides.push(DeckSlide {
            key: SlideKey::demand(),
            payload: SlidePayload::Demand {
                weeks,
                totals: comparison.totals.clone(),
            },
        });
        slides.push(DeckSlide {
            key: SlideKey::closing(),
            payload: SlidePayload::Closing,
        });

        log::debug!("Assembled {} default slides", slides.len());
        slides
    }
}

/// A slide ready to be laid out: content plus the effective texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSlide {
    pub key: SlideKey,
    pub title: String,
    pub sub_title: Option<String>,
    pub payload: SlidePayload,
}

/// Session state of one comparison deck.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    weeks: Vec<WeekId>,
    content: HashMap<SlideKey, DeckSlide>,
    media: HashMap<SlideKey, DeckSlide>,
    next_media_id: usize,
    order: Vec<SlideKey>,
    overrides: HashMap<SlideKey, Override>,
    visibility: VisibilityFlags,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the generated content. Keys not yet in the order list are
    /// appended in assembly order; existing order, overrides, visibility and
    /// media slides are kept.
    pub fn sync(&mut self, weeks: Vec<WeekId>, slides: Vec<DeckSlide>) {
        self.weeks = weeks;
        self.content.clear();
        for slide in slides {
            let key = slide.key.clone();
            self.content.insert(key.clone(), slide);
            self.add_slide(key);
        }
    }

    pub fn weeks(&self) -> &[WeekId] {
        &self.weeks
    }

    pub fn order(&self) -> &[SlideKey] {
        &self.order
    }

    pub fn visibility(&self) -> VisibilityFlags {
        self.visibility
    }

    pub fn override_for(&self, key: &SlideKey) -> Option<&Override> {
        self.overrides.get(key)
    }

    pub fn overrides(&self) -> &HashMap<SlideKey, Override> {
        &self.overrides
    }

    /// Content behind a key, generated or media.
    pub fn slide(&self, key: &SlideKey) -> Option<&DeckSlide> {
        self.content.get(key).or_else(|| self.media.get(key))
    }

    /// Move the key at `from` to `to`. Indices are clamped to the list.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if self.order.is_empty() {
            return;
        }
        let last = self.order.len() - 1;
        let from = from.min(last);
        let to = to.min(last);
        if from == to {
            return;
        }
        let key = self.order.remove(from);
        self.order.insert(to, key);
    }

    /// Move a slide by its position in [`Deck::resolved`], the order the
    /// deck renders and exports in. Hidden and orphaned keys keep their
    /// places in the order list. Positions are clamped.
    pub fn reorder_visible(&mut self, from: usize, to: usize) {
        let rendered: Vec<usize> = self
            .order
            .iter()
            .enumerate()
            .filter(|(_, key)| self.is_rendered(key))
            .map(|(index, _)| index)
            .collect();
        let Some(last) = rendered.len().checked_sub(1) else {
            return;
        };
        self.reorder(rendered[from.min(last)], rendered[to.min(last)]);
    }

    /// Merge `partial` into the override of one slide.
    pub fn set_override(&mut self, key: &SlideKey, partial: Override) {
        self.overrides.entry(key.clone()).or_default().merge(partial);
    }

    /// Drop every override of a slide.
    pub fn clear_override(&mut self, key: &SlideKey) {
        self.overrides.remove(key);
    }

    /// Flip a dimension's visibility and return the new value. The order list
    /// is not touched.
    pub fn toggle_visibility(&mut self, dimension: Dimension) -> bool {
        self.visibility.toggle(dimension)
    }

    pub fn set_visibility(&mut self, dimension: Dimension, visible: bool) {
        self.visibility.set(dimension, visible);
    }

    /// Append a key to the order list unless it is already present. Returns
    /// whether it was added.
    pub fn add_slide(&mut self, key: SlideKey) -> bool {
        if self.order.contains(&key) {
            return false;
        }
        self.order.push(key);
        true
    }

    /// Add a media slide at the end of the deck.
    pub fn add_media_slide(&mut self, media: MediaSlide) -> SlideKey {
        let key = SlideKey::media(self.next_media_id);
        self.next_media_id += 1;
        self.media.insert(
            key.clone(),
            DeckSlide {
                key: key.clone(),
                payload: SlidePayload::Media(media),
            },
        );
        self.add_slide(key.clone());
        key
    }

    /// Keys in the order list with no content behind them.
    pub fn orphans(&self) -> Vec<SlideKey> {
        self.order
            .iter()
            .filter(|key| self.slide(key).is_none())
            .cloned()
            .collect()
    }

    /// Remove orphaned keys and their overrides. Returns how many were removed.
    pub fn prune_orphans(&mut self) -> usize {
        let orphans = self.orphans();
        self.order.retain(|key| !orphans.contains(key));
        for key in &orphans {
            self.overrides.remove(key);
        }
        if !orphans.is_empty() {
            log::debug!("Pruned {} orphaned slide keys", orphans.len());
        }
        orphans.len()
    }

    fn is_rendered(&self, key: &SlideKey) -> bool {
        self.slide(key).is_some_and(|slide| {
            slide
                .dimension()
                .map_or(true, |dimension| self.visibility.is_visible(dimension))
        })
    }

    /// The deck as it renders and exports: order list filtered to keys with
    /// content whose dimension is visible, with overrides applied.
    pub fn resolved(&self) -> Vec<ResolvedSlide> {
        self.order
            .iter()
            .filter(|key| self.is_rendered(key))
            .filter_map(|key| self.slide(key))
            .map(|slide| {
                let overrides = self.overrides.get(&slide.key);
                ResolvedSlide {
                    key: slide.key.clone(),
                    title: overrides
                        .and_then(|o| o.title.clone())
                        .unwrap_or_else(|| slide.default_title()),
                    sub_title: overrides
                        .and_then(|o| o.sub_title.clone())
                        .or_else(|| slide.default_subtitle()),
                    payload: slide.payload.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ComparisonItem;
    use crate::paginate::PageSizes;

    fn item(name: &str) -> ComparisonItem {
        ComparisonItem {
            name: name.to_string(),
            per_week_values: Vec::new(),
            deltas: Vec::new(),
        }
    }

    fn comparison() -> Comparison {
        Comparison {
            totals: vec![CategoryRecord::default(), CategoryRecord::default()],
            sub_regions: ["A", "B", "C"].iter().map(|n| item(n)).collect(),
            days_of_week: vec![item("Segunda")],
            shifts: Vec::new(),
            origins: vec![item("App")],
        }
    }

    fn weeks() -> Vec<WeekId> {
        vec![WeekId::new("44"), WeekId::new("45")]
    }

    fn deck() -> Deck {
        let assembler = SlideAssembler::new(
            Paginator::new().with_page_sizes(PageSizes::default().with(Dimension::SubRegion, 2)),
        );
        let mut deck = Deck::new();
        deck.sync(weeks(), assembler.assemble(&weeks(), &comparison()));
        deck
    }

    fn keys(deck: &Deck) -> Vec<String> {
        deck.resolved().iter().map(|s| s.key.to_string()).collect()
    }

    #[test]
    fn test_default_order() {
        let deck = deck();
        assert_eq!(
            keys(&deck),
            vec![
                "cover",
                "summary",
                "subregion-0",
                "subregion-1",
                "weekday-0",
                "origin-0",
                "demand",
                "closing"
            ]
        );
    }

    #[test]
    fn test_empty_dimension_has_no_slide() {
        let deck = deck();
        assert!(deck.order().iter().all(|k| !k.as_str().starts_with("shift")));
    }

    #[test]
    fn test_reorder_moves_one_key() {
        let mut deck = deck();
        deck.reorder(0, 2);
        assert_eq!(
            &keys(&deck)[..4],
            &["summary", "subregion-0", "cover", "subregion-1"]
        );

        deck.reorder(7, 0);
        assert_eq!(keys(&deck)[0], "closing");
    }

    #[test]
    fn test_reorder_clamps_indices() {
        let mut deck = deck();
        deck.reorder(100, 0);
        assert_eq!(keys(&deck)[0], "closing");
        deck.reorder(0, 100);
        assert_eq!(keys(&deck).last().unwrap(), "closing");

        let mut empty = Deck::new();
        empty.reorder(3, 1);
        assert!(empty.order().is_empty());
    }

    #[test]
    fn test_override_merges_per_key() {
        let mut deck = deck();
        let summary = SlideKey::summary();
        deck.set_override(&summary, Override::title("Visão Geral"));
        deck.set_override(&summary, Override::sub_title("Rede Sul"));

        let resolved = deck.resolved();
        let slide = resolved.iter().find(|s| s.key == summary).unwrap();
        assert_eq!(slide.title, "Visão Geral");
        assert_eq!(slide.sub_title.as_deref(), Some("Rede Sul"));

        let cover = resolved.iter().find(|s| s.key == SlideKey::cover()).unwrap();
        assert_eq!(cover.title, "Comparativo Semanal de Operações");
        assert_eq!(cover.sub_title.as_deref(), Some("Semana 44 vs Semana 45"));
    }

    #[test]
    fn test_hidden_dimension_filters_pages_only() {
        let mut deck = deck();
        deck.set_override(&SlideKey::page(Dimension::SubRegion, 0), Override::title("X"));
        let order_before = deck.order().to_vec();
        let overrides_before = deck.overrides().clone();

        assert!(!deck.toggle_visibility(Dimension::SubRegion));
        let visible = keys(&deck);
        assert!(visible.iter().all(|k| !k.starts_with("subregion")));
        assert_eq!(deck.order(), order_before.as_slice());
        assert_eq!(deck.overrides(), &overrides_before);

        assert!(deck.toggle_visibility(Dimension::SubRegion));
        assert_eq!(keys(&deck)[2], "subregion-0");
    }

    #[test]
    fn test_reorder_visible_skips_hidden_and_orphaned_keys() {
        let mut deck = deck();
        deck.add_slide(SlideKey::new("extra"));
        deck.reorder(8, 1);
        deck.set_visibility(Dimension::SubRegion, false);
        assert_eq!(
            keys(&deck),
            vec!["cover", "summary", "weekday-0", "origin-0", "demand", "closing"]
        );

        deck.reorder_visible(2, 0);
        assert_eq!(keys(&deck)[0], "weekday-0");
        deck.reorder_visible(0, 1);
        assert_eq!(&keys(&deck)[..3], &["cover", "weekday-0", "summary"]);
        deck.reorder_visible(100, 0);
        assert_eq!(keys(&deck)[0], "closing");

        deck.set_visibility(Dimension::SubRegion, true);
        assert!(keys(&deck).contains(&"subregion-1".to_string()));
        assert!(deck.order().contains(&SlideKey::new("extra")));
    }

    #[test]
    fn test_add_slide_appends_unknown_keys() {
        let mut deck = deck();
        assert!(!deck.add_slide(SlideKey::cover()));
        assert!(deck.add_slide(SlideKey::new("extra")));
        assert_eq!(deck.order().last().unwrap().as_str(), "extra");
        // No content behind it yet, so it does not render.
        assert!(!keys(&deck).contains(&"extra".to_string()));
    }

    #[test]
    fn test_media_slide_is_appended() {
        let mut deck = deck();
        let key = deck.add_media_slide(MediaSlide {
            title: "Mapa de calor".to_string(),
            uri: "https://example.com/heat.png".to_string(),
        });
        assert_eq!(key.as_str(), "media-0");
        let resolved = deck.resolved();
        let last = resolved.last().unwrap();
        assert_eq!(last.key, key);
        assert_eq!(last.title, "Mapa de calor");
    }

    #[test]
    fn test_sync_keeps_order_and_lazily_filters_orphans() {
        let mut deck = deck();
        deck.reorder(3, 0);
        assert_eq!(keys(&deck)[0], "subregion-1");

        // Sub-regions shrink to one page: subregion-1 loses its content.
        let mut smaller = comparison();
        smaller.sub_regions.truncate(2);
        let assembler = SlideAssembler::new(
            Paginator::new().with_page_sizes(PageSizes::default().with(Dimension::SubRegion, 2)),
        );
        deck.sync(weeks(), assembler.assemble(&weeks(), &smaller));

        assert_eq!(deck.order()[0].as_str(), "subregion-1");
        assert_eq!(keys(&deck)[0], "cover");
        assert_eq!(deck.orphans(), vec![SlideKey::page(Dimension::SubRegion, 1)]);

        // Content returns: the slide is back where the user put it.
        deck.sync(weeks(), assembler.assemble(&weeks(), &comparison()));
        assert_eq!(keys(&deck)[0], "subregion-1");
    }

    #[test]
    fn test_prune_orphans_removes_keys_and_overrides() {
        let mut deck = deck();
        let orphan = SlideKey::new("gone");
        deck.add_slide(orphan.clone());
        deck.set_override(&orphan, Override::title("Old"));

        assert_eq!(deck.prune_orphans(), 1);
        assert!(!deck.order().contains(&orphan));
        assert!(deck.override_for(&orphan).is_none());
        assert_eq!(deck.prune_orphans(), 0);
    }

    #[test]
    fn test_page_subtitle_only_when_paginated() {
        let deck = deck();
        let resolved = deck.resolved();
        let first = resolved.iter().find(|s| s.key.as_str() == "subregion-0").unwrap();
        assert_eq!(first.sub_title.as_deref(), Some("Página 1/2"));
        let origin = resolved.iter().find(|s| s.key.as_str() == "origin-0").unwrap();
        assert_eq!(origin.sub_title, None);
    }
}
