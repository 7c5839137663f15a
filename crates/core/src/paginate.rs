//! Splitting comparison items into fixed-size slide pages.
//!
//! Each dimension has its own page size. A dimension without categories
//! produces no pages at all.

use crate::diff::{Comparison, ComparisonItem};
use crate::types::Dimension;
use serde::{Deserialize, Serialize};

/// Items per page for each dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSizes {
    pub sub_region: usize,
    pub day_of_week: usize,
    pub shift: usize,
    pub origin: usize,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            sub_region: 2,
            day_of_week: 4,
            shift: 3,
            origin: 3,
        }
    }
}

impl PageSizes {
    /// Page size for a dimension. Never zero.
    pub fn get(&self, dimension: Dimension) -> usize {
        let size = match dimension {
            Dimension::SubRegion => self.sub_region,
            Dimension::DayOfWeek => self.day_of_week,
            Dimension::Shift => self.shift,
            Dimension::Origin => self.origin,
        };
        size.max(1)
    }

    /// Set the page size for one dimension (at least 1).
    pub fn with(mut self, dimension: Dimension, size: usize) -> Self {
        let size = size.max(1);
        match dimension {
            Dimension::SubRegion => self.sub_region = size,
            Dimension::DayOfWeek => self.day_of_week = size,
            Dimension::Shift => self.shift = size,
            Dimension::Origin => self.origin = size,
        }
        self
    }
}

/// A bounded group of comparison items rendered as one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidePage {
    pub dimension: Dimension,
    /// 0-based page index within the dimension.
    pub page_index: usize,
    pub total_pages: usize,
    pub items: Vec<ComparisonItem>,
}

impl SlidePage {
    /// `"2/3"`-style page label.
    pub fn page_label(&self) -> String {
        format!("{}/{}", self.page_index + 1, self.total_pages)
    }
}

/// Chunk items into pages of at most `size` (clamped to at least 1).
pub fn paginate<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(|chunk| chunk.to_vec()).collect()
}

/// Paginates each dimension of a comparison.
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    sizes: PageSizes,
}

impl Paginator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_sizes(mut self, sizes: PageSizes) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn page_sizes(&self) -> PageSizes {
        self.sizes
    }

    /// Pages for one dimension, in item order.
    pub fn pages(&self, dimension: Dimension, items: &[ComparisonItem]) -> Vec<SlidePage> {
        let chunks = paginate(items, self.sizes.get(dimension));
        let total_pages = chunks.len();

        chunks
            .into_iter()
            .enumerate()
            .map(|(page_index, items)| SlidePage {
                dimension,
                page_index,
                total_pages,
                items,
            })
            .collect()
    }

    /// Pages for every dimension, in deck order.
    pub fn paginate_comparison(&self, comparison: &Comparison) -> Vec<SlidePage> {
        Dimension::ALL
            .iter()
            .flat_map(|&dimension| self.pages(dimension, comparison.items(dimension)))
            .collect()
    }
}
