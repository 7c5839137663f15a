//! Week-over-week deltas.
//!
//! Percent changes follow a fixed policy for zero baselines: `0 -> 0` is no
//! change, `0 -> x` counts as a full +100% swing.

use crate::normalize::{DataNormalizer, NormalizedCategory};
use crate::types::{CategoryRecord, Dimension, Metric, WeeklySnapshot};
use serde::{Deserialize, Serialize};

/// Signed difference between two consecutive values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    pub absolute: f64,
    pub percent: f64,
    /// `absolute >= 0`. Zero counts as positive for sign purposes.
    pub is_positive: bool,
}

impl Delta {
    /// Delta from `previous` to `current`.
    pub fn between(previous: f64, current: f64) -> Self {
        let absolute = current - previous;
        Self {
            absolute,
            percent: delta_percent(previous, current),
            is_positive: absolute >= 0.0,
        }
    }
}

/// Percent change from `previous` to `current`.
pub fn delta_percent(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        if current == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Deltas for every consecutive pair of values.
pub fn consecutive_deltas(values: &[f64]) -> Vec<Delta> {
    values
        .windows(2)
        .map(|pair| Delta::between(pair[0], pair[1]))
        .collect()
}

/// First-vs-last variation, ignoring intermediate weeks. `None` with fewer
/// than two values.
pub fn headline_variation(values: &[f64]) -> Option<Delta> {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 => Some(Delta::between(*first, *last)),
        _ => None,
    }
}

/// One category compared across all selected weeks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonItem {
    /// Trimmed category name.
    pub name: String,
    /// One record per week, zero-filled where the week lacked the category.
    pub per_week_values: Vec<CategoryRecord>,
    /// Adherence deltas, one per consecutive week pair.
    pub deltas: Vec<Delta>,
}

impl ComparisonItem {
    /// Build an item from a normalized category.
    pub fn from_category(category: NormalizedCategory) -> Self {
        let deltas = consecutive_deltas(&values_of(&category.per_week, Metric::Adherence));
        Self {
            name: category.name,
            per_week_values: category.per_week,
            deltas,
        }
    }

    pub fn display_name(&self) -> String {
        self.name.to_uppercase()
    }

    /// Values of a metric, one per week.
    pub fn values(&self, metric: Metric) -> Vec<f64> {
        values_of(&self.per_week_values, metric)
    }

    /// Consecutive deltas for any metric.
    pub fn deltas_for(&self, metric: Metric) -> Vec<Delta> {
        consecutive_deltas(&self.values(metric))
    }

    /// First-vs-last variation for a metric.
    pub fn headline(&self, metric: Metric) -> Option<Delta> {
        headline_variation(&self.values(metric))
    }
}

fn values_of(records: &[CategoryRecord], metric: Metric) -> Vec<f64> {
    records.iter().map(|r| r.value(metric)).collect()
}

/// Comparison of every dimension plus the overall totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    /// Overall totals, one record per week.
    pub totals: Vec<CategoryRecord>,
    pub sub_regions: Vec<ComparisonItem>,
    pub days_of_week: Vec<ComparisonItem>,
    pub shifts: Vec<ComparisonItem>,
    pub origins: Vec<ComparisonItem>,
}

impl Comparison {
    pub fn items(&self, dimension: Dimension) -> &[ComparisonItem] {
        match dimension {
            Dimension::SubRegion => &self.sub_regions,
            Dimension::DayOfWeek => &self.days_of_week,
            Dimension::Shift => &self.shifts,
            Dimension::Origin => &self.origins,
        }
    }

    fn items_mut(&mut self, dimension: Dimension) -> &mut Vec<ComparisonItem> {
        match dimension {
            Dimension::SubRegion => &mut self.sub_regions,
            Dimension::DayOfWeek => &mut self.days_of_week,
            Dimension::Shift => &mut self.shifts,
            Dimension::Origin => &mut self.origins,
        }
    }

    /// Headline variation of a totals metric.
    pub fn totals_headline(&self, metric: Metric) -> Option<Delta> {
        headline_variation(&values_of(&self.totals, metric))
    }

    pub fn week_count(&self) -> usize {
        self.totals.len()
    }
}

/// Turns weekly snapshots into a [`Comparison`].
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    normalizer: DataNormalizer,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare one dimension.
    pub fn compare_dimension(&self, snapshots: &[WeeklySnapshot], dimension: Dimension) -> Vec<ComparisonItem> {
        self.normalizer
            .normalize(snapshots, dimension)
            .into_iter()
            .map(ComparisonItem::from_category)
            .collect()
    }

    /// Compare all dimensions and the totals. Snapshots must already be in
    /// week order.
    pub fn compare(&self, snapshots: &[WeeklySnapshot]) -> Comparison {
        let mut comparison = Comparison {
            totals: snapshots.iter().map(|s| s.totals.clone()).collect(),
            ..Default::default()
        };
        for dimension in Dimension::ALL {
            *comparison.items_mut(dimension) = self.compare_dimension(snapshots, dimension);
        }
        comparison
    }
}
