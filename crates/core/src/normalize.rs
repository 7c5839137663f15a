//! Category normalization across weekly snapshots.
//!
//! Every week contributes its category names to one union. Weeks lacking a
//! category get a zero-valued record in its place, so every category carries
//! exactly one record per selected week.

use crate::types::{CategoryRecord, Dimension, WeeklySnapshot, UNNAMED_CATEGORY};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Collation key approximating locale-aware ordering: accents stripped,
/// case folded.
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Locale-aware comparison of two category names. Names that only differ by
/// accents or case fall back to a plain comparison so the order stays total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

/// One category with one record per selected week.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCategory {
    /// Trimmed name used for matching.
    pub name: String,
    /// One record per week, in week order. Synthesized records are zeroed.
    pub per_week: Vec<CategoryRecord>,
}

impl NormalizedCategory {
    /// Uppercased name used on slides.
    pub fn display_name(&self) -> String {
        self.name.to_uppercase()
    }
}

/// Merges per-category records of one dimension across weeks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataNormalizer;

impl DataNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Union of all weeks' trimmed category names for a dimension, deduplicated
    /// and sorted with [`compare_names`]. Blank names are kept under
    /// [`UNNAMED_CATEGORY`].
    pub fn category_names(&self, snapshots: &[WeeklySnapshot], dimension: Dimension) -> Vec<String> {
        let unique: BTreeSet<String> = snapshots
            .iter()
            .flat_map(|s| s.records(dimension))
            .map(|r| r.match_name().to_string())
            .collect();

        let mut names: Vec<String> = unique.into_iter().collect();
        names.sort_by(|a, b| compare_names(a, b));
        names
    }

    /// Normalize a dimension: every category gets one record per snapshot.
    pub fn normalize(&self, snapshots: &[WeeklySnapshot], dimension: Dimension) -> Vec<NormalizedCategory> {
        let names = self.category_names(snapshots, dimension);

        let lookups: Vec<HashMap<&str, &CategoryRecord>> = snapshots
            .iter()
            .map(|snapshot| {
                let mut by_name = HashMap::new();
                for record in snapshot.records(dimension) {
                    // First occurrence wins when a week repeats a name.
                    by_name.entry(record.match_name()).or_insert(record);
                }
                by_name
            })
            .collect();

        let categories: Vec<NormalizedCategory> = names
            .into_iter()
            .map(|name| {
                let per_week = lookups
                    .iter()
                    .map(|by_name| match by_name.get(name.as_str()) {
                        Some(record) => CategoryRecord {
                            name: name.clone(),
                            ..(*record).clone()
                        },
                        None => CategoryRecord::zeroed(name.clone()),
                    })
                    .collect();
                NormalizedCategory { name, per_week }
            })
            .collect();

        log::debug!(
            "Normalized {} categories for {} across {} weeks",
            categories.len(),
            dimension,
            snapshots.len()
        );

        categories
    }
}
