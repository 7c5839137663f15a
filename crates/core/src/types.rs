//! Domain types for weekly operational snapshots.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Matches `44`, `W44`, `w44`, `2024-W44` and `2024W44`.
static WEEK_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:\d{4}-?)?w?\s*(\d{1,2})\s*$").unwrap());

/// Identifier of a selected week, as supplied by the data layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekId(String);

impl WeekId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Week number without prefixes (`"2024-W07"` -> `"07"`), or the raw id
    /// when it does not look like a week number.
    pub fn label(&self) -> &str {
        WEEK_NUMBER_REGEX
            .captures(&self.0)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WeekId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A grouping axis for categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    SubRegion,
    DayOfWeek,
    Shift,
    Origin,
}

impl Dimension {
    /// All dimensions in deck order.
    pub const ALL: [Dimension; 4] = [
        Dimension::SubRegion,
        Dimension::DayOfWeek,
        Dimension::Shift,
        Dimension::Origin,
    ];

    /// Stable identifier used in slide keys and on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            Dimension::SubRegion => "subregion",
            Dimension::DayOfWeek => "weekday",
            Dimension::Shift => "shift",
            Dimension::Origin => "origin",
        }
    }

    /// Slide heading for pages of this dimension.
    pub fn title(&self) -> &'static str {
        match self {
            Dimension::SubRegion => "Aderência por Sub-região",
            Dimension::DayOfWeek => "Aderência por Dia da Semana",
            Dimension::Shift => "Aderência por Turno",
            Dimension::Origin => "Aderência por Origem",
        }
    }

    /// Parse a dimension from its slug or a few common spellings.
    pub fn from_slug(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "subregion" | "subregions" | "subregiao" => Some(Self::SubRegion),
            "weekday" | "dayofweek" | "day" | "days" => Some(Self::DayOfWeek),
            "shift" | "shifts" | "turno" => Some(Self::Shift),
            "origin" | "origins" | "origem" => Some(Self::Origin),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A numeric measure that can be compared across weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    /// Delivered over planned hours, in percent.
    Adherence,
    /// Planned hours, as decimal hours.
    PlannedHours,
    /// Delivered hours, as decimal hours.
    DeliveredHours,
    Offered,
    Accepted,
    Rejected,
    Completed,
}

impl Metric {
    /// Whether values of this metric are decimal hours.
    pub fn is_time(&self) -> bool {
        matches!(self, Metric::PlannedHours | Metric::DeliveredHours)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Adherence => "Aderência",
            Metric::PlannedHours => "Horas Planejadas",
            Metric::DeliveredHours => "Horas Entregues",
            Metric::Offered => "Ofertadas",
            Metric::Accepted => "Aceitas",
            Metric::Rejected => "Rejeitadas",
            Metric::Completed => "Completadas",
        }
    }
}

/// Stands in for a blank category name.
pub const UNNAMED_CATEGORY: &str = "Sem nome";

/// Aggregated metrics for one category (or the overall totals) in one week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryRecord {
    pub name: String,
    pub planned_seconds: f64,
    pub delivered_seconds: f64,
    pub adherence_percent: f64,
    pub offered: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub completed: u64,
}

impl CategoryRecord {
    /// A zero-valued record standing in for a category a week does not have.
    pub fn zeroed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Name used to match the category across weeks. Blank names all match
    /// [`UNNAMED_CATEGORY`].
    pub fn match_name(&self) -> &str {
        match self.name.trim() {
            "" => UNNAMED_CATEGORY,
            name => name,
        }
    }

    /// Uppercased name used on slides.
    pub fn display_name(&self) -> String {
        self.match_name().to_uppercase()
    }

    /// Value of a metric, with hours expressed as decimal hours.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Adherence => self.adherence_percent,
            Metric::PlannedHours => self.planned_seconds / 3600.0,
            Metric::DeliveredHours => self.delivered_seconds / 3600.0,
            Metric::Offered => self.offered as f64,
            Metric::Accepted => self.accepted as f64,
            Metric::Rejected => self.rejected as f64,
            Metric::Completed => self.completed as f64,
        }
    }

    /// Share of offered work that was rejected, in percent. Zero when nothing
    /// was offered.
    pub fn rejection_rate(&self) -> f64 {
        if self.offered == 0 {
            0.0
        } else {
            self.rejected as f64 / self.offered as f64 * 100.0
        }
    }
}

/// One week's full set of aggregated metrics across all dimensions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeeklySnapshot {
    pub week: Option<WeekId>,
    pub totals: CategoryRecord,
    pub sub_regions: Vec<CategoryRecord>,
    pub days_of_week: Vec<CategoryRecord>,
    pub shifts: Vec<CategoryRecord>,
    pub origins: Vec<CategoryRecord>,
}

impl WeeklySnapshot {
    /// Create an empty snapshot for the given week.
    pub fn new(week: impl Into<WeekId>) -> Self {
        Self {
            week: Some(week.into()),
            ..Default::default()
        }
    }

    /// Records for one dimension.
    pub fn records(&self, dimension: Dimension) -> &[CategoryRecord] {
        match dimension {
            Dimension::SubRegion => &self.sub_regions,
            Dimension::DayOfWeek => &self.days_of_week,
            Dimension::Shift => &self.shifts,
            Dimension::Origin => &self.origins,
        }
    }

    /// Mutable records for one dimension, used when building snapshots.
    pub fn records_mut(&mut self, dimension: Dimension) -> &mut Vec<CategoryRecord> {
        match dimension {
            Dimension::SubRegion => &mut self.sub_regions,
            Dimension::DayOfWeek => &mut self.days_of_week,
            Dimension::Shift => &mut self.shifts,
            Dimension::Origin => &mut self.origins,
        }
    }

    /// Add a record to a dimension.
    pub fn with_record(mut self, dimension: Dimension, record: CategoryRecord) -> Self {
        self.records_mut(dimension).push(record);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_label() {
        assert_eq!(WeekId::new("44").label(), "44");
        assert_eq!(WeekId::new("W45").label(), "45");
        assert_eq!(WeekId::new("2024-W07").label(), "07");
        assert_eq!(WeekId::new(" w3 ").label(), "3");
        assert_eq!(WeekId::new("semana-alpha").label(), "semana-alpha");
    }

    #[test]
    fn test_dimension_from_slug() {
        assert_eq!(Dimension::from_slug("origin"), Some(Dimension::Origin));
        assert_eq!(Dimension::from_slug("Sub-Region"), Some(Dimension::SubRegion));
        assert_eq!(Dimension::from_slug("day_of_week"), Some(Dimension::DayOfWeek));
        assert_eq!(Dimension::from_slug("nope"), None);
    }

    #[test]
    fn test_record_values() {
        let record = CategoryRecord {
            name: "  Norte ".to_string(),
            planned_seconds: 7200.0,
            delivered_seconds: 5400.0,
            adherence_percent: 75.0,
            offered: 10,
            rejected: 2,
            ..Default::default()
        };

        assert_eq!(record.match_name(), "Norte");
        assert_eq!(record.display_name(), "NORTE");
        assert_eq!(record.value(Metric::PlannedHours), 2.0);
        assert_eq!(record.value(Metric::DeliveredHours), 1.5);
        assert_eq!(record.value(Metric::Adherence), 75.0);
        assert_eq!(record.rejection_rate(), 20.0);
        assert_eq!(CategoryRecord::zeroed("X").rejection_rate(), 0.0);
        assert_eq!(CategoryRecord::zeroed("  ").match_name(), UNNAMED_CATEGORY);
        assert_eq!(CategoryRecord::zeroed("").display_name(), "SEM NOME");
    }

    #[test]
    fn test_snapshot_deserializes_camel_case() {
        let json = r#"{
            "week": "44",
            "totals": { "adherencePercent": 81.5, "plannedSeconds": 3600 },
            "subRegions": [{ "name": "Centro", "adherencePercent": 80 }]
        }"#;
        let snapshot: WeeklySnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.week, Some(WeekId::new("44")));
        assert_eq!(snapshot.totals.adherence_percent, 81.5);
        assert_eq!(snapshot.records(Dimension::SubRegion).len(), 1);
        assert!(snapshot.records(Dimension::Origin).is_empty());
    }
}
