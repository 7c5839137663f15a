//! Snapshots in, deck content out.

use crate::config::DeckOptions;
use crate::deck::{Deck, DeckSlide, SlideAssembler};
use crate::diff::{Comparison, DiffEngine};
use crate::error::{Error, Result};
use crate::paginate::Paginator;
use crate::types::{WeekId, WeeklySnapshot};

/// Pick one snapshot per selected week, in week order.
///
/// Snapshots carrying a week id are matched by id (or by week number, so
/// `"44"` matches `"W44"`). A selected week without a snapshot becomes an
/// all-zero snapshot. Snapshots without ids are taken positionally.
pub fn order_snapshots(snapshots: &[WeeklySnapshot], weeks: &[WeekId]) -> Result<Vec<WeeklySnapshot>> {
    if weeks.is_empty() {
        return Err(Error::InvalidInput("No weeks selected".to_string()));
    }

    if snapshots.iter().all(|s| s.week.is_none()) {
        if snapshots.len() != weeks.len() {
            return Err(Error::InvalidInput(format!(
                "{} snapshots without week ids for {} selected weeks",
                snapshots.len(),
                weeks.len()
            )));
        }
        return Ok(snapshots
            .iter()
            .zip(weeks)
            .map(|(snapshot, week)| WeeklySnapshot {
                week: Some(week.clone()),
                ..snapshot.clone()
            })
            .collect());
    }

    Ok(weeks
        .iter()
        .map(|week| {
            let found = snapshots.iter().find(|s| s.week.as_ref() == Some(week)).or_else(|| {
                snapshots
                    .iter()
                    .find(|s| s.week.as_ref().map(|w| w.label()) == Some(week.label()))
            });
            match found {
                Some(snapshot) => snapshot.clone(),
                None => {
                    log::warn!("No snapshot for week {}, treating it as all zeros", week);
                    WeeklySnapshot::new(week.clone())
                }
            }
        })
        .collect())
}

/// Normalizes, diffs, paginates and assembles deck content.
#[derive(Debug, Clone, Default)]
pub struct DeckPipeline {
    engine: DiffEngine,
    assembler: SlideAssembler,
}

impl DeckPipeline {
    pub fn new(options: &DeckOptions) -> Self {
        Self {
            engine: DiffEngine::new(),
            assembler: SlideAssembler::new(Paginator::new().with_page_sizes(options.page_sizes)),
        }
    }

    /// Compare the selected weeks.
    pub fn compare(&self, snapshots: &[WeeklySnapshot], weeks: &[WeekId]) -> Result<Comparison> {
        let ordered = order_snapshots(snapshots, weeks)?;
        Ok(self.engine.compare(&ordered))
    }

    /// Default slide sequence for the selected weeks.
    pub fn assemble(&self, snapshots: &[WeeklySnapshot], weeks: &[WeekId]) -> Result<Vec<DeckSlide>> {
        let comparison = self.compare(snapshots, weeks)?;
        Ok(self.assembler.assemble(weeks, &comparison))
    }

    /// Rebuild a deck's content after the week selection changed, keeping its
    /// order, overrides, visibility and media slides.
    pub fn refresh(&self, deck: &mut Deck, snapshots: &[WeeklySnapshot], weeks: &[WeekId]) -> Result<()> {
        let slides = self.assemble(snapshots, weeks)?;
        deck.sync(weeks.to_vec(), slides);
        Ok(())
    }

    /// A fresh deck for the selected weeks.
    pub fn build_deck(&self, snapshots: &[WeeklySnapshot], weeks: &[WeekId]) -> Result<Deck> {
        let mut deck = Deck::new();
        self.refresh(&mut deck, snapshots, weeks)?;
        Ok(deck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryRecord, Dimension};

    fn snapshot(week: &str, adherence: f64) -> WeeklySnapshot {
        let mut snapshot = WeeklySnapshot::new(week);
        snapshot.totals.adherence_percent = adherence;
        snapshot
    }

    #[test]
    fn test_order_by_week_id() {
        let snapshots = vec![snapshot("45", 90.0), snapshot("44", 80.0)];
        let weeks = vec![WeekId::new("W44"), WeekId::new("W45")];

        let ordered = order_snapshots(&snapshots, &weeks).unwrap();
        assert_eq!(ordered[0].totals.adherence_percent, 80.0);
        assert_eq!(ordered[1].totals.adherence_percent, 90.0);
    }

    #[test]
    fn test_missing_week_is_zero_snapshot() {
        let snapshots = vec![snapshot("44", 80.0)];
        let weeks = vec![WeekId::new("44"), WeekId::new("45")];

        let ordered = order_snapshots(&snapshots, &weeks).unwrap();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[1].totals, CategoryRecord::default());
    }

    #[test]
    fn test_positional_snapshots() {
        let snapshots = vec![WeeklySnapshot::default(), WeeklySnapshot::default()];
        let weeks = vec![WeekId::new("1"), WeekId::new("2")];
        let ordered = order_snapshots(&snapshots, &weeks).unwrap();
        assert_eq!(ordered[1].week, Some(WeekId::new("2")));

        let err = order_snapshots(&snapshots[..1], &weeks).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_no_weeks_is_invalid() {
        assert!(matches!(order_snapshots(&[], &[]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_refresh_keeps_user_order() {
        let pipeline = DeckPipeline::new(&DeckOptions::default());
        let mut w44 = snapshot("44", 80.0);
        w44.sub_regions = vec![CategoryRecord {
            name: "Centro".to_string(),
            adherence_percent: 80.0,
            ..Default::default()
        }];
        let w45 = snapshot("45", 85.0);
        let w46 = snapshot("46", 70.0);

        let weeks = vec![WeekId::new("44"), WeekId::new("45")];
        let mut deck = pipeline.build_deck(&[w44.clone(), w45.clone()], &weeks).unwrap();
        deck.reorder(0, 3);
        let order = deck.order().to_vec();

        let weeks = vec![WeekId::new("44"), WeekId::new("46")];
        pipeline.refresh(&mut deck, &[w44, w45, w46], &weeks).unwrap();
        assert_eq!(deck.order(), order.as_slice());
        assert_eq!(deck.weeks(), weeks.as_slice());
        assert!(deck
            .resolved()
            .iter()
            .any(|s| s.key.as_str() == format!("{}-0", Dimension::SubRegion.slug())));
    }
}
