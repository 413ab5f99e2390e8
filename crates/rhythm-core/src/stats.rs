//! Read-side statistics derived from the cycle log.
//!
//! Nothing here is stored: every snapshot is a pure function of the cycles
//! passed in and the calendar date treated as "today".
//!
//! The overall mood is the mood of the most recent work cycle that carries
//! one. "Most recent" means the latest `completed_at`; cycles completed at
//! the same instant are ordered by id, higher wins.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::cycle::{Cycle, CycleType, Mood};
use crate::error::StorageError;
use crate::storage::{CycleStatistics, CycleStore};

/// Counts for the statistics screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    pub total_cycles: u64,
    pub work_cycles: u64,
    pub break_cycles: u64,
    pub today_cycles: u64,
}

/// The home-screen summary for one day.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DailySummary {
    pub total_time_worked_minutes: f64,
    pub total_cycles_today: u64,
    pub overall_mood: Option<Mood>,
}

/// Both views, as refreshed after each recorded cycle.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SessionStatistics {
    pub snapshot: StatisticsSnapshot,
    pub daily: DailySummary,
}

impl From<CycleStatistics> for StatisticsSnapshot {
    fn from(stats: CycleStatistics) -> Self {
        Self {
            total_cycles: stats.total,
            work_cycles: stats.work,
            break_cycles: stats.breaks,
            today_cycles: stats.today,
        }
    }
}

pub struct StatisticsAggregator;

impl StatisticsAggregator {
    pub fn snapshot(cycles: &[Cycle], today: NaiveDate) -> StatisticsSnapshot {
        let mut snap = StatisticsSnapshot::default();
        for cycle in cycles {
            snap.total_cycles += 1;
            match cycle.cycle_type {
                CycleType::Work => snap.work_cycles += 1,
                CycleType::Break => snap.break_cycles += 1,
            }
            if local_date(cycle) == today {
                snap.today_cycles += 1;
            }
        }
        snap
    }

    pub fn daily_summary(cycles: &[Cycle], today: NaiveDate) -> DailySummary {
        let (minutes, count) = cycles
            .iter()
            .filter(|c| c.cycle_type == CycleType::Work && local_date(c) == today)
            .fold((0.0, 0), |(minutes, count), c| {
                (minutes + c.duration_minutes, count + 1)
            });
        DailySummary {
            total_time_worked_minutes: minutes,
            total_cycles_today: count,
            overall_mood: Self::overall_mood(cycles),
        }
    }

    pub fn overall_mood(cycles: &[Cycle]) -> Option<Mood> {
        cycles
            .iter()
            .filter(|c| c.cycle_type == CycleType::Work)
            .filter_map(|c| c.mood.map(|mood| (c.completed_at, c.id, mood)))
            .max_by_key(|(at, id, _)| (*at, *id))
            .map(|(_, _, mood)| mood)
    }

    /// Recompute both views from the store, using the local date as today.
    ///
    /// Counts come from the store's own aggregate queries; the daily summary
    /// needs the rows themselves.
    pub fn refresh(store: &dyn CycleStore) -> Result<SessionStatistics, StorageError> {
        let snapshot = store.statistics()?.into();
        let cycles = store.all_cycles()?;
        Ok(SessionStatistics {
            snapshot,
            daily: Self::daily_summary(&cycles, Local::now().date_naive()),
        })
    }
}

fn local_date(cycle: &Cycle) -> NaiveDate {
    cycle.completed_at.with_timezone(&Local).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn cycle(id: i64, cycle_type: CycleType, minutes: f64, mood: Option<Mood>, ago_hours: i64) -> Cycle {
        Cycle {
            id,
            cycle_type,
            duration_minutes: minutes,
            mood,
            completed_at: Utc::now() - Duration::hours(ago_hours),
        }
    }

    #[test]
    fn snapshot_splits_by_type_and_day() {
        let today = Local::now().date_naive();
        let cycles = vec![
            cycle(1, CycleType::Work, 25.0, None, 0),
            cycle(2, CycleType::Break, 5.0, None, 24 * 3),
            cycle(3, CycleType::Work, 25.0, Some(Mood::Good), 24 * 3),
        ];
        let snap = StatisticsAggregator::snapshot(&cycles, today);
        assert_eq!(
            snap,
            StatisticsSnapshot {
                total_cycles: 3,
                work_cycles: 2,
                break_cycles: 1,
                today_cycles: 1
            }
        );
    }

    #[test]
    fn daily_summary_sums_todays_work_only() {
        let today = Local::now().date_naive();
        let cycles = vec![
            cycle(1, CycleType::Work, 25.0, None, 0),
            cycle(2, CycleType::Work, 0.5, None, 0),
            cycle(3, CycleType::Break, 5.0, None, 0),
            cycle(4, CycleType::Work, 50.0, None, 24 * 5),
        ];
        let summary = StatisticsAggregator::daily_summary(&cycles, today);
        assert_eq!(summary.total_cycles_today, 2);
        assert!((summary.total_time_worked_minutes - 25.5).abs() < f64::EPSILON);
        assert_eq!(summary.overall_mood, None);
    }

    #[test]
    fn overall_mood_is_latest_work_mood() {
        let cycles = vec![
            cycle(1, CycleType::Work, 25.0, Some(Mood::Tired), 3),
            cycle(2, CycleType::Work, 25.0, Some(Mood::Stressed), 1),
            cycle(3, CycleType::Work, 25.0, None, 0),
            cycle(4, CycleType::Break, 5.0, None, 0),
        ];
        assert_eq!(StatisticsAggregator::overall_mood(&cycles), Some(Mood::Stressed));
    }

    #[test]
    fn overall_mood_tie_goes_to_higher_id() {
        let at = Utc::now();
        let mk = |id, mood| Cycle {
            id,
            cycle_type: CycleType::Work,
            duration_minutes: 25.0,
            mood: Some(mood),
            completed_at: at,
        };
        let cycles = vec![mk(9, Mood::Good), mk(4, Mood::Tired)];
        assert_eq!(StatisticsAggregator::overall_mood(&cycles), Some(Mood::Good));
    }

    #[test]
    fn refresh_reads_counts_and_rows_from_store() {
        let db = crate::storage::Database::open_memory().unwrap();
        db.add_cycle(CycleType::Work, 25.0, Some(Mood::Good)).unwrap();
        db.add_cycle(CycleType::Break, 5.0, None).unwrap();

        let stats = StatisticsAggregator::refresh(&db).unwrap();
        assert_eq!(stats.snapshot.total_cycles, 2);
        assert_eq!(stats.snapshot.today_cycles, 2);
        assert_eq!(stats.daily.total_cycles_today, 1);
        assert_eq!(stats.daily.overall_mood, Some(Mood::Good));
    }
}
