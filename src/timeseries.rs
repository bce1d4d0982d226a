//! Day-by-day cumulative totals for one class across the current billing cycle.

use crate::aggregator::{Outlook, TargetStatus};
use crate::schema::BudgetClass;
use crate::utils::{format_day, local_day, one_year_before, SECONDS_PER_DAY};
use chrono::{FixedOffset, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `[start, end)` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleWindow {
    pub start: i64,
    pub end: i64,
}

impl CycleWindow {
    /// The backend only lists upcoming boundaries, so the start of the
    /// current cycle is approximated as the latest boundary stepped back one
    /// year. `reset_dates` must be sorted ascending.
    pub fn from_reset_dates(reset_dates: &[i64]) -> Option<Self> {
        let end = *reset_dates.first()?;
        let latest = *reset_dates.last()?;
        let start = one_year_before(latest)?;
        Some(Self { start, end })
    }

    /// A window that has not finished yet stops one day past `now`.
    pub fn clamped_end(&self, now: i64) -> i64 {
        if now < self.end {
            now.saturating_add(SECONDS_PER_DAY)
        } else {
            self.end
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetLine {
    pub values: Vec<f64>,
    pub outlook: Outlook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSeries {
    pub labels: Vec<String>,
    pub cumulative_totals: Vec<f64>,
    pub target_line: Option<TargetLine>,
}

impl ClassSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub struct SeriesBuilder {
    window: CycleWindow,
    offset: FixedOffset,
    now: i64,
}

impl SeriesBuilder {
    pub fn new(window: CycleWindow, offset: FixedOffset, now: i64) -> Self {
        Self {
            window,
            offset,
            now,
        }
    }

    pub fn window(&self) -> CycleWindow {
        self.window
    }

    /// Every calendar day the chart covers, in order.
    pub fn days(&self) -> Vec<NaiveDate> {
        let (Some(first), Some(stop)) = (
            local_day(self.window.start, self.offset),
            local_day(self.window.clamped_end(self.now), self.offset),
        ) else {
            return Vec::new();
        };

        let mut days = Vec::new();
        let mut day = first;
        while day < stop {
            days.push(day);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        days
    }

    /// Returns `None` for classes with fewer than two transactions; those
    /// get no chart.
    pub fn build(&self, class: &BudgetClass, total_income: f64) -> Option<ClassSeries> {
        if class.history.len() <= 1 {
            return None;
        }

        let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for transaction in &class.history {
            if let Some(day) = local_day(transaction.timestamp, self.offset) {
                *per_day.entry(day).or_insert(0.0) += transaction.price;
            }
        }

        let days = self.days();
        let mut labels = Vec::with_capacity(days.len());
        let mut cumulative_totals = Vec::with_capacity(days.len());
        let mut running = 0.0;
        for day in days {
            running += per_day.get(&day).copied().unwrap_or(0.0);
            labels.push(format_day(day));
            cumulative_totals.push(running);
        }

        let target_line = TargetStatus::evaluate(class, class.sum(), total_income).map(|status| {
            TargetLine {
                values: vec![status.effective; cumulative_totals.len()],
                outlook: status.outlook,
            }
        });

        debug!(
            "Built {}-day series for class {} (target line: {})",
            labels.len(),
            class.id,
            target_line.is_some()
        );

        Some(ClassSeries {
            labels,
            cumulative_totals,
            target_line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ClassType, Target, Transaction};
    use crate::utils::utc_offset;

    // 2023-03-01 00:00:00 UTC
    const MARCH_1: i64 = 1_677_628_800;
    const DAY: i64 = SECONDS_PER_DAY;

    fn class(prices_at: &[(f64, i64)], target: Option<Target>) -> BudgetClass {
        BudgetClass {
            id: "c1".to_string(),
            name: "Food".to_string(),
            description: String::new(),
            class_type: ClassType::Expense,
            keywords: vec![],
            target,
            history: prices_at
                .iter()
                .enumerate()
                .map(|(i, (price, ts))| Transaction {
                    id: format!("t{}", i),
                    class_id: "c1".to_string(),
                    price: *price,
                    vendor: String::new(),
                    description: String::new(),
                    timestamp: *ts,
                    recurring: false,
                })
                .collect(),
        }
    }

    #[test]
    fn test_window_from_reset_dates() {
        // 2023-04-01 and 2024-03-01
        let window = CycleWindow::from_reset_dates(&[1_680_307_200, 1_709_251_200]).unwrap();
        assert_eq!(window.start, MARCH_1);
        assert_eq!(window.end, 1_680_307_200);
        assert!(CycleWindow::from_reset_dates(&[]).is_none());
    }

    #[test]
    fn test_cumulative_series() {
        let window = CycleWindow {
            start: MARCH_1,
            end: MARCH_1 + 4 * DAY,
        };
        let builder = SeriesBuilder::new(window, utc_offset(), MARCH_1 + 30 * DAY);
        let class = class(&[(10.0, MARCH_1 + DAY + 60), (5.0, MARCH_1 + 3 * DAY + 7200)], None);

        let series = builder.build(&class, 0.0).unwrap();
        assert_eq!(series.labels, vec!["2023-3-1", "2023-3-2", "2023-3-3", "2023-3-4"]);
        assert_eq!(series.cumulative_totals, vec![0.0, 10.0, 10.0, 15.0]);
        assert!(series.target_line.is_none());
    }

    #[test]
    fn test_walk_clamps_to_day_after_now() {
        let window = CycleWindow {
            start: MARCH_1,
            end: MARCH_1 + 10 * DAY,
        };
        let now = MARCH_1 + DAY + 12 * 3600;
        let builder = SeriesBuilder::new(window, utc_offset(), now);
        assert_eq!(builder.days().len(), 2);
    }

    #[test]
    fn test_target_line_is_flat() {
        let window = CycleWindow {
            start: MARCH_1,
            end: MARCH_1 + 3 * DAY,
        };
        let builder = SeriesBuilder::new(window, utc_offset(), MARCH_1 + 30 * DAY);
        let class = class(
            &[(40.0, MARCH_1), (20.0, MARCH_1 + DAY)],
            Some(Target::percent_of_income(0.05)),
        );

        let series = builder.build(&class, 2000.0).unwrap();
        let line = series.target_line.unwrap();
        assert_eq!(line.values, vec![100.0; 3]);
        assert_eq!(line.outlook, Outlook::Favorable);
    }

    #[test]
    fn test_single_transaction_has_no_series() {
        let window = CycleWindow {
            start: MARCH_1,
            end: MARCH_1 + 3 * DAY,
        };
        let builder = SeriesBuilder::new(window, utc_offset(), MARCH_1);
        assert!(builder.build(&class(&[(1.0, MARCH_1)], None), 0.0).is_none());
        assert!(builder.build(&class(&[], None), 0.0).is_none());
    }

    #[test]
    fn test_clamped_end_near_max_time() {
        let window = CycleWindow {
            start: 0,
            end: i64::MAX,
        };
        assert_eq!(window.clamped_end(i64::MAX - 10), i64::MAX);
        assert_eq!(window.clamped_end(0), DAY);
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let window = CycleWindow {
            start: MARCH_1 + 5 * DAY,
            end: MARCH_1,
        };
        let builder = SeriesBuilder::new(window, utc_offset(), MARCH_1 + 30 * DAY);
        assert!(builder.days().is_empty());
    }
}
