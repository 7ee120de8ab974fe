use crate::report::{Cohort, CohortAnalysis, TrendDirection};
use crate::stats::{mean, ratio};
use crate::trends::direction;
use core_types::{Opportunity, Status, YearMonth};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

const TREND_COHORTS: usize = 3;
const WIN_RATE_CHANGE_THRESHOLD: Decimal = dec!(0.10);

#[derive(Default)]
struct CohortTally {
    total: usize,
    won: usize,
    lost: usize,
    open: usize,
    days_to_close: Vec<Decimal>,
}

/// Groups deals by the month they were created in.
///
/// Deals without a created date belong to no cohort and are skipped.
pub fn calculate(opportunities: &[Opportunity]) -> CohortAnalysis {
    let mut by_month: BTreeMap<YearMonth, CohortTally> = BTreeMap::new();

    for opp in opportunities {
        let Some(created) = opp.created_date else { continue };
        let tally = by_month.entry(YearMonth::from_date(created)).or_default();
        tally.total += 1;
        match opp.status {
            Status::Open => tally.open += 1,
            Status::Won => tally.won += 1,
            Status::Lost => tally.lost += 1,
        }
        if opp.is_closed() {
            if let Some(days) = opp.cycle_days() {
                tally.days_to_close.push(Decimal::from(days));
            }
        }
    }

    let cohorts: Vec<Cohort> = by_month
        .into_iter()
        .map(|(month, tally)| {
            let closed = tally.won + tally.lost;
            Cohort {
                month,
                total: tally.total,
                won: tally.won,
                lost: tally.lost,
                open: tally.open,
                conversion_rate: ratio(closed, tally.total),
                win_rate: ratio(tally.won, closed),
                avg_days_to_close: mean(&tally.days_to_close),
            }
        })
        .collect();

    CohortAnalysis {
        trend: cohort_trend(&cohorts),
        cohorts,
    }
}

/// Win-rate movement across the most recent cohorts.
fn cohort_trend(cohorts: &[Cohort]) -> TrendDirection {
    if cohorts.len() < TREND_COHORTS {
        return TrendDirection::Stable;
    }
    let recent: Vec<Decimal> = cohorts[cohorts.len() - TREND_COHORTS..]
        .iter()
        .filter_map(|c| c.win_rate)
        .collect();
    match (recent.first(), recent.last()) {
        (Some(first), Some(last)) if recent.len() >= 2 => {
            direction(*last - *first, WIN_RATE_CHANGE_THRESHOLD)
        }
        _ => TrendDirection::Stable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lost, open, won};
    use core_types::Stage;

    #[test]
    fn groups_by_created_month() {
        let opportunities = vec![
            won("W1", 100, Stage::Demo, "2024-01-05", "2024-01-25"),
            lost("L1", 100, Stage::Demo, "2024-01-10", "2024-02-09"),
            open("O1", 100, Stage::Demo, "2024-01-20"),
            open("O2", 100, Stage::Demo, "2024-02-01"),
        ];
        let analysis = calculate(&opportunities);
        assert_eq!(analysis.cohorts.len(), 2);

        let january = &analysis.cohorts[0];
        assert_eq!(january.month.to_string(), "2024-01");
        assert_eq!((january.total, january.won, january.lost, january.open), (3, 1, 1, 1));
        assert_eq!(january.conversion_rate, Some(dec!(2) / dec!(3)));
        assert_eq!(january.win_rate, Some(dec!(0.5)));
        assert_eq!(january.avg_days_to_close, Some(dec!(25)));

        let february = &analysis.cohorts[1];
        assert_eq!(february.conversion_rate, Some(Decimal::ZERO));
        assert_eq!(february.win_rate, None);
        assert_eq!(february.avg_days_to_close, None);
    }

    #[test]
    fn trend_compares_recent_cohorts_with_a_win_rate() {
        let opportunities = vec![
            lost("A", 100, Stage::Demo, "2024-01-05", "2024-02-01"),
            won("B", 100, Stage::Demo, "2024-01-06", "2024-02-01"),
            open("C", 100, Stage::Demo, "2024-02-05"),
            won("D", 100, Stage::Demo, "2024-03-05", "2024-04-01"),
        ];
        // January 0.5, February undefined, March 1.0.
        assert_eq!(calculate(&opportunities).trend, TrendDirection::Improving);
    }

    #[test]
    fn fewer_than_three_cohorts_is_stable() {
        let opportunities = vec![
            lost("A", 100, Stage::Demo, "2024-01-05", "2024-02-01"),
            won("D", 100, Stage::Demo, "2024-03-05", "2024-04-01"),
        ];
        assert_eq!(calculate(&opportunities).trend, TrendDirection::Stable);
    }

    #[test]
    fn undated_deals_are_skipped() {
        let mut undated = open("O1", 100, Stage::Demo, "2024-01-01");
        undated.created_date = None;
        assert!(calculate(&[undated]).cohorts.is_empty());
    }
}
