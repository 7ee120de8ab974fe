use crate::report::{MonthlyRevenue, ProjectedMonth, TrendAnalysis, TrendDirection};
use crate::stats::{checked_ratio, mean, ratio};
use configuration::TrendSettings;
use core_types::{Opportunity, Status, YearMonth};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

const MONTHS_PER_QUARTER: u32 = 3;
const REVENUE_CHANGE_THRESHOLD: Decimal = dec!(0.10);
const WIN_RATE_CHANGE_THRESHOLD: Decimal = dec!(0.05);

/// Classifies `change` against a symmetric threshold.
pub(crate) fn direction(change: Decimal, threshold: Decimal) -> TrendDirection {
    if change > threshold {
        TrendDirection::Improving
    } else if change < -threshold {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

/// Monthly won revenue and win rate by close month, with a flat projection.
///
/// Closed deals without a close date cannot be placed in a month and are
/// skipped. `current_pipeline` is the open pipeline total the coverage ratio
/// is measured against.
pub fn calculate(
    opportunities: &[Opportunity],
    settings: &TrendSettings,
    current_pipeline: Decimal,
) -> TrendAnalysis {
    let mut by_month: BTreeMap<YearMonth, (Decimal, usize, usize)> = BTreeMap::new();
    for opp in opportunities.iter().filter(|opp| opp.is_closed()) {
        let Some(closed) = opp.close_date else { continue };
        let entry = by_month.entry(YearMonth::from_date(closed)).or_default();
        if opp.status == Status::Won {
            entry.0 += opp.amount;
            entry.1 += 1;
        } else {
            entry.2 += 1;
        }
    }

    let months: Vec<MonthlyRevenue> = by_month
        .into_iter()
        .map(|(month, (revenue, won_count, lost_count))| MonthlyRevenue {
            month,
            revenue,
            won_count,
            lost_count,
            win_rate: ratio(won_count, won_count + lost_count),
        })
        .collect();

    let window = &months[months.len().saturating_sub(settings.trailing_months)..];

    let revenue_trend = match (window.first(), window.last()) {
        (Some(first), Some(last)) if window.len() >= 2 => {
            checked_ratio(last.revenue - first.revenue, first.revenue)
                .map(|change| direction(change, REVENUE_CHANGE_THRESHOLD))
                .unwrap_or_default()
        }
        _ => TrendDirection::Stable,
    };

    let window_rates: Vec<Decimal> = window.iter().filter_map(|m| m.win_rate).collect();
    let win_rate_trend = match (window_rates.first(), window_rates.last()) {
        (Some(first), Some(last)) if window_rates.len() >= 2 => {
            direction(*last - *first, WIN_RATE_CHANGE_THRESHOLD)
        }
        _ => TrendDirection::Stable,
    };

    let has_full_window = months.len() >= settings.trailing_months;
    let avg_monthly_revenue = if has_full_window {
        mean(&window.iter().map(|m| m.revenue).collect::<Vec<_>>())
    } else {
        None
    };
    let avg_win_rate = if has_full_window { mean(&window_rates) } else { None };

    let projection = match (avg_monthly_revenue, months.last()) {
        (Some(revenue), Some(last)) => {
            std::iter::successors(Some(last.month.next()), |month| Some(month.next()))
                .take(settings.projection_months)
                .map(|month| ProjectedMonth { month, revenue })
                .collect()
        }
        _ => Vec::new(),
    };

    let quarterly_quota = settings.monthly_quota * Decimal::from(MONTHS_PER_QUARTER);

    TrendAnalysis {
        months,
        revenue_trend,
        win_rate_trend,
        avg_monthly_revenue,
        avg_win_rate,
        projection,
        next_quarter_projection: avg_monthly_revenue
            .map(|revenue| revenue * Decimal::from(MONTHS_PER_QUARTER)),
        current_pipeline,
        quarterly_quota,
        pipeline_coverage: checked_ratio(current_pipeline, quarterly_quota),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lost, won};
    use core_types::Stage;

    fn history() -> Vec<Opportunity> {
        vec![
            won("W1", 1000, Stage::Demo, "2023-12-01", "2024-01-15"),
            lost("L1", 500, Stage::Demo, "2023-12-01", "2024-01-20"),
            won("W2", 1000, Stage::Demo, "2023-12-01", "2024-02-10"),
            won("W3", 2000, Stage::Demo, "2023-12-01", "2024-03-05"),
        ]
    }

    #[test]
    fn groups_closed_deals_by_close_month() {
        let trends = calculate(&history(), &TrendSettings::default(), Decimal::ZERO);
        let labels: Vec<String> = trends.months.iter().map(|m| m.month.to_string()).collect();
        assert_eq!(labels, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(trends.months[0].revenue, dec!(1000));
        assert_eq!(trends.months[0].win_rate, Some(dec!(0.5)));
    }

    #[test]
    fn detects_revenue_and_win_rate_direction() {
        let trends = calculate(&history(), &TrendSettings::default(), Decimal::ZERO);
        // Revenue doubles from January to March; win rate rises from 0.5 to 1.
        assert_eq!(trends.revenue_trend, TrendDirection::Improving);
        assert_eq!(trends.win_rate_trend, TrendDirection::Improving);
    }

    #[test]
    fn projects_the_trailing_average_forward() {
        let trends = calculate(&history(), &TrendSettings::default(), dec!(3000000));
        let expected_avg = dec!(4000) / dec!(3);
        assert_eq!(trends.avg_monthly_revenue, Some(expected_avg));
        assert_eq!(trends.next_quarter_projection, Some(expected_avg * dec!(3)));

        let months: Vec<String> = trends.projection.iter().map(|p| p.month.to_string()).collect();
        assert_eq!(months, vec!["2024-04", "2024-05", "2024-06"]);

        assert_eq!(trends.quarterly_quota, dec!(6000000));
        assert_eq!(trends.pipeline_coverage, Some(dec!(0.5)));
    }

    #[test]
    fn too_little_history_leaves_projection_undefined() {
        let trends = calculate(&history()[..2], &TrendSettings::default(), Decimal::ZERO);
        assert_eq!(trends.months.len(), 1);
        assert_eq!(trends.avg_monthly_revenue, None);
        assert_eq!(trends.next_quarter_projection, None);
        assert!(trends.projection.is_empty());
        assert_eq!(trends.revenue_trend, TrendDirection::Stable);
    }

    #[test]
    fn zero_starting_revenue_is_stable() {
        let opportunities = vec![
            lost("L1", 100, Stage::Demo, "2023-12-01", "2024-01-10"),
            won("W1", 100, Stage::Demo, "2023-12-01", "2024-02-10"),
        ];
        let trends = calculate(&opportunities, &TrendSettings::default(), Decimal::ZERO);
        assert_eq!(trends.revenue_trend, TrendDirection::Stable);
        assert_eq!(trends.win_rate_trend, TrendDirection::Improving);
    }

    #[test]
    fn direction_uses_strict_thresholds() {
        assert_eq!(direction(dec!(0.10), dec!(0.10)), TrendDirection::Stable);
        assert_eq!(direction(dec!(-0.11), dec!(0.10)), TrendDirection::Declining);
    }
}
