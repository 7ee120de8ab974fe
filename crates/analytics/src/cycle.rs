use crate::report::{CycleAnalysis, RevenueProjection, StageCycle, VelocityAnalysis};
use crate::stats::{mean, median};
use core_types::{Opportunity, Stage, Status};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

const PROJECTION_HORIZONS: [u32; 3] = [30, 60, 90];
const DAYS_PER_YEAR: u32 = 365;

/// Cycle lengths in days of closed deals that have both dates.
pub(crate) fn closed_cycle_lengths(opportunities: &[Opportunity]) -> Vec<Decimal> {
    opportunities
        .iter()
        .filter(|opp| opp.is_closed())
        .filter_map(Opportunity::cycle_days)
        .map(Decimal::from)
        .collect()
}

/// Cycle lengths in days of won deals that have both dates.
pub(crate) fn won_cycle_lengths(opportunities: &[Opportunity]) -> Vec<Decimal> {
    opportunities
        .iter()
        .filter(|opp| opp.status == Status::Won)
        .filter_map(Opportunity::cycle_days)
        .map(Decimal::from)
        .collect()
}

/// Average, median and per-stage cycle length over closed deals.
///
/// Deals missing either date are skipped rather than counted as zero days.
pub fn calculate(opportunities: &[Opportunity]) -> CycleAnalysis {
    let cycles = closed_cycle_lengths(opportunities);

    let won_cycles = won_cycle_lengths(opportunities);

    let mut by_stage: BTreeMap<Stage, Vec<Decimal>> = BTreeMap::new();
    for opp in opportunities.iter().filter(|opp| opp.is_closed()) {
        if let (Some(stage), Some(days)) = (opp.last_stage, opp.cycle_days()) {
            by_stage.entry(stage).or_default().push(Decimal::from(days));
        }
    }

    CycleAnalysis {
        avg_cycle_days: mean(&cycles),
        median_cycle_days: median(&cycles),
        avg_won_cycle_days: mean(&won_cycles),
        sample_size: cycles.len(),
        by_stage: by_stage
            .into_iter()
            .filter_map(|(stage, days)| {
                Some(StageCycle {
                    stage,
                    count: days.len(),
                    avg_days: mean(&days)?,
                    median_days: median(&days)?,
                })
            })
            .collect(),
    }
}

/// Mean amount of won deals.
pub fn avg_won_deal_size(opportunities: &[Opportunity]) -> Option<Decimal> {
    let amounts: Vec<Decimal> = opportunities
        .iter()
        .filter(|opp| opp.status == Status::Won)
        .map(|opp| opp.amount)
        .collect();
    mean(&amounts)
}

/// Sales velocity: (open deals × win rate × average won deal) / average cycle.
///
/// Any undefined input, or a zero cycle, leaves velocity and its projections
/// undefined. No division happens in that case.
pub fn velocity(
    open_count: usize,
    win_rate: Option<Decimal>,
    avg_deal_size: Option<Decimal>,
    avg_cycle_days: Option<Decimal>,
) -> VelocityAnalysis {
    let velocity_per_day = match (win_rate, avg_deal_size, avg_cycle_days) {
        (Some(rate), Some(deal_size), Some(cycle)) if cycle > Decimal::ZERO => {
            Some(Decimal::from(open_count) * rate * deal_size / cycle)
        }
        _ => None,
    };

    let projections = velocity_per_day
        .map(|per_day| {
            PROJECTION_HORIZONS
                .iter()
                .map(|days| RevenueProjection {
                    days: *days,
                    revenue: per_day * Decimal::from(*days),
                })
                .collect()
        })
        .unwrap_or_default();

    VelocityAnalysis {
        open_count,
        win_rate,
        avg_deal_size,
        avg_cycle_days,
        velocity_per_day,
        projections,
        annualized: velocity_per_day.map(|per_day| per_day * Decimal::from(DAYS_PER_YEAR)),
    }
}
