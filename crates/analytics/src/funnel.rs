use crate::report::{FunnelAnalysis, FunnelStage, StageTransition};
use crate::stats::{mean, ratio};
use chrono::NaiveDate;
use configuration::FunnelSettings;
use core_types::{Opportunity, Stage, Status};
use rust_decimal::Decimal;

#[derive(Default)]
struct StageTally {
    entered: usize,
    current: usize,
    won: usize,
    lost: usize,
    day_estimates: Vec<Decimal>,
}

/// Stage conversion funnel.
///
/// A deal counts toward its own stage and every stage before it. Open deals
/// use their current stage, closed deals the stage they closed from; closed
/// deals without one are left out.
pub fn calculate(
    opportunities: &[Opportunity],
    as_of: NaiveDate,
    settings: &FunnelSettings,
) -> FunnelAnalysis {
    let mut tallies: Vec<StageTally> = Stage::ALL.iter().map(|_| StageTally::default()).collect();

    for opp in opportunities {
        let Some(stage) = opp.funnel_stage() else {
            continue;
        };
        let reached = stage.index() + 1;

        let elapsed = match opp.status {
            Status::Open => opp.age_on(as_of),
            Status::Won | Status::Lost => opp.cycle_days(),
        };
        let per_stage = elapsed.map(|days| Decimal::from(days) / Decimal::from(reached));

        for tally in tallies.iter_mut().take(reached) {
            tally.entered += 1;
            if let Some(days) = per_stage {
                tally.day_estimates.push(days);
            }
        }

        let tally = &mut tallies[stage.index()];
        match opp.status {
            Status::Open => tally.current += 1,
            Status::Won => tally.won += 1,
            Status::Lost => tally.lost += 1,
        }
    }

    let stages: Vec<FunnelStage> = Stage::ALL
        .iter()
        .zip(&tallies)
        .map(|(stage, tally)| summarize(*stage, tally, settings.stuck_multiplier))
        .collect();

    let transitions: Vec<StageTransition> = stages
        .windows(2)
        .map(|pair| {
            let (from, to) = (&pair[0], &pair[1]);
            let conversion_rate = ratio(to.entered, from.entered);
            StageTransition {
                from_stage: from.stage,
                to_stage: to.stage,
                from_count: from.entered,
                to_count: to.entered,
                dropped: from.entered.saturating_sub(to.entered),
                conversion_rate,
                drop_off_rate: conversion_rate.map(|rate| Decimal::ONE - rate),
            }
        })
        .collect();

    FunnelAnalysis {
        biggest_bottleneck: biggest_bottleneck(&transitions),
        slowest_stage: first_max_by(&stages, |s| s.avg_days_in_stage.unwrap_or_default()),
        stickiest_stage: first_max_by(&stages, |s| Decimal::from(s.stuck_count)),
        stages,
        transitions,
    }
}

fn summarize(stage: Stage, tally: &StageTally, stuck_multiplier: Decimal) -> FunnelStage {
    let avg_days_in_stage = mean(&tally.day_estimates);
    let stuck_count = avg_days_in_stage
        .map(|avg| {
            let threshold = avg * stuck_multiplier;
            tally.day_estimates.iter().filter(|days| **days > threshold).count()
        })
        .unwrap_or(0);

    FunnelStage {
        stage,
        entered: tally.entered,
        currently_in_stage: tally.current,
        won_from_here: tally.won,
        lost_from_here: tally.lost,
        avg_days_in_stage,
        stuck_count,
    }
}

fn biggest_bottleneck(transitions: &[StageTransition]) -> Option<StageTransition> {
    let mut best: Option<&StageTransition> = None;
    for transition in transitions {
        let Some(drop_off) = transition.drop_off_rate else {
            continue;
        };
        let current_best = best.and_then(|b| b.drop_off_rate).unwrap_or(Decimal::ZERO);
        if drop_off > current_best {
            best = Some(transition);
        }
    }
    best.cloned()
}

/// The earliest stage with the strictly largest positive value.
fn first_max_by<F>(stages: &[FunnelStage], value: F) -> Option<Stage>
where
    F: Fn(&FunnelStage) -> Decimal,
{
    let mut best: Option<(Stage, Decimal)> = None;
    for stage in stages {
        let current = value(stage);
        let threshold = best.map(|(_, v)| v).unwrap_or(Decimal::ZERO);
        if current > threshold {
            best = Some((stage.stage, current));
        }
    }
    best.map(|(stage, _)| stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, lost, open, won};
    use rust_decimal_macros::dec;

    fn sample() -> Vec<Opportunity> {
        vec![
            open("O1", 100, Stage::Discovery, "2024-03-01"),
            open("O2", 100, Stage::Demo, "2024-02-01"),
            open("O3", 100, Stage::Proposal, "2024-01-01"),
            won("W1", 100, Stage::Negotiation, "2023-10-01", "2024-01-01"),
            lost("L1", 100, Stage::Demo, "2023-11-01", "2023-12-01"),
        ]
    }

    #[test]
    fn counts_deals_toward_every_earlier_stage() {
        let funnel = calculate(&sample(), date("2024-04-01"), &FunnelSettings::default());
        let entered: Vec<usize> = funnel.stages.iter().map(|s| s.entered).collect();
        assert_eq!(entered, vec![5, 4, 2, 1]);

        let demo = &funnel.stages[1];
        assert_eq!(demo.currently_in_stage, 1);
        assert_eq!(demo.lost_from_here, 1);
        assert_eq!(funnel.stages[3].won_from_here, 1);
    }

    #[test]
    fn transitions_are_stage_to_stage() {
        let funnel = calculate(&sample(), date("2024-04-01"), &FunnelSettings::default());
        let first = &funnel.transitions[0];
        assert_eq!((first.from_stage, first.to_stage), (Stage::Discovery, Stage::Demo));
        assert_eq!(first.conversion_rate, Some(dec!(0.8)));
        assert_eq!(first.drop_off_rate, Some(dec!(0.2)));
        assert_eq!(first.dropped, 1);

        let second = &funnel.transitions[1];
        assert_eq!(second.conversion_rate, Some(dec!(0.5)));

        let bottleneck = funnel.biggest_bottleneck.unwrap();
        assert_eq!(bottleneck.from_stage, Stage::Demo);
        assert_eq!(bottleneck.drop_off_rate, Some(dec!(0.5)));
    }

    #[test]
    fn empty_stages_have_undefined_conversion() {
        let opportunities = vec![open("O1", 100, Stage::Discovery, "2024-03-01")];
        let funnel = calculate(&opportunities, date("2024-04-01"), &FunnelSettings::default());
        assert_eq!(funnel.transitions[0].conversion_rate, Some(Decimal::ZERO));
        assert_eq!(funnel.transitions[1].conversion_rate, None);
        assert_eq!(funnel.transitions[1].drop_off_rate, None);
        assert_eq!(funnel.stages[1].avg_days_in_stage, None);
    }

    #[test]
    fn estimates_time_in_stage_and_stuck_deals() {
        let opportunities = vec![
            open("FAST", 100, Stage::Discovery, "2024-03-22"),
            open("SLOW", 100, Stage::Discovery, "2023-12-01"),
            open("NORMAL", 100, Stage::Discovery, "2024-03-12"),
        ];
        let funnel = calculate(&opportunities, date("2024-04-01"), &FunnelSettings::default());
        let discovery = &funnel.stages[0];
        // Ages 10, 122 and 20 days.
        assert_eq!(discovery.avg_days_in_stage, Some(dec!(152) / dec!(3)));
        assert_eq!(discovery.stuck_count, 1);
        assert_eq!(funnel.slowest_stage, Some(Stage::Discovery));
        assert_eq!(funnel.stickiest_stage, Some(Stage::Discovery));
    }

    #[test]
    fn closed_deals_without_last_stage_are_skipped() {
        let mut unknown = lost("L1", 100, Stage::Demo, "2023-11-01", "2023-12-01");
        unknown.last_stage = None;
        let funnel = calculate(&[unknown], date("2024-04-01"), &FunnelSettings::default());
        assert!(funnel.stages.iter().all(|s| s.entered == 0));
        assert_eq!(funnel.biggest_bottleneck, None);
        assert_eq!(funnel.slowest_stage, None);
    }
}
