use crate::report::{ConfidenceLevel, ForecastConfidence, HistoricalWinRates, StageWinRate};
use crate::stats::ratio;
use core_types::{Opportunity, Stage, StageProbabilities, Status};
use std::collections::BTreeMap;

const HIGH_CONFIDENCE_SAMPLE: usize = 50;
const MEDIUM_CONFIDENCE_SAMPLE: usize = 20;

/// Win rate per last stage from closed deals, plus overall totals.
///
/// A stage with no closed deals reports `win_rate: None`, never zero.
pub fn calculate(opportunities: &[Opportunity]) -> HistoricalWinRates {
    let mut counts: BTreeMap<Stage, (usize, usize)> =
        Stage::ALL.iter().map(|stage| (*stage, (0, 0))).collect();
    let mut won = 0;
    let mut lost = 0;

    for opp in opportunities.iter().filter(|opp| opp.is_closed()) {
        let is_won = opp.status == Status::Won;
        if is_won { won += 1 } else { lost += 1 }

        if let Some(entry) = opp.last_stage.and_then(|stage| counts.get_mut(&stage)) {
            if is_won { entry.0 += 1 } else { entry.1 += 1 }
        }
    }

    HistoricalWinRates {
        stages: counts
            .into_iter()
            .map(|(stage, (won, lost))| StageWinRate {
                stage,
                won,
                lost,
                win_rate: ratio(won, won + lost),
            })
            .collect(),
        won,
        lost,
        closed: won + lost,
        overall_win_rate: ratio(won, won + lost),
    }
}

/// The derived probability mapping: only stages with closed history appear.
pub fn to_probabilities(win_rates: &HistoricalWinRates) -> StageProbabilities {
    let values = win_rates
        .stages
        .iter()
        .filter_map(|s| s.win_rate.map(|rate| (s.stage, rate)))
        .collect();
    // A ratio of counts always lies within [0, 1].
    StageProbabilities::new(values).unwrap_or_else(|_| StageProbabilities::empty())
}

pub fn confidence(win_rates: &HistoricalWinRates) -> ForecastConfidence {
    let sample_size = win_rates.closed;
    let level = if sample_size >= HIGH_CONFIDENCE_SAMPLE {
        ConfidenceLevel::High
    } else if sample_size >= MEDIUM_CONFIDENCE_SAMPLE {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    };
    ForecastConfidence { level, sample_size }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lost, open, won};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn rate_for(rates: &HistoricalWinRates, stage: Stage) -> Option<Decimal> {
        rates.stages.iter().find(|s| s.stage == stage).and_then(|s| s.win_rate)
    }

    #[test]
    fn three_won_one_lost_at_proposal() {
        let opportunities = vec![
            won("W1", 100, Stage::Proposal, "2024-01-01", "2024-02-01"),
            won("W2", 100, Stage::Proposal, "2024-01-01", "2024-02-01"),
            won("W3", 100, Stage::Proposal, "2024-01-01", "2024-02-01"),
            lost("L1", 100, Stage::Proposal, "2024-01-01", "2024-02-01"),
        ];
        let rates = calculate(&opportunities);
        assert_eq!(rate_for(&rates, Stage::Proposal), Some(dec!(0.75)));
        assert_eq!(rates.overall_win_rate, Some(dec!(0.75)));
        assert_eq!(rates.closed, 4);
    }

    #[test]
    fn stage_without_history_is_insufficient_not_zero() {
        let opportunities = vec![
            lost("L1", 100, Stage::Demo, "2024-01-01", "2024-02-01"),
            open("O1", 100, Stage::Negotiation, "2024-01-01"),
        ];
        let rates = calculate(&opportunities);
        assert_eq!(rate_for(&rates, Stage::Demo), Some(Decimal::ZERO));
        assert_eq!(rate_for(&rates, Stage::Negotiation), None);
        assert_eq!(rates.stages.len(), 4);

        let derived = to_probabilities(&rates);
        assert_eq!(derived.get(Stage::Demo), Some(Decimal::ZERO));
        assert!(!derived.contains(Stage::Negotiation));
    }

    #[test]
    fn closed_deal_without_last_stage_counts_only_overall() {
        let mut unknown = won("W1", 100, Stage::Demo, "2024-01-01", "2024-02-01");
        unknown.last_stage = None;
        let rates = calculate(&[unknown]);
        assert_eq!(rates.won, 1);
        assert_eq!(rates.overall_win_rate, Some(Decimal::ONE));
        assert!(rates.stages.iter().all(|s| s.win_rate.is_none()));
    }

    #[test]
    fn no_closed_deals_means_no_overall_rate() {
        let rates = calculate(&[open("O1", 100, Stage::Demo, "2024-01-01")]);
        assert_eq!(rates.overall_win_rate, None);
        assert_eq!(confidence(&rates).level, ConfidenceLevel::Low);
    }

    #[test]
    fn confidence_grows_with_sample_size() {
        let deals: Vec<Opportunity> = (0..50)
            .map(|i| won(&format!("W{i}"), 100, Stage::Demo, "2024-01-01", "2024-02-01"))
            .collect();
        assert_eq!(confidence(&calculate(&deals[..19])).level, ConfidenceLevel::Low);
        assert_eq!(confidence(&calculate(&deals[..20])).level, ConfidenceLevel::Medium);
        assert_eq!(confidence(&calculate(&deals)).level, ConfidenceLevel::High);
    }
}
