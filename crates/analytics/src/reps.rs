use crate::error::AnalyticsError;
use crate::forecast::probability_for;
use crate::report::RepPerformance;
use crate::stats::{checked_ratio, ratio};
use core_types::{Opportunity, StageProbabilities, Status};
use std::collections::BTreeMap;

/// Per-owner pipeline and track record, sorted by owner name.
pub fn calculate(
    opportunities: &[Opportunity],
    probabilities: &StageProbabilities,
) -> Result<Vec<RepPerformance>, AnalyticsError> {
    let mut by_owner: BTreeMap<&str, RepPerformance> = BTreeMap::new();

    for opp in opportunities {
        let rep = by_owner
            .entry(opp.owner.as_str())
            .or_insert_with(|| RepPerformance {
                owner: opp.owner.clone(),
                ..RepPerformance::default()
            });

        match opp.status {
            Status::Open => {
                // Open deals without a stage cannot be weighted anywhere.
                let Some(stage) = opp.stage else { continue };
                let probability = probability_for(probabilities, stage)?;
                rep.open_count += 1;
                rep.open_pipeline += opp.amount;
                rep.weighted_forecast += opp.amount * probability;
            }
            Status::Won => {
                rep.won_count += 1;
                rep.won_amount += opp.amount;
            }
            Status::Lost => rep.lost_count += 1,
        }
    }

    Ok(by_owner
        .into_values()
        .map(|mut rep| {
            rep.win_rate = ratio(rep.won_count, rep.won_count + rep.lost_count);
            rep.avg_deal_size = checked_ratio(rep.won_amount, rep.won_count.into());
            rep
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lost, open, owned_by, probabilities, won};
    use core_types::Stage;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn team() -> Vec<Opportunity> {
        vec![
            owned_by(open("O1", 1000, Stage::Proposal, "2024-01-01"), "Sam"),
            owned_by(won("W1", 400, Stage::Demo, "2024-01-01", "2024-02-01"), "Sam"),
            owned_by(won("W2", 600, Stage::Demo, "2024-01-01", "2024-02-01"), "Sam"),
            owned_by(lost("L1", 900, Stage::Demo, "2024-01-01", "2024-02-01"), "Sam"),
            owned_by(open("O2", 500, Stage::Discovery, "2024-01-01"), "Alex"),
        ]
    }

    #[test]
    fn groups_by_owner_in_name_order() {
        let reps = calculate(&team(), &StageProbabilities::default()).unwrap();
        let owners: Vec<&str> = reps.iter().map(|r| r.owner.as_str()).collect();
        assert_eq!(owners, vec!["Alex", "Sam"]);

        let sam = &reps[1];
        assert_eq!(sam.open_count, 1);
        assert_eq!(sam.open_pipeline, dec!(1000));
        assert_eq!(sam.weighted_forecast, dec!(500));
        assert_eq!((sam.won_count, sam.lost_count), (2, 1));
        assert_eq!(sam.win_rate, Some(dec!(2) / dec!(3)));
        assert_eq!(sam.won_amount, dec!(1000));
        assert_eq!(sam.avg_deal_size, Some(dec!(500)));
    }

    #[test]
    fn rep_without_closed_deals_has_no_win_rate() {
        let reps = calculate(&team(), &StageProbabilities::default()).unwrap();
        let alex = &reps[0];
        assert_eq!(alex.win_rate, None);
        assert_eq!(alex.avg_deal_size, None);
        assert_eq!(alex.won_amount, Decimal::ZERO);
        assert_eq!(alex.weighted_forecast, dec!(50));
    }

    #[test]
    fn missing_probability_fails_like_the_pipeline_forecast() {
        let probs = probabilities(&[(Stage::Proposal, dec!(0.5))]);
        assert_eq!(
            calculate(&team(), &probs),
            Err(AnalyticsError::MissingProbability(Stage::Discovery))
        );
    }
}
