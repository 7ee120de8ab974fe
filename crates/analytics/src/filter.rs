use chrono::NaiveDate;
use core_types::{Opportunity, Stage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A dashboard selection applied to the record set before the engine runs.
///
/// Empty sets and absent bounds select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityFilter {
    /// Inclusive lower bound on the created date.
    pub created_from: Option<NaiveDate>,
    /// Inclusive upper bound on the created date.
    pub created_to: Option<NaiveDate>,
    pub owners: BTreeSet<String>,
    /// Restricts open deals only; closed history is kept whole.
    pub stages: BTreeSet<Stage>,
}

impl OpportunityFilter {
    pub fn is_empty(&self) -> bool {
        self.created_from.is_none()
            && self.created_to.is_none()
            && self.owners.is_empty()
            && self.stages.is_empty()
    }

    pub fn matches(&self, opp: &Opportunity) -> bool {
        if self.created_from.is_some() || self.created_to.is_some() {
            let Some(created) = opp.created_date else {
                return false;
            };
            if self.created_from.is_some_and(|from| created < from)
                || self.created_to.is_some_and(|to| created > to)
            {
                return false;
            }
        }

        if !self.owners.is_empty() && !self.owners.contains(&opp.owner) {
            return false;
        }

        if opp.is_open() && !self.stages.is_empty() {
            return opp.stage.is_some_and(|stage| self.stages.contains(&stage));
        }

        true
    }

    /// The matching opportunities, in input order.
    pub fn apply(&self, opportunities: &[Opportunity]) -> Vec<Opportunity> {
        opportunities
            .iter()
            .filter(|opp| self.matches(opp))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, open, owned_by, won};

    fn records() -> Vec<Opportunity> {
        vec![
            owned_by(open("A", 100, Stage::Discovery, "2024-01-10"), "Sam"),
            owned_by(open("B", 100, Stage::Proposal, "2024-02-10"), "Alex"),
            owned_by(won("C", 100, Stage::Demo, "2024-03-10", "2024-04-01"), "Sam"),
        ]
    }

    fn ids(opportunities: &[Opportunity]) -> Vec<&str> {
        opportunities.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = OpportunityFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&records()), records());
    }

    #[test]
    fn created_range_is_inclusive() {
        let filter = OpportunityFilter {
            created_from: Some(date("2024-02-10")),
            created_to: Some(date("2024-03-10")),
            ..OpportunityFilter::default()
        };
        assert_eq!(ids(&filter.apply(&records())), vec!["B", "C"]);
    }

    #[test]
    fn date_bound_drops_undated_deals() {
        let mut undated = open("D", 100, Stage::Demo, "2024-01-01");
        undated.created_date = None;
        let filter = OpportunityFilter {
            created_to: Some(date("2030-01-01")),
            ..OpportunityFilter::default()
        };
        assert!(filter.apply(&[undated]).is_empty());
    }

    #[test]
    fn owner_filter() {
        let filter = OpportunityFilter {
            owners: BTreeSet::from(["Sam".to_string()]),
            ..OpportunityFilter::default()
        };
        assert_eq!(ids(&filter.apply(&records())), vec!["A", "C"]);
    }

    #[test]
    fn stage_filter_only_restricts_open_deals() {
        let filter = OpportunityFilter {
            stages: BTreeSet::from([Stage::Proposal]),
            ..OpportunityFilter::default()
        };
        assert_eq!(ids(&filter.apply(&records())), vec!["B", "C"]);
    }
}
