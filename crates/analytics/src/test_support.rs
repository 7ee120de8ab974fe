//! Builders shared by the unit tests of this crate.

use chrono::NaiveDate;
use core_types::{Opportunity, Stage, StageProbabilities, Status};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

pub fn open(id: &str, amount: i64, stage: Stage, created: &str) -> Opportunity {
    Opportunity {
        id: id.to_string(),
        name: format!("Deal {id}"),
        amount: Decimal::from(amount),
        stage: Some(stage),
        status: Status::Open,
        created_date: Some(date(created)),
        close_date: None,
        owner: "Dana".to_string(),
        last_stage: None,
    }
}

pub fn won(id: &str, amount: i64, last_stage: Stage, created: &str, closed: &str) -> Opportunity {
    closed_deal(id, amount, Status::Won, last_stage, created, closed)
}

pub fn lost(id: &str, amount: i64, last_stage: Stage, created: &str, closed: &str) -> Opportunity {
    closed_deal(id, amount, Status::Lost, last_stage, created, closed)
}

pub fn owned_by(mut opp: Opportunity, owner: &str) -> Opportunity {
    opp.owner = owner.to_string();
    opp
}

pub fn probabilities(values: &[(Stage, Decimal)]) -> StageProbabilities {
    StageProbabilities::new(values.iter().copied().collect::<BTreeMap<_, _>>()).unwrap()
}

fn closed_deal(
    id: &str,
    amount: i64,
    status: Status,
    last_stage: Stage,
    created: &str,
    closed: &str,
) -> Opportunity {
    Opportunity {
        id: id.to_string(),
        name: format!("Deal {id}"),
        amount: Decimal::from(amount),
        stage: None,
        status,
        created_date: Some(date(created)),
        close_date: Some(date(closed)),
        owner: "Dana".to_string(),
        last_stage: Some(last_stage),
    }
}
