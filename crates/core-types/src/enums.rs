use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An active step of the sales process.
///
/// The derived ordering is the canonical funnel order, so `Stage::Discovery < Stage::Negotiation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Discovery,
    Demo,
    Proposal,
    Negotiation,
}

impl Stage {
    /// All stages in canonical order.
    pub const ALL: [Stage; 4] = [
        Stage::Discovery,
        Stage::Demo,
        Stage::Proposal,
        Stage::Negotiation,
    ];

    /// Zero-based position in the canonical order.
    pub fn index(&self) -> usize {
        match self {
            Stage::Discovery => 0,
            Stage::Demo => 1,
            Stage::Proposal => 2,
            Stage::Negotiation => 3,
        }
    }

    /// Returns the following stage, if any.
    pub fn next(&self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Discovery => "Discovery",
            Stage::Demo => "Demo",
            Stage::Proposal => "Proposal",
            Stage::Negotiation => "Negotiation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discovery" => Ok(Stage::Discovery),
            "demo" => Ok(Stage::Demo),
            "proposal" => Ok(Stage::Proposal),
            "negotiation" => Ok(Stage::Negotiation),
            other => Err(CoreError::InvalidInput("stage".to_string(), other.to_string())),
        }
    }
}

/// Lifecycle status of an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Open,
    Won,
    Lost,
}

impl Status {
    pub fn is_closed(&self) -> bool {
        matches!(self, Status::Won | Status::Lost)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Open => "Open",
            Status::Won => "Won",
            Status::Lost => "Lost",
        };
        f.write_str(label)
    }
}

impl FromStr for Status {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "won" => Ok(Status::Won),
            "lost" => Ok(Status::Lost),
            other => Err(CoreError::InvalidInput("status".to_string(), other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_order_canonically() {
        let mut shuffled = vec![Stage::Proposal, Stage::Discovery, Stage::Negotiation, Stage::Demo];
        shuffled.sort();
        assert_eq!(shuffled, Stage::ALL.to_vec());
        assert_eq!(Stage::Demo.next(), Some(Stage::Proposal));
        assert_eq!(Stage::Negotiation.next(), None);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" proposal ".parse::<Stage>().unwrap(), Stage::Proposal);
        assert_eq!("WON".parse::<Status>().unwrap(), Status::Won);
        assert!("Closed Won".parse::<Stage>().is_err());
        assert!("pending".parse::<Status>().is_err());
    }
}
