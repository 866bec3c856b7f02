//! Vulnerability severity labels
//!
//! The three tiers are ordered from most to least deprived. The pipeline
//! assigns them to clusters by ascending mean income-rank decile; the read
//! side groups and counts by the persisted label text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity tier assigned to a household
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "Very Vulnerable")]
    VeryVulnerable,
    #[serde(rename = "Vulnerable")]
    Vulnerable,
    #[serde(rename = "Not Vulnerable")]
    NotVulnerable,
}

impl Severity {
    /// Tiers in assignment order (lowest mean decile first)
    pub const ORDERED: [Severity; 3] = [
        Severity::VeryVulnerable,
        Severity::Vulnerable,
        Severity::NotVulnerable,
    ];

    /// Label text as persisted in `vulnerability_records.severity_label`
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::VeryVulnerable => "Very Vulnerable",
            Severity::Vulnerable => "Vulnerable",
            Severity::NotVulnerable => "Not Vulnerable",
        }
    }

    /// Fixed base severity score for the tier
    pub fn base_score(&self) -> i64 {
        match self {
            Severity::VeryVulnerable => 90,
            Severity::Vulnerable => 60,
            Severity::NotVulnerable => 30,
        }
    }

    /// Tier for a sorted cluster position; positions past the last tier
    /// fall back to `NotVulnerable`.
    pub fn for_rank(rank: usize) -> Severity {
        Self::ORDERED
            .get(rank)
            .copied()
            .unwrap_or(Severity::NotVulnerable)
    }

    /// Weight used by the region index (1 = most vulnerable)
    pub fn index_weight(&self) -> i64 {
        match self {
            Severity::VeryVulnerable => 1,
            Severity::Vulnerable => 2,
            Severity::NotVulnerable => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Very Vulnerable" => Ok(Severity::VeryVulnerable),
            "Vulnerable" => Ok(Severity::Vulnerable),
            "Not Vulnerable" => Ok(Severity::NotVulnerable),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown severity label: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_scores() {
        assert_eq!(Severity::VeryVulnerable.base_score(), 90);
        assert_eq!(Severity::Vulnerable.base_score(), 60);
        assert_eq!(Severity::NotVulnerable.base_score(), 30);
    }

    #[test]
    fn test_unknown_label_text_is_rejected() {
        assert!("Somewhat Vulnerable".parse::<Severity>().is_err());
        assert!("".parse::<Severity>().is_err());
    }

    #[test]
    fn test_rank_fallback() {
        assert_eq!(Severity::for_rank(0), Severity::VeryVulnerable);
        assert_eq!(Severity::for_rank(1), Severity::Vulnerable);
        assert_eq!(Severity::for_rank(2), Severity::NotVulnerable);
        assert_eq!(Severity::for_rank(7), Severity::NotVulnerable);
        // clusters ranked past the known tiers score as the least vulnerable
        assert_eq!(Severity::for_rank(7).base_score(), 30);
    }

    #[test]
    fn test_label_round_trip_through_text() {
        for severity in Severity::ORDERED {
            assert_eq!(severity.as_str().parse::<Severity>().unwrap(), severity);
        }
    }

    #[test]
    fn test_serde_uses_label_text() {
        let json = serde_json::to_string(&Severity::VeryVulnerable).unwrap();
        assert_eq!(json, "\"Very Vulnerable\"");
    }
}
