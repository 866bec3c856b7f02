//! Program period label parsing
//!
//! Assistance program history stores free-text period labels such as
//! `"BPNT JAN 2024"`, `"PKH TAHAP MEI 2020"` or
//! `"JAN 2023 - UPDATE DES 2023"`. The parser extracts a (year, month) pair:
//! - the month is the **last** month token in the label (a later "updated
//!   through" month supersedes an earlier one),
//! - the year is the **first** `20xx` token,
//! - anything unparseable maps to [`YearMonth::UNKNOWN`] (0, 0).
//!
//! Month tokens cover Indonesian and English abbreviations, several of
//! which map to the same month (`MEI`/`MAY`, `AGS`/`AGT`/`AGU`/`AUG`, ...).
//! Tokens are matched as substrings, so `"DESEMBER"` reads as `DES`.

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Month abbreviation synonyms
const MONTH_TOKENS: &[(&str, u32)] = &[
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MEI", 5),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AGS", 8),
    ("AGT", 8),
    ("AGU", 8),
    ("AUG", 8),
    ("SEP", 9),
    ("OKT", 10),
    ("OCT", 10),
    ("NOV", 11),
    ("DES", 12),
    ("DEC", 12),
];

static MONTH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternation = MONTH_TOKENS
        .iter()
        .map(|(token, _)| *token)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("({})", alternation)).expect("month token pattern is valid")
});

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(20\d{2})").expect("year pattern is valid"));

/// Calendar month reference; `(0, 0)` means unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Sentinel for "no usable period"
    pub const UNKNOWN: YearMonth = YearMonth { year: 0, month: 0 };

    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Current local calendar month
    pub fn now() -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.year == 0 || self.month == 0
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn month_number(token: &str) -> Option<u32> {
    MONTH_TOKENS
        .iter()
        .find(|(candidate, _)| *candidate == token)
        .map(|(_, month)| *month)
}

/// Extract (year, month) from a program period label
///
/// Never fails: absent, blank or unrecognized labels yield
/// [`YearMonth::UNKNOWN`].
pub fn parse_period(text: Option<&str>) -> YearMonth {
    let Some(text) = text else {
        return YearMonth::UNKNOWN;
    };

    let upper = text.to_uppercase();

    let Some(month_token) = MONTH_PATTERN.find_iter(&upper).last() else {
        return YearMonth::UNKNOWN;
    };
    let Some(year_match) = YEAR_PATTERN.find(&upper) else {
        return YearMonth::UNKNOWN;
    };

    let year = match year_match.as_str().parse::<i32>() {
        Ok(year) => year,
        Err(_) => return YearMonth::UNKNOWN,
    };
    let month = month_number(month_token.as_str()).unwrap_or(0);

    if month == 0 {
        return YearMonth::UNKNOWN;
    }

    YearMonth { year, month }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_label() {
        assert_eq!(parse_period(Some("BPNT JAN 2024")), YearMonth::new(2024, 1));
        assert_eq!(parse_period(Some("PKH MEI 2020")), YearMonth::new(2020, 5));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(parse_period(Some("bpnt okt 2022")), YearMonth::new(2022, 10));
        assert_eq!(parse_period(Some("Tahap Agustus 2021")), YearMonth::new(2021, 8));
    }

    #[test]
    fn test_last_month_token_wins() {
        assert_eq!(
            parse_period(Some("JAN 2023 - UPDATE DES 2023")),
            YearMonth::new(2023, 12)
        );
        assert_eq!(
            parse_period(Some("FEB MAR APR 2021")),
            YearMonth::new(2021, 4)
        );
    }

    #[test]
    fn test_first_year_token_wins() {
        assert_eq!(
            parse_period(Some("JAN 2019 S/D JUN 2020")),
            YearMonth::new(2019, 6)
        );
    }

    #[test]
    fn test_synonyms_map_to_same_month() {
        for label in ["AGS 2022", "AGT 2022", "AGU 2022", "AUG 2022"] {
            assert_eq!(parse_period(Some(label)), YearMonth::new(2022, 8), "{}", label);
        }
        assert_eq!(parse_period(Some("MAY 2022")), parse_period(Some("MEI 2022")));
        assert_eq!(parse_period(Some("OCT 2022")), parse_period(Some("OKT 2022")));
        assert_eq!(parse_period(Some("DEC 2022")), parse_period(Some("DES 2022")));
    }

    #[test]
    fn test_missing_year_is_unknown() {
        assert_eq!(parse_period(Some("BPNT JAN")), YearMonth::UNKNOWN);
        assert_eq!(parse_period(Some("JAN 1999")), YearMonth::UNKNOWN);
    }

    #[test]
    fn test_missing_month_is_unknown() {
        assert_eq!(parse_period(Some("TAHAP 3 2024")), YearMonth::UNKNOWN);
        assert_eq!(parse_period(Some("2024")), YearMonth::UNKNOWN);
    }

    #[test]
    fn test_absent_or_blank_is_unknown() {
        assert_eq!(parse_period(None), YearMonth::UNKNOWN);
        assert_eq!(parse_period(Some("")), YearMonth::UNKNOWN);
        assert_eq!(parse_period(Some("   ")), YearMonth::UNKNOWN);
    }

    #[test]
    fn test_non_ascii_input_does_not_panic() {
        assert_eq!(parse_period(Some("ПКХ 2024 ✓")), YearMonth::UNKNOWN);
        assert_eq!(parse_period(Some("é JAN 2024 ß")), YearMonth::new(2024, 1));
    }

    #[test]
    fn test_is_unknown() {
        assert!(YearMonth::UNKNOWN.is_unknown());
        assert!(YearMonth::new(2024, 0).is_unknown());
        assert!(YearMonth::new(0, 5).is_unknown());
        assert!(!YearMonth::new(2024, 5).is_unknown());
    }
}
