//! Derived attributes
//!
//! Computed per row after the whole table has been normalized:
//! - effective responsible party (owner markers point at a sibling column)
//! - staleness, from a date at the start of the comment
//! - highlight category, from comparing owner with advisor and designer
//!
//! Staleness depends on the wall clock. Callers pass `now` explicitly and
//! rebuild the table rather than caching flags on their own.

use crate::model::{Highlight, NormalizedRow, Table};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Owner marker pointing at the designer column
pub const DESIGNER_MARKER: &str = "designer";

/// Owner marker pointing at the advisor column
pub const ADVISOR_MARKER: &str = "rådgiver";

/// Age after which a dated comment counts as stale
pub const STALE_AFTER_DAYS: i64 = 90;

/// Statuses (lowercase) that are never stale
pub const EXCLUDED_STATUSES: [&str; 2] = ["web: online", "annulleret"];

const EMAIL_ANNOTATION: &str = " (email";

static LEADING_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2})[/-]([0-9]{2})[/-]([0-9]{2,4})").expect("valid leading date regex")
});

/// Strip a trailing `(email ...)` annotation from a name
///
/// Cuts at the first ` (email` and trims.
#[must_use]
pub fn clean_name(name: &str) -> &str {
    name.split(EMAIL_ANNOTATION).next().unwrap_or_default().trim()
}

/// Effective responsible party
///
/// `designer` is checked before `rådgiver`; anything else is returned
/// unchanged.
#[must_use]
pub fn resolve_owner(owner: &str, advisor: &str, designer: &str) -> String {
    let marker = owner.trim().to_lowercase();
    if marker == DESIGNER_MARKER {
        clean_name(designer).to_string()
    } else if marker == ADVISOR_MARKER {
        clean_name(advisor).to_string()
    } else {
        owner.to_string()
    }
}

/// Date at the very start of a comment (`DD/MM/YY`, `DD-MM-YYYY`, ...)
///
/// Two-digit years are read as `20YY`. Returns `None` when there is no
/// leading date or it is not a valid calendar date in years 1 to 9999.
#[must_use]
pub fn parse_leading_date(comment: &str) -> Option<NaiveDate> {
    let caps = LEADING_DATE.captures(comment)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year = &caps[3];
    let year: i32 = if year.len() == 2 {
        format!("20{year}").parse().ok()?
    } else {
        year.parse().ok()?
    };
    if !(1..=9999).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Staleness window and status exclusions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalenessRule {
    /// Comments dated before `now - window` are stale
    pub window: Duration,
    /// Lowercase statuses that are never stale
    pub excluded_statuses: Vec<String>,
}

impl Default for StalenessRule {
    fn default() -> Self {
        Self {
            window: Duration::days(STALE_AFTER_DAYS),
            excluded_statuses: EXCLUDED_STATUSES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl StalenessRule {
    /// Evaluate staleness of a comment/status pair at `now`
    #[must_use]
    pub fn is_stale(&self, comment: &str, status: &str, now: NaiveDateTime) -> bool {
        let Some(dated) = parse_leading_date(comment).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
            return false;
        };
        let status = status.to_lowercase();
        dated < now - self.window && !self.excluded_statuses.iter().any(|s| *s == status)
    }
}

/// Highlight category for a row whose owner is already resolved
///
/// Advisor match is checked first.
#[must_use]
pub fn classify(row: &NormalizedRow) -> Highlight {
    let owner = row.owner.trim();
    if owner == row.advisor.trim() {
        Highlight::OwnerIsAdvisor
    } else if owner == clean_name(&row.designer) {
        Highlight::OwnerIsDesigner
    } else {
        Highlight::None
    }
}

/// Derive owner, staleness and highlight for one row
pub fn derive_row(row: &mut NormalizedRow, now: NaiveDateTime, rule: &StalenessRule) {
    row.owner = resolve_owner(&row.owner, &row.advisor, &row.designer);
    row.stale = rule.is_stale(&row.comment, &row.status, now);
    row.highlight = classify(row);
}

/// Derive every row with the default staleness rule
#[must_use]
pub fn derive(table: Table, now: NaiveDateTime) -> Table {
    derive_with(table, now, &StalenessRule::default())
}

/// Derive every row with an explicit staleness rule
#[must_use]
pub fn derive_with(table: Table, now: NaiveDateTime, rule: &StalenessRule) -> Table {
    let mut rows = table.into_rows();
    for row in &mut rows {
        derive_row(row, now, rule);
    }
    Table::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn clean_name_strips_email() {
        assert_eq!(clean_name("Jane Doe (email jane@x.com)"), "Jane Doe");
        assert_eq!(clean_name("  Jane Doe  "), "Jane Doe");
        assert_eq!(clean_name("Jane (email a) (email b)"), "Jane");
        assert_eq!(clean_name(""), "");
    }

    #[test]
    fn owner_resolution_designer_first() {
        let advisor = "Radgiver A";
        let designer = "Designer B (email b@x.dk)";
        assert_eq!(resolve_owner("designer", advisor, designer), "Designer B");
        assert_eq!(resolve_owner(" Designer ", advisor, designer), "Designer B");
        assert_eq!(resolve_owner("rådgiver", advisor, designer), "Radgiver A");
        assert_eq!(resolve_owner("RÅDGIVER", advisor, designer), "Radgiver A");
        assert_eq!(resolve_owner("Kunden", advisor, designer), "Kunden");
        assert_eq!(resolve_owner("", advisor, designer), "");
    }

    #[test]
    fn leading_date_formats() {
        assert_eq!(parse_leading_date("14/03/24 ring"), NaiveDate::from_ymd_opt(2024, 3, 14));
        assert_eq!(parse_leading_date("14-03-2024 note"), NaiveDate::from_ymd_opt(2024, 3, 14));
        assert_eq!(parse_leading_date("01/02-23"), NaiveDate::from_ymd_opt(2023, 2, 1));
        assert_eq!(parse_leading_date("14/13/24"), None);
        assert_eq!(parse_leading_date("31/02/24"), None);
        assert_eq!(parse_leading_date("note 14/03/24"), None);
        assert_eq!(parse_leading_date("not a date"), None);
        assert_eq!(parse_leading_date("4/3/24"), None);
    }

    #[test]
    fn year_zero_is_not_a_date() {
        assert_eq!(parse_leading_date("01/01/0000 x"), None);
        assert_eq!(parse_leading_date("01/01/000 x"), None);
        assert_eq!(parse_leading_date("01/01/0001 x"), NaiveDate::from_ymd_opt(1, 1, 1));
        assert!(!StalenessRule::default().is_stale("01/01/0000 x", "Design", at(2024, 6, 1)));
    }

    #[test]
    fn stale_requires_old_date_and_active_status() {
        let rule = StalenessRule::default();
        let later = at(2024, 4, 2);

        assert!(rule.is_stale("01/01/2024 call", "In progress", later));
        assert!(!rule.is_stale("01/01/2024 call", "Web: Online", at(2099, 1, 1)));
        assert!(!rule.is_stale("01/01/2024 call", "ANNULLERET", later));
        assert!(!rule.is_stale("not a date", "In progress", later));
        assert!(!rule.is_stale("01/01/2024 call", "In progress", at(2024, 3, 1)));
    }

    #[test]
    fn stale_window_boundary_is_strict() {
        let rule = StalenessRule::default();
        // exactly 90 days after midnight on the comment date
        let boundary = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(!rule.is_stale("01/01/2024", "Ny", boundary));
        assert!(rule.is_stale("01/01/2024", "Ny", boundary + Duration::seconds(1)));
    }

    #[test]
    fn classify_prefers_advisor() {
        let mut row = NormalizedRow {
            advisor: "Sam".into(),
            designer: "Sam (email s@x.dk)".into(),
            owner: "Sam".into(),
            ..Default::default()
        };
        assert_eq!(classify(&row), Highlight::OwnerIsAdvisor);

        row.advisor = "Ann".into();
        assert_eq!(classify(&row), Highlight::OwnerIsDesigner);

        row.owner = "Kunden".into();
        assert_eq!(classify(&row), Highlight::None);
    }

    #[test]
    fn derive_fills_all_attributes() {
        let table = Table::from_rows(vec![NormalizedRow {
            advisor: "Ann".into(),
            designer: "Dan (email d@x.dk)".into(),
            owner: "Designer".into(),
            comment: "02/01/24 venter".into(),
            status: "Design".into(),
            ..Default::default()
        }]);
        let derived = derive(table, at(2024, 6, 1));
        let row = &derived.rows()[0];
        assert_eq!(row.owner, "Dan");
        assert!(row.stale);
        assert_eq!(row.highlight, Highlight::OwnerIsDesigner);
    }
}
