use chrono::{Datelike, Duration};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use statusboard_core::derive::StalenessRule;
use statusboard_core::{
    build_table, clean_name, filter_by_flag, normalize, parse_leading_date, search, Column,
    Highlight, NormalizedRow, RowFilter, Table,
};
use statusboard_test_utils::{fixed_now, flat_row};

fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("titel".to_string()),
        Just("radgiver".to_string()),
        Just("web-designer".to_string()),
        Just("webdesigner".to_string()),
        Just("status".to_string()),
        Just("kommentarer".to_string()),
        Just("hvem-har-bolden".to_string()),
        Just("staging-site".to_string()),
        Just("Staging-Link".to_string()),
        Just("item_id".to_string()),
        "[a-z]{1,6}",
    ]
}

fn flat_rows_strategy() -> impl Strategy<Value = Vec<Vec<(String, String)>>> {
    prop::collection::vec(
        prop::collection::vec((key_strategy(), "[ a-zA-Z\t\n]{0,12}"), 0..8),
        0..6,
    )
}

fn to_rows(raw: &[Vec<(String, String)>]) -> Vec<statusboard_core::FlatRow> {
    raw.iter()
        .map(|pairs| pairs.iter().cloned().collect())
        .collect()
}

proptest! {
    #[test]
    fn prop_two_digit_year_expands_to_2000s(
        day in 1u32..=28,
        month in 1u32..=12,
        yy in 0u32..100,
        sep in prop_oneof![Just('/'), Just('-')],
        rest in "[ a-z]{0,10}",
    ) {
        let comment = format!("{day:02}{sep}{month:02}{sep}{yy:02}{rest}");
        let date = parse_leading_date(&comment).expect("valid leading date");
        prop_assert_eq!(date.year(), 2000 + i32::try_from(yy).unwrap());
        prop_assert_eq!(date.month(), month);
        prop_assert_eq!(date.day(), day);
    }

    #[test]
    fn prop_clean_name_idempotent(name in ".{0,40}") {
        let once = clean_name(&name);
        prop_assert_eq!(clean_name(once), once);
    }

    #[test]
    fn prop_clean_name_strips_annotation(name in "[A-Za-z][A-Za-z ]{0,15}[A-Za-z]", mail in "[a-z]{1,8}@[a-z]{1,8}\\.dk") {
        let annotated = format!("{name} (email {mail})");
        prop_assert_eq!(clean_name(&annotated), name.trim());
    }

    #[test]
    fn prop_normalize_idempotent(raw in flat_rows_strategy()) {
        let first = normalize(to_rows(&raw));
        let second = normalize(first.to_flat_rows());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_normalized_text_is_collapsed(raw in flat_rows_strategy()) {
        let table = normalize(to_rows(&raw));
        for row in table.iter() {
            for column in Column::ALL {
                let value = row.get(column);
                prop_assert_eq!(value, value.trim());
                prop_assert!(!value.contains("  "));
                prop_assert!(!value.contains('\t') && !value.contains('\n'));
            }
        }
    }

    #[test]
    fn prop_search_then_stale_counts(
        rows in prop::collection::vec(("[a-e]{0,4}", "[a-e]{0,4}", any::<bool>()), 0..20),
        term in "[a-e]{1,2}",
    ) {
        let table = Table::from_rows(
            rows.iter()
                .map(|(title, status, stale)| NormalizedRow {
                    title: title.clone(),
                    status: status.clone(),
                    stale: *stale,
                    ..Default::default()
                })
                .collect(),
        );

        let matching: Vec<_> = rows
            .iter()
            .filter(|(title, status, _)| title.contains(&term) || status.contains(&term))
            .collect();
        let stale_matching = matching.iter().filter(|(_, _, stale)| *stale).count();

        let searched = search(&table, &term);
        prop_assert_eq!(searched.len(), matching.len());
        prop_assert_eq!(filter_by_flag(&searched, RowFilter::Stale).len(), stale_matching);
        prop_assert_eq!(table.len(), rows.len());
    }
}

#[test]
fn search_annull_matches_status_only() {
    let table = Table::from_rows(
        ["Annulleret", "Design", "annulleret af kunde", "Web: Online"]
            .iter()
            .enumerate()
            .map(|(i, status)| NormalizedRow {
                item_id: Some(format!("annull-{i}")),
                title: format!("Kunde {i}"),
                status: (*status).to_string(),
                ..Default::default()
            })
            .collect(),
    );

    let found = search(&table, "annull");
    let statuses: Vec<&str> = found.iter().map(|r| r.status.as_str()).collect();
    assert_eq!(statuses, vec!["Annulleret", "annulleret af kunde"]);
}

#[test]
fn missing_designer_column_normalizes_to_empty() {
    let table = normalize(vec![
        flat_row(&[("titel", "A"), ("status", "Ny")]),
        flat_row(&[("titel", "B"), ("radgiver", "Ann")]),
    ]);
    assert_eq!(table.len(), 2);
    assert!(table.iter().all(|r| r.designer.is_empty()));
}

#[test]
fn owner_resolution_examples() {
    let base = [
        ("radgiver", "Radgiver A"),
        ("webdesigner", "Designer B (email b@example.com)"),
    ];

    let mut designer = base.to_vec();
    designer.push(("hvemharbolden", "designer"));
    let mut advisor = base.to_vec();
    advisor.push(("hvemharbolden", "rådgiver"));

    let table = build_table(vec![flat_row(&designer), flat_row(&advisor)], fixed_now());
    assert_eq!(table.rows()[0].owner, "Designer B");
    assert_eq!(table.rows()[0].highlight, Highlight::OwnerIsDesigner);
    assert_eq!(table.rows()[1].owner, "Radgiver A");
    assert_eq!(table.rows()[1].highlight, Highlight::OwnerIsAdvisor);
}

#[test]
fn staleness_examples() {
    let rule = StalenessRule::default();
    let dated = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let far_future = dated + Duration::days(365 * 50);
    assert!(!rule.is_stale("01/01/2024 call", "Web: Online", far_future));
    assert!(rule.is_stale("01/01/2024 call", "In progress", dated + Duration::days(91)));
    assert!(!rule.is_stale("not a date", "In progress", far_future));
}

#[test]
fn rebuild_recomputes_staleness_against_now() {
    let rows = vec![flat_row(&[("kommentarer", "15/08/24 ring"), ("status", "Design")])];
    let early = build_table(rows.clone(), fixed_now());
    let later = build_table(rows, fixed_now() + Duration::days(120));
    assert!(!early.rows()[0].stale);
    assert!(later.rows()[0].stale);
}
