//! Schema normalization
//!
//! Reconciles the upstream key variants seen across configurations into the
//! canonical column set:
//! - hyphenated legacy keys are renamed (`web-designer`, `hvem-har-bolden`,
//!   `staging-site`)
//! - the staging column is detected by name when its key has drifted
//! - every canonical column is present on every row (missing → `""`)
//! - every text value has whitespace runs collapsed and is trimmed
//!
//! When a row carries both a canonical key and one of its variants, the
//! canonical key wins and the variant is kept as an extra column.

use crate::model::{Column, FlatRow, NormalizedRow, Table, ITEM_ID_KEY};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use tracing::debug;

/// Legacy key → canonical column
pub const RENAMES: [(&str, Column); 3] = [
    ("web-designer", Column::Designer),
    ("hvem-har-bolden", Column::Owner),
    ("staging-site", Column::StagingLink),
];

const STAGING_VARIANT: &str = "staging-site";
const STAGING_NEEDLE: &str = "staging";

/// Collapse whitespace runs to one space and trim the ends
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find the column holding the staging link
///
/// Exact canonical key first, then the `staging-site` variant, then the
/// first column whose name contains `staging` (case-insensitive).
#[must_use]
pub fn detect_staging_column<'a, I>(columns: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let columns = columns.into_iter();
    let canonical = Column::StagingLink.key();

    columns
        .clone()
        .find(|c| *c == canonical)
        .or_else(|| {
            columns
                .clone()
                .find(|c| c.trim().to_lowercase() == STAGING_VARIANT)
        })
        .or_else(|| {
            columns
                .clone()
                .find(|c| c.trim().to_lowercase().contains(STAGING_NEEDLE))
        })
}

/// Normalize flat rows into a table
///
/// Derived attributes are left at their defaults; see [`crate::derive`].
#[must_use]
pub fn normalize(rows: Vec<FlatRow>) -> Table {
    let columns: IndexSet<&str> = rows
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .collect();

    let mut renames: HashMap<String, Column> = RENAMES
        .iter()
        .filter(|(variant, _)| columns.contains(variant))
        .map(|(variant, column)| ((*variant).to_string(), *column))
        .collect();
    match detect_staging_column(columns.iter().copied()) {
        Some(staging) if staging != Column::StagingLink.key() => {
            debug!(column = staging, "staging column detected by name");
            renames.insert(staging.to_string(), Column::StagingLink);
        }
        Some(_) => {}
        None => debug!("no staging column in payload"),
    }

    Table::from_rows(rows.iter().map(|row| normalize_row(row, &renames)).collect())
}

fn normalize_row(row: &FlatRow, renames: &HashMap<String, Column>) -> NormalizedRow {
    let mut out = NormalizedRow::default();
    let mut filled: IndexSet<Column> = IndexSet::new();
    let mut variants: Vec<(&str, Column, String)> = Vec::new();
    let mut extra: IndexMap<String, String> = IndexMap::new();

    for (key, value) in row {
        let value = collapse_whitespace(value);
        if key == ITEM_ID_KEY {
            out.item_id = Some(value).filter(|v| !v.is_empty());
        } else if let Some(column) = Column::from_key(key) {
            *out.slot_mut(column) = value;
            filled.insert(column);
        } else if let Some(column) = renames.get(key) {
            variants.push((key.as_str(), *column, value));
        } else {
            extra.insert(key.clone(), value);
        }
    }

    for (key, column, value) in variants {
        if filled.insert(column) {
            *out.slot_mut(column) = value;
        } else {
            extra.insert(key.to_string(), value);
        }
    }

    out.extra = extra;
    out
}
