//! Search and flag filters over a normalized table
//!
//! Filters never touch the table they are given; each returns a new table
//! with copies of the retained rows, so one base table can serve any number
//! of concurrent views.

use crate::model::{Column, Highlight, NormalizedRow, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Row filter on derived attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFilter {
    /// Keep every row
    #[default]
    None,
    /// Owner equals advisor
    OwnerIsAdvisor,
    /// Owner equals designer (email annotation stripped)
    OwnerIsDesigner,
    /// Stale rows
    Stale,
}

impl RowFilter {
    /// All filters, in selector order
    pub const ALL: [RowFilter; 4] = [
        RowFilter::None,
        RowFilter::OwnerIsAdvisor,
        RowFilter::OwnerIsDesigner,
        RowFilter::Stale,
    ];

    /// Check whether a row passes
    #[inline]
    #[must_use]
    pub fn matches(self, row: &NormalizedRow) -> bool {
        match self {
            RowFilter::None => true,
            RowFilter::OwnerIsAdvisor => row.highlight == Highlight::OwnerIsAdvisor,
            RowFilter::OwnerIsDesigner => row.highlight == Highlight::OwnerIsDesigner,
            RowFilter::Stale => row.stale,
        }
    }

    /// Query parameter value
    #[inline]
    #[must_use]
    pub fn as_param(self) -> &'static str {
        match self {
            RowFilter::None => "",
            RowFilter::OwnerIsAdvisor => "advisor",
            RowFilter::OwnerIsDesigner => "designer",
            RowFilter::Stale => "stale",
        }
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowFilter::None => f.write_str("none"),
            other => f.write_str(other.as_param()),
        }
    }
}

impl FromStr for RowFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(RowFilter::None),
            "advisor" => Ok(RowFilter::OwnerIsAdvisor),
            "designer" => Ok(RowFilter::OwnerIsDesigner),
            "stale" => Ok(RowFilter::Stale),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

/// Case-insensitive substring search over the canonical columns
///
/// An empty term keeps every row.
#[must_use]
pub fn search(table: &Table, term: &str) -> Table {
    if term.is_empty() {
        return table.clone();
    }
    let needle = term.to_lowercase();
    table.retain_cloned(|row| {
        Column::ALL
            .iter()
            .any(|c| row.get(*c).to_lowercase().contains(&needle))
    })
}

/// Keep rows passing `flag`
#[must_use]
pub fn filter_by_flag(table: &Table, flag: RowFilter) -> Table {
    match flag {
        RowFilter::None => table.clone(),
        flag => table.retain_cloned(|row| flag.matches(row)),
    }
}

/// Search term plus at most one flag filter
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    /// Free-text search term
    #[serde(default)]
    pub term: String,
    /// Flag filter
    #[serde(default)]
    pub flag: RowFilter,
}

impl Query {
    /// Create query
    #[must_use]
    pub fn new(term: impl Into<String>, flag: RowFilter) -> Self {
        Self {
            term: term.into(),
            flag,
        }
    }

    /// Apply search, then the flag filter
    #[must_use]
    pub fn apply(&self, table: &Table) -> Table {
        filter_by_flag(&search(table, &self.term), self.flag)
    }
}

/// What a view currently shows
///
/// `Loaded` with zero rows means "nothing matched", which is distinct from
/// `NotLoaded`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TableView {
    /// No data fetched yet
    #[default]
    NotLoaded,
    /// Filtered rows
    Loaded(Table),
}

impl TableView {
    /// Rows, if loaded
    #[must_use]
    pub fn table(&self) -> Option<&Table> {
        match self {
            TableView::NotLoaded => None,
            TableView::Loaded(table) => Some(table),
        }
    }
}
