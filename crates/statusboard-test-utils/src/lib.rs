//! Testing utilities for the statusboard workspace
//!
//! Shared fixtures: upstream item builders, flat rows, sample tables.

#![allow(missing_docs)]

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use statusboard_core::{FlatRow, Highlight, NormalizedRow, Table};

/// Fixed evaluation time used across tests
pub fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn flat_row(pairs: &[(&str, &str)]) -> FlatRow {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Builder for upstream items in the API's wire shape
#[derive(Debug, Clone)]
pub struct ItemBuilder {
    title: String,
    item_id: u64,
    fields: Vec<Value>,
}

impl ItemBuilder {
    pub fn new(title: &str, item_id: u64) -> Self {
        Self {
            title: title.to_string(),
            item_id,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, external_id: &str, field_type: &str, values: Vec<Value>) -> Self {
        self.fields.push(json!({
            "external_id": external_id,
            "type": field_type,
            "values": values,
        }));
        self
    }

    pub fn text(self, external_id: &str, text: &str) -> Self {
        self.field(external_id, "text", vec![json!({ "value": text })])
    }

    pub fn category(self, external_id: &str, text: &str) -> Self {
        self.field(external_id, "category", vec![json!({ "value": { "text": text } })])
    }

    pub fn contact(self, external_id: &str, name: &str) -> Self {
        self.field(external_id, "contact", vec![json!({ "value": { "name": name } })])
    }

    pub fn link(self, external_id: &str, url: &str) -> Self {
        self.field(external_id, "link", vec![json!({ "value": { "url": url } })])
    }

    pub fn embed_ref(self, external_id: &str, embed_id: u64) -> Self {
        self.field(external_id, "embed", vec![json!({ "embed": { "embed_id": embed_id } })])
    }

    pub fn file_ref(self, external_id: &str, file_id: u64) -> Self {
        self.field(external_id, "embed", vec![json!({ "file": { "file_id": file_id } })])
    }

    pub fn build(self) -> Value {
        json!({
            "item_id": self.item_id,
            "title": self.title,
            "fields": self.fields,
        })
    }
}

/// Typical item with every canonical field populated
pub fn sample_item(title: &str, item_id: u64) -> Value {
    ItemBuilder::new(title, item_id)
        .contact("radgiver", "Ann Andersen")
        .contact("web-designer", "Dan Dahl (email dan@example.com)")
        .category("status", "Design")
        .text("kommentarer", "02/01/24 venter på tekster")
        .category("hvem-har-bolden", "Designer")
        .link("staging-site", "https://staging.example.com")
        .build()
}

/// Small derived table covering each highlight and staleness combination
pub fn sample_table() -> Table {
    Table::from_rows(vec![
        NormalizedRow {
            item_id: Some("1".into()),
            title: "Bageriet".into(),
            advisor: "Ann".into(),
            designer: "Dan (email d@x.dk)".into(),
            status: "Design".into(),
            comment: "02/01/24 venter".into(),
            owner: "Ann".into(),
            staging_link: "bageriet.staging.dk".into(),
            stale: true,
            highlight: Highlight::OwnerIsAdvisor,
            ..Default::default()
        },
        NormalizedRow {
            item_id: Some("2".into()),
            title: "Slagteren".into(),
            advisor: "Ann".into(),
            designer: "Dan".into(),
            status: "Annulleret".into(),
            comment: "02/01/24 <b>stop</b>".into(),
            owner: "Dan".into(),
            staging_link: "https://slagter.example.com".into(),
            stale: false,
            highlight: Highlight::OwnerIsDesigner,
            ..Default::default()
        },
        NormalizedRow {
            item_id: Some("3".into()),
            title: "Frisøren".into(),
            advisor: "Bo".into(),
            designer: "Dan".into(),
            status: "Web: Online".into(),
            comment: String::new(),
            owner: "Kunden".into(),
            staging_link: String::new(),
            stale: false,
            highlight: Highlight::None,
            ..Default::default()
        },
    ])
}
