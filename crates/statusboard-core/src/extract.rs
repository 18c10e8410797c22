//! Field extraction
//!
//! Turns one upstream record's typed field list into a flat key → string
//! mapping. Dispatch is on the declared field type; embed fields try their
//! strategies in a fixed order:
//!
//! 1. a direct URL on the value (string, or `url` / `embed_url` / `link`)
//! 2. an inline URL on the embedded object (`resolved_url`, `original_url`, `url`)
//! 3. a remote lookup of the embed id (or, failing that, the file id)
//!
//! Remote lookups are deferred: [`extract`] records them as pending and
//! [`Extractor::extract_all`] resolves every distinct reference once per
//! run through a [`ResolutionCache`], with a bounded number in flight.
//!
//! No failure in here propagates. A field that cannot be read becomes an
//! empty string and the rest of the record is still emitted.

use crate::error::{ExtractError, ResolveError, ResolveResult};
use crate::model::{FieldType, FlatRow, RawField, RawRecord, ITEM_ID_KEY, TITLE_KEY};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Default number of remote lookups in flight per run
pub const DEFAULT_RESOLVE_WORKERS: usize = 8;

/// Reference to an upstream object that must be looked up to get a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RemoteRef {
    /// Embed id
    Embed(u64),
    /// File id
    File(u64),
}

impl fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteRef::Embed(id) => write!(f, "embed:{id}"),
            RemoteRef::File(id) => write!(f, "file:{id}"),
        }
    }
}

/// Outcome of reading one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Value known locally
    Resolved(String),
    /// Value needs a remote lookup
    Remote(RemoteRef),
}

/// Source-side lookup of embed and file references
#[async_trait]
pub trait RefResolver: Send + Sync {
    /// Resolve a reference to a URL
    async fn resolve(&self, reference: RemoteRef) -> ResolveResult<String>;
}

/// Resolver for sources without remote references (flat feeds)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemoteResolver;

#[async_trait]
impl RefResolver for NoRemoteResolver {
    async fn resolve(&self, reference: RemoteRef) -> ResolveResult<String> {
        Err(ResolveError::Unsupported(reference))
    }
}

/// Per-run cache of resolved references
///
/// Create one per pipeline invocation and drop it when the run ends.
/// Failed lookups are stored as empty strings so a reference repeated
/// within the run is not looked up twice.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: DashMap<RemoteRef, String>,
    lookups: AtomicUsize,
}

impl ResolutionCache {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached URL for a reference
    #[must_use]
    pub fn get(&self, reference: &RemoteRef) -> Option<String> {
        self.entries.get(reference).map(|e| e.value().clone())
    }

    /// Number of cached references
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been resolved yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of remote lookups issued through this cache
    #[inline]
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Resolve every uncached reference, at most `workers` at a time
    pub async fn resolve_all<I>(&self, resolver: &dyn RefResolver, references: I, workers: usize)
    where
        I: IntoIterator<Item = RemoteRef>,
    {
        let mut seen = HashSet::new();
        let todo: Vec<RemoteRef> = references
            .into_iter()
            .filter(|r| !self.entries.contains_key(r) && seen.insert(*r))
            .collect();
        if todo.is_empty() {
            return;
        }

        debug!(count = todo.len(), workers, "resolving remote references");
        self.lookups.fetch_add(todo.len(), Ordering::Relaxed);

        let results: Vec<(RemoteRef, ResolveResult<String>)> = stream::iter(todo)
            .map(|reference| async move { (reference, resolver.resolve(reference).await) })
            .buffer_unordered(workers.max(1))
            .collect()
            .await;

        for (reference, result) in results {
            let url = match result {
                Ok(url) => url.trim().to_string(),
                Err(e) => {
                    warn!(%reference, error = %e, "remote reference lookup failed");
                    String::new()
                }
            };
            self.entries.insert(reference, url);
        }
    }
}

/// Extraction of one record, possibly waiting on remote lookups
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    /// Flat row; pending keys hold an empty placeholder
    pub row: FlatRow,
    /// Keys whose value must come from a remote lookup
    pub pending: Vec<(String, RemoteRef)>,
}

impl Extraction {
    /// Fill pending keys from the cache; unresolved keys stay empty
    #[must_use]
    pub fn finish(mut self, cache: &ResolutionCache) -> FlatRow {
        for (key, reference) in self.pending {
            let url = cache.get(&reference).unwrap_or_default();
            self.row.insert(key, url);
        }
        self.row
    }
}

/// Extract one record without performing remote lookups
#[must_use]
pub fn extract(record: &RawRecord) -> Extraction {
    let mut out = Extraction::default();
    out.row.insert(TITLE_KEY.to_string(), record.title.clone());
    if let Some(id) = &record.item_id {
        out.row.insert(ITEM_ID_KEY.to_string(), id.clone());
    }

    for field in &record.fields {
        match extract_field(field) {
            Ok(FieldValue::Resolved(value)) => {
                out.row.insert(field.key.clone(), value);
            }
            Ok(FieldValue::Remote(reference)) => {
                out.row.insert(field.key.clone(), String::new());
                out.pending.push((field.key.clone(), reference));
            }
            Err(e) => {
                debug!(key = %field.key, error = %e, "field unreadable, using empty value");
                out.row.insert(field.key.clone(), String::new());
            }
        }
    }
    out
}

/// Read one typed field
///
/// # Errors
/// `ExtractError::MissingNested` when the first value lacks the key its
/// type requires. Callers treat this as an empty value.
pub fn extract_field(field: &RawField) -> Result<FieldValue, ExtractError> {
    let Some(first) = field.first() else {
        return Ok(FieldValue::Resolved(String::new()));
    };

    let nested = |expected: &'static str| -> Result<FieldValue, ExtractError> {
        first
            .get("value")
            .and_then(|v| v.get(expected))
            .map(|v| FieldValue::Resolved(value_to_string(v)))
            .ok_or_else(|| ExtractError::missing_nested(&field.key, field.field_type.as_tag(), expected))
    };

    match &field.field_type {
        FieldType::App => nested("title"),
        FieldType::Contact => nested("name"),
        FieldType::Category => nested("text"),
        FieldType::Date => ["start_date_utc", "start"]
            .into_iter()
            .filter_map(|k| first.get(k))
            .map(value_to_string)
            .find(|s| !s.is_empty())
            .map(FieldValue::Resolved)
            .ok_or_else(|| {
                ExtractError::missing_nested(&field.key, field.field_type.as_tag(), "start_date_utc")
            }),
        FieldType::Link => Ok(FieldValue::Resolved(extract_url(first.get("value")))),
        FieldType::Embed => Ok(extract_embed(first)),
        FieldType::Text | FieldType::Number | FieldType::Other(_) => {
            Ok(FieldValue::Resolved(plain_value(first.get("value"))))
        }
    }
}

/// URL-shaped string out of a link value
///
/// Strings pass through trimmed; objects yield the first non-empty of
/// `url`, `embed_url`, `link`.
#[must_use]
pub fn extract_url(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Object(obj)) => url_from_object(obj).unwrap_or_default(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

fn url_from_object(obj: &Map<String, Value>) -> Option<String> {
    ["url", "embed_url", "link"]
        .into_iter()
        .filter_map(|k| obj.get(k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn plain_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::Object(obj)) => {
            url_from_object(obj).unwrap_or_else(|| Value::Object(obj.clone()).to_string())
        }
        Some(other) => value_to_string(other),
        None => String::new(),
    }
}

fn extract_embed(first: &Value) -> FieldValue {
    // direct url on the value
    let direct = extract_url(first.get("value"));
    if !direct.is_empty() {
        return FieldValue::Resolved(direct);
    }

    let embed = nested_object(first, "embed");
    if let Some(embed) = embed {
        let inline = ["resolved_url", "original_url", "url"]
            .into_iter()
            .filter_map(|k| embed.get(k).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty());
        if let Some(url) = inline {
            return FieldValue::Resolved(url.to_string());
        }
    }

    if let Some(id) = embed.and_then(|e| e.get("embed_id")).and_then(as_id) {
        return FieldValue::Remote(RemoteRef::Embed(id));
    }
    if let Some(id) = nested_object(first, "file")
        .and_then(|f| f.get("file_id"))
        .and_then(as_id)
    {
        return FieldValue::Remote(RemoteRef::File(id));
    }

    FieldValue::Resolved(String::new())
}

/// `first.<key>` or `first.value.<key>` as an object
fn nested_object<'a>(first: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    first
        .get(key)
        .or_else(|| first.get("value").and_then(|v| v.get(key)))
        .and_then(Value::as_object)
}

fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// String form of a scalar JSON value; null becomes empty
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten one object of a pre-flattened feed
///
/// Nested objects become dotted keys (`a.b`); arrays are kept as their
/// JSON text.
#[must_use]
pub fn extract_flat(obj: &Map<String, Value>) -> FlatRow {
    let mut row = FlatRow::new();
    flatten_into(&mut row, None, obj);
    row
}

fn flatten_into(row: &mut FlatRow, prefix: Option<&str>, obj: &Map<String, Value>) {
    for (k, v) in obj {
        let key = match prefix {
            Some(p) => format!("{p}.{k}"),
            None => k.clone(),
        };
        match v {
            Value::Object(inner) if !inner.is_empty() => flatten_into(row, Some(&key), inner),
            other => {
                row.insert(key, value_to_string(other));
            }
        }
    }
}

/// Runs extraction over a batch with remote resolution
pub struct Extractor<'a> {
    resolver: &'a dyn RefResolver,
    cache: &'a ResolutionCache,
    workers: usize,
}

impl<'a> Extractor<'a> {
    /// Create extractor over a resolver and a per-run cache
    #[must_use]
    pub fn new(resolver: &'a dyn RefResolver, cache: &'a ResolutionCache) -> Self {
        Self {
            resolver,
            cache,
            workers: DEFAULT_RESOLVE_WORKERS,
        }
    }

    /// With maximum lookups in flight
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Extract every record, resolving remote references once each
    pub async fn extract_all(&self, records: &[RawRecord]) -> Vec<FlatRow> {
        let extractions: Vec<Extraction> = records.iter().map(extract).collect();

        let references = extractions
            .iter()
            .flat_map(|e| e.pending.iter().map(|(_, r)| *r))
            .collect::<Vec<_>>();
        self.cache
            .resolve_all(self.resolver, references, self.workers)
            .await;

        extractions
            .into_iter()
            .map(|e| e.finish(self.cache))
            .collect()
    }
}

impl fmt::Debug for Extractor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("workers", &self.workers)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn field(key: &str, tag: &str, values: Value) -> RawField {
        let values = match values {
            Value::Array(v) => v,
            other => vec![other],
        };
        RawField::new(key, FieldType::from_tag(tag), values)
    }

    fn resolved(s: &str) -> Result<FieldValue, ExtractError> {
        Ok(FieldValue::Resolved(s.to_string()))
    }

    #[test]
    fn category_takes_label_text() {
        let f = field("status", "category", json!({"value": {"id": 3, "text": "Web: Online"}}));
        assert_eq!(extract_field(&f), resolved("Web: Online"));
    }

    #[test]
    fn contact_takes_display_name() {
        let f = field("radgiver", "contact", json!({"value": {"name": "Anne Hansen", "mail": ["a@x.dk"]}}));
        assert_eq!(extract_field(&f), resolved("Anne Hansen"));
    }

    #[test]
    fn date_prefers_utc_start() {
        let f = field(
            "deadline",
            "date",
            json!({"start": "2024-03-14 10:00:00", "start_date_utc": "2024-03-14"}),
        );
        assert_eq!(extract_field(&f), resolved("2024-03-14"));

        let f = field("deadline", "date", json!({"start": "2024-03-14 10:00:00"}));
        assert_eq!(extract_field(&f), resolved("2024-03-14 10:00:00"));
    }

    #[test]
    fn app_takes_referenced_title() {
        let f = field("kunde", "app", json!({"value": {"item_id": 5, "title": "Bageriet"}}));
        assert_eq!(extract_field(&f), resolved("Bageriet"));
    }

    #[test]
    fn link_accepts_container_or_string() {
        let f = field("staging-site", "link", json!({"value": {"url": " https://a.dk "}}));
        assert_eq!(extract_field(&f), resolved("https://a.dk"));

        let f = field("staging-site", "link", json!({"value": "b.dk"}));
        assert_eq!(extract_field(&f), resolved("b.dk"));
    }

    #[test]
    fn text_with_nested_object_pulls_url_or_stringifies() {
        let f = field("kommentarer", "text", json!({"value": {"link": "https://c.dk"}}));
        assert_eq!(extract_field(&f), resolved("https://c.dk"));

        let f = field("kommentarer", "text", json!({"value": {"a": 1}}));
        assert_eq!(extract_field(&f), resolved(r#"{"a":1}"#));
    }

    #[test]
    fn number_is_stringified() {
        let f = field("pris", "number", json!({"value": 12.5}));
        assert_eq!(extract_field(&f), resolved("12.5"));
    }

    #[test]
    fn empty_values_yield_empty_string() {
        let f = field("status", "category", json!([]));
        assert_eq!(extract_field(&f), resolved(""));
    }

    #[test]
    fn missing_nested_is_error_but_record_survives() {
        let record = RawRecord {
            title: "Kunde".into(),
            item_id: Some("1".into()),
            fields: vec![
                field("status", "category", json!({"value": {}})),
                field("radgiver", "contact", json!({"value": {"name": "Bo"}})),
            ],
        };
        assert!(extract_field(&record.fields[0]).is_err());

        let out = extract(&record);
        assert_eq!(out.row["status"], "");
        assert_eq!(out.row["radgiver"], "Bo");
        assert_eq!(out.row["titel"], "Kunde");
        assert_eq!(out.row["item_id"], "1");
    }

    #[test]
    fn embed_strategy_order() {
        let direct = field("staging", "embed", json!({"value": {"url": "https://direct"}, "embed": {"resolved_url": "https://inline"}}));
        assert_eq!(extract_field(&direct), resolved("https://direct"));

        let inline = field("staging", "embed", json!({"embed": {"embed_id": 9, "original_url": "https://orig", "resolved_url": ""}}));
        assert_eq!(extract_field(&inline), resolved("https://orig"));

        let remote = field("staging", "embed", json!({"embed": {"embed_id": 9}, "file": {"file_id": 4}}));
        assert_eq!(
            extract_field(&remote),
            Ok(FieldValue::Remote(RemoteRef::Embed(9)))
        );

        let file = field("staging", "embed", json!({"file": {"file_id": "4"}}));
        assert_eq!(
            extract_field(&file),
            Ok(FieldValue::Remote(RemoteRef::File(4)))
        );

        let nothing = field("staging", "embed", json!({"embed": {}}));
        assert_eq!(extract_field(&nothing), resolved(""));
    }

    #[test]
    fn flat_feed_object_flattens_nested_keys() {
        let obj = json!({
            "titel": "A",
            "status": null,
            "meta": {"owner": "Bo", "n": 2},
            "tags": ["x"]
        });
        let row = extract_flat(obj.as_object().unwrap());
        assert_eq!(row["titel"], "A");
        assert_eq!(row["status"], "");
        assert_eq!(row["meta.owner"], "Bo");
        assert_eq!(row["meta.n"], "2");
        assert_eq!(row["tags"], r#"["x"]"#);
    }

    struct RecordingResolver {
        calls: Mutex<Vec<RemoteRef>>,
    }

    #[async_trait]
    impl RefResolver for RecordingResolver {
        async fn resolve(&self, reference: RemoteRef) -> ResolveResult<String> {
            self.calls.lock().unwrap().push(reference);
            match reference {
                RemoteRef::Embed(id) => Ok(format!("https://embed/{id}")),
                RemoteRef::File(_) => Err(ResolveError::lookup_failed(reference, "boom")),
            }
        }
    }

    #[tokio::test]
    async fn extractor_resolves_each_reference_once() {
        let record = |title: &str, embed_id: u64| RawRecord {
            title: title.into(),
            item_id: None,
            fields: vec![field("staging-site", "embed", json!({"embed": {"embed_id": embed_id}}))],
        };
        let records = vec![
            record("a", 1),
            record("b", 1),
            record("c", 2),
            RawRecord {
                title: "d".into(),
                item_id: None,
                fields: vec![field("staging-site", "embed", json!({"file": {"file_id": 3}}))],
            },
        ];

        let resolver = RecordingResolver {
            calls: Mutex::new(Vec::new()),
        };
        let cache = ResolutionCache::new();
        let rows = Extractor::new(&resolver, &cache)
            .with_workers(2)
            .extract_all(&records)
            .await;

        assert_eq!(rows[0]["staging-site"], "https://embed/1");
        assert_eq!(rows[1]["staging-site"], "https://embed/1");
        assert_eq!(rows[2]["staging-site"], "https://embed/2");
        assert_eq!(rows[3]["staging-site"], "");

        let mut calls = resolver.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(
            calls,
            vec![RemoteRef::Embed(1), RemoteRef::Embed(2), RemoteRef::File(3)]
        );
        assert_eq!(cache.lookups(), 3);
        assert_eq!(cache.len(), 3);
    }

    #[derive(Default)]
    struct SlowResolver {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl RefResolver for SlowResolver {
        async fn resolve(&self, reference: RemoteRef) -> ResolveResult<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("https://{reference}"))
        }
    }

    #[tokio::test]
    async fn lookups_in_flight_never_exceed_workers() {
        let records: Vec<RawRecord> = (1..=6)
            .map(|id| RawRecord {
                title: format!("kunde {id}"),
                item_id: None,
                fields: vec![field("staging-site", "embed", json!({"embed": {"embed_id": id}}))],
            })
            .collect();

        let resolver = SlowResolver::default();
        let cache = ResolutionCache::new();
        let rows = Extractor::new(&resolver, &cache)
            .with_workers(2)
            .extract_all(&records)
            .await;

        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| !r["staging-site"].is_empty()));
        assert_eq!(cache.lookups(), 6);
        assert_eq!(resolver.peak.load(Ordering::SeqCst), 2);
        assert_eq!(resolver.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_remote_resolver_degrades_to_empty() {
        let record = RawRecord {
            title: "a".into(),
            item_id: None,
            fields: vec![field("staging-site", "embed", json!({"embed": {"embed_id": 7}}))],
        };
        let cache = ResolutionCache::new();
        let rows = Extractor::new(&NoRemoteResolver, &cache)
            .extract_all(std::slice::from_ref(&record))
            .await;
        assert_eq!(rows[0]["staging-site"], "");
        assert_eq!(cache.get(&RemoteRef::Embed(7)), Some(String::new()));
    }
}
