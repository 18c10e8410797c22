//! HTML rendering
//!
//! Pure functions from snapshot + query to page markup. Every cell value is
//! escaped; the staging column is the only one rendered as markup.

use once_cell::sync::Lazy;
use regex::Regex;
use statusboard_core::{Column, Highlight, NormalizedRow, Query, RowFilter, Snapshot, TableView};

/// Page heading and document title
pub const PAGE_TITLE: &str = "Website Kundestatus";

/// Anchor text for staging links
pub const LINK_TEXT: &str = "Link til side";

/// Shown after a wrong password
pub const WRONG_PASSWORD: &str = "Forkert kode.";

/// Shown in place of rows when nothing matched
pub const NO_RESULTS: &str = "Ingen resultater fundet.";

/// Shown when no data has been loaded
pub const NOT_LOADED: &str = "Data er ikke indlæst endnu.";

const MIN_LINK_LEN: usize = 5;

static EMBEDDED_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s'"}]+"#).expect("valid embedded url regex"));

const STYLE: &str = r"
table { width: 100%; border-collapse: collapse; }
table th { text-align: left; font-weight: bold; padding: 8px; border-bottom: 1px solid rgba(0,0,0,0.15); }
table td { padding: 8px; vertical-align: top; }
table td:nth-child(1), table td:nth-child(4), table td:nth-child(6) { max-width: 150px; white-space: normal; word-break: break-word; }
table td:nth-child(2), table td:nth-child(3) { max-width: 180px; white-space: normal; word-break: break-word; }
table td:nth-child(5) { max-width: 700px; white-space: normal; word-break: break-word; }
.highlight-row-red { background-color: rgba(255, 0, 0, 0.1); }
.highlight-row-green { background-color: rgba(0, 255, 0, 0.08); }
tr td { background-color: inherit; }
tr.morkerod td { background-color: rgba(213, 2, 2, 0.55); color: white; }
a { text-decoration: underline; }
.error { color: #a00; }
";

/// Escape text for HTML content and attribute values
#[must_use]
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Target URL for a raw staging value
///
/// Values shorter than five characters are ignored. An `http(s)://` URL
/// embedded in surrounding text is pulled out; anything without a scheme
/// gets `http://`.
#[must_use]
pub fn staging_href(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < MIN_LINK_LEN {
        return None;
    }
    let link = EMBEDDED_URL
        .find(trimmed)
        .map_or(trimmed, |m| m.as_str());
    if link.starts_with("http") {
        Some(link.to_string())
    } else {
        Some(format!("http://{link}"))
    }
}

/// Anchor for a raw staging value, or `""`
#[must_use]
pub fn staging_anchor(raw: &str) -> String {
    staging_href(raw).map_or_else(String::new, |href| {
        format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">{LINK_TEXT}</a>"#,
            html_escape(&href)
        )
    })
}

/// CSS classes for a row
#[must_use]
pub fn row_classes(row: &NormalizedRow) -> String {
    let highlight = match row.highlight {
        Highlight::OwnerIsAdvisor => Some("highlight-row-red"),
        Highlight::OwnerIsDesigner => Some("highlight-row-green"),
        Highlight::None => None,
    };
    let stale = row.stale.then_some("morkerod");
    [highlight, stale]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_row(row: &NormalizedRow) -> String {
    let cells: String = Column::ALL
        .iter()
        .map(|&column| {
            let value = row.get(column);
            let content = match column {
                Column::StagingLink => staging_anchor(value),
                _ => html_escape(value),
            };
            format!("<td>{content}</td>")
        })
        .collect();
    let classes = row_classes(row);
    if classes.is_empty() {
        format!("<tr>{cells}</tr>")
    } else {
        format!(r#"<tr class="{classes}">{cells}</tr>"#)
    }
}

/// Result count line plus the table, or the not-loaded notice
#[must_use]
pub fn render_table(view: &TableView) -> String {
    let Some(table) = view.table() else {
        return format!(r#"<p class="notice">{NOT_LOADED}</p>"#);
    };

    let header: String = Column::ALL
        .iter()
        .map(|c| format!("<th>{}</th>", html_escape(c.label())))
        .collect();
    let body: String = if table.is_empty() {
        format!(
            r#"<tr><td colspan="{}">{NO_RESULTS}</td></tr>"#,
            Column::ALL.len()
        )
    } else {
        table.iter().map(render_row).collect()
    };

    format!(
        "<p>Fundet {} resultater.</p>\n<table><thead><tr>{header}</tr></thead><tbody>{body}</tbody></table>",
        table.len()
    )
}

fn flag_label(flag: RowFilter) -> &'static str {
    match flag {
        RowFilter::None => "Alle",
        RowFilter::OwnerIsAdvisor => "🔴 Bolden hos rådgiver",
        RowFilter::OwnerIsDesigner => "🟢 Bolden hos designer",
        RowFilter::Stale => "⚫ Ingen opdatering i 90 dage",
    }
}

fn render_controls(query: &Query) -> String {
    let options: String = RowFilter::ALL
        .iter()
        .map(|&flag| {
            let selected = if flag == query.flag { " selected" } else { "" };
            format!(
                r#"<option value="{}"{selected}>{}</option>"#,
                flag.as_param(),
                flag_label(flag)
            )
        })
        .collect();
    format!(
        r#"<form method="get" action="/">
<input type="search" name="search" value="{}" placeholder="Søg">
<select name="flag">{options}</select>
<button type="submit">Søg</button>
</form>
<form method="post" action="/logout"><button type="submit">Log ud</button></form>"#,
        html_escape(&query.term)
    )
}

fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="da">
<head>
<meta charset="utf-8">
<title>{PAGE_TITLE}</title>
<style>{STYLE}</style>
</head>
<body>
<h1>{PAGE_TITLE}</h1>
{body}
</body>
</html>"#
    )
}

/// Full dashboard page
#[must_use]
pub fn render_dashboard(snapshot: &Snapshot, query: &Query, view: &TableView) -> String {
    let mut body = render_controls(query);
    if let Some(error) = &snapshot.error {
        body.push_str(&format!(
            r#"<p class="error">Kunne ikke hente data: {}</p>"#,
            html_escape(error)
        ));
    }
    body.push('\n');
    body.push_str(&render_table(view));
    body.push_str(&format!(
        r#"<p class="fetched">Opdateret {}</p>"#,
        snapshot.fetched_at.format("%d-%m-%Y %H:%M UTC")
    ));
    page(&body)
}

/// Password form
#[must_use]
pub fn render_login(failed: bool) -> String {
    let error = if failed {
        format!(r#"<p class="error">{WRONG_PASSWORD}</p>"#)
    } else {
        String::new()
    };
    page(&format!(
        r#"{error}<form method="post" action="/login">
<label>Adgangskode <input type="password" name="password" autofocus></label>
<button type="submit">Log ind</button>
</form>"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use statusboard_core::Table;
    use statusboard_test_utils::sample_table;

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            html_escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn staging_href_rules() {
        assert_eq!(staging_href("abc"), None);
        assert_eq!(staging_href("   ab  "), None);
        assert_eq!(
            staging_href("bageriet.staging.dk").as_deref(),
            Some("http://bageriet.staging.dk")
        );
        assert_eq!(
            staging_href("https://x.test/a").as_deref(),
            Some("https://x.test/a")
        );
        assert_eq!(
            staging_href("{'url': 'https://x.test/p?q=1'}").as_deref(),
            Some("https://x.test/p?q=1")
        );
    }

    #[test]
    fn staging_anchor_opens_new_tab_and_escapes() {
        assert_eq!(staging_anchor(""), "");
        assert_eq!(
            staging_anchor("https://x.test/?a=1&b=2"),
            r#"<a href="https://x.test/?a=1&amp;b=2" target="_blank" rel="noopener noreferrer">Link til side</a>"#
        );
    }

    #[test]
    fn row_classes_combine_highlight_and_stale() {
        let table = sample_table();
        let classes: Vec<String> = table.iter().map(row_classes).collect();
        assert_eq!(
            classes,
            vec!["highlight-row-red morkerod", "highlight-row-green", ""]
        );
    }

    #[test]
    fn table_escapes_cells_and_uses_labels() {
        let html = render_table(&TableView::Loaded(sample_table()));
        assert!(html.starts_with("<p>Fundet 3 resultater.</p>"));
        assert!(html.contains("<th>Kundenavn</th>"));
        assert!(html.contains("<th>Hvem har bolden</th>"));
        assert!(html.contains("02/01/24 &lt;b&gt;stop&lt;/b&gt;"));
        assert!(!html.contains("<b>stop</b>"));
        assert!(html.contains(r#"href="http://bageriet.staging.dk""#));
    }

    #[test]
    fn empty_and_not_loaded_are_distinct() {
        let empty = render_table(&TableView::Loaded(Table::empty()));
        assert!(empty.contains("Fundet 0 resultater."));
        assert!(empty.contains(r#"<td colspan="7">Ingen resultater fundet.</td>"#));

        let not_loaded = render_table(&TableView::NotLoaded);
        assert!(not_loaded.contains(NOT_LOADED));
        assert!(!not_loaded.contains("Fundet"));
    }

    #[test]
    fn dashboard_keeps_query_and_shows_error() {
        let snapshot = Snapshot::failed("feed:x", "feed returned 500: <oops>");
        let query = Query::new("\"bager\"", RowFilter::Stale);
        let html = render_dashboard(&snapshot, &query, &TableView::Loaded(Table::empty()));

        assert!(html.contains(r#"value="&quot;bager&quot;""#));
        assert!(html.contains(r#"<option value="stale" selected>"#));
        assert!(html.contains("feed returned 500: &lt;oops&gt;"));
        assert!(html.contains("<title>Website Kundestatus</title>"));
    }

    #[test]
    fn login_page_shows_error_only_after_failure() {
        assert!(!render_login(false).contains(WRONG_PASSWORD));
        assert!(render_login(true).contains(WRONG_PASSWORD));
        assert!(render_login(false).contains(r#"name="password""#));
    }
}
