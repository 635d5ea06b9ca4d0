//! # Response Extraction
//!
//! Turns NIWA responses into tide data.
//!
//! ## JSON API
//! ```json
//! { "metadata": { ... },
//!   "values": [ { "time": "2024-03-01T06:12:00Z", "value": 1.42 }, ... ] }
//! ```
//! Times carrying an offset are converted to local time; naive times are
//! taken as local already.
//!
//! ## Legacy HTML
//! The tide calculator answers with one or more `<table>`s. Every `<tr>` in
//! every table becomes a row of trimmed `<td>` texts; the first row found is
//! the header and the rest form one flat list:
//! ```html
//! <table>
//!   <tr><td>Day</td><td>Time</td><td>Height</td></tr>
//!   <tr><td>Fri</td><td>06:12</td><td>1.4</td></tr>
//!   ...
//! </table>
//! ```
//! Column positions are described by [`RowSchema`]. Rows that are short or
//! hold unreadable text still produce a [`TableEntry`], with the bad parts
//! left empty.

use crate::{TableEntry, TideError, TideEvent};
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    values: Vec<ApiValue>,
}

#[derive(Debug, Deserialize)]
struct ApiValue {
    time: String,
    value: f32,
}

/// Parse the API payload into events, converting times into `tz`.
pub fn extract_events<Tz: TimeZone>(body: &str, tz: &Tz) -> Result<Vec<TideEvent>, TideError> {
    let response: ApiResponse = serde_json::from_str(body)?;

    let events = response
        .values
        .into_iter()
        .map(|v| {
            Ok(TideEvent {
                timestamp: parse_timestamp(&v.time, tz)?,
                height_m: v.value,
            })
        })
        .collect::<Result<Vec<_>, TideError>>()?;

    tracing::debug!(count = events.len(), "extracted tide events");
    Ok(events)
}

/// Read an ISO-8601 style timestamp as local wall-clock time in `tz`.
fn parse_timestamp<Tz: TimeZone>(value: &str, tz: &Tz) -> Result<NaiveDateTime, TideError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(tz).naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| TideError::Timestamp {
            value: value.to_string(),
        })
}

/// Cell text scraped from every table in an HTML page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HtmlTable {
    /// First row found, used as column names
    pub header: Vec<String>,
    /// Column name to index, built from `header`
    pub columns: HashMap<String, usize>,
    /// Every later row, across all tables, in document order
    pub rows: Vec<Vec<String>>,
}

/// Scrape all table rows out of an HTML document.
///
/// html5ever recovers from malformed markup rather than failing, so a page
/// without tables gives an empty [`HtmlTable`].
pub fn extract_table(html: &str) -> HtmlTable {
    let doc = Html::parse_document(html);
    let tables = Selector::parse("table").expect("CSS selector should be valid");

    let mut table = HtmlTable::default();
    let mut seen_header = false;

    for element in doc.select(&tables) {
        for tr in table_rows(element) {
            let row: Vec<String> = child_elements(tr, "td")
                .map(|td| td.text().collect::<String>().trim().to_string())
                .collect();

            if seen_header {
                table.rows.push(row);
            } else {
                seen_header = true;
                table.columns = row
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), i))
                    .collect();
                table.header = row;
            }
        }
    }

    tracing::debug!(rows = table.rows.len(), header = ?table.header, "scraped tide table");
    table
}

/// Rows belonging to this table, not to tables nested inside it.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(child_elements(child, "tr")),
            _ => {}
        }
    }
    rows
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == name)
}

/// Where the time and height live in a scraped row.
///
/// The tide calculator puts the time in column 1 and the height in column 2.
/// If NIWA changes the page layout, this is the only thing to update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowSchema {
    pub time_col: usize,
    pub height_col: usize,
}

impl Default for RowSchema {
    fn default() -> Self {
        RowSchema {
            time_col: 1,
            height_col: 2,
        }
    }
}

impl RowSchema {
    /// Read one row. Missing or unparsable cells come back as `None`.
    pub fn entry(&self, row: &[String]) -> TableEntry {
        let time = row.get(self.time_col).and_then(|cell| parse_time(cell));
        let height_m = row.get(self.height_col).and_then(|cell| parse_height(cell));

        if time.is_none() || height_m.is_none() {
            tracing::debug!(?row, "incomplete tide row");
        }

        TableEntry { time, height_m }
    }

    /// Read every data row of a scraped table.
    pub fn entries(&self, table: &HtmlTable) -> Vec<TableEntry> {
        table.rows.iter().map(|row| self.entry(row)).collect()
    }
}

/// Accepts `14:07`, `14:07:00`, `2:07 PM`, `2:07pm` and full date-times.
fn parse_time(cell: &str) -> Option<NaiveTime> {
    let cell = cell.trim();
    ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(cell, fmt).ok())
        .or_else(|| {
            ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %I:%M %p"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
                .map(|dt| dt.time())
        })
}

/// Accepts `1.4` and `1.4m`.
fn parse_height(cell: &str) -> Option<f32> {
    cell.trim().trim_end_matches('m').trim().parse().ok()
}
