//! # Karekare Tides Core Library
//!
//! This library fetches NIWA tide predictions for Karekare Beach and publishes
//! them as a small static HTML table covering today and tomorrow. It is run
//! once per invocation by an external scheduler (cron), so everything here is
//! sequential and nothing survives between runs.
//!
//! ## Data Flow
//!
//! 1. **Query**: ask NIWA for a two-day window ([`tide_data`])
//! 2. **Extract**: turn the JSON payload or HTML table into events ([`extract`])
//! 3. **Split**: bucket events into today and tomorrow ([`days`])
//! 4. **Render**: build the HTML page ([`renderer`])
//! 5. **Publish**: write to scratch, rename over the live file ([`publish`])
//!
//! [`pipeline::TidePipeline`] wires the stages together.
//!
//! ## Data Sources
//!
//! Two interchangeable sources are supported:
//! - **API**: NIWA's JSON tide API, one GET for both days, needs an API key
//! - **Legacy**: the NIWA tide calculator form, one POST per day, HTML table
//!
//! ## Core Types
//!
//! - [`TideEvent`]: a single predicted high or low tide
//! - [`TableEntry`]: one slot of the rendered table, possibly incomplete
//! - [`RunDates`]: the clock reading every stage of a run shares

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod days;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod publish;
pub mod renderer;
pub mod tide_data;

pub use error::TideError;

/// A single predicted tide extreme.
///
/// Heights are metres relative to mean sea level, so low tides are negative.
/// Events keep the order the source delivered them in.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use tide_table_lib::TideEvent;
///
/// let high = TideEvent {
///     timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
///         .unwrap()
///         .and_hms_opt(6, 12, 0)
///         .unwrap(),
///     height_m: 1.42,
/// };
/// assert_eq!(high.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideEvent {
    /// Local wall-clock time of the tide
    pub timestamp: NaiveDateTime,
    /// Height in metres above mean sea level
    pub height_m: f32,
}

impl TideEvent {
    /// Local calendar date of the event.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// One slot of a day column in the rendered table.
///
/// API events always fill both fields. Rows scraped from the legacy HTML
/// table may be short or hold text that does not parse; the missing part is
/// `None` and renders as a blank cell instead of failing the run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TableEntry {
    pub time: Option<NaiveTime>,
    pub height_m: Option<f32>,
}

impl From<&TideEvent> for TableEntry {
    fn from(event: &TideEvent) -> Self {
        TableEntry {
            time: Some(event.timestamp.time()),
            height_m: Some(event.height_m),
        }
    }
}

/// The instant a run started, plus the two calendar dates derived from it.
///
/// Captured once so that "today" and "tomorrow" agree across every request,
/// the day split and the page header, even if a run straddles midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunDates {
    /// Local time the run started; embedded in the page as a comment
    pub generated_at: NaiveDateTime,
    pub today: NaiveDate,
    pub tomorrow: NaiveDate,
}

impl RunDates {
    /// Build run dates from a local wall-clock reading.
    pub fn new(generated_at: NaiveDateTime) -> Self {
        let today = generated_at.date();
        // succ_opt only fails at NaiveDate::MAX
        let tomorrow = today.succ_opt().unwrap_or(today);
        RunDates {
            generated_at,
            today,
            tomorrow,
        }
    }

    /// Read the local clock.
    pub fn now() -> Self {
        Self::new(Local::now().naive_local())
    }

    /// Date targeted by a single-day request.
    pub fn day(&self, tomorrow: bool) -> NaiveDate {
        if tomorrow {
            self.tomorrow
        } else {
            self.today
        }
    }
}
