//! # Day Splitter
//!
//! The API returns one flat list covering the two-day window. The table
//! shows it as two columns, so each event is assigned to today or tomorrow by
//! comparing its local calendar date with the run's dates.

use crate::{RunDates, TideEvent};
use serde::{Deserialize, Serialize};

/// What to do with an event dated neither today nor tomorrow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucketing {
    /// Only exact date matches are kept; anything else is dropped
    #[default]
    Strict,
    /// Anything that is not today goes in tomorrow
    Lenient,
}

/// Events split into the two table columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DayBuckets {
    pub today: Vec<TideEvent>,
    pub tomorrow: Vec<TideEvent>,
    /// Events dropped under [`Bucketing::Strict`]
    pub discarded: usize,
}

/// Partition events by local calendar date, keeping source order.
pub fn split_days(events: &[TideEvent], dates: &RunDates, mode: Bucketing) -> DayBuckets {
    let mut buckets = DayBuckets::default();

    for event in events {
        let date = event.date();
        if date == dates.today {
            buckets.today.push(*event);
        } else if date == dates.tomorrow || mode == Bucketing::Lenient {
            buckets.tomorrow.push(*event);
        } else {
            tracing::debug!(timestamp = %event.timestamp, "tide outside today/tomorrow");
            buckets.discarded += 1;
        }
    }

    if buckets.discarded > 0 {
        tracing::warn!(
            discarded = buckets.discarded,
            today = %dates.today,
            "dropped tides outside the two-day window"
        );
    }

    buckets
}
