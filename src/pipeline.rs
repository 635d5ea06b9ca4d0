//! # Run Pipeline
//!
//! One run is: query NIWA, extract the tides, split them by day, render the
//! page and publish it. Stages run strictly in that order and the first error
//! ends the run, so a failed run never touches the live page.

use crate::config::{load_api_key, Config, SourceKind};
use crate::days::split_days;
use crate::extract::{extract_events, extract_table, RowSchema};
use crate::publish::Publisher;
use crate::renderer::{render_page, LabelStyle, Page};
use crate::tide_data::NiwaClient;
use crate::{RunDates, TableEntry, TideError};
use chrono::Local;
use std::path::PathBuf;

/// The two table columns, ready to render.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DayColumns {
    pub today: Vec<TableEntry>,
    pub tomorrow: Vec<TableEntry>,
}

/// A configured run, built once at startup.
pub struct TidePipeline {
    config: Config,
    client: NiwaClient,
    publisher: Publisher,
    /// Only read when the API source is selected
    api_key: Option<String>,
}

impl TidePipeline {
    /// Validate settings, read the API key and build the HTTP client.
    pub fn new(config: Config) -> Result<Self, TideError> {
        let api_key = match config.source.kind {
            SourceKind::Api => Some(load_api_key(&config.source.api_key_path)?),
            SourceKind::Legacy => None,
        };
        let client = NiwaClient::new(&config.source)?;
        let publisher = Publisher::new(&config.output.scratch_dir, config.output.publish_path());

        Ok(TidePipeline {
            config,
            client,
            publisher,
            api_key,
        })
    }

    /// Fetch and sort tides into today and tomorrow.
    pub async fn collect(&self, dates: &RunDates) -> Result<DayColumns, TideError> {
        let source = &self.config.source;
        let station = &self.config.station;

        let columns = match source.kind {
            SourceKind::Api => {
                let api_key = self.api_key.as_deref().ok_or_else(|| {
                    TideError::config(&source.api_key_path, "API key was not loaded")
                })?;
                let body = self
                    .client
                    .fetch_predictions(&source.api_url, api_key, station, dates)
                    .await?;
                let events = extract_events(&body, &Local)?;
                let buckets = split_days(&events, dates, source.bucketing);
                DayColumns {
                    today: buckets.today.iter().map(TableEntry::from).collect(),
                    tomorrow: buckets.tomorrow.iter().map(TableEntry::from).collect(),
                }
            }
            SourceKind::Legacy => {
                // Each request covers exactly one day, so rows go straight
                // into their column without a date check.
                let schema = RowSchema::default();
                let mut columns = DayColumns::default();
                for tomorrow in [false, true] {
                    let body = self
                        .client
                        .fetch_calculator(&source.legacy_url, station, dates, tomorrow)
                        .await?;
                    let entries = schema.entries(&extract_table(&body));
                    if tomorrow {
                        columns.tomorrow = entries;
                    } else {
                        columns.today = entries;
                    }
                }
                columns
            }
        };

        tracing::info!(
            today = columns.today.len(),
            tomorrow = columns.tomorrow.len(),
            "collected tides"
        );
        Ok(columns)
    }

    /// Render the page for already collected columns.
    pub fn render(&self, dates: &RunDates, columns: &DayColumns) -> String {
        let style = match self.config.source.kind {
            SourceKind::Api => LabelStyle::Iso,
            SourceKind::Legacy => LabelStyle::Short,
        };
        let output = &self.config.output;

        render_page(&Page {
            heading: &self.config.station.heading,
            refresh_url: &output.refresh_url,
            refresh_secs: output.refresh_secs,
            generated_at: dates.generated_at,
            today_label: style.format(dates.today),
            tomorrow_label: style.format(dates.tomorrow),
            today: &columns.today,
            tomorrow: &columns.tomorrow,
        })
    }

    /// Fetch and render without publishing.
    pub async fn build_page(&self, dates: &RunDates) -> Result<String, TideError> {
        let columns = self.collect(dates).await?;
        Ok(self.render(dates, &columns))
    }

    /// Full run: fetch, render and publish. Returns the live path.
    pub async fn run(&self, dates: &RunDates) -> Result<PathBuf, TideError> {
        let html = self.build_page(dates).await?;
        let path = self.publisher.publish(&html)?;
        Ok(path.to_path_buf())
    }
}
