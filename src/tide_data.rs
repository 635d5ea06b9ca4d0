//! # NIWA Tide Queries
//!
//! Builds and sends the requests that return tide predictions for the
//! station. Nothing here retries or caches: a run makes one request (API) or
//! two (legacy calculator, one per day), and any failure ends the run.
//!
//! ## Data Sources
//!
//! ### Tide API
//! - **URL**: https://api.niwa.co.nz/tides/data
//! - **Query**: `lat`, `long`, `numberOfDays=2`, `startDate=YYYY-MM-DD`, `datum=MSL`
//! - **Auth**: API key in the `x-apikey` header
//! - **Format**: JSON, see [`crate::extract::extract_events`]
//!
//! ### Tide calculator (legacy)
//! - **URL**: https://www.niwa.co.nz/node/26820/results
//! - **Body**: form-encoded location, coordinates, datum and one day's date
//! - **Format**: HTML table, see [`crate::extract::extract_table`]
//!
//! Request parameters are plain functions of the station settings and run
//! dates, so they are tested without a network.

use crate::config::{SourceConfig, StationConfig};
use crate::{RunDates, TideError};
use chrono::Datelike;
use reqwest::{Client, Response};

/// Header NIWA reads the API key from.
pub const API_KEY_HEADER: &str = "x-apikey";

/// Days of predictions requested from the API.
pub const API_DAYS: u32 = 2;

/// Query string for a two-day API request starting today.
pub fn api_query(station: &StationConfig, dates: &RunDates) -> Vec<(&'static str, String)> {
    vec![
        ("lat", station.latitude.to_string()),
        ("long", station.longitude.to_string()),
        ("numberOfDays", API_DAYS.to_string()),
        ("startDate", dates.today.format("%Y-%m-%d").to_string()),
        ("datum", station.datum.clone()),
    ]
}

/// Form body for a one-day calculator request, for today or tomorrow.
pub fn legacy_form(
    station: &StationConfig,
    dates: &RunDates,
    tomorrow: bool,
) -> Vec<(&'static str, String)> {
    let day = dates.day(tomorrow);
    vec![
        ("location_name", station.name.clone()),
        // 0 selects a user-specified location
        ("loc", "0".to_string()),
        ("lat", station.legacy_lat.clone()),
        ("lon", station.legacy_lon.clone()),
        ("datum", station.datum.clone()),
        ("days", "1".to_string()),
        ("day", day.day().to_string()),
        ("month", day.month().to_string()),
        ("year", day.year().to_string()),
        // Midnight, despite looking like noon
        ("time", "12".to_string()),
        ("showResults", "data".to_string()),
        ("submit", "Calculate".to_string()),
    ]
}

/// HTTP client for both NIWA services.
#[derive(Clone, Debug)]
pub struct NiwaClient {
    http: Client,
}

impl NiwaClient {
    /// Build a client honouring the TLS setting.
    ///
    /// Certificates are verified unless `accept_invalid_certs` is set.
    /// Transport defaults are used for everything else, including timeouts.
    pub fn new(source: &SourceConfig) -> Result<Self, TideError> {
        if source.accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled");
        }
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(source.accept_invalid_certs)
            .build()?;
        Ok(NiwaClient { http })
    }

    /// GET two days of predictions from the tide API. Returns the JSON body.
    pub async fn fetch_predictions(
        &self,
        url: &str,
        api_key: &str,
        station: &StationConfig,
        dates: &RunDates,
    ) -> Result<String, TideError> {
        tracing::debug!(url, start = %dates.today, "requesting tide API");
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, api_key)
            .query(&api_query(station, dates))
            .send()
            .await?;
        read_body(response).await
    }

    /// POST one day's query to the tide calculator. Returns the HTML body.
    pub async fn fetch_calculator(
        &self,
        url: &str,
        station: &StationConfig,
        dates: &RunDates,
        tomorrow: bool,
    ) -> Result<String, TideError> {
        tracing::debug!(url, day = %dates.day(tomorrow), "requesting tide calculator");
        let response = self
            .http
            .post(url)
            .form(&legacy_form(station, dates, tomorrow))
            .send()
            .await?;
        read_body(response).await
    }
}

/// Fail on any non-success status, otherwise return the body text.
async fn read_body(response: Response) -> Result<String, TideError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TideError::Status {
            status,
            url: response.url().to_string(),
        });
    }
    let body = response.text().await?;
    tracing::debug!(%status, bytes = body.len(), "received response");
    Ok(body)
}
