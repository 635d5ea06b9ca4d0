//! # Configuration Management
//!
//! Settings come from `tide-config.toml`; every field has a default matching
//! the Karekare deployment, so a missing file or a partial one still works.
//! The NIWA API key lives in its own JSON file (`{"api_key": "..."}`) so it
//! can be kept out of the settings and permissioned separately.

use crate::{days::Bucketing, TideError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default settings file, relative to the working directory.
pub const CONFIG_FILE: &str = "tide-config.toml";

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Location the tide table is for
    pub station: StationConfig,
    /// Which NIWA service to query and how
    pub source: SourceConfig,
    /// Where the page is written and published
    pub output: OutputConfig,
}

/// Location and datum settings
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    /// Location name sent to the legacy form
    pub name: String,
    /// Heading shown above the table
    pub heading: String,
    /// Decimal latitude for the API (negative is south)
    pub latitude: f64,
    /// Decimal longitude for the API (positive is east)
    pub longitude: f64,
    /// Degree-minute-second latitude for the legacy form
    pub legacy_lat: String,
    /// Degree-minute-second longitude for the legacy form
    pub legacy_lon: String,
    /// Height datum code, MSL for mean sea level
    pub datum: String,
}

/// Upstream data source settings
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// NIWA tide API endpoint
    pub api_url: String,
    /// NIWA tide calculator form endpoint
    pub legacy_url: String,
    /// JSON file holding `{"api_key": "..."}`
    pub api_key_path: PathBuf,
    /// Skip TLS certificate verification. Off unless explicitly enabled.
    pub accept_invalid_certs: bool,
    /// How events outside today/tomorrow are treated
    pub bucketing: Bucketing,
}

/// Which NIWA service feeds the table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON tide API, one request for both days
    #[default]
    Api,
    /// HTML tide calculator, one request per day
    Legacy,
}

/// Output file settings
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Scratch directory for the temporary file; same filesystem as `publish_dir`
    pub scratch_dir: PathBuf,
    /// Directory the web server reads from
    pub publish_dir: PathBuf,
    /// Page file name inside `publish_dir`
    pub file_name: String,
    /// URL the page refreshes itself from
    pub refresh_url: String,
    /// Seconds between browser refreshes
    pub refresh_secs: u32,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            name: "Karekare".to_string(),
            heading: "Tides for Karekare Beach".to_string(),
            latitude: -36.990833,  // 36 59 27 S
            longitude: 174.486944, // 174 29 13 E
            legacy_lat: "36 59 27 S".to_string(),
            legacy_lon: "174 29 13 E".to_string(),
            datum: "MSL".to_string(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            kind: SourceKind::Api,
            api_url: "https://api.niwa.co.nz/tides/data".to_string(),
            legacy_url: "https://www.niwa.co.nz/node/26820/results".to_string(),
            api_key_path: PathBuf::from("niwa-key.json"),
            accept_invalid_certs: false,
            bucketing: Bucketing::Strict,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            scratch_dir: PathBuf::from("/services/www/tmp"),
            publish_dir: PathBuf::from("/services/www/wikarekare/weather"),
            file_name: "tides.html".to_string(),
            refresh_url: "/weather/tides.html".to_string(),
            refresh_secs: 3600,
        }
    }
}

impl OutputConfig {
    /// Live path readers see.
    pub fn publish_path(&self) -> PathBuf {
        self.publish_dir.join(&self.file_name)
    }
}

impl Config {
    /// Load configuration from tide-config.toml in the working directory
    pub fn load() -> Result<Self, TideError> {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from the specified path.
    ///
    /// A missing file means defaults. A file that exists but cannot be read
    /// or parsed is an error, so a typo never silently publishes from the
    /// wrong place.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TideError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config =
                    toml::from_str(&contents).map_err(|e| TideError::config(path, e))?;
                tracing::info!(
                    path = %path.display(),
                    station = %config.station.name,
                    source = ?config.source.kind,
                    "loaded configuration"
                );
                Ok(config)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(TideError::config(path, e)),
        }
    }
}

#[derive(Deserialize)]
struct ApiKeyFile {
    api_key: String,
}

/// Read the NIWA API key from a JSON file with an `api_key` field.
pub fn load_api_key<P: AsRef<Path>>(path: P) -> Result<String, TideError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| TideError::config(path, e))?;
    let file: ApiKeyFile = serde_json::from_slice(&data).map_err(|e| TideError::config(path, e))?;

    let key = file.api_key.trim();
    if key.is_empty() {
        return Err(TideError::config(path, "api_key is blank"));
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.station.name, "Karekare");
        assert_eq!(config.station.datum, "MSL");
        assert_eq!(config.source.kind, SourceKind::Api);
        assert!(!config.source.accept_invalid_certs);
        assert_eq!(config.source.bucketing, Bucketing::Strict);
        assert_eq!(config.output.refresh_secs, 3600);
        assert_eq!(
            config.output.publish_path(),
            PathBuf::from("/services/www/wikarekare/weather/tides.html")
        );
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.station.legacy_lat, parsed.station.legacy_lat);
        assert_eq!(config.output.scratch_dir, parsed.output.scratch_dir);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = write_temp(
            r#"
[source]
kind = "legacy"
bucketing = "lenient"

[output]
publish_dir = "/var/www/tides"
"#,
        );
        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.source.kind, SourceKind::Legacy);
        assert_eq!(config.source.bucketing, Bucketing::Lenient);
        assert_eq!(config.source.api_url, "https://api.niwa.co.nz/tides/data");
        assert_eq!(
            config.output.publish_path(),
            PathBuf::from("/var/www/tides/tides.html")
        );
        assert_eq!(config.station.heading, "Tides for Karekare Beach");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path/tide-config.toml").unwrap();
        assert_eq!(config.station.name, "Karekare");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let file = write_temp("[source]\nkind = \"carrier-pigeon\"\n");
        let err = Config::load_from_path(file.path()).unwrap_err();
        assert_eq!(err.stage(), "config");
    }

    #[test]
    fn test_load_api_key() {
        let file = write_temp(r#"{ "api_key": "  abc123 " }"#);
        assert_eq!(load_api_key(file.path()).unwrap(), "abc123");
    }

    #[test]
    fn test_api_key_errors() {
        let blank = write_temp(r#"{ "api_key": "" }"#);
        assert!(matches!(
            load_api_key(blank.path()),
            Err(TideError::Config { .. })
        ));

        let wrong_field = write_temp(r#"{ "key": "abc123" }"#);
        assert!(matches!(
            load_api_key(wrong_field.path()),
            Err(TideError::Config { .. })
        ));

        assert!(matches!(
            load_api_key("/nonexistent/niwa-key.json"),
            Err(TideError::Config { .. })
        ));
    }
}
