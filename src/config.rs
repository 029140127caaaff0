//! Startup settings: prediction endpoint, location catalog and input mode.
//!
//! Settings come from built-in defaults, optionally overlaid by a TOML file.
//! Command-line flags are applied on top by the binary.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, Result};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILE: &str = "homeprice.log";

const DEFAULT_LOCATIONS: &[&str] = &[
    "Whitefield", "Sarjapur", "Electronic City", "MG Road", "Koramangala",
    "Indira Nagar", "Jayanagar", "Hebbal", "Rajaji Nagar", "Yelahanka",
    "Bannerghatta Road", "HSR Layout", "Marathahalli", "Kengeri", "Bellandur",
    "BTM Layout", "Banashankari", "KR Puram", "Hennur Road", "Old Airport Road",
    "Basavanagudi", "Malleshwaram", "Kaggadasapura", "Begur Road", "Devanahalli",
    "Electronic City Phase II", "Raja Rajeshwari Nagar", "Kothanur", "Varthur",
    "Uttarahalli", "Arekere", "Kanakpura Road", "Ramamurthy Nagar",
    "Sahakara Nagar", "Chikkabanavar", "Kalena Agrahara", "Domlur", "Cox Town",
    "Hoodi", "Nagarbhavi", "Yeshwanthpur", "Mahadevpura", "Thigalarapalya",
    "Bommanahalli", "Sonnenahalli", "Kudlu Gate", "Hulimavu", "Ejipura",
    "JP Nagar", "Wilson Garden", "Frazer Town", "Harlur", "RT Nagar",
    "CV Raman Nagar", "Sadashivanagar", "Sanjay Nagar", "Basaveshwara Nagar",
    "Jakkur", "Bommasandra", "Thanisandra", "Chandra Layout", "Vijayanagar",
    "Hosa Road", "Narayana Nagar", "Brookefield", "HRBR Layout", "Ulsoor",
    "Richmond Town", "Somasundara Palya",
];

/// Ordered set of valid location names. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    names: Vec<String>,
}

impl Catalog {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(AppError::Config("location catalog is empty".into()));
        }
        let mut seen = HashSet::new();
        for name in &names {
            if name.trim().is_empty() {
                return Err(AppError::Config("location catalog contains a blank name".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(AppError::Config(format!("duplicate location \"{}\"", name)));
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            names: DEFAULT_LOCATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// How the location field accepts input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LocationMode {
    /// Free text with filtered suggestions, checked against the catalog on submit.
    #[default]
    ValidatedAutocomplete,
    /// Pick from the full catalog only; typing is ignored.
    ClosedSelect,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub request_timeout: Duration,
    pub location_mode: LocationMode,
    pub log_file: PathBuf,
    pub catalog: Arc<Catalog>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            location_mode: LocationMode::default(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            catalog: Arc::new(Catalog::default()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    location_mode: Option<LocationMode>,
    log_file: Option<PathBuf>,
    locations: Option<Vec<String>>,
}

impl Settings {
    /// Defaults, overlaid with `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&text)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let file: SettingsFile =
            toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))?;
        let mut settings = Self::default();
        if let Some(url) = file.api_url {
            settings.set_api_url(&url)?;
        }
        if let Some(secs) = file.request_timeout_secs {
            if secs == 0 {
                return Err(AppError::Config("request_timeout_secs must be positive".into()));
            }
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(mode) = file.location_mode {
            settings.location_mode = mode;
        }
        if let Some(log_file) = file.log_file {
            settings.log_file = log_file;
        }
        if let Some(locations) = file.locations {
            settings.catalog = Arc::new(Catalog::new(locations)?);
        }
        Ok(settings)
    }

    pub fn set_api_url(&mut self, url: &str) -> Result<()> {
        let trimmed = url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(AppError::Config(format!("api_url must be an http(s) URL, got \"{}\"", url)));
        }
        self.api_url = trimmed.to_string();
        Ok(())
    }

    pub fn predict_endpoint(&self) -> String {
        format!("{}/predict", self.api_url)
    }
}
