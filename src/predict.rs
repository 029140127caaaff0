//! Wire types and client for the external price prediction service.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info};

use crate::config::{Catalog, Settings};
use crate::error::{AppError, Result};
use crate::loan::check_price;

pub const BATH_OPTIONS: [u8; 5] = [1, 2, 3, 4, 5];
pub const BALCONY_OPTIONS: [u8; 4] = [0, 1, 2, 3];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    pub total_sqft: f64,
    pub bath: u8,
    pub balcony: u8,
    pub price_per_sqft: f64,
    pub location: String,
}

impl PredictionRequest {
    /// Field checks first, then catalog membership.
    pub fn validate(&self, catalog: &Catalog) -> Result<()> {
        check_amount("Total Sqft", self.total_sqft)?;
        check_amount("Price Per Sqft", self.price_per_sqft)?;
        if !BATH_OPTIONS.contains(&self.bath) {
            return Err(AppError::InvalidField {
                field: "Bathrooms",
                reason: format!("must be one of {:?}", BATH_OPTIONS),
            });
        }
        if !BALCONY_OPTIONS.contains(&self.balcony) {
            return Err(AppError::InvalidField {
                field: "Balcony",
                reason: format!("must be one of {:?}", BALCONY_OPTIONS),
            });
        }
        if !catalog.contains(&self.location) {
            return Err(AppError::UnknownLocation(self.location.clone()));
        }
        Ok(())
    }
}

fn check_amount(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::InvalidField {
            field,
            reason: "must be a non-negative number".into(),
        });
    }
    Ok(())
}

/// One feature's contribution to the predicted price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawContribution")]
pub struct ShapContribution {
    pub feature: String,
    pub contribution: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawContribution {
    Pair(String, f64),
    Named {
        feature: String,
        #[serde(alias = "value", alias = "shap_value")]
        contribution: f64,
    },
}

impl From<RawContribution> for ShapContribution {
    fn from(raw: RawContribution) -> Self {
        match raw {
            RawContribution::Pair(feature, contribution)
            | RawContribution::Named { feature, contribution } => Self { feature, contribution },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_price_lakhs: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub shap_values: Vec<ShapContribution>,
}

// Absent and `null` both mean "no contributions".
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<ShapContribution>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ShapContribution>>::deserialize(deserializer)?.unwrap_or_default())
}

impl PredictionResult {
    /// Contributions ordered by absolute size, largest first.
    pub fn top_contributions(&self, limit: usize) -> Vec<&ShapContribution> {
        let mut sorted: Vec<&ShapContribution> = self.shap_values.iter().collect();
        sorted.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        sorted.truncate(limit);
        sorted
    }
}

pub trait PredictionService {
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult>;
}

pub struct HttpPredictor {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpPredictor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.predict_endpoint(), settings.request_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PredictionService for HttpPredictor {
    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        info!(endpoint = %self.endpoint, location = %request.location, "requesting prediction");
        let resp = self.client.post(&self.endpoint).json(request).send().map_err(|e| {
            error!(error = %e, "prediction request failed");
            AppError::Http(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "prediction service returned an error status");
            return Err(AppError::Status(status.as_u16()));
        }

        let result = resp.json::<PredictionResult>().map_err(|e| {
            error!(error = %e, "could not decode prediction response");
            AppError::Http(e)
        })?;
        check_price(result.predicted_price_lakhs).map_err(|e| {
            error!(
                price_lakhs = result.predicted_price_lakhs,
                "prediction service returned an unusable price"
            );
            e
        })?;
        info!(price_lakhs = result.predicted_price_lakhs, "prediction received");
        Ok(result)
    }
}
