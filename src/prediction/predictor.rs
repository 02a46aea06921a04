use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PredictorConfig;

/// Feature payload understood by the rating model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFeatures {
    pub year: i32,
    pub runtime: u32,
    pub genre: String,
}

impl PredictionFeatures {
    pub fn validate(&self) -> Result<(), PredictionError> {
        if !(1900..=2030).contains(&self.year) {
            return Err(PredictionError::Validation(format!(
                "year must be between 1900 and 2030, got {}",
                self.year
            )));
        }
        if self.runtime == 0 {
            return Err(PredictionError::Validation(
                "runtime must be greater than zero".to_string(),
            ));
        }
        if self.genre.trim().is_empty() {
            return Err(PredictionError::Validation("genre is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(rename = "predictedRating")]
    predicted_rating: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Prediction endpoint not configured")]
    NotConfigured,
    #[error("Prediction API error: {0}")]
    Status(u16),
    #[error("Invalid prediction request: {0}")]
    Validation(String),
    #[error("Prediction transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid prediction response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct PredictionClient {
    http: reqwest::Client,
    url: Option<String>,
}

impl PredictionClient {
    pub fn new(config: &PredictorConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        if config.url.is_none() {
            warn!("No prediction endpoint configured, predictions are disabled");
        }
        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }

    pub async fn predict(&self, features: &PredictionFeatures) -> Result<f64, PredictionError> {
        features.validate()?;
        let url = self.url.as_deref().ok_or(PredictionError::NotConfigured)?;

        debug!(year = features.year, runtime = features.runtime, genre = %features.genre, "Requesting rating prediction");

        let response = self.http.post(url).json(features).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Prediction endpoint returned error status");
            return Err(PredictionError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let prediction: PredictResponse = serde_json::from_slice(&body)?;
        Ok(prediction.predicted_rating)
    }
}
