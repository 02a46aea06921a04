use serde::{Deserialize, Serialize};

use crate::catalog::Movie;
use crate::tmdb::Genre;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenresResponse {
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub movies: Vec<Movie>,
    pub total_pages: u32,
    pub page: u32,
    pub mode: String,
    /// Canonical query string for the listing, for deep links.
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub title: String,
    pub year: i32,
    pub runtime: u32,
    /// Genre id or name.
    pub genre: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub title: String,
    pub predicted_rating: f64,
    pub analysis: String,
    pub confidence: String,
}
