use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::catalog::MovieDetailView;
use crate::listing::{ListingMode, ListingState, QueryState};
use crate::prediction::{fetch_commentary, CommentaryError, CommentaryMode, PredictionFeatures};
use crate::server::AppState;
use crate::tmdb::{DiscoverFilter, ListingPage, MovieDetail};
use crate::util::QueryParams;
use super::error::ApiError;
use super::types::*;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn get_genres(State(state): State<AppState>) -> Result<Json<GenresResponse>, ApiError> {
    let genres = state.catalog.genre_table().await?;
    Ok(Json(GenresResponse {
        genres: genres.genres().to_vec(),
    }))
}

pub async fn tmdb_popular(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<ListingPage>, ApiError> {
    let page = page_param(&params);
    Ok(Json(state.catalog.tmdb().popular(page).await?))
}

pub async fn tmdb_search(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<ListingPage>, ApiError> {
    let query = params
        .get_non_empty("query")
        .ok_or_else(|| ApiError::Validation("Query parameter is required".to_string()))?;
    let page = page_param(&params);
    Ok(Json(state.catalog.tmdb().search(query, page).await?))
}

pub async fn tmdb_discover(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<ListingPage>, ApiError> {
    let filter = DiscoverFilter {
        genre: params
            .get_non_empty("genre")
            .filter(|g| *g != "all")
            .and_then(|g| g.parse().ok()),
        year_from: params.get("yearFrom").and_then(|y| y.parse().ok()),
        year_to: params.get("yearTo").and_then(|y| y.parse().ok()),
    };
    let page = page_param(&params);
    Ok(Json(state.catalog.tmdb().discover(&filter, page).await?))
}

pub async fn tmdb_movie_detail(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<MovieDetail>, ApiError> {
    Ok(Json(state.catalog.tmdb().movie_detail(id).await?))
}

/// The enriched listing for a query state, served through the listing
/// controller so only the newest request updates the displayed state.
pub async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<ListingResponse>, ApiError> {
    let query = QueryState::from_params(&params);
    let mode = ListingMode::select(&query);
    let canonical = query.to_url_params();
    let page = query.page;

    debug!(query = %canonical, mode = mode.name(), "Listing request");

    let result = state.listing.load(query).await?;

    Ok(Json(ListingResponse {
        movies: result.movies,
        total_pages: result.total_pages,
        page,
        mode: mode.name().to_string(),
        query: canonical,
    }))
}

pub async fn listing_state(State(state): State<AppState>) -> Json<ListingState> {
    Json(state.listing.state().as_ref().clone())
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<MovieDetailView>, ApiError> {
    Ok(Json(state.catalog.detail(id).await?))
}

/// Generative-text proxy: `{prompt, mode}` in, raw candidate envelope out.
pub async fn ai_analysis(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::Validation("Invalid JSON body".to_string()))?;

    let prompt = request.get("prompt").and_then(Value::as_str);
    let mode = request
        .get("mode")
        .and_then(Value::as_str)
        .and_then(|m| m.parse::<CommentaryMode>().ok());

    let (Some(prompt), Some(mode)) = (prompt, mode) else {
        return Err(ApiError::Validation(
            "Missing or invalid `prompt` / `mode`".to_string(),
        ));
    };

    match state.generator.generate(prompt, mode).await {
        Ok(envelope) => Ok(Json(envelope)),
        Err(e @ CommentaryError::MissingCredential) => Err(ApiError::Internal(e.to_string())),
        Err(CommentaryError::Upstream { body, .. }) => {
            Err(ApiError::Internal(format!("Google API error: {}", body)))
        }
        Err(e) => {
            debug!(error = %e, "Generative text call failed");
            Err(ApiError::Internal(
                "Internal server error calling Google API.".to_string(),
            ))
        }
    }
}

/// Predict a rating, then ask for analysis and confidence commentary.
pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let request: PredictRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("Invalid prediction request: {}", e)))?;

    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }

    let genre = resolve_genre_name(&state, &request.genre).await?;
    let features = PredictionFeatures {
        year: request.year,
        runtime: request.runtime,
        genre,
    };

    let rating = state.predictor.predict(&features).await?;
    info!(title = %title, rating, "Predicted rating");

    let generator = state.generator.as_ref();
    let (analysis, confidence) = tokio::join!(
        fetch_commentary(generator, CommentaryMode::Analysis, &title, rating),
        fetch_commentary(generator, CommentaryMode::Confidence, &title, rating),
    );

    Ok(Json(PredictResponse {
        title,
        predicted_rating: rating,
        analysis,
        confidence,
    }))
}

/// The model wants genre names; the UI may send TMDB genre ids.
async fn resolve_genre_name(state: &AppState, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    let is_id = value.parse::<u32>().is_ok();

    match state.catalog.genre_table().await {
        Ok(genres) => match genres.resolve(value) {
            Some(genre) => Ok(genre.name.clone()),
            None if is_id => Err(ApiError::Validation(format!("Unknown genre id {}", value))),
            None => Ok(value.to_string()),
        },
        Err(e) if is_id => Err(e.into()),
        Err(_) => Ok(value.to_string()),
    }
}

fn page_param(params: &QueryParams) -> u32 {
    params
        .get("page")
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}
