use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::listing::ListingController;
use crate::prediction::{GeminiClient, PredictionClient, ProxyGenerator, TextGenerator};
use crate::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub listing: Arc<ListingController>,
    pub predictor: Arc<PredictionClient>,
    pub generator: Arc<dyn TextGenerator>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let catalog = Arc::new(Catalog::new(&config.tmdb)?);
        let listing = Arc::new(ListingController::new(catalog.clone()));
        let predictor = Arc::new(PredictionClient::new(&config.predictor)?);
        let generator: Arc<dyn TextGenerator> = match config.gemini.proxy_url {
            Some(ref url) => {
                info!(url = %url, "Commentary goes through remote proxy");
                Arc::new(ProxyGenerator::new(url.clone())?)
            }
            None => Arc::new(GeminiClient::new(&config.gemini)?),
        };

        Ok(Self {
            config: Arc::new(config),
            catalog,
            listing,
            predictor,
            generator,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let tmdb_routes = Router::new()
        .route("/api/tmdb/genres", get(crate::api::get_genres))
        .route("/api/tmdb/movies/popular", get(crate::api::tmdb_popular))
        .route("/api/tmdb/movies/search", get(crate::api::tmdb_search))
        .route("/api/tmdb/movies/discover", get(crate::api::tmdb_discover))
        .route(
            "/api/tmdb/movies/details/:id",
            get(crate::api::tmdb_movie_detail),
        );

    let app_routes = Router::new()
        .route("/api/movies", get(crate::api::list_movies))
        .route("/api/movies/state", get(crate::api::listing_state))
        .route("/api/movies/:id", get(crate::api::get_movie))
        .route("/api/ai-analysis", post(crate::api::ai_analysis))
        .route("/api/predict", post(crate::api::predict));

    let mut router = Router::new()
        .route("/health", get(crate::api::health))
        .merge(tmdb_routes)
        .merge(app_routes)
        .fallback(fallback_handler);

    if let Some(ref appdir) = state.config.appdir {
        router = router.fallback_service(ServeDir::new(appdir));
    }

    router
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback_handler(req: Request) -> impl IntoResponse {
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}
