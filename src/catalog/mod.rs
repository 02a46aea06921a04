//! Movie listings as the UI sees them.
//!
//! [`Catalog`] wraps the TMDB client: it keeps the genre table for the life of
//! the process, enriches every listing with runtimes before returning it, and
//! converts raw records into display [`Movie`]s.

pub mod genres;
pub mod movie;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::TmdbConfig;
use crate::listing::{ListingMode, ListingSource};
use crate::tmdb::{
    enrich, DiscoverFilter, EnrichOptions, ListingPage, MovieDetail, RetryPolicy, TmdbClient,
    TmdbError,
};

pub use genres::GenreTable;
pub use movie::{
    format_detail, format_movie, release_year, ImageUrls, ListingResult, Movie, MovieDetailView,
    ProviderView, WatchAvailability, POSTER_PLACEHOLDER,
};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Tmdb(#[from] TmdbError),
}

pub struct Catalog {
    tmdb: TmdbClient,
    genres: OnceCell<GenreTable>,
    images: ImageUrls,
    enrich: EnrichOptions,
    region: String,
}

impl Catalog {
    pub fn new(config: &TmdbConfig) -> Result<Self, TmdbError> {
        let enrich = EnrichOptions {
            batch_size: config.batch_size,
            batch_delay: config.batch_delay(),
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                ..Default::default()
            },
        };

        Ok(Self {
            tmdb: TmdbClient::new(config)?,
            genres: OnceCell::new(),
            images: ImageUrls::new(&config.image_base_url),
            enrich,
            region: config.region.clone(),
        })
    }

    pub fn tmdb(&self) -> &TmdbClient {
        &self.tmdb
    }

    /// The genre table, loaded on first use. A failed load is not cached.
    pub async fn genre_table(&self) -> Result<&GenreTable, TmdbError> {
        self.genres
            .get_or_try_init(|| async {
                let genres = self.tmdb.genres().await?;
                info!(count = genres.len(), "Loaded genre list");
                Ok::<_, TmdbError>(GenreTable::new(genres))
            })
            .await
    }

    pub async fn popular(&self, page: u32) -> Result<ListingResult, CatalogError> {
        let listing = self.tmdb.popular(page).await?;
        Ok(self.finish(listing).await)
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<ListingResult, CatalogError> {
        if query.trim().is_empty() {
            return Err(CatalogError::Validation(
                "Query parameter is required".to_string(),
            ));
        }
        let listing = self.tmdb.search(query, page).await?;
        Ok(self.finish(listing).await)
    }

    pub async fn discover(
        &self,
        filter: &DiscoverFilter,
        page: u32,
    ) -> Result<ListingResult, CatalogError> {
        let listing = self.tmdb.discover(filter, page).await?;
        Ok(self.finish(listing).await)
    }

    pub async fn detail(&self, id: u64) -> Result<MovieDetailView, CatalogError> {
        let detail: MovieDetail = self.tmdb.movie_detail(id).await?;
        Ok(format_detail(&detail, &self.images, &self.region))
    }

    /// Attach runtimes and convert to display movies. Runs after every
    /// successful listing call so callers never see un-enriched results.
    async fn finish(&self, listing: ListingPage) -> ListingResult {
        let empty = GenreTable::default();
        let genres = match self.genre_table().await {
            Ok(genres) => genres,
            Err(e) => {
                warn!(error = %e, "Genre list unavailable, leaving genres blank");
                &empty
            }
        };

        let ids: Vec<u64> = listing.results.iter().map(|m| m.id).collect();
        let details = enrich(&self.tmdb, &ids, &self.enrich).await;

        let movies = listing
            .results
            .iter()
            .zip(details.iter())
            .map(|(summary, detail)| {
                format_movie(summary, genres, &self.images, Some(detail.runtime))
            })
            .collect();

        ListingResult {
            movies,
            total_pages: listing.clamped_total_pages(),
        }
    }
}

#[async_trait]
impl ListingSource for Catalog {
    async fn fetch_listing(
        &self,
        mode: &ListingMode,
        page: u32,
    ) -> Result<ListingResult, CatalogError> {
        match mode {
            ListingMode::Search { query } => self.search(query, page).await,
            ListingMode::Discover(filter) => self.discover(filter, page).await,
            ListingMode::Popular => self.popular(page).await,
        }
    }
}
