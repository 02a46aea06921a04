use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::TmdbConfig;
use super::enrich::DetailSource;
use super::error::{TmdbError, TmdbResult};
use super::types::{Genre, GenreList, ListingPage, MovieDetail};

/// Filters accepted by the discover endpoint. `None` means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverFilter {
    pub genre: Option<u32>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
}

impl DiscoverFilter {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("sort_by", "popularity.desc".to_string())];
        if let Some(genre) = self.genre {
            params.push(("with_genres", genre.to_string()));
        }
        if let Some(year) = self.year_from {
            params.push(("primary_release_date.gte", format!("{}-01-01", year)));
        }
        if let Some(year) = self.year_to {
            params.push(("primary_release_date.lte", format!("{}-12-31", year)));
        }
        params
    }
}

pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    listings: Option<Cache<String, ListingPage>>,
    details: Option<Cache<u64, MovieDetail>>,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> TmdbResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        if config.api_key.is_none() {
            warn!("No TMDB API key configured, upstream requests will be rejected");
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            language: config.language.clone(),
            listings: response_cache(config.listing_ttl(), config.cache_capacity),
            details: response_cache(config.detail_ttl(), config.cache_capacity),
        })
    }

    pub async fn genres(&self) -> TmdbResult<Vec<Genre>> {
        let list: GenreList = self.get("/genre/movie/list", &[]).await?;
        Ok(list.genres)
    }

    pub async fn popular(&self, page: u32) -> TmdbResult<ListingPage> {
        self.listing("/movie/popular", vec![("page", page.to_string())])
            .await
    }

    pub async fn search(&self, query: &str, page: u32) -> TmdbResult<ListingPage> {
        self.listing(
            "/search/movie",
            vec![("query", query.to_string()), ("page", page.to_string())],
        )
        .await
    }

    pub async fn discover(&self, filter: &DiscoverFilter, page: u32) -> TmdbResult<ListingPage> {
        let mut params = filter.params();
        params.push(("page", page.to_string()));
        self.listing("/discover/movie", params).await
    }

    pub async fn movie_detail(&self, id: u64) -> TmdbResult<MovieDetail> {
        if let Some(detail) = cached(&self.details, &id).await {
            return Ok(detail);
        }

        let path = format!("/movie/{}", id);
        let detail: MovieDetail = self
            .get(&path, &[("append_to_response", "watch/providers".to_string())])
            .await?;

        if let Some(ref details) = self.details {
            details.insert(id, detail.clone()).await;
        }
        Ok(detail)
    }

    async fn listing(
        &self,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> TmdbResult<ListingPage> {
        let key = cache_key(path, &params);
        if let Some(page) = cached(&self.listings, &key).await {
            debug!(key = %key, "TMDB listing cache hit");
            return Ok(page);
        }

        let page: ListingPage = self.get(path, &params).await?;
        if let Some(ref listings) = self.listings {
            listings.insert(key, page.clone()).await;
        }
        Ok(page)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> TmdbResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(path = %path, "TMDB request");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            warn!(path = %path, retry_after = ?retry_after, "TMDB rate limited request");
            return Err(TmdbError::RateLimited { retry_after });
        }

        if !status.is_success() {
            warn!(path = %path, status = status.as_u16(), "TMDB returned error status");
            return Err(TmdbError::Upstream(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl DetailSource for TmdbClient {
    async fn movie_detail(&self, id: u64) -> TmdbResult<MovieDetail> {
        TmdbClient::movie_detail(self, id).await
    }
}

/// A zero TTL turns the cache off.
fn response_cache<K, V>(ttl: Duration, capacity: u64) -> Option<Cache<K, V>>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    (!ttl.is_zero()).then(|| {
        Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build()
    })
}

async fn cached<K, V>(cache: &Option<Cache<K, V>>, key: &K) -> Option<V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    match cache {
        Some(cache) => cache.get(key).await,
        None => None,
    }
}

fn cache_key(path: &str, params: &[(&'static str, String)]) -> String {
    let mut key = path.to_string();
    for (name, value) in params {
        key.push('|');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_params() {
        let filter = DiscoverFilter {
            genre: Some(28),
            year_from: Some(1990),
            year_to: Some(1999),
        };
        let params = filter.params();
        assert!(params.contains(&("with_genres", "28".to_string())));
        assert!(params.contains(&("primary_release_date.gte", "1990-01-01".to_string())));
        assert!(params.contains(&("primary_release_date.lte", "1999-12-31".to_string())));

        let params = DiscoverFilter::default().params();
        assert_eq!(params, vec![("sort_by", "popularity.desc".to_string())]);
    }

    #[test]
    fn test_cache_key_distinguishes_params() {
        let a = cache_key("/search/movie", &[("query", "alien".to_string()), ("page", "1".to_string())]);
        let b = cache_key("/search/movie", &[("query", "alien".to_string()), ("page", "2".to_string())]);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_response_cache_is_bounded() {
        let cache = response_cache::<String, u32>(Duration::from_secs(3600), 100).unwrap();
        for n in 0..2_000u32 {
            cache.insert(format!("/search/movie|query=q{}", n), n).await;
        }
        cache.run_pending_tasks().await;
        assert!(cache.entry_count() <= 100);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache = response_cache::<u64, MovieDetail>(Duration::ZERO, 100);
        assert!(cache.is_none());
        assert_eq!(cached(&cache, &603).await, None);

        let cache = response_cache::<u64, u32>(Duration::from_secs(60), 100);
        cache.as_ref().unwrap().insert(603, 136).await;
        assert_eq!(cached(&cache, &603).await, Some(136));
    }
}
