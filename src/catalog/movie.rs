use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::tmdb::{MovieDetail, MovieSummary, Provider, RegionProviders};
use super::genres::GenreTable;

pub const POSTER_PLACEHOLDER: &str = "/placeholder.svg?height=450&width=300";

/// A movie as handed to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    pub rating: f64,
    pub genre: String,
    pub poster: String,
    pub overview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResult {
    pub movies: Vec<Movie>,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetailView {
    pub id: u64,
    pub title: String,
    pub year: i32,
    pub runtime: u32,
    pub rating: f64,
    pub genres: Vec<String>,
    pub overview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    pub poster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop: Option<String>,
    pub watch: WatchAvailability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WatchAvailability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub subscription: Vec<ProviderView>,
    pub rent: Vec<ProviderView>,
    pub buy: Vec<ProviderView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderView {
    pub id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub homepage: String,
}

/// Builds image URLs against the TMDB image CDN.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base: String,
}

impl ImageUrls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn poster(&self, path: Option<&str>) -> String {
        match path.filter(|p| !p.is_empty()) {
            Some(path) => format!("{}/w500{}", self.base, path),
            None => POSTER_PLACEHOLDER.to_string(),
        }
    }

    pub fn original(&self, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|path| format!("{}/original{}", self.base, path))
    }
}

/// Year part of a TMDB `YYYY-MM-DD` date, 0 when unknown.
pub fn release_year(release_date: &str) -> i32 {
    if let Ok(date) = NaiveDate::parse_from_str(release_date, "%Y-%m-%d") {
        return date.year();
    }
    release_date
        .split('-')
        .next()
        .and_then(|year| year.trim().parse::<i32>().ok())
        .unwrap_or(0)
}

pub fn format_movie(
    summary: &MovieSummary,
    genres: &GenreTable,
    images: &ImageUrls,
    runtime: Option<u32>,
) -> Movie {
    Movie {
        id: summary.id,
        title: summary.title.clone(),
        year: release_year(&summary.release_date),
        runtime,
        rating: summary.vote_average,
        genre: genres.join_names(&summary.genre_ids),
        poster: images.poster(summary.poster_path.as_deref()),
        overview: summary.overview.clone(),
    }
}

pub fn format_detail(detail: &MovieDetail, images: &ImageUrls, region: &str) -> MovieDetailView {
    let watch = detail
        .watch_providers
        .results
        .get(region)
        .map(|providers| watch_availability(providers, images))
        .unwrap_or_default();

    MovieDetailView {
        id: detail.id,
        title: detail.title.clone(),
        year: release_year(&detail.release_date),
        runtime: detail.runtime,
        rating: detail.vote_average,
        genres: detail.genres.iter().map(|g| g.name.clone()).collect(),
        overview: detail.overview.clone(),
        tagline: detail.tagline.clone().filter(|t| !t.is_empty()),
        poster: images.poster(detail.poster_path.as_deref()),
        backdrop: images.original(detail.backdrop_path.as_deref()),
        watch,
    }
}

fn watch_availability(providers: &RegionProviders, images: &ImageUrls) -> WatchAvailability {
    let view = |list: &[Provider]| -> Vec<ProviderView> {
        list.iter()
            .map(|p| ProviderView {
                id: p.provider_id,
                name: p.provider_name.clone(),
                logo: images.original(p.logo_path.as_deref()),
                homepage: provider_homepage(p.provider_id).to_string(),
            })
            .collect()
    };

    WatchAvailability {
        link: providers.link.clone(),
        subscription: view(&providers.flatrate),
        rent: view(&providers.rent),
        buy: view(&providers.buy),
    }
}

pub fn provider_homepage(provider_id: u32) -> &'static str {
    match provider_id {
        8 => "https://www.netflix.com",
        15 => "https://www.hulu.com",
        337 => "https://www.disneyplus.com",
        119 => "https://www.amazon.com/prime",
        384 => "https://www.max.com",
        350 | 2 => "https://tv.apple.com",
        386 => "https://www.peacocktv.com",
        531 => "https://www.paramountplus.com",
        3 => "https://play.google.com/store",
        68 => "https://www.microsoft.com/en-us/store",
        279 => "https://www.youtube.com/movies",
        _ => "https://www.google.com/search?q=streaming%20service",
    }
}
