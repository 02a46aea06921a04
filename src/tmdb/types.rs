use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// TMDB refuses to page past this point.
pub const MAX_TOTAL_PAGES: u32 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreList {
    #[serde(default)]
    pub genres: Vec<Genre>,
}

/// A movie as it appears in popular/search/discover listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<MovieSummary>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

impl ListingPage {
    pub fn clamped_total_pages(&self) -> u32 {
        self.total_pages.min(MAX_TOTAL_PAGES)
    }
}

/// Per-movie detail, fetched with the watch providers appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MovieDetail {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub runtime: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(rename = "watch/providers", default, deserialize_with = "null_as_default")]
    pub watch_providers: WatchProviders,
}

impl MovieDetail {
    /// What a movie degrades to when its detail cannot be fetched.
    pub fn fallback(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WatchProviders {
    #[serde(default)]
    pub results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RegionProviders {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<Provider>,
    #[serde(default)]
    pub rent: Vec<Provider>,
    #[serde(default)]
    pub buy: Vec<Provider>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
}

fn first_page() -> u32 {
    1
}

/// TMDB sends explicit nulls for fields it has no value for.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_page_clamps_total_pages() {
        let page: ListingPage =
            serde_json::from_str(r#"{"page":3,"results":[],"total_pages":41234,"total_results":9}"#)
                .unwrap();
        assert_eq!(page.total_pages, 41234);
        assert_eq!(page.clamped_total_pages(), 500);

        let small: ListingPage = serde_json::from_str(r#"{"total_pages":12}"#).unwrap();
        assert_eq!(small.page, 1);
        assert_eq!(small.clamped_total_pages(), 12);
    }

    #[test]
    fn test_summary_tolerates_nulls() {
        let movie: MovieSummary = serde_json::from_str(
            r#"{"id":7,"title":null,"release_date":null,"vote_average":null,"genre_ids":null,"poster_path":null,"overview":null}"#,
        )
        .unwrap();
        assert_eq!(movie.id, 7);
        assert_eq!(movie.title, "");
        assert!(movie.genre_ids.is_empty());
        assert!(movie.poster_path.is_none());
    }

    #[test]
    fn test_detail_with_watch_providers() {
        let detail: MovieDetail = serde_json::from_str(
            r#"{
                "id": 550,
                "title": "Fight Club",
                "runtime": null,
                "genres": [{"id": 18, "name": "Drama"}],
                "watch/providers": {
                    "results": {
                        "US": {
                            "link": "https://www.themoviedb.org/movie/550/watch",
                            "flatrate": [{"provider_id": 8, "provider_name": "Netflix", "logo_path": "/n.jpg"}]
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(detail.runtime, 0);
        assert_eq!(detail.genres[0].name, "Drama");
        let us = &detail.watch_providers.results["US"];
        assert_eq!(us.flatrate[0].provider_id, 8);
        assert!(us.rent.is_empty());
    }

    #[test]
    fn test_fallback_detail() {
        let detail = MovieDetail::fallback(42);
        assert_eq!(detail.id, 42);
        assert_eq!(detail.runtime, 0);
        assert!(detail.watch_providers.results.is_empty());
    }
}
