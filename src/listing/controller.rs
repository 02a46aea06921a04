use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, ListingResult};
use crate::tmdb::DiscoverFilter;
use super::query_state::QueryState;

pub const FAILED_MESSAGE: &str = "Failed to load movies.";

/// Which upstream listing a [`QueryState`] is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingMode {
    Search { query: String },
    Discover(DiscoverFilter),
    Popular,
}

impl ListingMode {
    /// A search query beats filters, filters beat the popular listing.
    pub fn select(state: &QueryState) -> Self {
        if let Some(query) = state.search_query() {
            return ListingMode::Search {
                query: query.to_string(),
            };
        }
        if state.has_filters() {
            return ListingMode::Discover(DiscoverFilter {
                genre: state.genre,
                year_from: Some(state.year_from),
                year_to: Some(state.year_to),
            });
        }
        ListingMode::Popular
    }

    pub fn name(&self) -> &'static str {
        match self {
            ListingMode::Search { .. } => "search",
            ListingMode::Discover(_) => "discover",
            ListingMode::Popular => "popular",
        }
    }
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listing(
        &self,
        mode: &ListingMode,
        page: u32,
    ) -> Result<ListingResult, CatalogError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ListingState {
    Idle,
    Loading {
        generation: u64,
        query: QueryState,
    },
    Success {
        generation: u64,
        query: QueryState,
        result: ListingResult,
    },
    Failed {
        generation: u64,
        query: QueryState,
        message: String,
    },
}

impl ListingState {
    pub fn generation(&self) -> u64 {
        match self {
            ListingState::Idle => 0,
            ListingState::Loading { generation, .. }
            | ListingState::Success { generation, .. }
            | ListingState::Failed { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("Listing request {generation} was superseded by a newer one")]
    Superseded { generation: u64 },
    #[error("Failed to load movies: {0}")]
    Failed(#[from] CatalogError),
}

/// Owns the displayed listing. Every [`load`](Self::load) takes a new
/// generation token; only the newest token may change the state.
pub struct ListingController {
    source: Arc<dyn ListingSource>,
    generation: AtomicU64,
    state: ArcSwap<ListingState>,
}

impl ListingController {
    pub fn new(source: Arc<dyn ListingSource>) -> Self {
        Self {
            source,
            generation: AtomicU64::new(0),
            state: ArcSwap::from_pointee(ListingState::Idle),
        }
    }

    pub fn state(&self) -> Arc<ListingState> {
        self.state.load_full()
    }

    pub async fn load(&self, query: QueryState) -> Result<ListingResult, ListingError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(
            generation,
            ListingState::Loading {
                generation,
                query: query.clone(),
            },
        );

        let mode = ListingMode::select(&query);
        debug!(generation, mode = mode.name(), page = query.page, "Loading listing");

        let outcome = self.source.fetch_listing(&mode, query.page).await;

        let next = match &outcome {
            Ok(result) => ListingState::Success {
                generation,
                query,
                result: result.clone(),
            },
            Err(e) => {
                warn!(generation, mode = mode.name(), error = %e, "Listing failed");
                ListingState::Failed {
                    generation,
                    query,
                    message: FAILED_MESSAGE.to_string(),
                }
            }
        };

        if !self.transition(generation, next) {
            info!(generation, "Discarding superseded listing result");
            return Err(ListingError::Superseded { generation });
        }

        outcome.map_err(ListingError::Failed)
    }

    /// Store `next` if `generation` is still the newest token. Returns whether
    /// the state was updated.
    fn transition(&self, generation: u64, next: ListingState) -> bool {
        let next = Arc::new(next);
        let mut applied = false;

        self.state.rcu(|current| {
            applied = current.generation() <= generation
                && self.generation.load(Ordering::SeqCst) == generation;
            if applied {
                Arc::clone(&next)
            } else {
                Arc::clone(current)
            }
        });

        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Movie;
    use crate::tmdb::TmdbError;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Answers with one movie whose title names the mode. A search for
    /// "slow" signals `entered` and then holds until `release`; searches for
    /// "broken" fail.
    #[derive(Default)]
    struct StubSource {
        calls: Mutex<Vec<(ListingMode, u32)>>,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ListingSource for StubSource {
        async fn fetch_listing(
            &self,
            mode: &ListingMode,
            page: u32,
        ) -> Result<ListingResult, CatalogError> {
            self.calls.lock().unwrap().push((mode.clone(), page));

            if let ListingMode::Search { query } = mode {
                if query == "slow" {
                    self.entered.notify_one();
                    self.release.notified().await;
                }
                if query == "broken" {
                    return Err(CatalogError::Tmdb(TmdbError::Upstream(503)));
                }
            }

            Ok(ListingResult {
                movies: vec![Movie {
                    id: page as u64,
                    title: mode.name().to_string(),
                    year: 2000,
                    runtime: Some(100),
                    rating: 7.0,
                    genre: String::new(),
                    poster: String::new(),
                    overview: String::new(),
                }],
                total_pages: 1,
            })
        }
    }

    fn controller() -> (Arc<StubSource>, ListingController) {
        let source = Arc::new(StubSource::default());
        let controller = ListingController::new(source.clone());
        (source, controller)
    }

    #[test]
    fn test_mode_selection() {
        let search = ListingMode::select(&QueryState::from_url("query=batman"));
        assert_eq!(
            search,
            ListingMode::Search {
                query: "batman".to_string()
            }
        );

        let discover = ListingMode::select(&QueryState::from_url("genre=28"));
        assert_eq!(
            discover,
            ListingMode::Discover(DiscoverFilter {
                genre: Some(28),
                year_from: Some(1970),
                year_to: Some(2025),
            })
        );

        assert_eq!(ListingMode::select(&QueryState::from_url("")), ListingMode::Popular);
        assert_eq!(
            ListingMode::select(&QueryState::from_url("query=batman&genre=28")).name(),
            "search"
        );
        assert_eq!(
            ListingMode::select(&QueryState::from_url("yearTo=1999")).name(),
            "discover"
        );
    }

    #[tokio::test]
    async fn test_success_state() {
        let (source, controller) = controller();
        assert_eq!(*controller.state(), ListingState::Idle);

        let result = controller.load(QueryState::from_url("page=4")).await.unwrap();
        assert_eq!(result.movies[0].title, "popular");

        match &*controller.state() {
            ListingState::Success { generation, query, result } => {
                assert_eq!(*generation, 1);
                assert_eq!(query.page, 4);
                assert_eq!(result.movies[0].id, 4);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(source.calls.lock().unwrap()[0], (ListingMode::Popular, 4));
    }

    #[tokio::test]
    async fn test_failure_state() {
        let (_, controller) = controller();
        let err = controller
            .load(QueryState::from_url("query=broken"))
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::Failed(_)));

        match &*controller.state() {
            ListingState::Failed { message, .. } => assert_eq!(message, FAILED_MESSAGE),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stale_result_is_discarded() {
        let (source, controller) = controller();

        let (first, second) = tokio::join!(
            controller.load(QueryState::from_url("query=slow")),
            async {
                source.entered.notified().await;
                let second = controller.load(QueryState::from_url("genre=28")).await;
                source.release.notify_one();
                second
            }
        );

        assert!(matches!(first, Err(ListingError::Superseded { generation: 1 })));
        assert_eq!(second.unwrap().movies[0].title, "discover");

        match &*controller.state() {
            ListingState::Success { generation, result, .. } => {
                assert_eq!(*generation, 2);
                assert_eq!(result.movies[0].title, "discover");
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_loading_state_while_in_flight() {
        let (source, controller) = controller();

        let (_, observed) = tokio::join!(
            controller.load(QueryState::from_url("query=slow")),
            async {
                source.entered.notified().await;
                let observed = controller.state();
                source.release.notify_one();
                observed
            }
        );

        assert!(matches!(&*observed, ListingState::Loading { generation: 1, .. }));
    }
}
