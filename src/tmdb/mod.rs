pub mod client;
pub mod enrich;
pub mod error;
pub mod types;

pub use client::{DiscoverFilter, TmdbClient};
pub use enrich::{enrich, fetch_with_retry, DetailSource, EnrichOptions, RetryPolicy};
pub use error::{TmdbError, TmdbResult};
pub use types::*;
