pub mod controller;
pub mod query_state;

pub use controller::{ListingController, ListingError, ListingMode, ListingSource, ListingState};
pub use query_state::QueryState;
