// Package model provides basket, request and response models and related functionality.

pub mod basket;
pub mod request;
pub mod response;
pub mod stats;


// Re-export main types
pub use basket::{BasketConfig, BasketNamesPage, BasketNamesQueryPage, RequestsPage, RequestsQueryPage};
pub use request::{Headers, RequestRecord};
pub use response::ResponseSpec;
pub use stats::{BasketInfo, DatabaseStats};
