//! Service layer
//!
//! Contains business logic separated from HTTP handlers.

mod news;
mod pagination;
mod relative_time;

pub use news::{FilterOptions, NewsService, normalize_filters};
pub use pagination::Pagination;
pub use relative_time::relative_time;
