//! Data layer module
//!
//! Everything that talks to the hosted table API:
//! - Row and payload models
//! - PostgREST query construction
//! - Repository traits and the REST implementation

mod models;
pub mod query;
mod rest;
mod store;

pub use models::*;
pub use rest::RestClient;
pub use store::{ContactRepository, NewsRepository, ProfileRepository};

#[cfg(test)]
pub use store::{MockContactRepository, MockNewsRepository, MockProfileRepository};
