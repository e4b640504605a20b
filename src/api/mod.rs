//! API layer
//!
//! HTTP handlers for:
//! - Dashboard pages
//! - Contact form
//! - Marketing pages and the shared layout
//! - Metrics (Prometheus)

mod contact;
mod dashboard;
pub mod flash;
pub mod metrics;
pub mod pages;

pub use contact::contact_router;
pub use dashboard::{dashboard_router, header_order};
pub use metrics::{metrics_router, track_requests};
pub use pages::{error_page, pages_router};
