//! kobosync — client library for the Kobo data portal backend.
//!
//! Holds a local cache of projects, keeps each project's column
//! selection in step with the backend, exports submissions to CSV and
//! tracks when the next scheduled sync is due.

pub mod api;
pub mod config;
pub mod countdown;
pub mod errors;
pub mod export;
pub mod models;
pub mod projection;
pub mod session;
pub mod store;

pub use api::ApiClient;
pub use errors::{ClientError, Result};
pub use session::SessionContext;
pub use store::ProjectStore;
