//! Pharmacy bid marketplace backend.
//!
//! Customers shop medicine requests to several pharmacies, pharmacies answer
//! with priced bills, and the customer accepts one of them.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod services;
pub mod state;
pub mod utils;

pub use handlers::router;
pub use state::AppState;
