//! Business logic behind the HTTP handlers.
//!
//! - [`lifecycle`]: creating requests, quoting, declining and accepting.
//! - [`billing`]: pricing a quote.
//! - [`views`]: dashboard reads.
//! - [`accounts`]: signup, login and the pharmacy directory.

pub mod accounts;
pub mod billing;
pub mod lifecycle;
pub mod views;
