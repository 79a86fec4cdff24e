//! CLI command handlers.
//!
//! Each submodule handles a top-level command variant from [`crate::cli::Commands`].

// These modules contain CLI command handlers, not public library API.
#[allow(clippy::missing_errors_doc)]
pub mod alias;
#[allow(clippy::missing_errors_doc)]
pub mod request;
#[allow(clippy::missing_errors_doc)]
pub mod service;
