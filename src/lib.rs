pub mod cli;
pub mod config;
pub mod constants;
pub mod duration;
pub mod engine;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod invocation;
pub mod logging;
pub mod output;
pub mod params;
pub mod resilience;
pub mod store;
