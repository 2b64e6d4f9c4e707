//! skywatch - current weather and forecasts with an offline cache
//!
//! Every remote resource goes through [`cache::CachedFetcher`], which serves
//! fresh cached data, fetches when the network is reachable, and falls back
//! to stale data when a fetch fails.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod data;
pub mod locations;
pub mod logging;
pub mod service;
pub mod settings;
pub mod ui;
