pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod scrape;
pub mod state;
pub mod torznab;
