pub mod api;
pub mod catalog;
pub mod consumer;
pub mod error;
pub mod ingestion;
pub mod models;
pub mod processing;
pub mod schema;
pub mod store;
pub mod translator;
