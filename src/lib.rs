pub mod api;
pub mod config;
pub mod extractor;
pub mod pipeline;
pub mod presenter;
pub mod schema;
pub mod store;
