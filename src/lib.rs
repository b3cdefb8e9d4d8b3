pub mod analytics;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod models;
pub mod services;
