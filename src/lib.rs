pub mod config;
pub mod error;
pub mod fake_predictor;
pub mod http_cache;
pub mod http_client;
pub mod model;
pub mod predictor;
pub mod reconcile;
pub mod review;
pub mod review_export;
pub mod schedule;
pub mod state;
pub mod worker;
