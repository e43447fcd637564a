pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::create_store;
pub use error::{ConfigError, LookupError};
pub use service::{FeeMatrixResolver, FeePipeline, FeeSession};
