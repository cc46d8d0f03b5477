pub mod config;
pub mod content;
pub mod error;
pub mod feed;
pub mod publish;
pub mod scheduler;
pub mod storage;
pub mod summary;

pub use config::{AppConfig, FailurePolicy};
pub use error::{Error, Result};
