pub mod annotate;
pub mod batch;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod labels;
pub mod persist;
pub mod phash;
pub mod progress;
pub mod storage;
pub mod vision;

pub use config::AppConfig;
pub use engine::{RunSummary, TaggingEngine};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
