pub mod book;
pub mod config;
pub mod context;
pub mod error;
pub mod notify;
pub mod runner;

pub use book::OrderBook;
pub use config::PipelineConfig;
pub use context::{CaptureSession, CaptureState, CommitOutcome, Review};
pub use error::PipelineError;
pub use notify::{NoopNotifier, Notifier, Severity};
pub use runner::CapturePipeline;
