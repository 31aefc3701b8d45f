pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod export;
pub mod extract;
pub mod order;
pub mod pipeline;
pub mod query;
pub mod reconcile;
pub mod sanitize;

pub use config::{load_config, load_config_or_default, Config};
pub use credentials::{resolve_api_key, save_api_key, CredentialError};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, DelfinError, Result};
pub use export::{export, export_file_name, write_export, ExportError};
pub use extract::{
    example_order, CapturedImage, ExtractionError, GeminiClient, GeminiConfig, InferenceClient,
    OrderExtractor,
};
pub use order::{NewOrder, OrderRecord, OrderStatus};
pub use pipeline::{
    CapturePipeline, CaptureState, CommitOutcome, NoopNotifier, Notifier, OrderBook,
    PipelineConfig, PipelineError, Review, Severity,
};
pub use query::{search, stats, OrderStats, StatusFilter};
pub use reconcile::{find_collision, reconcile, reconcile_with, ReplaceDecision, Resolution};
