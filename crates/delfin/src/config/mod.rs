pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, load_config_or_default, API_KEY_ENV};
pub use schema::{default_config_path, Config, DEFAULT_ENDPOINT, DEFAULT_MODEL};
