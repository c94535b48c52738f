pub mod config;
pub mod error;
pub mod value;

pub use config::{BatchConfig, CONFIG_ENV_VAR, Config, DEFAULT_BATCH_LIMIT, HydrationConfig};
pub use error::{Error, ErrorKind, Result, StoreError};
pub use value::AnyValue;
