pub mod logging;

pub use logging::{config_from_env, init_default, init_from_env, init_logging, LoggingConfig};
