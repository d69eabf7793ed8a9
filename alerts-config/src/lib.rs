//! Configuration types and loading for the alerts services.
//!
//! Configuration is layered: a base file, an environment specific file and finally
//! `APP_`-prefixed environment variables. See [`load_config`] for the lookup rules.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};
