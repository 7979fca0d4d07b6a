//! Configuration loading.
//!
//! Sources, lowest precedence first:
//! 1. `Settings::default()`
//! 2. an optional `config/default.{toml,yaml,json,...}` file
//! 3. environment variables such as `PUBSUBLITE__SERVER__PORT=9000`

mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{BrokerSettings, LogSettings, ServerSettings, Settings};

pub const ENV_PREFIX: &str = "PUBSUBLITE";

/// Loads the configuration from `config/default` and the environment,
/// merged over the default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Same as [`load_config`] but reads the file at `path` (extension optional).
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}
