use std::path::Path;
use tracing::{debug, info};

use super::settings::EvalConfig;
use crate::error::{EvalError, Result};

const ENV_PREFIX: &str = "WALKFWD";

/// Layers an optional TOML file and `WALKFWD__SECTION__KEY` variables over the
/// built-in defaults, then validates the result.
pub fn load_config(path: &Path) -> Result<EvalConfig> {
    if path.exists() {
        info!("Loading configuration from {}", path.display());
    } else {
        debug!("No configuration file at {}, using defaults", path.display());
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("universe.tickers"),
        )
        .build()
        .map_err(|e| EvalError::Config(e.to_string()))?;

    let config: EvalConfig = settings
        .try_deserialize()
        .map_err(|e| EvalError::Config(e.to_string()))?;

    config
        .validate()
        .map_err(|errors| EvalError::Config(errors.join(", ")))?;
    Ok(config)
}

/// Effective configuration rendered as TOML.
pub fn to_toml_string(config: &EvalConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| EvalError::Config(e.to_string()))
}
