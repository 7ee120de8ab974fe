use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AnalysisSettings, Config, DataSettings, ForecastSettings, FunnelSettings, LoggingSettings,
    ProbabilitySettings, ProbabilitySource, ReportSettings, ScenarioSettings, ServerSettings,
    TrendSettings,
};

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "PIPELINE";

/// Loads the application configuration.
///
/// Sources, lowest precedence first: built-in defaults, the TOML file
/// (`config.toml` in the working directory when `path` is `None`, in which
/// case it may be absent), then `PIPELINE__SECTION__KEY` environment variables.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(data = %config.data.path.display(), "Configuration loaded.");
    Ok(config)
}

/// Parses configuration from an in-memory TOML document, without environment overrides.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}
