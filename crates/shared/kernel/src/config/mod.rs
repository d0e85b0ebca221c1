use crate::KernelError;
use config::{Config, Environment, File};
use mosaic_domain::config::AppConfig;
use mosaic_domain::modules::ModuleCatalog;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment prefix for overrides, e.g. `MOSAIC__FLAGS__ISOLATED_MODULES=true`.
pub const ENV_PREFIX: &str = "MOSAIC";

/// Custom error type for config loading.
#[mosaic_derive::mosaic_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads configuration from a file layered with environment overrides.
///
/// 1. **Base file**: `path`, or `server` (any supported extension) when `None`.
/// 2. **Environment**: variables prefixed with `MOSAIC__`; nested keys are separated by double
///    underscores (`MOSAIC__DATABASE__URL` maps to `database.url`). Values are parsed, so
///    `true` becomes a boolean and `9000` a number.
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file is missing or the content does not match `T`.
///
/// # Example
/// ```rust
/// use mosaic_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct Settings {
///     port: u16,
/// }
///
/// let cfg: Settings = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let effective_path = path.map_or_else(|| PathBuf::from("server"), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    info!("Loading config from {}", effective_path.display());

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

/// Loads and validates the platform configuration.
///
/// # Errors
/// Returns [`KernelError::Configuration`] for unreadable or invalid configuration.
pub fn load_app_config(path: Option<impl AsRef<Path>>) -> Result<AppConfig, KernelError> {
    load_config::<AppConfig>(path).map_err(|err| KernelError::Configuration {
        message: err.to_string().into(),
        context: Some("loading".into()),
    })
}

/// Rejects deployments that cannot start.
///
/// Checked before the first phase: an empty database URL, port `0`, and module entries that
/// are blank or absent from `catalog`.
///
/// # Errors
/// Returns [`KernelError::Configuration`] describing the first problem found.
pub fn validate(config: &AppConfig, catalog: &ModuleCatalog) -> Result<(), KernelError> {
    if config.database.url.trim().is_empty() {
        return Err(KernelError::configuration("database.url must not be empty"));
    }

    if config.server.port == 0 {
        return Err(KernelError::configuration("server.port must not be 0"));
    }

    for name in config.modules.keys() {
        if name.trim().is_empty() {
            return Err(KernelError::configuration("module names must not be empty"));
        }
        if catalog.get(name).is_none() {
            return Err(KernelError::Configuration {
                message: format!("Unknown module '{name}'").into(),
                context: Some("modules".into()),
            });
        }
    }

    Ok(())
}
