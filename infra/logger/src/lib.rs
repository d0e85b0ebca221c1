//! # Logger
//!
//! Installs the process-wide tracing subscriber: compact console output, an optional
//! non-blocking rolling file (plain or JSON) and an [`EnvFilter`] seeded from the configured
//! level. `RUST_LOG` still wins when no explicit filter is given.
//!
//! Modules never talk to the subscriber directly. They receive a [`LogHandle`] from the
//! registry, which tags every event with the scope it was created for.
//!
//! ## Example
//!
//! ```rust
//! # use mosaic_logger::{Logger, LevelFilter};
//! let logger = Logger::builder()
//!     .name("mosaic")
//!     .console(true)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//!
//! logger.handle().child("order").info("ready");
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_NAME: &str = "mosaic";
const DEFAULT_MAX_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";

/// A builder for configuring and initializing the global tracing subscriber.
#[must_use = "The builder must be configured before it can be used to initialize the logger."]
#[derive(Debug)]
pub struct LoggerBuilder {
    name: String,
    console: bool,
    path: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    json: bool,
    env_filter: Option<String>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            console: true,
            path: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
            env_filter: None,
        }
    }
}

impl LoggerBuilder {
    /// Name used as the root log scope and as the rolling file prefix.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Parses a level directive such as `"debug"`.
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] for unknown levels.
    pub fn level_str(self, level: &str) -> Result<Self, LoggerError> {
        let parsed = LevelFilter::from_str(level.trim()).map_err(|e| {
            LoggerError::InvalidConfiguration {
                message: format!("Unknown log level '{level}': {e}").into(),
                context: None,
            }
        })?;
        Ok(self.level(parsed))
    }

    /// Adds an explicit env filter (e.g., `mosaic_kernel=debug,tower_http=info`).
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    pub const fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// Directory for rolling log files.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub const fn max_files(mut self, max: usize) -> Self {
        self.max_files = max;
        self
    }

    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Writes file output as JSON lines.
    pub const fn json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    /// Consumes the builder and installs the global tracing subscriber.
    ///
    /// The returned [`Logger`] owns the file writer guard; keep it alive until shutdown so
    /// buffered lines are flushed.
    ///
    /// # Errors
    /// Returns [`LoggerError::Subscriber`] if a global subscriber has already been set and
    /// [`LoggerError::InvalidConfiguration`] for invalid builder settings.
    pub fn init(self) -> Result<Logger, LoggerError> {
        self.validate()?;

        let env_filter = self.build_env_filter()?;
        let mut layers = Vec::new();

        if self.console {
            layers.push(layer().compact().with_ansi(true).boxed());
        }

        let guard = if let Some(path) = &self.path {
            fs::create_dir_all(path).map_err(|e| LoggerError::Internal {
                message: e.to_string().into(),
                context: Some(format!("Failed to create path: {}", path.display()).into()),
            })?;

            let file_appender = RollingFileAppender::builder()
                .rotation(self.rotation.clone())
                .filename_prefix(&self.name)
                .filename_suffix(LOG_FILE_SUFFIX)
                .max_log_files(self.max_files)
                .build(path)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = layer().with_writer(non_blocking).with_ansi(false);

            layers.push(if self.json { file_layer.json().boxed() } else { file_layer.boxed() });
            Some(guard)
        } else {
            None
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging layers enabled. Enable console or file output.".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(env_filter).with(layers).try_init()?;

        Ok(Logger { guard, root: LogHandle::new(self.name) })
    }

    fn validate(&self) -> Result<(), LoggerError> {
        if self.name.trim().is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "Logger name cannot be empty".into(),
                context: None,
            });
        }

        if self.max_files == 0 {
            return Err(LoggerError::InvalidConfiguration {
                message: "max_files must be greater than zero".into(),
                context: None,
            });
        }

        Ok(())
    }

    fn build_env_filter(&self) -> Result<EnvFilter, LoggerError> {
        let builder = EnvFilter::builder().with_default_directive(self.level.into());
        self.env_filter.as_ref().map_or_else(
            || Ok(builder.from_env_lossy()),
            |filter| {
                builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                    message: format!("Invalid env filter '{filter}': {e}").into(),
                    context: None,
                })
            },
        )
    }
}

/// A handle to the initialized logging system.
///
/// Holds the background writer guard. Drop it only when the application shuts down.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
    root: LogHandle,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// A logger that installs nothing, for embedders and tests that manage the subscriber
    /// themselves. Events still flow to whatever subscriber is current.
    pub fn detached(name: impl Into<String>) -> Self {
        Self { guard: None, root: LogHandle::new(name) }
    }

    /// The root log scope, ready to be bound into the registry.
    #[must_use]
    pub fn handle(&self) -> LogHandle {
        self.root.clone()
    }

    #[must_use]
    pub const fn guard(&self) -> Option<&WorkerGuard> {
        self.guard.as_ref()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

/// Cloneable log sink handed to modules through the registry.
///
/// Every event carries a `scope` field; child handles extend it with a dotted suffix
/// (`mosaic.order`). Events with structured fields go through [`LogHandle::span`]:
///
/// ```rust
/// # use mosaic_logger::LogHandle;
/// let log = LogHandle::new("mosaic.order");
/// let _scope = log.span().entered();
/// tracing::info!(order_id = 7, "Order placed");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHandle {
    scope: Arc<str>,
}

impl LogHandle {
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self { scope: Arc::from(scope.into()) }
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self::new(format!("{}.{name}", self.scope))
    }

    /// A span tagging every event recorded inside it with this handle's scope.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("module", scope = %self.scope)
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(scope = %self.scope, "{message}");
    }

    pub fn info(&self, message: &str) {
        tracing::info!(scope = %self.scope, "{message}");
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(scope = %self.scope, "{message}");
    }

    pub fn error(&self, message: &str) {
        tracing::error!(scope = %self.scope, "{message}");
    }
}
