//! Phase sequencer.
//!
//! [`Bootstrapper::run`] walks [`Phase::ALL`] once, in order. Each phase runs its built-in
//! step (if any) and then the hooks registered for it. The first failure stops the walk and
//! is returned as [`KernelError::PhaseFailure`]; completed phases are not rolled back.
//!
//! | phase               | built-in step                                          |
//! |---------------------|--------------------------------------------------------|
//! | `config`            | binds `configModule` and `logger`                      |
//! | `flags`             | binds `featureFlagRouter` and `runtimeMode`            |
//! | `db-connection`     | runs the [`ConnectionLoader`], binds `pgConnection`    |
//! | `module-resolution` | merges, resolves, binds `mergedModuleConfig`/`modules` |
//! | `federation`        | isolated mode only, binds `remoteQuery`                |
//!
//! The remaining phases belong to external collaborators and only run hooks.

mod observer;

pub use observer::{EventBusObserver, PhaseEvent, PhaseObserver, TracingObserver};

use crate::config::validate;
use crate::container::{Container, ContainerError};
use crate::federation::RemoteQuery;
use crate::flags::{BUILTIN_FLAGS, FlagDefinition, FlagRouter, RuntimeMode};
use crate::modules::{ActiveModules, ModuleSet, merge, resolve_modules};
use crate::{BoxFuture, KernelError};
use mosaic_database::{Database, DatabaseError};
use mosaic_domain::config::{AppConfig, DatabaseConfig};
use mosaic_domain::constants::keys;
use mosaic_domain::joiner::JoinerConfig;
use mosaic_logger::LogHandle;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Startup phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Config,
    Flags,
    Models,
    PluginModels,
    Strategies,
    DbConnection,
    ModuleResolution,
    Database,
    Repositories,
    Services,
    HttpLayer,
    Plugins,
    Subscribers,
    ApiRoutes,
    Defaults,
    SearchIndex,
    Federation,
}

impl Phase {
    pub const ALL: [Self; 17] = [
        Self::Config,
        Self::Flags,
        Self::Models,
        Self::PluginModels,
        Self::Strategies,
        Self::DbConnection,
        Self::ModuleResolution,
        Self::Database,
        Self::Repositories,
        Self::Services,
        Self::HttpLayer,
        Self::Plugins,
        Self::Subscribers,
        Self::ApiRoutes,
        Self::Defaults,
        Self::SearchIndex,
        Self::Federation,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Flags => "flags",
            Self::Models => "models",
            Self::PluginModels => "plugin-models",
            Self::Strategies => "strategies",
            Self::DbConnection => "db-connection",
            Self::ModuleResolution => "module-resolution",
            Self::Database => "database",
            Self::Repositories => "repositories",
            Self::Services => "services",
            Self::HttpLayer => "http-layer",
            Self::Plugins => "plugins",
            Self::Subscribers => "subscribers",
            Self::ApiRoutes => "api-routes",
            Self::Defaults => "defaults",
            Self::SearchIndex => "search-index",
            Self::Federation => "federation",
        }
    }

    /// Upper snake case prefix of lifecycle event names.
    #[must_use]
    pub fn event_prefix(self) -> String {
        self.as_str().replace('-', "_").to_uppercase()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opens the lower-level connection bound as `pgConnection`.
pub trait ConnectionLoader: Send + Sync {
    fn load<'a>(
        &'a self,
        config: &'a DatabaseConfig,
    ) -> BoxFuture<'a, Result<Database, DatabaseError>>;
}

/// Default loader backed by [`Database::builder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseLoader;

impl ConnectionLoader for DatabaseLoader {
    fn load<'a>(
        &'a self,
        config: &'a DatabaseConfig,
    ) -> BoxFuture<'a, Result<Database, DatabaseError>> {
        Box::pin(async move {
            Database::builder()
                .url(&config.url)
                .session(&config.namespace, &config.database)
                .init()
                .await
        })
    }
}

/// What a hook sees of the platform being built.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub phase: Phase,
    /// The process registry.
    pub container: Container,
    /// `None` until the `flags` phase has run.
    pub mode: Option<RuntimeMode>,
    pub config: AppConfig,
}

type Hook = Arc<dyn Fn(PhaseContext) -> BoxFuture<'static, Result<(), KernelError>> + Send + Sync>;

/// Time spent in one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub elapsed: Duration,
}

/// A fully started platform.
#[derive(Debug, Clone)]
pub struct Platform {
    pub container: Container,
    pub mode: RuntimeMode,
    pub timings: Vec<PhaseTiming>,
}

impl Platform {
    /// # Errors
    /// Returns [`ContainerError::UnresolvedKey`] in legacy-only mode.
    pub fn remote_query(&self) -> Result<Arc<RemoteQuery>, ContainerError> {
        self.container.resolve::<RemoteQuery>(keys::REMOTE_QUERY)
    }

    #[must_use]
    pub fn total_elapsed(&self) -> Duration {
        self.timings.iter().map(|t| t.elapsed).sum()
    }
}

/// Runs the startup phases against a process registry.
pub struct Bootstrapper {
    config: AppConfig,
    container: Container,
    modules: ModuleSet,
    joiner: JoinerConfig,
    flags: Vec<FlagDefinition>,
    logger: LogHandle,
    loader: Arc<dyn ConnectionLoader>,
    observers: Vec<Arc<dyn PhaseObserver>>,
    hooks: BTreeMap<Phase, Vec<Hook>>,
}

impl fmt::Debug for Bootstrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("modules", &self.modules)
            .field("observers", &self.observers.len())
            .field("hooks", &self.hooks.values().map(Vec::len).sum::<usize>())
            .finish_non_exhaustive()
    }
}

/// Mutable state threaded through the built-in steps.
#[derive(Default)]
struct RunState {
    mode: Option<RuntimeMode>,
    active: ActiveModules,
}

impl Bootstrapper {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            container: Container::new(),
            modules: ModuleSet::new(),
            joiner: JoinerConfig::default(),
            flags: BUILTIN_FLAGS.to_vec(),
            logger: LogHandle::new("mosaic"),
            loader: Arc::new(DatabaseLoader),
            observers: Vec::new(),
            hooks: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn modules(mut self, modules: ModuleSet) -> Self {
        self.modules = modules;
        self
    }

    #[must_use]
    pub fn joiner(mut self, joiner: JoinerConfig) -> Self {
        self.joiner = joiner;
        self
    }

    /// Declares an additional flag.
    #[must_use]
    pub fn flag(mut self, definition: FlagDefinition) -> Self {
        self.flags.push(definition);
        self
    }

    /// Root log handle bound as `logger`.
    #[must_use]
    pub fn logger(mut self, logger: LogHandle) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn connection_loader(mut self, loader: impl ConnectionLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: impl PhaseObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Runs `hook` after the built-in step of `phase`, in registration order.
    #[must_use]
    pub fn hook<F>(mut self, phase: Phase, hook: F) -> Self
    where
        F: Fn(PhaseContext) -> BoxFuture<'static, Result<(), KernelError>> + Send + Sync + 'static,
    {
        self.hooks.entry(phase).or_default().push(Arc::new(hook));
        self
    }

    /// The process registry phases will populate.
    #[must_use]
    pub const fn container(&self) -> &Container {
        &self.container
    }

    /// Validates the configuration, then runs every phase in order.
    ///
    /// # Errors
    /// Returns [`KernelError::Configuration`] before any phase starts if the deployment
    /// configuration is invalid, and [`KernelError::PhaseFailure`] for the first failing phase.
    pub async fn run(self) -> Result<Platform, KernelError> {
        validate(&self.config, &self.modules.catalog())?;

        let mut state = RunState::default();
        let mut timings = Vec::with_capacity(Phase::ALL.len());

        for phase in Phase::ALL {
            self.notify(&PhaseEvent::Started { phase });
            let started = Instant::now();

            self.run_phase(phase, &mut state).await.map_err(|cause| KernelError::PhaseFailure {
                phase,
                cause: Box::new(cause),
                context: None,
            })?;

            let elapsed = started.elapsed();
            timings.push(PhaseTiming { phase, elapsed });
            self.notify(&PhaseEvent::Completed { phase, elapsed });
        }

        let mode = state.mode.unwrap_or_default();
        info!(mode = %mode, modules = state.active.len(), "Platform started");

        Ok(Platform { container: self.container, mode, timings })
    }

    async fn run_phase(&self, phase: Phase, state: &mut RunState) -> Result<(), KernelError> {
        match phase {
            Phase::Config => self.register_config(),
            Phase::Flags => state.mode = Some(self.evaluate_flags()),
            Phase::DbConnection => self.connect().await?,
            Phase::ModuleResolution => {
                state.active = self.resolve_modules(state.mode.unwrap_or_default())?;
            },
            Phase::Federation => self.build_federation(state)?,
            _ => {},
        }

        for hook in self.hooks.get(&phase).into_iter().flatten() {
            let context = PhaseContext {
                phase,
                container: self.container.clone(),
                mode: state.mode,
                config: self.config.clone(),
            };
            hook(context).await?;
        }

        Ok(())
    }

    fn register_config(&self) {
        self.container.register_value(keys::CONFIG, self.config.clone());
        self.container.register_value(keys::LOGGER, self.logger.clone());
    }

    fn evaluate_flags(&self) -> RuntimeMode {
        let router = FlagRouter::new(&self.flags, &self.config.flags);
        let mode = router.runtime_mode();
        debug!(enabled = ?router.enabled_keys().collect::<Vec<_>>(), mode = %mode, "Flags evaluated");

        self.container.register_value(keys::FLAG_ROUTER, router);
        self.container.register_value(keys::RUNTIME_MODE, mode);
        mode
    }

    async fn connect(&self) -> Result<(), KernelError> {
        let connection = self.loader.load(&self.config.database).await?;
        self.container.register_value(keys::PG_CONNECTION, connection);
        Ok(())
    }

    fn resolve_modules(&self, mode: RuntimeMode) -> Result<ActiveModules, KernelError> {
        let merged = merge(&self.config.modules, &self.modules.catalog())?;
        debug!(modules = ?merged.names().collect::<Vec<_>>(), "Module configuration merged");

        self.container.register_value(keys::MERGED_MODULE_CONFIG, merged.clone());
        let active = resolve_modules(mode, &self.modules, &merged, &self.container)?;
        self.container.register_value(keys::MODULES, active.clone());
        Ok(active)
    }

    fn build_federation(&self, state: &RunState) -> Result<(), KernelError> {
        if !state.mode.is_some_and(RuntimeMode::is_isolated) {
            debug!("Legacy-only mode, remoteQuery not built");
            return Ok(());
        }

        let remote_query = RemoteQuery::build(self.joiner.clone(), state.active.clone())?;
        self.container.register_value(keys::REMOTE_QUERY, remote_query);
        Ok(())
    }

    fn notify(&self, event: &PhaseEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
