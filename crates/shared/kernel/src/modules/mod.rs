//! Module contracts, catalog merge and resolution.
//!
//! A module ships a [`ModuleFactory`]. In legacy-only mode the factory registers its
//! services straight into the process registry; in isolated mode it builds an
//! [`IsolatedModule`] on top of a registry of its own that holds only what it declared.

mod error;
pub mod merge;
pub mod resolver;

pub use error::{ModuleError, ModuleErrorExt};
pub use merge::{merge, merge_into};
pub use resolver::resolve_modules;

use crate::BoxFuture;
use crate::container::Container;
use mosaic_database::Database;
use mosaic_domain::constants::keys;
use mosaic_domain::modules::{ModuleCatalog, ModuleDefinition, ModuleOptions};
use mosaic_domain::query::{Filter, Record};
use mosaic_logger::LogHandle;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an isolated module instance.
pub type ModuleHandle = Arc<dyn IsolatedModule>;

/// A read request addressed to the module owning `entity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub entity: String,
    /// Every filter must match.
    pub filters: Vec<Filter>,
}

impl FetchRequest {
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self { entity: entity.into(), filters: Vec::new() }
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// A running module with a registry of its own.
pub trait IsolatedModule: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// The module's private registry.
    fn container(&self) -> &Container;

    /// Reads records of an entity this module owns.
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<Vec<Record>, ModuleError>>;
}

/// Compiled-in entry point of a module.
pub trait ModuleFactory: Send + Sync {
    fn definition(&self) -> ModuleDefinition;

    /// Registers the module's services into a shared registry (legacy resolution path).
    ///
    /// # Errors
    /// Returns an error if a required binding is missing or the options are invalid.
    fn register_services(
        &self,
        container: &Container,
        options: &ModuleOptions,
    ) -> Result<(), ModuleError>;

    /// Builds an isolated instance on top of the prepared context.
    ///
    /// # Errors
    /// Returns an error if the module cannot be constructed; startup aborts.
    fn instantiate(&self, context: ModuleContext) -> Result<ModuleHandle, ModuleError>;
}

/// Everything an isolated module gets at construction time.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub name: String,
    /// Fresh registry holding `pgConnection`, `logger`, `moduleOptions` and declared
    /// dependencies.
    pub container: Container,
    pub options: ModuleOptions,
}

impl ModuleContext {
    /// # Errors
    /// Returns [`ModuleError::Container`] if no connection was wired in.
    pub fn connection(&self) -> Result<Arc<Database>, ModuleError> {
        Ok(self.container.resolve::<Database>(keys::PG_CONNECTION)?)
    }

    /// # Errors
    /// Returns [`ModuleError::Container`] if no logger was wired in.
    pub fn logger(&self) -> Result<Arc<LogHandle>, ModuleError> {
        Ok(self.container.resolve::<LogHandle>(keys::LOGGER)?)
    }
}

/// The set of modules compiled into a platform build.
#[derive(Clone, Default)]
pub struct ModuleSet {
    factories: BTreeMap<String, Arc<dyn ModuleFactory>>,
}

impl ModuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, factory: impl ModuleFactory + 'static) -> Self {
        self.insert(Arc::new(factory));
        self
    }

    pub fn insert(&mut self, factory: Arc<dyn ModuleFactory>) {
        self.factories.insert(factory.definition().name, factory);
    }

    #[must_use]
    pub fn factory(&self, name: &str) -> Option<&Arc<dyn ModuleFactory>> {
        self.factories.get(name)
    }

    /// Static definitions of every module in the set.
    #[must_use]
    pub fn catalog(&self) -> ModuleCatalog {
        self.factories.values().map(|f| f.definition()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }
}

impl fmt::Debug for ModuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Isolated module instances by name, registered as `modules`.
#[derive(Debug, Clone, Default)]
pub struct ActiveModules {
    modules: Arc<BTreeMap<String, ModuleHandle>>,
}

impl ActiveModules {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModuleHandle> {
        self.modules.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleHandle)> {
        self.modules.iter().map(|(name, handle)| (name.as_str(), handle))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl FromIterator<(String, ModuleHandle)> for ActiveModules {
    fn from_iter<I: IntoIterator<Item = (String, ModuleHandle)>>(iter: I) -> Self {
        Self { modules: Arc::new(iter.into_iter().collect()) }
    }
}
