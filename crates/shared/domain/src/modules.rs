//! Module descriptors and the deployment-facing configuration shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Registry key under which a module's shared-registry service is bound.
#[must_use]
pub fn service_key(module: &str) -> String {
    format!("{module}Service")
}

/// Registry key under which an isolated module handle is bound.
#[must_use]
pub fn module_key(module: &str) -> String {
    format!("{module}Module")
}

/// Deployment-supplied settings for one module, kept verbatim.
///
/// Modules read their settings from the nested `options` object; any other keys (such as
/// `resources`) are preserved untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleOptions(Map<String, Value>);

impl ModuleOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for compiled-in defaults.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The nested `options` object, if any.
    #[must_use]
    pub fn options(&self) -> Option<&Map<String, Value>> {
        self.0.get("options").and_then(Value::as_object)
    }

    /// Reads `options.<key>` as a string.
    #[must_use]
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options().and_then(|o| o.get(key)).and_then(Value::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Deployment override for a single module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEntry", into = "RawEntry")]
pub enum ModuleConfigEntry {
    /// `false`, `null` or absent.
    #[default]
    Disabled,
    /// `true`: enabled with the module's own defaults.
    EnabledDefault,
    /// An explicit options object.
    EnabledWithConfig(ModuleOptions),
}

impl ModuleConfigEntry {
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Options this entry resolves to when enabled; `true` maps to an empty object.
    #[must_use]
    pub fn to_options(&self) -> Option<ModuleOptions> {
        match self {
            Self::Disabled => None,
            Self::EnabledDefault => Some(ModuleOptions::new()),
            Self::EnabledWithConfig(options) => Some(options.clone()),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Flag(bool),
    Config(ModuleOptions),
    Unset(()),
}

impl From<RawEntry> for ModuleConfigEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Flag(true) => Self::EnabledDefault,
            RawEntry::Flag(false) | RawEntry::Unset(()) => Self::Disabled,
            RawEntry::Config(options) => Self::EnabledWithConfig(options),
        }
    }
}

impl From<ModuleConfigEntry> for RawEntry {
    fn from(entry: ModuleConfigEntry) -> Self {
        match entry {
            ModuleConfigEntry::Disabled => Self::Flag(false),
            ModuleConfigEntry::EnabledDefault => Self::Flag(true),
            ModuleConfigEntry::EnabledWithConfig(options) => Self::Config(options),
        }
    }
}

impl From<bool> for ModuleConfigEntry {
    fn from(enabled: bool) -> Self {
        if enabled { Self::EnabledDefault } else { Self::Disabled }
    }
}

impl From<ModuleOptions> for ModuleConfigEntry {
    fn from(options: ModuleOptions) -> Self {
        Self::EnabledWithConfig(options)
    }
}

/// Static descriptor of a module compiled into the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDefinition {
    pub name: String,
    pub is_legacy: bool,
    pub default_config: ModuleConfigEntry,
    /// Process registry keys an isolated instance imports besides the connection and logger.
    pub dependencies: Vec<String>,
}

impl ModuleDefinition {
    /// A non-legacy module, disabled unless the deployment enables it.
    #[must_use]
    pub fn isolated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_legacy: false,
            default_config: ModuleConfigEntry::Disabled,
            dependencies: Vec::new(),
        }
    }

    /// A legacy module, always served from the shared registry.
    #[must_use]
    pub fn legacy(name: impl Into<String>) -> Self {
        Self { is_legacy: true, default_config: ModuleConfigEntry::EnabledDefault, ..Self::isolated(name) }
    }

    #[must_use]
    pub fn with_default(mut self, entry: impl Into<ModuleConfigEntry>) -> Self {
        self.default_config = entry.into();
        self
    }

    #[must_use]
    pub fn depends_on(mut self, key: impl Into<String>) -> Self {
        self.dependencies.push(key.into());
        self
    }
}

/// The compiled-in module definitions, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    definitions: BTreeMap<String, ModuleDefinition>,
}

impl ModuleCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition, replacing one with the same name.
    pub fn insert(&mut self, definition: ModuleDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModuleDefinition> {
        self.definitions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDefinition> {
        self.definitions.values()
    }

    pub fn legacy(&self) -> impl Iterator<Item = &ModuleDefinition> {
        self.iter().filter(|d| d.is_legacy)
    }

    /// Starting point for the merge: non-legacy modules enabled by default.
    #[must_use]
    pub fn defaults(&self) -> MergedModuleConfig {
        let mut merged = MergedModuleConfig::default();
        for definition in self.iter().filter(|d| !d.is_legacy) {
            if let Some(options) = definition.default_config.to_options() {
                merged.insert(definition.name.clone(), options);
            }
        }
        merged
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}

impl FromIterator<ModuleDefinition> for ModuleCatalog {
    fn from_iter<I: IntoIterator<Item = ModuleDefinition>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for definition in iter {
            catalog.insert(definition);
        }
        catalog
    }
}

/// Resolved configuration of the enabled, non-legacy modules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedModuleConfig {
    entries: BTreeMap<String, ModuleOptions>,
}

impl MergedModuleConfig {
    pub fn insert(&mut self, name: impl Into<String>, options: ModuleOptions) {
        self.entries.insert(name.into(), options);
    }

    pub fn remove(&mut self, name: &str) -> Option<ModuleOptions> {
        self.entries.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModuleOptions> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleOptions)> {
        self.entries.iter().map(|(name, options)| (name.as_str(), options))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
