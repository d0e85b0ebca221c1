//! Feature flags, evaluated once at bootstrap.

use mosaic_domain::constants::ISOLATED_MODULES_FLAG;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A flag the platform knows about, with its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagDefinition {
    pub key: &'static str,
    pub default: bool,
    pub description: &'static str,
}

/// Flags compiled into the platform.
pub const BUILTIN_FLAGS: &[FlagDefinition] = &[FlagDefinition {
    key: ISOLATED_MODULES_FLAG,
    default: false,
    description: "Run non-legacy modules in isolated registries and expose remoteQuery",
}];

/// Read-only flag lookup shared across scopes.
#[derive(Debug, Clone, Default)]
pub struct FlagRouter {
    values: Arc<BTreeMap<String, bool>>,
}

impl FlagRouter {
    /// Builds the router from definitions and deployment values.
    ///
    /// Deployment values override defaults. Values for undeclared keys are kept.
    #[must_use]
    pub fn new(definitions: &[FlagDefinition], deployment: &BTreeMap<String, bool>) -> Self {
        let mut values: BTreeMap<String, bool> =
            definitions.iter().map(|d| (d.key.to_owned(), d.default)).collect();

        for (key, enabled) in deployment {
            if !definitions.iter().any(|d| d.key == key.as_str()) {
                warn!(flag = %key, enabled, "Deployment sets an undeclared feature flag");
            }
            values.insert(key.clone(), *enabled);
        }

        Self { values: Arc::new(values) }
    }

    /// Whether `key` is on. Unknown keys are off.
    #[must_use]
    pub fn is_feature_enabled(&self, key: &str) -> bool {
        self.values.get(key).copied().unwrap_or(false)
    }

    /// Active flags, sorted.
    pub fn enabled_keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter(|(_, on)| **on).map(|(key, _)| key.as_str())
    }

    /// Collapses the flags into the module runtime mode.
    #[must_use]
    pub fn runtime_mode(&self) -> RuntimeMode {
        if self.is_feature_enabled(ISOLATED_MODULES_FLAG) {
            RuntimeMode::Isolated
        } else {
            RuntimeMode::LegacyOnly
        }
    }
}

/// How modules are run, decided once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    /// Every module shares the process registry; no federation.
    #[default]
    LegacyOnly,
    /// Non-legacy modules get their own registries and `remoteQuery` is built.
    Isolated,
}

impl RuntimeMode {
    #[must_use]
    pub const fn is_isolated(self) -> bool {
        matches!(self, Self::Isolated)
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LegacyOnly => "legacy-only",
            Self::Isolated => "isolated",
        })
    }
}
