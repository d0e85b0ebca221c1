use super::{ActiveModules, ModuleContext, ModuleError, ModuleHandle, ModuleSet};
use crate::KernelError;
use crate::container::Container;
use crate::flags::RuntimeMode;
use mosaic_domain::constants::keys;
use mosaic_domain::modules::{MergedModuleConfig, ModuleDefinition, ModuleOptions, module_key};
use mosaic_logger::LogHandle;
use tracing::{debug, info};

/// Wires every module into `process` according to `mode`.
///
/// Legacy modules always register their services into `process`. Merged modules do the same
/// in [`RuntimeMode::LegacyOnly`]; in [`RuntimeMode::Isolated`] each one is built on a fresh
/// registry and its handle is bound as `<name>Module`. Modules missing from `merged` are never
/// touched.
///
/// # Errors
/// Returns [`KernelError::ModuleInstantiation`] on the first module that fails; nothing after
/// it is attempted.
pub fn resolve_modules(
    mode: RuntimeMode,
    modules: &ModuleSet,
    merged: &MergedModuleConfig,
    process: &Container,
) -> Result<ActiveModules, KernelError> {
    for definition in modules.catalog().legacy() {
        let options = definition.default_config.to_options().unwrap_or_default();
        register_shared(modules, &definition.name, &options, process)?;
    }

    if !mode.is_isolated() {
        for (name, options) in merged.iter() {
            register_shared(modules, name, options, process)?;
        }
        return Ok(ActiveModules::default());
    }

    let logger = process.resolve::<LogHandle>(keys::LOGGER).map_err(|source| {
        KernelError::ModuleInstantiation {
            source: source.into(),
            context: Some("isolated modules need a process logger".into()),
        }
    })?;

    let mut active = Vec::with_capacity(merged.len());
    for (name, options) in merged.iter() {
        let factory = modules.factory(name).ok_or_else(|| unknown_factory(name))?;
        let definition = factory.definition();

        let handle = isolate(&definition, options, process, &logger)
            .and_then(|context| factory.instantiate(context))
            .map_err(|source| KernelError::ModuleInstantiation {
                source,
                context: Some(format!("module '{name}'").into()),
            })?;

        process.register_value(module_key(name), ModuleHandle::clone(&handle));
        info!(module = %name, "Isolated module instantiated");
        active.push((name.to_owned(), handle));
    }

    Ok(active.into_iter().collect())
}

fn register_shared(
    modules: &ModuleSet,
    name: &str,
    options: &ModuleOptions,
    process: &Container,
) -> Result<(), KernelError> {
    let factory = modules.factory(name).ok_or_else(|| unknown_factory(name))?;
    factory.register_services(process, options).map_err(|source| {
        KernelError::ModuleInstantiation {
            source,
            context: Some(format!("services of '{name}'").into()),
        }
    })?;
    debug!(module = %name, "Module services registered in the process registry");
    Ok(())
}

/// Builds the private registry of an isolated module.
fn isolate(
    definition: &ModuleDefinition,
    options: &ModuleOptions,
    process: &Container,
    logger: &LogHandle,
) -> Result<ModuleContext, ModuleError> {
    let container = Container::new();
    container.import(process, keys::PG_CONNECTION)?;
    container.register_value(keys::LOGGER, logger.child(&definition.name));
    container.register_value(keys::MODULE_OPTIONS, options.clone());
    for dependency in &definition.dependencies {
        container.import(process, dependency)?;
    }

    Ok(ModuleContext { name: definition.name.clone(), container, options: options.clone() })
}

fn unknown_factory(name: &str) -> KernelError {
    KernelError::Configuration {
        message: format!("No factory for module '{name}'").into(),
        context: None,
    }
}
