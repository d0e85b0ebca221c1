mod common;

use common::{TableService, bootstrapper};
use mosaic_database::Database;
use mosaic_domain::config::AppConfig;
use mosaic_domain::constants::{ISOLATED_MODULES_FLAG, keys};
use mosaic_domain::modules::{ModuleConfigEntry, ModuleOptions, module_key, service_key};
use mosaic_kernel::KernelError;
use mosaic_kernel::bootstrap::{Bootstrapper, Phase, PhaseEvent, PhaseObserver};
use mosaic_kernel::container::ContainerError;
use mosaic_kernel::flags::RuntimeMode;
use mosaic_kernel::modules::{ActiveModules, ModuleHandle, ModuleSet};
use mosaic_logger::LogHandle;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn names(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

impl PhaseObserver for Recorder {
    fn on_event(&self, event: &PhaseEvent) {
        self.0.lock().push(event.name());
    }
}

#[tokio::test]
async fn phases_run_once_in_order() {
    let recorder = Recorder::default();
    let platform = bootstrapper(false).await.observer(recorder.clone()).run().await.unwrap();

    let names = recorder.names();
    assert_eq!(names.len(), Phase::ALL.len() * 2);
    assert_eq!(names.first().map(String::as_str), Some("CONFIG_STARTED"));
    assert_eq!(names.get(1).map(String::as_str), Some("CONFIG_COMPLETED"));
    assert_eq!(names.last().map(String::as_str), Some("FEDERATION_COMPLETED"));

    let db = names.iter().position(|n| n == "DB_CONNECTION_COMPLETED").unwrap();
    let resolution = names.iter().position(|n| n == "MODULE_RESOLUTION_STARTED").unwrap();
    assert!(db < resolution);

    let phases: Vec<_> = platform.timings.iter().map(|t| t.phase).collect();
    assert_eq!(phases, Phase::ALL);
}

#[tokio::test]
async fn connection_is_bound_by_the_db_connection_phase() {
    let seen = Arc::new(Mutex::new(Vec::new()));

    let before = Arc::clone(&seen);
    let after = Arc::clone(&seen);
    bootstrapper(false)
        .await
        .hook(Phase::Strategies, move |ctx| {
            let unresolved = ctx.container.resolve::<Database>(keys::PG_CONNECTION).is_err();
            before.lock().push(("strategies", unresolved));
            Box::pin(async { Ok(()) })
        })
        .hook(Phase::Database, move |ctx| {
            let unresolved = ctx.container.resolve::<Database>(keys::PG_CONNECTION).is_err();
            after.lock().push(("database", unresolved));
            Box::pin(async { Ok(()) })
        })
        .run()
        .await
        .unwrap();

    assert_eq!(*seen.lock(), vec![("strategies", true), ("database", false)]);
}

#[tokio::test]
async fn core_bindings_are_registered() {
    let platform = bootstrapper(false).await.run().await.unwrap();
    let container = &platform.container;

    assert!(container.resolve::<AppConfig>(keys::CONFIG).is_ok());
    assert!(container.resolve::<LogHandle>(keys::LOGGER).is_ok());
    assert_eq!(*container.resolve::<RuntimeMode>(keys::RUNTIME_MODE).unwrap(), RuntimeMode::LegacyOnly);
    assert_eq!(platform.mode, RuntimeMode::LegacyOnly);
    assert!(container.contains(keys::MERGED_MODULE_CONFIG));
    assert!(container.contains(keys::FLAG_ROUTER));
}

#[tokio::test]
async fn legacy_mode_shares_the_process_registry() {
    let platform = bootstrapper(false).await.run().await.unwrap();
    let container = &platform.container;

    // The legacy cart module is always wired in, enabled modules join it.
    for name in ["cart", "customer", "order", "product"] {
        assert!(container.contains(&service_key(name)), "{name} services missing");
        assert!(!container.contains(&module_key(name)));
    }
    assert!(!container.contains(&service_key("pricing")));
    assert!(container.resolve::<ActiveModules>(keys::MODULES).unwrap().is_empty());

    let err = platform.remote_query().unwrap_err();
    assert!(matches!(err, ContainerError::UnresolvedKey { .. }));
}

#[tokio::test]
async fn isolated_mode_builds_private_registries() {
    let platform = bootstrapper(true).await.run().await.unwrap();
    let container = &platform.container;
    assert_eq!(platform.mode, RuntimeMode::Isolated);

    let active = container.resolve::<ActiveModules>(keys::MODULES).unwrap();
    assert_eq!(active.names().collect::<Vec<_>>(), ["customer", "order", "product"]);

    // Legacy modules keep the shared path even in isolated mode.
    assert!(container.contains(&service_key("cart")));
    assert!(!container.contains(&service_key("order")));

    let order = container.resolve::<ModuleHandle>(&module_key("order")).unwrap();
    let private = order.container();
    assert!(private.contains(keys::PG_CONNECTION));
    assert!(private.contains(keys::MODULE_OPTIONS));
    assert!(!private.contains(keys::CONFIG));
    assert!(!private.contains(keys::FLAG_ROUTER));

    let logger = private.resolve::<LogHandle>(keys::LOGGER).unwrap();
    assert_eq!(logger.scope(), "mosaic.order");

    let shared = container.resolve::<Database>(keys::PG_CONNECTION).unwrap();
    let seen = private.resolve::<Database>(keys::PG_CONNECTION).unwrap();
    assert!(Arc::ptr_eq(&shared, &seen));

    assert!(platform.remote_query().is_ok());
}

#[tokio::test]
async fn isolated_mode_without_modules_still_binds_remote_query() {
    let config = AppConfig::default().with_flag(ISOLATED_MODULES_FLAG, true);
    let platform = Bootstrapper::new(config)
        .modules(common::module_set())
        .connection_loader(common::SeededLoader(common::seeded_database().await))
        .run()
        .await
        .unwrap();

    let remote_query = platform.remote_query().unwrap();
    assert!(remote_query.entities().is_empty());
}

#[tokio::test]
async fn module_options_reach_the_module() {
    let options = ModuleOptions::new().with("currency", "EUR");
    let config = common::config(false)
        .with_module("pricing", ModuleConfigEntry::EnabledWithConfig(options.clone()));

    let platform = Bootstrapper::new(config)
        .modules(common::module_set())
        .connection_loader(common::SeededLoader(common::seeded_database().await))
        .run()
        .await
        .unwrap();

    let service = platform.container.resolve::<TableService>(&service_key("pricing")).unwrap();
    assert_eq!(service.options, options);
}

#[tokio::test]
async fn disabled_modules_are_not_touched() {
    let config = common::config(true).with_module("order", ModuleConfigEntry::Disabled);
    let platform = Bootstrapper::new(config)
        .modules(common::module_set())
        .connection_loader(common::SeededLoader(common::seeded_database().await))
        .run()
        .await
        .unwrap();

    assert!(!platform.container.contains(&module_key("order")));
    assert!(platform.container.contains(&module_key("customer")));
}

#[tokio::test]
async fn failing_hook_stops_the_sequence() {
    let recorder = Recorder::default();
    let err = bootstrapper(false)
        .await
        .observer(recorder.clone())
        .hook(Phase::Services, |_| Box::pin(async { Err(KernelError::from("services refused")) }))
        .hook(Phase::ApiRoutes, |_| Box::pin(async { Err(KernelError::from("api routes reached")) }))
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.failed_phase(), Some(Phase::Services));
    assert!(matches!(err.root_cause(), KernelError::Internal { .. }));

    let names = recorder.names();
    assert_eq!(names.last().map(String::as_str), Some("SERVICES_STARTED"));
    assert!(!names.iter().any(|n| n == "SERVICES_COMPLETED"));
}

#[tokio::test]
async fn failing_module_aborts_resolution() {
    let modules = ModuleSet::new()
        .with(common::TableFactory::isolated("customer", &["customer"]))
        .with(common::TableFactory::isolated("order", &["order"]).broken());
    let config = AppConfig::default()
        .with_flag(ISOLATED_MODULES_FLAG, true)
        .with_module("order", ModuleConfigEntry::EnabledDefault);

    let err = Bootstrapper::new(config)
        .modules(modules)
        .connection_loader(common::SeededLoader(common::seeded_database().await))
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.failed_phase(), Some(Phase::ModuleResolution));
    assert!(matches!(err.root_cause(), KernelError::ModuleInstantiation { .. }));
}

#[tokio::test]
async fn unknown_module_fails_before_any_phase() {
    let recorder = Recorder::default();
    let config = common::config(false).with_module("billing", ModuleConfigEntry::EnabledDefault);

    let err = Bootstrapper::new(config)
        .modules(common::module_set())
        .observer(recorder.clone())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, KernelError::Configuration { .. }));
    assert!(err.to_string().contains("billing"));
    assert!(recorder.names().is_empty());
}

#[tokio::test]
async fn unsupported_connection_fails_the_db_phase() {
    let mut config = common::config(false);
    config.database.url = "postgres://localhost/app".into();

    let err = Bootstrapper::new(config).modules(common::module_set()).run().await.unwrap_err();

    assert_eq!(err.failed_phase(), Some(Phase::DbConnection));
    assert!(matches!(err.root_cause(), KernelError::Connection { .. }));
}
