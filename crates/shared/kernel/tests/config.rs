mod common;

use mosaic_domain::config::AppConfig;
use mosaic_domain::constants::ISOLATED_MODULES_FLAG;
use mosaic_domain::modules::{ModuleConfigEntry, ModuleOptions};
use mosaic_kernel::KernelError;
use mosaic_kernel::config::{load_app_config, load_config, validate};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

fn toml_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_a_deployment_file() {
    let file = toml_file(
        r#"
        [server]
        port = 8081

        [database]
        url = "mem://"
        namespace = "shop"

        [flags]
        isolated_modules = true

        [modules]
        order = true
        customer = false
        pricing = { resources = "isolated", options = { currency = "EUR" } }
        "#,
    );

    let config = load_app_config(Some(file.path())).unwrap();

    assert_eq!(config.server.port, 8081);
    assert_eq!(config.database.namespace, "shop");
    assert_eq!(config.database.database, "core");
    assert_eq!(config.flags.get(ISOLATED_MODULES_FLAG), Some(&true));
    assert_eq!(config.modules["order"], ModuleConfigEntry::EnabledDefault);
    assert_eq!(config.modules["customer"], ModuleConfigEntry::Disabled);

    let ModuleConfigEntry::EnabledWithConfig(pricing) = &config.modules["pricing"] else {
        panic!("pricing options lost: {:?}", config.modules["pricing"]);
    };
    assert_eq!(pricing.get("resources"), Some(&json!("isolated")));
    assert_eq!(pricing.get("options"), Some(&json!({ "currency": "EUR" })));
}

#[test]
fn missing_file_is_a_configuration_error() {
    let err = load_app_config(Some("does/not/exist.toml")).unwrap_err();
    assert!(matches!(err, KernelError::Configuration { .. }));
}

#[test]
fn generic_loader_reads_any_shape() {
    #[derive(serde::Deserialize)]
    struct Probe {
        name: String,
        retries: u8,
    }

    let file = toml_file("name = \"probe\"\nretries = 3\n");
    let probe: Probe = load_config(Some(file.path())).unwrap();
    assert_eq!(probe.name, "probe");
    assert_eq!(probe.retries, 3);
}

#[test]
fn validation_rejects_unstartable_deployments() {
    let catalog = common::module_set().catalog();

    assert!(validate(&common::config(true), &catalog).is_ok());

    let mut empty_url = AppConfig::default();
    empty_url.database.url = "  ".into();
    assert!(validate(&empty_url, &catalog).is_err());

    let mut no_port = AppConfig::default();
    no_port.server.port = 0;
    assert!(validate(&no_port, &catalog).is_err());

    let blank = AppConfig::default().with_module(" ", ModuleConfigEntry::EnabledDefault);
    assert!(validate(&blank, &catalog).is_err());

    let unknown = AppConfig::default()
        .with_module("loyalty", ModuleConfigEntry::EnabledWithConfig(ModuleOptions::new()));
    let err = validate(&unknown, &catalog).unwrap_err();
    assert!(err.to_string().contains("loyalty"));
}
