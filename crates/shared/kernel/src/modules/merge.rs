use crate::KernelError;
use mosaic_domain::modules::{ModuleCatalog, ModuleConfigEntry, MergedModuleConfig};
use std::collections::BTreeMap;
use tracing::debug;

/// Merges deployment overrides over the catalog defaults.
///
/// # Errors
/// Returns [`KernelError::Configuration`] if the deployment names a module the catalog does
/// not know.
pub fn merge(
    deployment: &BTreeMap<String, ModuleConfigEntry>,
    catalog: &ModuleCatalog,
) -> Result<MergedModuleConfig, KernelError> {
    merge_into(catalog.defaults(), deployment, catalog)
}

/// Applies deployment overrides to an existing starting point.
///
/// Legacy modules are skipped, a disabled entry removes the module, `true` enables it with
/// empty options and an object is stored as given. Names the deployment does not mention keep
/// whatever `base` holds.
///
/// # Errors
/// Returns [`KernelError::Configuration`] for module names missing from the catalog.
pub fn merge_into(
    mut base: MergedModuleConfig,
    deployment: &BTreeMap<String, ModuleConfigEntry>,
    catalog: &ModuleCatalog,
) -> Result<MergedModuleConfig, KernelError> {
    for (name, entry) in deployment {
        let definition = catalog.get(name).ok_or_else(|| KernelError::Configuration {
            message: format!("Unknown module '{name}'").into(),
            context: Some("modules".into()),
        })?;

        if definition.is_legacy {
            debug!(module = %name, "Skipping legacy module in merge");
            continue;
        }

        match entry.to_options() {
            Some(options) => base.insert(name.clone(), options),
            None => {
                base.remove(name);
            },
        }
    }

    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_domain::modules::{ModuleDefinition, ModuleOptions};
    use proptest::prelude::*;
    use serde_json::json;

    const NAMES: &[&str] = &["cart", "customer", "order", "pricing", "product", "search"];

    fn catalog() -> ModuleCatalog {
        [
            ModuleDefinition::legacy("cart"),
            ModuleDefinition::legacy("search").with_default(ModuleOptions::new().with("resources", "shared")),
            ModuleDefinition::isolated("customer"),
            ModuleDefinition::isolated("order").with_default(true),
            ModuleDefinition::isolated("pricing"),
            ModuleDefinition::isolated("product").with_default(true),
        ]
        .into_iter()
        .collect()
    }

    fn options(value: serde_json::Value) -> ModuleOptions {
        serde_json::from_value(value).unwrap()
    }

    fn entry() -> impl Strategy<Value = ModuleConfigEntry> {
        prop_oneof![
            Just(ModuleConfigEntry::Disabled),
            Just(ModuleConfigEntry::EnabledDefault),
            "[a-z]{1,8}".prop_map(|v| {
                ModuleConfigEntry::EnabledWithConfig(options(
                    json!({ "resources": "isolated", "options": { "schema": v } }),
                ))
            }),
        ]
    }

    fn deployment() -> impl Strategy<Value = BTreeMap<String, ModuleConfigEntry>> {
        prop::collection::btree_map(prop::sample::select(NAMES).prop_map(str::to_owned), entry(), 0..6)
    }

    #[test]
    fn defaults_seed_the_result() {
        let merged = merge(&BTreeMap::new(), &catalog()).unwrap();
        assert_eq!(merged.names().collect::<Vec<_>>(), vec!["order", "product"]);
        assert!(merged.get("order").unwrap().is_empty());
    }

    #[test]
    fn true_yields_empty_options_and_objects_are_kept() {
        let custom = options(json!({ "resources": "isolated", "options": { "x": 1 }, "extra": [1] }));
        let deployment = BTreeMap::from([
            ("customer".to_owned(), ModuleConfigEntry::EnabledDefault),
            ("pricing".to_owned(), ModuleConfigEntry::EnabledWithConfig(custom.clone())),
            ("product".to_owned(), ModuleConfigEntry::Disabled),
        ]);

        let merged = merge(&deployment, &catalog()).unwrap();
        assert_eq!(merged.get("customer"), Some(&ModuleOptions::new()));
        assert_eq!(merged.get("pricing"), Some(&custom));
        assert!(!merged.contains("product"));
        assert!(merged.contains("order"));
    }

    #[test]
    fn unknown_modules_are_configuration_errors() {
        let deployment = BTreeMap::from([("wishlist".to_owned(), ModuleConfigEntry::EnabledDefault)]);
        let err = merge(&deployment, &catalog()).unwrap_err();
        assert!(matches!(err, KernelError::Configuration { .. }));
        assert!(err.to_string().contains("wishlist"));
    }

    #[test]
    fn untouched_names_keep_the_base() {
        let mut base = MergedModuleConfig::default();
        base.insert("customer", options(json!({ "resources": "shared" })));

        let deployment = BTreeMap::from([("order".to_owned(), ModuleConfigEntry::EnabledDefault)]);
        let merged = merge_into(base.clone(), &deployment, &catalog()).unwrap();
        assert_eq!(merged.get("customer"), base.get("customer"));
        assert_eq!(merged.len(), 2);
    }

    proptest! {
        #[test]
        fn merge_never_contains_legacy_modules(deployment in deployment()) {
            let catalog = catalog();
            let merged = merge(&deployment, &catalog).unwrap();
            for name in merged.names() {
                prop_assert!(!catalog.get(name).unwrap().is_legacy);
            }
        }

        #[test]
        fn explicit_disable_always_removes(deployment in deployment()) {
            let merged = merge(&deployment, &catalog()).unwrap();
            for (name, entry) in &deployment {
                if !entry.is_enabled() {
                    prop_assert!(!merged.contains(name));
                }
            }
        }

        #[test]
        fn object_entries_are_stored_verbatim(deployment in deployment()) {
            let catalog = catalog();
            let merged = merge(&deployment, &catalog).unwrap();
            for (name, entry) in &deployment {
                if let ModuleConfigEntry::EnabledWithConfig(options) = entry {
                    if !catalog.get(name).unwrap().is_legacy {
                        prop_assert_eq!(merged.get(name), Some(options));
                    }
                }
            }
        }
    }
}
