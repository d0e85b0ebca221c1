use mosaic_kernel::container::Container;
use proptest::prelude::*;
use std::collections::BTreeSet;

#[test]
fn parent_bindings_added_later_are_visible() {
    let root = Container::new();
    let child = root.create_scope();
    let grandchild = child.create_scope();

    root.register_value("currency", "EUR".to_owned());

    assert_eq!(grandchild.depth(), 2);
    assert_eq!(grandchild.resolve::<String>("currency").unwrap().as_str(), "EUR");
}

#[test]
fn child_overrides_shadow_without_leaking() {
    let root = Container::new();
    root.register_value("requestContext", 0_u64);

    let request = root.create_scope();
    request.register_value("requestContext", 42_u64);

    assert_eq!(*request.resolve::<u64>("requestContext").unwrap(), 42);
    assert_eq!(*root.resolve::<u64>("requestContext").unwrap(), 0);
}

proptest! {
    #[test]
    fn sibling_scopes_never_see_each_other(
        left in prop::collection::btree_set("k[a-z]{1,7}", 0..8),
        right in prop::collection::btree_set("[A-Z]{1,8}", 0..8),
    ) {
        let root = Container::new();
        root.register_value("shared", ());
        let a = root.create_scope();
        let b = root.create_scope();

        for key in &left {
            a.register_value(key.as_str(), key.clone());
        }
        for key in &right {
            b.register_value(key.as_str(), key.clone());
        }

        for key in &left {
            prop_assert!(a.contains(key));
            prop_assert!(!b.contains(key));
            prop_assert!(!root.contains(key));
        }
        for key in &right {
            prop_assert!(!a.contains(key));
        }
        prop_assert!(a.contains("shared") && b.contains("shared"));

        let own: BTreeSet<String> = a.keys().into_iter().collect();
        prop_assert_eq!(own, left);
    }
}
