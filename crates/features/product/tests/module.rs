use mosaic_database::Database;
use mosaic_domain::constants::keys;
use mosaic_domain::modules::{ModuleOptions, service_key};
use mosaic_kernel::container::Container;
use mosaic_kernel::modules::{FetchRequest, IsolatedModule, ModuleContext, ModuleFactory};
use mosaic_logger::LogHandle;
use mosaic_product::{NewProduct, ProductError, ProductModule, ProductService};
use serde_json::json;

async fn registry() -> Container {
    let db = Database::builder().url("mem://").session("test", "catalog").init().await.unwrap();
    let container = Container::new();
    container.register_value(keys::PG_CONNECTION, db);
    container.register_value(keys::LOGGER, LogHandle::new("mosaic"));
    container
}

#[tokio::test]
async fn creates_products_with_unique_handles() {
    let container = registry().await;
    ProductModule.register_services(&container, &ModuleOptions::new()).unwrap();
    let service = container.resolve::<ProductService>(&service_key("product")).unwrap();

    let mug = service.create(NewProduct::titled("Blue Mug")).unwrap();
    assert_eq!(mug["handle"], json!("blue-mug"));
    assert!(mug.get("description").is_none());
    assert_eq!(service.by_handle("blue-mug"), Some(mug));

    let duplicate = service.create(NewProduct::titled("blue mug!"));
    assert!(matches!(duplicate, Err(ProductError::Conflict { .. })));

    let custom = NewProduct { handle: Some("mug-2".into()), ..NewProduct::titled("Blue Mug") };
    assert_eq!(service.create(custom).unwrap()["id"], json!(2));

    assert!(matches!(service.create(NewProduct::titled("  ")), Err(ProductError::Validation { .. })));
}

#[tokio::test]
async fn isolated_instance_serves_products() {
    let container = registry().await;
    let context = ModuleContext { name: "product".into(), container: container.clone(), options: ModuleOptions::new() };
    let handle = ProductModule.instantiate(context).unwrap();

    let service = container.resolve::<ProductService>(&service_key("product")).unwrap();
    service.create(NewProduct::titled("Mug")).unwrap();
    service.create(NewProduct::titled("Teapot")).unwrap();

    let all = handle.fetch(FetchRequest::new("product")).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(handle.fetch(FetchRequest::new("price")).await.is_err());
}
