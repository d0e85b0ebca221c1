use mosaic_customer::{CustomerError, CustomerModule, CustomerService};
use mosaic_database::Database;
use mosaic_domain::constants::keys;
use mosaic_domain::modules::{ModuleOptions, service_key};
use mosaic_domain::query::Filter;
use mosaic_kernel::container::Container;
use mosaic_kernel::modules::{FetchRequest, IsolatedModule, ModuleContext, ModuleFactory};
use mosaic_logger::LogHandle;
use serde_json::json;

async fn service() -> CustomerService {
    let db = Database::builder().url("mem://").session("test", "customers").init().await.unwrap();
    let container = Container::new();
    container.register_value(keys::PG_CONNECTION, db);
    container.register_value(keys::LOGGER, LogHandle::new("mosaic"));
    CustomerModule.register_services(&container, &ModuleOptions::new()).unwrap();

    let service = container.resolve::<CustomerService>(&service_key("customer")).unwrap();
    CustomerService::clone(&service)
}

#[tokio::test]
async fn registers_and_finds_customers() {
    let service = service().await;

    let ada = service.register("Ada", "Ada@Example.com").unwrap();
    assert_eq!(ada["email"], json!("ada@example.com"));
    assert_eq!(service.find_by_email("ADA@example.com"), Some(ada.clone()));
    assert_eq!(service.get(1), Some(ada));
}

#[tokio::test]
async fn rejects_duplicates_and_bad_input() {
    let service = service().await;
    service.register("Ada", "ada@example.com").unwrap();

    assert!(matches!(service.register("Ada II", " ADA@example.com"), Err(CustomerError::Conflict { .. })));
    assert!(matches!(service.register(" ", "grace@example.com"), Err(CustomerError::Validation { .. })));
    assert!(matches!(service.register("Grace", "grace"), Err(CustomerError::Validation { .. })));
}

#[tokio::test]
async fn isolated_instance_serves_customers() {
    let db = Database::builder().url("mem://").session("test", "customers").init().await.unwrap();
    let container = Container::new();
    container.register_value(keys::PG_CONNECTION, db);
    container.register_value(keys::LOGGER, LogHandle::new("mosaic.customer"));

    let context = ModuleContext { name: "customer".into(), container: container.clone(), options: ModuleOptions::new() };
    let handle = CustomerModule.instantiate(context).unwrap();

    let service = container.resolve::<CustomerService>(&service_key("customer")).unwrap();
    service.register("Ada", "ada@example.com").unwrap();
    service.register("Grace", "grace@example.com").unwrap();

    let request = FetchRequest::new("customer").filter(Filter::any_of("id", vec![json!(2), json!(9)]));
    let found = handle.fetch(request).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], json!("Grace"));
    assert!(handle.fetch(FetchRequest::new("order")).await.is_err());
}
