use mosaic_database::Database;
use mosaic_domain::constants::keys;
use mosaic_domain::modules::{ModuleOptions, service_key};
use mosaic_domain::query::Filter;
use mosaic_kernel::container::Container;
use mosaic_kernel::modules::{FetchRequest, IsolatedModule, ModuleContext, ModuleError, ModuleFactory};
use mosaic_logger::LogHandle;
use mosaic_order::{NewOrder, OrderError, OrderModule, OrderService};
use serde_json::json;

async fn process_registry() -> Container {
    let db = Database::builder().url("mem://").session("test", "orders").init().await.unwrap();
    let container = Container::new();
    container.register_value(keys::PG_CONNECTION, db);
    container.register_value(keys::LOGGER, LogHandle::new("mosaic"));
    container
}

fn order(customer_id: u64, quantity: u64) -> NewOrder {
    NewOrder { customer_id, product_id: 10, quantity, total: quantity * 250 }
}

#[tokio::test]
async fn shared_services_place_orders() {
    let container = process_registry().await;
    OrderModule.register_services(&container, &ModuleOptions::new()).unwrap();

    let service = container.resolve::<OrderService>(&service_key("order")).unwrap();
    let placed = service.place(order(7, 2)).unwrap();

    assert_eq!(placed["id"], json!(1));
    assert_eq!(placed["status"], json!("pending"));
    assert_eq!(placed["total"], json!(500));
    assert_eq!(service.get(1), Some(placed));
    assert!(service.get(2).is_none());
}

#[tokio::test]
async fn quantity_limits_come_from_options() {
    let container = process_registry().await;
    let options = ModuleOptions::new().with("options", json!({ "max_quantity": 3 }));
    OrderModule.register_services(&container, &options).unwrap();

    let service = container.resolve::<OrderService>(&service_key("order")).unwrap();
    assert_eq!(service.max_quantity(), 3);
    assert!(matches!(service.place(order(7, 4)), Err(OrderError::Validation { .. })));
    assert!(matches!(service.place(order(7, 0)), Err(OrderError::Validation { .. })));
    assert!(service.place(order(7, 3)).is_ok());
}

#[tokio::test]
async fn lists_orders_of_a_customer() {
    let container = process_registry().await;
    OrderModule.register_services(&container, &ModuleOptions::new()).unwrap();
    let service = container.resolve::<OrderService>(&service_key("order")).unwrap();

    for customer in [7, 8, 7] {
        service.place(order(customer, 1)).unwrap();
    }

    let ids: Vec<_> = service.for_customer(7).iter().map(|o| o["id"].clone()).collect();
    assert_eq!(ids, [json!(1), json!(3)]);
}

#[tokio::test]
async fn missing_connection_is_a_dependency_error() {
    let container = Container::new();
    container.register_value(keys::LOGGER, LogHandle::new("mosaic"));

    let err = OrderModule.register_services(&container, &ModuleOptions::new()).unwrap_err();
    assert!(matches!(err, ModuleError::Container { .. }));
}

#[tokio::test]
async fn isolated_instance_serves_fetches() {
    let process = process_registry().await;
    let private = Container::new();
    private.import(&process, keys::PG_CONNECTION).unwrap();
    private.register_value(keys::LOGGER, LogHandle::new("mosaic.order"));

    let context = ModuleContext {
        name: "order".into(),
        container: private.clone(),
        options: ModuleOptions::new(),
    };
    let handle = OrderModule.instantiate(context).unwrap();
    assert_eq!(handle.name(), "order");

    let service = private.resolve::<OrderService>(&service_key("order")).unwrap();
    service.place(order(7, 1)).unwrap();
    service.place(order(8, 1)).unwrap();
    assert!(!process.contains(&service_key("order")));

    let request = FetchRequest::new("order").filter(Filter::eq("customer_id", 8));
    let records = handle.fetch(request).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], json!(2));

    let err = handle.fetch(FetchRequest::new("customer")).await.unwrap_err();
    assert!(matches!(err, ModuleError::UnsupportedEntity { .. }));
}
