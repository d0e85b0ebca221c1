use mosaic_database::*;
use mosaic_domain::query::{Filter, Record};
use serde_json::json;

fn record(value: serde_json::Value) -> Record {
    serde_json::from_value(value).expect("object")
}

#[tokio::test]
async fn connect_in_memory_and_health_check() {
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .init()
        .await
        .expect("connect to mem://");

    db.health().await.expect("health check");
    assert_eq!(db.namespace(), "test_ns");
    assert_eq!(db.database(), "test_db");
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));

    let err = Database::builder().url("mem://").init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn unsupported_engine_fails_connection() {
    let err = Database::builder().url("pg://localhost").session("a", "b").init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Connection { .. }));
}

#[tokio::test]
async fn insert_assigns_ids_and_select_filters() {
    let db = Database::builder().url("mem://").session("t", "t").init().await.unwrap();

    let first = db.insert("order", record(json!({ "customer_id": 1 }))).unwrap();
    let second = db.insert("order", record(json!({ "customer_id": 2 }))).unwrap();
    db.insert("order", record(json!({ "id": 10, "customer_id": 1 }))).unwrap();
    let after_explicit = db.insert("order", record(json!({ "customer_id": 3 }))).unwrap();

    assert_eq!(first["id"], json!(1));
    assert_eq!(second["id"], json!(2));
    assert_eq!(after_explicit["id"], json!(11));
    assert_eq!(db.count("order"), 4);

    let by_customer = db.select("order", &[Filter::eq("customer_id", 1)]);
    assert_eq!(by_customer.len(), 2);

    let in_list = db.select("order", &[Filter::any_of("id", vec![json!(2), json!(11)])]);
    assert_eq!(in_list.len(), 2);

    assert!(db.get("order", &json!(10)).is_some());
    assert!(db.select("missing", &[]).is_empty());
    assert_eq!(db.tables(), vec!["order".to_owned()]);
}

#[tokio::test]
async fn duplicate_ids_are_rejected() {
    let db = Database::builder().url("mem://").session("t", "t").init().await.unwrap();
    db.insert("product", record(json!({ "id": "sku-1" }))).unwrap();

    let err = db.insert("product", record(json!({ "id": "sku-1" }))).unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
    assert_eq!(db.count("product"), 1);
}

#[tokio::test]
async fn clones_share_the_connection() {
    let db = Database::builder().url("mem://").session("t", "t").init().await.unwrap();
    let other = db.clone();
    other.insert("cart", record(json!({}))).unwrap();

    assert!(db.same_connection(&other));
    assert_eq!(db.count("cart"), 1);
}
