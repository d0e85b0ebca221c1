#![allow(dead_code, unreachable_pub)]

use mosaic_database::{Database, DatabaseError};
use mosaic_domain::config::{AppConfig, DatabaseConfig};
use mosaic_domain::constants::ISOLATED_MODULES_FLAG;
use mosaic_domain::joiner::{JoinerConfig, JoinerRelation};
use mosaic_domain::modules::{ModuleConfigEntry, ModuleDefinition, ModuleOptions, service_key};
use mosaic_domain::query::Record;
use mosaic_kernel::BoxFuture;
use mosaic_kernel::bootstrap::{Bootstrapper, ConnectionLoader};
use mosaic_kernel::container::Container;
use mosaic_kernel::modules::{
    FetchRequest, IsolatedModule, ModuleContext, ModuleError, ModuleFactory, ModuleHandle,
    ModuleSet,
};
use serde_json::{Value, json};
use std::sync::Arc;

/// Hands out a pre-seeded connection.
#[derive(Debug, Clone)]
pub struct SeededLoader(pub Database);

impl ConnectionLoader for SeededLoader {
    fn load<'a>(&'a self, _: &'a DatabaseConfig) -> BoxFuture<'a, Result<Database, DatabaseError>> {
        let db = self.0.clone();
        Box::pin(async move { Ok(db) })
    }
}

/// Shared-registry service of a table module.
#[derive(Debug, Clone)]
pub struct TableService {
    pub tables: Vec<&'static str>,
    pub options: ModuleOptions,
}

/// Module factory serving whole tables of the connection.
#[derive(Debug, Clone)]
pub struct TableFactory {
    pub definition: ModuleDefinition,
    pub tables: Vec<&'static str>,
    pub broken: bool,
}

impl TableFactory {
    pub fn isolated(name: &str, tables: &[&'static str]) -> Self {
        Self { definition: ModuleDefinition::isolated(name), tables: tables.to_vec(), broken: false }
    }

    pub fn legacy(name: &str) -> Self {
        Self { definition: ModuleDefinition::legacy(name), tables: Vec::new(), broken: false }
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

impl ModuleFactory for TableFactory {
    fn definition(&self) -> ModuleDefinition {
        self.definition.clone()
    }

    fn register_services(&self, container: &Container, options: &ModuleOptions) -> Result<(), ModuleError> {
        container.register_value(
            service_key(&self.definition.name),
            TableService { tables: self.tables.clone(), options: options.clone() },
        );
        Ok(())
    }

    fn instantiate(&self, context: ModuleContext) -> Result<ModuleHandle, ModuleError> {
        if self.broken {
            return Err("refusing to start".into());
        }
        let db = context.connection()?;
        Ok(Arc::new(TableModule {
            name: context.name,
            container: context.container,
            db,
            tables: self.tables.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct TableModule {
    name: String,
    container: Container,
    db: Arc<Database>,
    tables: Vec<&'static str>,
}

impl IsolatedModule for TableModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn container(&self) -> &Container {
        &self.container
    }

    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<Vec<Record>, ModuleError>> {
        Box::pin(async move {
            if !self.tables.contains(&request.entity.as_str()) {
                return Err(ModuleError::unsupported_entity(&self.name, &request.entity));
            }
            Ok(self.db.select(&request.entity, &request.filters))
        })
    }
}

pub fn record(value: Value) -> Record {
    serde_json::from_value(value).expect("record object")
}

/// Orders 1..=3 for customers 7, 7 and 99 (no such customer), products 10 and 11.
pub async fn seeded_database() -> Database {
    let db = Database::builder().url("mem://").session("test", "test").init().await.unwrap();
    for row in [
        json!({ "id": 1, "customer_id": 7, "product_id": 10, "total": 25 }),
        json!({ "id": 2, "customer_id": 7, "product_id": 11, "total": 40 }),
        json!({ "id": 3, "customer_id": 99, "product_id": 10, "total": 5 }),
    ] {
        db.insert("order", record(row)).unwrap();
    }
    db.insert("customer", record(json!({ "id": 7, "name": "Ada", "email": "ada@example.com" }))).unwrap();
    db.insert("product", record(json!({ "id": 10, "title": "Mug" }))).unwrap();
    db.insert("product", record(json!({ "id": 11, "title": "Teapot" }))).unwrap();
    db.insert("price", record(json!({ "product_id": 10, "amount": 8, "currency": "EUR" }))).unwrap();
    db.insert("price", record(json!({ "product_id": 10, "amount": 9, "currency": "USD" }))).unwrap();
    db
}

pub fn module_set() -> ModuleSet {
    ModuleSet::new()
        .with(TableFactory::legacy("cart"))
        .with(TableFactory::isolated("customer", &["customer"]))
        .with(TableFactory::isolated("order", &["order"]))
        .with(TableFactory::isolated("product", &["product", "price"]))
        .with(TableFactory::isolated("pricing", &[]))
}

pub fn joiner() -> JoinerConfig {
    JoinerConfig::new()
        .entity("order", "order")
        .entity("customer", "customer")
        .entity("product", "product")
        .entity("price", "product")
        .entity("invoice", "billing")
        .relation(JoinerRelation::new("order", "customer", "customer", "customer_id", "id").one_to_one())
        .relation(JoinerRelation::new("customer", "orders", "order", "id", "customer_id"))
        .relation(JoinerRelation::new("order", "product", "product", "product_id", "id").one_to_one())
        .relation(JoinerRelation::new("product", "prices", "price", "id", "product_id"))
        .relation(JoinerRelation::new("order", "invoice", "invoice", "id", "order_id").one_to_one())
}

pub fn config(isolated: bool) -> AppConfig {
    AppConfig::default()
        .with_flag(ISOLATED_MODULES_FLAG, isolated)
        .with_module("customer", ModuleConfigEntry::EnabledDefault)
        .with_module("order", ModuleConfigEntry::EnabledDefault)
        .with_module("product", ModuleConfigEntry::EnabledDefault)
}

pub async fn bootstrapper(isolated: bool) -> Bootstrapper {
    Bootstrapper::new(config(isolated))
        .modules(module_set())
        .joiner(joiner())
        .connection_loader(SeededLoader(seeded_database().await))
}
