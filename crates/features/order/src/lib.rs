//! Order module: places orders and serves them to the federated query layer.
//!
//! Owns the `order` entity. Orders reference customers and products by id only; the
//! records behind those ids belong to other modules and are joined through `remoteQuery`.

mod error;

pub use error::{OrderError, OrderErrorExt};

use mosaic_database::Database;
use mosaic_domain::constants::{keys, modules::ORDER};
use mosaic_domain::modules::{ModuleDefinition, ModuleOptions, service_key};
use mosaic_domain::query::{Filter, Record};
use mosaic_kernel::BoxFuture;
use mosaic_kernel::container::Container;
use mosaic_kernel::modules::{
    FetchRequest, IsolatedModule, ModuleContext, ModuleError, ModuleFactory, ModuleHandle,
};
use mosaic_logger::LogHandle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Entity served by this module.
pub const ENTITY: &str = "order";

const DEFAULT_MAX_QUANTITY: u64 = 100;

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Completed,
}

/// Input of [`OrderService::place`]. Amounts are in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: u64,
    pub product_id: u64,
    pub quantity: u64,
    pub total: u64,
}

/// Order storage and lookup.
#[mosaic_derive::mosaic_service]
pub struct OrderService {
    db: Arc<Database>,
    log: LogHandle,
    max_quantity: u64,
}

impl OrderService {
    /// Builds the service from deployment options.
    ///
    /// Recognized option: `options.max_quantity` (default 100).
    #[must_use]
    pub fn with_options(db: Arc<Database>, log: LogHandle, options: &ModuleOptions) -> Self {
        let max_quantity = options
            .options()
            .and_then(|o| o.get("max_quantity"))
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_MAX_QUANTITY);

        Self::new(OrderServiceInner { db, log, max_quantity })
    }

    /// Stores a pending order.
    ///
    /// # Errors
    /// Returns [`OrderError::Validation`] for an empty or oversized quantity.
    pub fn place(&self, order: NewOrder) -> Result<Record, OrderError> {
        if order.quantity == 0 || order.quantity > self.max_quantity {
            return Err(OrderError::Validation {
                message: format!("quantity must be within 1..={}", self.max_quantity).into(),
                context: Some(format!("product {}", order.product_id).into()),
            });
        }

        let mut record = match serde_json::to_value(&order)? {
            Value::Object(record) => record,
            _ => return Err("order did not encode to an object".into()),
        };
        record.insert("status".into(), serde_json::to_value(OrderStatus::Pending)?);

        let stored = self.db.insert(ENTITY, record).context("placing order")?;
        let _scope = self.log.span().entered();
        info!(order_id = %stored["id"], customer_id = order.customer_id, "Order placed");
        Ok(stored)
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<Record> {
        self.db.get(ENTITY, &Value::from(id))
    }

    #[must_use]
    pub fn for_customer(&self, customer_id: u64) -> Vec<Record> {
        self.find(&[Filter::eq("customer_id", customer_id)])
    }

    #[must_use]
    pub fn find(&self, filters: &[Filter]) -> Vec<Record> {
        self.db.select(ENTITY, filters)
    }

    #[must_use]
    pub fn max_quantity(&self) -> u64 {
        self.max_quantity
    }
}

/// Factory of the `order` module.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderModule;

impl ModuleFactory for OrderModule {
    fn definition(&self) -> ModuleDefinition {
        ModuleDefinition::isolated(ORDER)
    }

    fn register_services(
        &self,
        container: &Container,
        options: &ModuleOptions,
    ) -> Result<(), ModuleError> {
        let db = container.resolve::<Database>(keys::PG_CONNECTION)?;
        let log = container.resolve::<LogHandle>(keys::LOGGER)?.child(ORDER);

        container.register_value(service_key(ORDER), OrderService::with_options(db, log, options));
        Ok(())
    }

    fn instantiate(&self, context: ModuleContext) -> Result<ModuleHandle, ModuleError> {
        let service = OrderService::with_options(
            context.connection()?,
            LogHandle::clone(&*context.logger()?),
            &context.options,
        );
        context.container.register_value(service_key(ORDER), service.clone());

        tracing::debug!(max_quantity = service.max_quantity(), "Order module isolated");
        Ok(Arc::new(IsolatedOrders { container: context.container, service }))
    }
}

/// Isolated instance of the `order` module.
#[derive(Debug)]
pub struct IsolatedOrders {
    container: Container,
    service: OrderService,
}

impl IsolatedOrders {
    #[must_use]
    pub const fn service(&self) -> &OrderService {
        &self.service
    }
}

impl IsolatedModule for IsolatedOrders {
    fn name(&self) -> &str {
        ORDER
    }

    fn container(&self) -> &Container {
        &self.container
    }

    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<Vec<Record>, ModuleError>> {
        Box::pin(async move {
            if request.entity != ENTITY {
                return Err(ModuleError::unsupported_entity(ORDER, &request.entity));
            }
            Ok(self.service.find(&request.filters))
        })
    }
}
