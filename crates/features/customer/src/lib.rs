//! Customer module. Owns the `customer` entity.

mod error;

pub use error::{CustomerError, CustomerErrorExt};

use mosaic_database::Database;
use mosaic_domain::constants::{keys, modules::CUSTOMER};
use mosaic_domain::modules::{ModuleDefinition, ModuleOptions, service_key};
use mosaic_domain::query::{Filter, Record};
use mosaic_kernel::BoxFuture;
use mosaic_kernel::container::Container;
use mosaic_kernel::modules::{
    FetchRequest, IsolatedModule, ModuleContext, ModuleError, ModuleFactory, ModuleHandle,
};
use mosaic_logger::LogHandle;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

pub const ENTITY: &str = "customer";

/// Customer registration and lookup.
#[mosaic_derive::mosaic_service]
pub struct CustomerService {
    db: Arc<Database>,
    log: LogHandle,
}

impl CustomerService {
    #[must_use]
    pub fn open(db: Arc<Database>, log: LogHandle) -> Self {
        Self::new(CustomerServiceInner { db, log })
    }

    /// Registers a customer. Emails are stored lowercased and must be unique.
    ///
    /// # Errors
    /// Returns [`CustomerError::Validation`] for a blank name or malformed email and
    /// [`CustomerError::Conflict`] if the email is taken.
    pub fn register(&self, name: &str, email: &str) -> Result<Record, CustomerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CustomerError::Validation { message: "name is empty".into(), context: None });
        }

        let email = normalize_email(email).ok_or_else(|| CustomerError::Validation {
            message: format!("'{email}' is not an email address").into(),
            context: None,
        })?;
        if self.find_by_email(&email).is_some() {
            return Err(CustomerError::Conflict { message: email.into(), context: None });
        }

        let mut record = Map::new();
        record.insert("name".into(), Value::from(name));
        record.insert("email".into(), Value::from(email));

        let stored = self.db.insert(ENTITY, record).context("registering customer")?;
        let _scope = self.log.span().entered();
        info!(customer_id = %stored["id"], "Customer registered");
        Ok(stored)
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<Record> {
        self.db.get(ENTITY, &Value::from(id))
    }

    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<Record> {
        let email = normalize_email(email)?;
        self.db.select(ENTITY, &[Filter::eq("email", email)]).into_iter().next()
    }

    #[must_use]
    pub fn find(&self, filters: &[Filter]) -> Vec<Record> {
        self.db.select(ENTITY, filters)
    }
}

fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    (!local.is_empty() && domain.contains('.') && !domain.starts_with('.')).then_some(email)
}

/// Factory of the `customer` module.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerModule;

impl ModuleFactory for CustomerModule {
    fn definition(&self) -> ModuleDefinition {
        ModuleDefinition::isolated(CUSTOMER)
    }

    fn register_services(&self, container: &Container, _: &ModuleOptions) -> Result<(), ModuleError> {
        let db = container.resolve::<Database>(keys::PG_CONNECTION)?;
        let log = container.resolve::<LogHandle>(keys::LOGGER)?.child(CUSTOMER);
        container.register_value(service_key(CUSTOMER), CustomerService::open(db, log));
        Ok(())
    }

    fn instantiate(&self, context: ModuleContext) -> Result<ModuleHandle, ModuleError> {
        let service = CustomerService::open(context.connection()?, LogHandle::clone(&*context.logger()?));
        context.container.register_value(service_key(CUSTOMER), service.clone());
        Ok(Arc::new(IsolatedCustomers { container: context.container, service }))
    }
}

/// Isolated instance of the `customer` module.
#[derive(Debug)]
pub struct IsolatedCustomers {
    container: Container,
    service: CustomerService,
}

impl IsolatedModule for IsolatedCustomers {
    fn name(&self) -> &str {
        CUSTOMER
    }

    fn container(&self) -> &Container {
        &self.container
    }

    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<Vec<Record>, ModuleError>> {
        Box::pin(async move {
            match request.entity.as_str() {
                ENTITY => Ok(self.service.find(&request.filters)),
                other => Err(ModuleError::unsupported_entity(CUSTOMER, other)),
            }
        })
    }
}
