//! Product catalog module.
//!
//! Owns the `product` entity. Products are addressed by numeric id or by a unique, URL-safe
//! handle derived from the title unless one is supplied.

mod error;

pub use error::{ProductError, ProductErrorExt};

use mosaic_database::Database;
use mosaic_domain::constants::{keys, modules::PRODUCT};
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
use tracing::{debug, info};

pub const ENTITY: &str = "product";

/// Input of [`ProductService::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewProduct {
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }
}

#[mosaic_derive::mosaic_service]
pub struct ProductService {
    db: Arc<Database>,
    log: LogHandle,
}

impl ProductService {
    #[must_use]
    pub fn open(db: Arc<Database>, log: LogHandle) -> Self {
        Self::new(ProductServiceInner { db, log })
    }

    /// # Errors
    /// Returns [`ProductError::Validation`] for a blank title or a title without any
    /// handle-safe characters and [`ProductError::Conflict`] for a taken handle.
    pub fn create(&self, mut product: NewProduct) -> Result<Record, ProductError> {
        if product.title.trim().is_empty() {
            return Err(ProductError::Validation { message: "title is empty".into(), context: None });
        }

        let handle = slugify(product.handle.as_deref().unwrap_or(&product.title));
        if handle.is_empty() {
            return Err(ProductError::Validation {
                message: "handle has no usable characters".into(),
                context: Some(product.title.into()),
            });
        }
        if self.by_handle(&handle).is_some() {
            return Err(ProductError::Conflict { message: handle.into(), context: None });
        }
        product.handle = Some(handle);

        let Value::Object(record) = serde_json::to_value(&product)? else {
            return Err("product did not encode to an object".into());
        };
        let stored = self.db.insert(ENTITY, record).context("creating product")?;
        let _scope = self.log.span().entered();
        info!(product_id = %stored["id"], handle = %stored["handle"], "Product created");
        Ok(stored)
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<Record> {
        self.db.get(ENTITY, &Value::from(id))
    }

    #[must_use]
    pub fn by_handle(&self, handle: &str) -> Option<Record> {
        self.db.select(ENTITY, &[Filter::eq("handle", handle)]).into_iter().next()
    }

    #[must_use]
    pub fn find(&self, filters: &[Filter]) -> Vec<Record> {
        self.db.select(ENTITY, filters)
    }
}

/// Lowercase ASCII alphanumerics joined by single dashes.
fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProductModule;

impl ModuleFactory for ProductModule {
    fn definition(&self) -> ModuleDefinition {
        ModuleDefinition::isolated(PRODUCT)
    }

    fn register_services(&self, container: &Container, _: &ModuleOptions) -> Result<(), ModuleError> {
        let db = container.resolve::<Database>(keys::PG_CONNECTION)?;
        let log = container.resolve::<LogHandle>(keys::LOGGER)?.child(PRODUCT);
        container.register_value(service_key(PRODUCT), ProductService::open(db, log));
        Ok(())
    }

    fn instantiate(&self, context: ModuleContext) -> Result<ModuleHandle, ModuleError> {
        let service = ProductService::open(context.connection()?, LogHandle::clone(&*context.logger()?));
        context.container.register_value(service_key(PRODUCT), service.clone());
        debug!("Product module isolated");
        Ok(Arc::new(IsolatedProducts { container: context.container, service }))
    }
}

#[derive(Debug)]
pub struct IsolatedProducts {
    container: Container,
    service: ProductService,
}

impl IsolatedModule for IsolatedProducts {
    fn name(&self) -> &str {
        PRODUCT
    }

    fn container(&self) -> &Container {
        &self.container
    }

    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<Vec<Record>, ModuleError>> {
        Box::pin(async move {
            match request.entity.as_str() {
                ENTITY => Ok(self.service.find(&request.filters)),
                other => Err(ModuleError::unsupported_entity(PRODUCT, other)),
            }
        })
    }
}
