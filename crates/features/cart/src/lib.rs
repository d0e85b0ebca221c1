//! Cart module.
//!
//! A legacy module: it is always wired into the process registry and never isolated.
//! Carts live in memory; checkout turns every line into an order through the order
//! services found in the same registry, which only exist there in legacy-only mode.

mod error;

pub use error::{CartError, CartErrorExt};

use fxhash::FxHashMap;
use mosaic_domain::constants::{keys, modules::CART, modules::ORDER};
use mosaic_domain::modules::{ModuleDefinition, ModuleOptions, service_key};
use mosaic_domain::query::Record;
use mosaic_kernel::container::Container;
use mosaic_kernel::modules::{ModuleContext, ModuleError, ModuleFactory, ModuleHandle};
use mosaic_logger::LogHandle;
use mosaic_order::{NewOrder, OrderService};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One product line of a cart. Amounts are in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: u64,
    pub quantity: u64,
    pub unit_amount: u64,
}

impl LineItem {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.unit_amount.saturating_mul(self.quantity)
    }
}

/// In-memory carts keyed by cart id.
#[mosaic_derive::mosaic_service]
pub struct CartService {
    carts: Mutex<FxHashMap<String, Vec<LineItem>>>,
    log: LogHandle,
}

impl CartService {
    #[must_use]
    pub fn open(log: LogHandle) -> Self {
        Self::new(CartServiceInner { carts: Mutex::default(), log })
    }

    /// Adds `item`, merging quantities with an existing line of the same product and price.
    ///
    /// # Errors
    /// Returns [`CartError::Validation`] for a zero quantity.
    pub fn add_item(&self, cart_id: &str, item: LineItem) -> Result<Vec<LineItem>, CartError> {
        if item.quantity == 0 {
            return Err(CartError::Validation {
                message: "quantity must be positive".into(),
                context: Some(cart_id.to_owned().into()),
            });
        }

        let mut carts = self.carts.lock();
        let lines = carts.entry(cart_id.to_owned()).or_default();
        match lines
            .iter_mut()
            .find(|line| line.product_id == item.product_id && line.unit_amount == item.unit_amount)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
            None => lines.push(item),
        }
        Ok(lines.clone())
    }

    /// Removes every line of `product_id`; returns whether anything was removed.
    pub fn remove_item(&self, cart_id: &str, product_id: u64) -> bool {
        let mut carts = self.carts.lock();
        let Some(lines) = carts.get_mut(cart_id) else {
            return false;
        };
        let before = lines.len();
        lines.retain(|line| line.product_id != product_id);
        before != lines.len()
    }

    #[must_use]
    pub fn items(&self, cart_id: &str) -> Vec<LineItem> {
        self.carts.lock().get(cart_id).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn total(&self, cart_id: &str) -> u64 {
        self.items(cart_id).iter().map(LineItem::total).fold(0, u64::saturating_add)
    }

    pub fn clear(&self, cart_id: &str) {
        self.carts.lock().remove(cart_id);
    }

    /// Places one order per line through the order services bound in `registry`. Placed
    /// lines leave the cart, so a retried checkout never orders them twice.
    ///
    /// # Errors
    /// Returns [`CartError::Empty`] for an empty cart, [`CartError::Dependency`] if
    /// `registry` holds no order services, [`CartError::Validation`] if a line exceeds the
    /// order limit (nothing is placed then) and [`CartError::Order`] if an order is rejected.
    pub fn checkout(
        &self,
        cart_id: &str,
        customer_id: u64,
        registry: &Container,
    ) -> Result<Vec<Record>, CartError> {
        let lines = self.items(cart_id);
        if lines.is_empty() {
            return Err(CartError::Empty { message: cart_id.to_owned().into(), context: None });
        }

        let orders = registry.resolve::<OrderService>(&service_key(ORDER)).context("checkout")?;
        let limit = orders.max_quantity();
        if let Some(line) = lines.iter().find(|line| line.quantity > limit) {
            return Err(CartError::Validation {
                message: format!("product {} exceeds the order limit of {limit}", line.product_id).into(),
                context: Some(cart_id.to_owned().into()),
            });
        }

        let mut placed = Vec::with_capacity(lines.len());
        for line in &lines {
            let order = NewOrder {
                customer_id,
                product_id: line.product_id,
                quantity: line.quantity,
                total: line.total(),
            };
            match orders.place(order) {
                Ok(record) => placed.push(record),
                Err(source) => {
                    self.take_lines(cart_id, &lines[..placed.len()]);
                    return Err(CartError::Order {
                        source,
                        context: Some(format!("cart '{cart_id}'").into()),
                    });
                },
            }
        }

        self.take_lines(cart_id, &lines);
        let _scope = self.log.span().entered();
        info!(cart_id, customer_id, orders = placed.len(), "Cart checked out");
        Ok(placed)
    }

    /// Removes one occurrence of each of `taken` from the cart, dropping the cart once empty.
    fn take_lines(&self, cart_id: &str, taken: &[LineItem]) {
        let mut carts = self.carts.lock();
        let Some(lines) = carts.get_mut(cart_id) else {
            return;
        };
        for item in taken {
            if let Some(index) = lines.iter().position(|line| line == item) {
                lines.remove(index);
            }
        }
        if lines.is_empty() {
            carts.remove(cart_id);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CartModule;

impl ModuleFactory for CartModule {
    fn definition(&self) -> ModuleDefinition {
        ModuleDefinition::legacy(CART)
    }

    fn register_services(&self, container: &Container, _: &ModuleOptions) -> Result<(), ModuleError> {
        let log = container.resolve::<LogHandle>(keys::LOGGER)?.child(CART);
        container.register_value(service_key(CART), CartService::open(log));
        tracing::debug!(module = CART, "Cart services registered");
        Ok(())
    }

    fn instantiate(&self, _: ModuleContext) -> Result<ModuleHandle, ModuleError> {
        Err(ModuleError::Internal {
            message: "cart is a legacy module".into(),
            context: Some("it only runs in the shared registry".into()),
        })
    }
}
