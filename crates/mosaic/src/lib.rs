//! Facade crate for the Mosaic platform.
//! Re-exports domain/kernel primitives and assembles the compiled-in modules.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Add `mosaic` (with `server` for the HTTP surface).
//! - Call [`bootstrapper`] with the deployment configuration and run it.

pub use mosaic_domain as domain;
pub use mosaic_kernel as kernel;

use mosaic_domain::config::AppConfig;
use mosaic_domain::constants::modules::{CUSTOMER, ORDER, PRICING, PRODUCT};
use mosaic_domain::joiner::{JoinerConfig, JoinerRelation};
use mosaic_kernel::bootstrap::{Bootstrapper, TracingObserver};
use mosaic_kernel::flags::FlagDefinition;
use modules::{customer, order, pricing, product};

#[cfg(feature = "server")]
pub mod server {
    pub use mosaic_kernel::server::{RequestContext, platform_router, request_scope};
}

/// Modules compiled into this build.
pub mod modules {
    pub use mosaic_cart as cart;
    pub use mosaic_customer as customer;
    pub use mosaic_order as order;
    pub use mosaic_pricing as pricing;
    pub use mosaic_product as product;

    use mosaic_domain::constants::modules::{CART, CUSTOMER, ORDER, PRICING, PRODUCT};
    use mosaic_domain::modules::ModuleCatalog;
    use mosaic_kernel::modules::ModuleSet;

    pub const COMPILED: &[&str] = &[CART, CUSTOMER, ORDER, PRICING, PRODUCT];

    /// Factories of every compiled-in module.
    #[must_use]
    pub fn module_set() -> ModuleSet {
        ModuleSet::new()
            .with(cart::CartModule)
            .with(customer::CustomerModule)
            .with(order::OrderModule)
            .with(pricing::PricingModule)
            .with(product::ProductModule)
    }

    /// The compiled-in module catalog.
    #[must_use]
    pub fn catalog() -> ModuleCatalog {
        module_set().catalog()
    }
}

/// Entity ownership and relations between the compiled-in modules.
#[must_use]
pub fn joiner_config() -> JoinerConfig {
    JoinerConfig::new()
        .entity(order::ENTITY, ORDER)
        .entity(customer::ENTITY, CUSTOMER)
        .entity(product::ENTITY, PRODUCT)
        .entity(pricing::ENTITY, PRICING)
        .relation(
            JoinerRelation::new(order::ENTITY, "customer", customer::ENTITY, "customer_id", "id")
                .one_to_one(),
        )
        .relation(JoinerRelation::new(customer::ENTITY, "orders", order::ENTITY, "id", "customer_id"))
        .relation(
            JoinerRelation::new(order::ENTITY, "product", product::ENTITY, "product_id", "id")
                .one_to_one(),
        )
        .relation(JoinerRelation::new(product::ENTITY, "prices", pricing::ENTITY, "id", "product_id"))
        .relation(
            JoinerRelation::new(pricing::ENTITY, "product", product::ENTITY, "product_id", "id")
                .one_to_one(),
        )
}

/// Flags declared by modules on top of the kernel's built-in ones.
#[must_use]
pub fn module_flags() -> Vec<FlagDefinition> {
    pricing::FLAGS.to_vec()
}

/// A bootstrapper wired with every compiled-in module, the join configuration, module
/// flags and phase logging. Callers add hooks, observers and the logger.
#[must_use]
pub fn bootstrapper(config: AppConfig) -> Bootstrapper {
    module_flags()
        .into_iter()
        .fold(Bootstrapper::new(config), Bootstrapper::flag)
        .modules(modules::module_set())
        .joiner(joiner_config())
        .observer(TracingObserver)
}

