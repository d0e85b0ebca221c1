//! Well-known names shared between the kernel, the modules and the HTTP surface.

/// Feature flag that switches module resolution into isolated mode.
pub const ISOLATED_MODULES_FLAG: &str = "isolated_modules";

/// Registry keys bound by the bootstrap phases and the request middleware.
pub mod keys {
    pub const CONFIG: &str = "configModule";
    pub const LOGGER: &str = "logger";
    pub const FLAG_ROUTER: &str = "featureFlagRouter";
    pub const RUNTIME_MODE: &str = "runtimeMode";
    /// Shared lower-level connection handle.
    pub const PG_CONNECTION: &str = "pgConnection";
    pub const MERGED_MODULE_CONFIG: &str = "mergedModuleConfig";
    pub const MODULES: &str = "modules";
    pub const MODULE_OPTIONS: &str = "moduleOptions";
    pub const REMOTE_QUERY: &str = "remoteQuery";
    pub const REQUEST_CONTEXT: &str = "requestContext";
    /// Request-scoped connection manager.
    pub const MANAGER: &str = "manager";
}

/// Names of the modules compiled into the platform.
pub mod modules {
    pub const CART: &str = "cart";
    pub const CUSTOMER: &str = "customer";
    pub const ORDER: &str = "order";
    pub const PRICING: &str = "pricing";
    pub const PRODUCT: &str = "product";
}
