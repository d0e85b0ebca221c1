//! Pricing module: per-product prices and quotes.
//!
//! Owns the `price` entity. Prices are append-only; the latest price of a product in a
//! currency wins. Amounts are integers in minor currency units, tax rates are basis points.
//!
//! Whether stored prices already include tax is a platform-wide switch
//! ([`TAX_INCLUSIVE_FLAG`]), so the module declares a dependency on the flag router.

mod error;

pub use error::{PricingError, PricingErrorExt};

use mosaic_database::Database;
use mosaic_domain::constants::{keys, modules::PRICING};
use mosaic_domain::modules::{ModuleDefinition, ModuleOptions, service_key};
use mosaic_domain::query::{Filter, Record};
use mosaic_kernel::BoxFuture;
use mosaic_kernel::container::Container;
use mosaic_kernel::flags::{FlagDefinition, FlagRouter};
use mosaic_kernel::modules::{
    FetchRequest, IsolatedModule, ModuleContext, ModuleError, ModuleFactory, ModuleHandle,
};
use mosaic_logger::LogHandle;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

pub const ENTITY: &str = "price";

/// When on, stored prices are gross amounts.
pub const TAX_INCLUSIVE_FLAG: &str = "tax_inclusive_prices";

/// Flags contributed by this module.
pub const FLAGS: &[FlagDefinition] = &[FlagDefinition {
    key: TAX_INCLUSIVE_FLAG,
    default: false,
    description: "Stored prices already include tax",
}];

const DEFAULT_CURRENCY: &str = "USD";
const BPS: u128 = 10_000;

/// Price breakdown for a quantity of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub product_id: u64,
    pub currency: String,
    pub quantity: u64,
    pub unit_amount: u64,
    pub net: u64,
    pub tax: u64,
    pub gross: u64,
}

/// Settings read from `moduleOptions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingSettings {
    /// `options.currency`, used when a call names none.
    pub currency: String,
    /// `options.tax_rate_bps`.
    pub tax_rate_bps: u64,
    pub tax_inclusive: bool,
}

impl PricingSettings {
    #[must_use]
    pub fn resolve(options: &ModuleOptions, flags: &FlagRouter) -> Self {
        let currency =
            options.option_str("currency").map_or_else(|| DEFAULT_CURRENCY.to_owned(), str::to_ascii_uppercase);
        let tax_rate_bps =
            options.options().and_then(|o| o.get("tax_rate_bps")).and_then(Value::as_u64).unwrap_or(0);

        Self { currency, tax_rate_bps, tax_inclusive: flags.is_feature_enabled(TAX_INCLUSIVE_FLAG) }
    }
}

#[mosaic_derive::mosaic_service]
pub struct PricingService {
    db: Arc<Database>,
    log: LogHandle,
    settings: PricingSettings,
}

impl PricingService {
    #[must_use]
    pub fn open(db: Arc<Database>, log: LogHandle, settings: PricingSettings) -> Self {
        Self::new(PricingServiceInner { db, log, settings })
    }

    #[must_use]
    pub fn settings(&self) -> &PricingSettings {
        &self.settings
    }

    /// Records a new price for `product_id`.
    ///
    /// # Errors
    /// Returns [`PricingError::Validation`] unless the currency is a three-letter code.
    pub fn set_price(
        &self,
        product_id: u64,
        amount: u64,
        currency: Option<&str>,
    ) -> Result<Record, PricingError> {
        let currency = self.currency(currency)?;

        let mut record = Map::new();
        record.insert("product_id".into(), Value::from(product_id));
        record.insert("amount".into(), Value::from(amount));
        record.insert("currency".into(), Value::from(currency.as_str()));

        let stored = self.db.insert(ENTITY, record).context("setting price")?;
        let _scope = self.log.span().entered();
        debug!(product_id, amount, currency = %currency, "Price set");
        Ok(stored)
    }

    /// The current price record of a product.
    #[must_use]
    pub fn price_for(&self, product_id: u64, currency: Option<&str>) -> Option<Record> {
        let currency = self.currency(currency).ok()?;
        self.db
            .select(ENTITY, &[Filter::eq("product_id", product_id), Filter::eq("currency", currency)])
            .pop()
    }

    /// Prices `quantity` units of a product.
    ///
    /// # Errors
    /// Returns [`PricingError::NotFound`] if the product has no price in the currency and
    /// [`PricingError::Validation`] when an amount does not fit in `u64`.
    pub fn quote(
        &self,
        product_id: u64,
        quantity: u64,
        currency: Option<&str>,
    ) -> Result<Quote, PricingError> {
        let currency = self.currency(currency)?;
        let price = self.price_for(product_id, Some(&currency)).ok_or_else(|| {
            PricingError::NotFound {
                message: format!("product {product_id}").into(),
                context: Some(currency.clone().into()),
            }
        })?;

        let unit_amount = price
            .get("amount")
            .and_then(Value::as_u64)
            .ok_or("stored price has no amount")?;
        let total = u128::from(amount(u128::from(unit_amount) * u128::from(quantity), "total")?);
        let rate = u128::from(self.settings.tax_rate_bps);

        let (net, tax) = if self.settings.tax_inclusive {
            let net = div_round(total * BPS, BPS + rate);
            (net, total - net)
        } else {
            (total, div_round(total * rate, BPS))
        };

        Ok(Quote {
            product_id,
            currency,
            quantity,
            unit_amount,
            net: amount(net, "net")?,
            tax: amount(tax, "tax")?,
            gross: amount(net + tax, "gross")?,
        })
    }

    #[must_use]
    pub fn find(&self, filters: &[Filter]) -> Vec<Record> {
        self.db.select(ENTITY, filters)
    }

    fn currency(&self, currency: Option<&str>) -> Result<String, PricingError> {
        let code = currency.map_or_else(|| self.settings.currency.clone(), str::to_ascii_uppercase);
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(code)
        } else {
            Err(PricingError::Validation { message: format!("bad currency '{code}'").into(), context: None })
        }
    }
}

/// Integer division rounding half up.
const fn div_round(value: u128, divisor: u128) -> u128 {
    (value + divisor / 2) / divisor
}

fn amount(value: u128, part: &'static str) -> Result<u64, PricingError> {
    u64::try_from(value).map_err(|_| PricingError::Validation {
        message: format!("{part} amount {value} exceeds the supported range").into(),
        context: Some("quote".into()),
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PricingModule;

impl PricingModule {
    fn service(container: &Container, log: LogHandle, options: &ModuleOptions) -> Result<PricingService, ModuleError> {
        let db = container.resolve::<Database>(keys::PG_CONNECTION)?;
        let flags = container.resolve::<FlagRouter>(keys::FLAG_ROUTER)?;
        Ok(PricingService::open(db, log, PricingSettings::resolve(options, &flags)))
    }
}

impl ModuleFactory for PricingModule {
    fn definition(&self) -> ModuleDefinition {
        ModuleDefinition::isolated(PRICING).depends_on(keys::FLAG_ROUTER)
    }

    fn register_services(&self, container: &Container, options: &ModuleOptions) -> Result<(), ModuleError> {
        let log = container.resolve::<LogHandle>(keys::LOGGER)?.child(PRICING);
        container.register_value(service_key(PRICING), Self::service(container, log, options)?);
        Ok(())
    }

    fn instantiate(&self, context: ModuleContext) -> Result<ModuleHandle, ModuleError> {
        let log = LogHandle::clone(&*context.logger()?);
        let service = Self::service(&context.container, log, &context.options)?;
        context.container.register_value(service_key(PRICING), service.clone());
        Ok(Arc::new(IsolatedPricing { container: context.container, service }))
    }
}

#[derive(Debug)]
pub struct IsolatedPricing {
    container: Container,
    service: PricingService,
}

impl IsolatedModule for IsolatedPricing {
    fn name(&self) -> &str {
        PRICING
    }

    fn container(&self) -> &Container {
        &self.container
    }

    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<Vec<Record>, ModuleError>> {
        Box::pin(async move {
            match request.entity.as_str() {
                ENTITY => Ok(self.service.find(&request.filters)),
                other => Err(ModuleError::unsupported_entity(PRICING, other)),
            }
        })
    }
}
