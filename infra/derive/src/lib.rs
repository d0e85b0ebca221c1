#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by every `mosaic` crate.
//!
//! * [`macro@mosaic_error`] turns a named-field enum into a `thiserror` error with
//!   context support.
//! * [`macro@mosaic_service`] splits a module service into an `Inner` state struct and a
//!   cheaply cloneable handle that can be bound into a registry.
//!
//! Examples are `ignore`d here because they reference the consuming crates.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemStruct, parse_macro_input};

/// Attribute macro for domain error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait adding `.context(...)`
///   to `Result<T, Name>` and to `Result<T, Source>` for every variant with a source.
/// * **Standard Conversions**: `From<Source>` for variants with a `source` field (or a field
///   marked `#[source]`/`#[from]`), so `?` works on upstream errors.
/// * **Internal Fallback**: `From<&'static str>` and `From<String>` when an `Internal`
///   variant exists.
///
/// # Requirements
///
/// 1. Only enums are accepted, and every variant must use named fields.
/// 2. Context fields must be typed `Option<Cow<'static, str>>`.
/// 3. A variant with a source must also carry a context field, and no other fields.
/// 4. One annotated enum per module: the macro emits a module-level `format_context` helper.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[mosaic_derive::mosaic_error]
/// pub enum ModuleError {
///     #[error("Storage error{}: {source}", format_context(.context))]
///     Storage { source: mosaic_database::DatabaseError, context: Option<Cow<'static, str>> },
///
///     #[error("Internal module error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load(db: &Database) -> Result<(), ModuleError> {
///     db.ensure_table("order").context("Preparing order table")?;
///     Err("not implemented".into())
/// }
/// ```
#[proc_macro_attribute]
pub fn mosaic_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Attribute macro to define a module service handle.
///
/// `struct OrderService { .. }` becomes `OrderServiceInner { .. }` holding the state and
/// `OrderService`, an `Arc` wrapper that implements `Clone`, `Deref<Target = OrderServiceInner>`
/// and `From<OrderServiceInner>`.
///
/// # Example
/// ```rust,ignore
/// #[mosaic_derive::mosaic_service]
/// pub struct OrderService {
///     db: Database,
/// }
///
/// let service = OrderService::new(OrderServiceInner { db });
/// ```
#[proc_macro_attribute]
pub fn mosaic_service(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::service::expand_service(input).into()
}
