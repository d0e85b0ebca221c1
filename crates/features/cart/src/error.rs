use mosaic_kernel::container::ContainerError;
use mosaic_order::OrderError;
use std::borrow::Cow;

/// A specialized [`CartError`] enum of this crate.
#[mosaic_derive::mosaic_error]
pub enum CartError {
    #[error("Invalid cart operation{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Cart is empty{}: {message}", format_context(.context))]
    Empty { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A service the cart relies on is not in the registry.
    #[error("Cart dependency error{}: {source}", format_context(.context))]
    Dependency { source: ContainerError, context: Option<Cow<'static, str>> },

    #[error("Checkout failed{}: {source}", format_context(.context))]
    Order { source: OrderError, context: Option<Cow<'static, str>> },

    #[error("Internal cart error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
