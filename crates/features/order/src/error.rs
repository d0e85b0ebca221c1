use mosaic_database::DatabaseError;
use std::borrow::Cow;

/// A specialized [`OrderError`] enum of this crate.
#[mosaic_derive::mosaic_error]
pub enum OrderError {
    /// The order cannot be placed as requested.
    #[error("Invalid order{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Order storage error{}: {source}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Order encoding error{}: {source}", format_context(.context))]
    Encoding { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal order error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
