use mosaic_database::DatabaseError;
use std::borrow::Cow;

/// A specialized [`CustomerError`] enum of this crate.
#[mosaic_derive::mosaic_error]
pub enum CustomerError {
    #[error("Invalid customer{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Another customer already uses the email address.
    #[error("Customer already exists{}: {message}", format_context(.context))]
    Conflict { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Customer storage error{}: {source}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Internal customer error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
