use crate::modules::ModuleError;
use std::borrow::Cow;

/// Request-time failures of [`RemoteQuery::resolve`](super::RemoteQuery::resolve).
///
/// Never fatal to the process; the HTTP layer turns them into client errors.
#[mosaic_derive::mosaic_error]
pub enum FederationError {
    /// The query shape is not a single-rooted object of relations.
    #[error("Invalid query shape{}: {message}", format_context(.context))]
    InvalidShape { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The entity is not declared in the join configuration.
    #[error("Unknown entity '{message}'{}", format_context(.context))]
    UnknownEntity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The relation alias is not declared on the parent entity.
    #[error("Unknown relation '{message}'{}", format_context(.context))]
    UnknownRelation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The owning module was never activated.
    #[error("Module '{message}' is not active{}", format_context(.context))]
    InactiveModule { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The owning module failed to serve the fetch.
    #[error("Module fetch failed{}: {source}", format_context(.context))]
    Module { source: ModuleError, context: Option<Cow<'static, str>> },
}

impl FederationError {
    pub(crate) fn invalid_shape(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidShape { message: message.into(), context: None }
    }
}
