use std::borrow::Cow;

/// Failures raised while resolving registry bindings.
#[mosaic_derive::mosaic_error]
pub enum ContainerError {
    /// No binding for the key anywhere in the scope chain.
    #[error("Unresolved key '{message}'{}", format_context(.context))]
    UnresolvedKey { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The binding exists but holds another type.
    #[error("Type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A factory or lazy producer reported an error.
    #[error("Factory failed{}: {message}", format_context(.context))]
    Factory { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal container error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ContainerError {
    pub(crate) fn unresolved(key: &str) -> Self {
        Self::UnresolvedKey { message: key.to_owned().into(), context: None }
    }

    pub(crate) fn producing(key: &str, cause: &Self) -> Self {
        Self::Factory { message: format!("'{key}': {cause}").into(), context: None }
    }

    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::UnresolvedKey { .. })
    }
}
