use crate::bootstrap::Phase;
use crate::container::ContainerError;
use crate::modules::ModuleError;
use mosaic_database::DatabaseError;
use std::borrow::Cow;

/// Startup failures. None of them are recovered locally; they end the process.
#[mosaic_derive::mosaic_error]
pub enum KernelError {
    /// Malformed or inconsistent deployment configuration.
    #[error("Configuration error{}: {message}", format_context(.context))]
    Configuration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Registry error{}: {source}", format_context(.context))]
    Container { source: ContainerError, context: Option<Cow<'static, str>> },

    /// The connection loader could not provide a handle.
    #[error("Connection error{}: {source}", format_context(.context))]
    Connection { source: DatabaseError, context: Option<Cow<'static, str>> },

    /// An isolated module could not be constructed.
    #[error("Module instantiation failed{}: {source}", format_context(.context))]
    ModuleInstantiation { source: ModuleError, context: Option<Cow<'static, str>> },

    /// A phase step or hook failed; later phases did not run.
    #[error("Phase '{phase}' failed{}: {cause}", format_context(.context))]
    PhaseFailure { phase: Phase, cause: Box<KernelError>, context: Option<Cow<'static, str>> },

    #[error("Internal kernel error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl KernelError {
    pub(crate) fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Configuration { message: message.into(), context: None }
    }

    /// The phase that aborted startup, if this is a phase failure.
    #[must_use]
    pub const fn failed_phase(&self) -> Option<Phase> {
        match self {
            Self::PhaseFailure { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Unwraps a phase failure down to its underlying error.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::PhaseFailure { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}
