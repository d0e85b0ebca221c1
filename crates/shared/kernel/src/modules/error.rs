use crate::container::ContainerError;
use mosaic_database::DatabaseError;
use std::borrow::Cow;
use std::error::Error;

/// Errors raised by module factories and module handles.
#[mosaic_derive::mosaic_error]
pub enum ModuleError {
    /// A module-specific failure, boxed from the module's own error type.
    #[error("Module error{}: {source}", format_context(.context))]
    Module { source: Box<dyn Error + Send + Sync>, context: Option<Cow<'static, str>> },

    /// A binding the module needs is missing from its registry.
    #[error("Module dependency error{}: {source}", format_context(.context))]
    Container { source: ContainerError, context: Option<Cow<'static, str>> },

    #[error("Module storage error{}: {source}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    /// The module was asked for an entity it does not own.
    #[error("Unsupported entity{}: {message}", format_context(.context))]
    UnsupportedEntity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal module error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ModuleError {
    /// Boxes a module's own error type.
    pub fn module(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Module { source: Box::new(err), context: None }
    }

    pub fn unsupported_entity(module: &str, entity: &str) -> Self {
        Self::UnsupportedEntity {
            message: entity.to_owned().into(),
            context: Some(format!("module '{module}'").into()),
        }
    }
}
