//! Hierarchical dependency registry.
//!
//! A [`Container`] is one scope: a private layer of bindings plus an optional parent. Lookups
//! walk from the current scope up to the root; writes only ever touch the current layer. The
//! process-wide registry is the root scope, request handlers work on short-lived children.
//!
//! ```rust
//! use mosaic_kernel::container::Container;
//!
//! let root = Container::new();
//! root.register_value("currency", "EUR".to_owned());
//!
//! let request = root.create_scope();
//! request.register_value("requestId", 7_u64);
//!
//! assert_eq!(request.resolve::<String>("currency").unwrap().as_str(), "EUR");
//! assert!(root.resolve::<u64>("requestId").is_err());
//! ```

mod error;

pub use error::{ContainerError, ContainerErrorExt};

use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::{Arc, OnceLock};

type AnyArc = Arc<dyn Any + Send + Sync>;
type Producer = Arc<dyn Fn(&Container) -> Result<AnyArc, ContainerError> + Send + Sync>;

#[derive(Clone)]
enum BindingKind {
    Value(AnyArc),
    /// Invoked on every resolve with the resolving scope.
    Factory(Producer),
    /// Invoked once with the owning scope; the result is cached in the binding. `origin` is
    /// set on imported copies and names the scope the binding was registered in.
    Lazy { producer: Producer, cell: Arc<OnceLock<AnyArc>>, origin: Option<Arc<ScopeInner>> },
}

#[derive(Clone)]
struct Binding {
    kind: BindingKind,
    type_name: &'static str,
}

struct ScopeInner {
    parent: Option<Arc<ScopeInner>>,
    depth: usize,
    bindings: RwLock<FxHashMap<String, Binding>>,
}

impl ScopeInner {
    /// Finds `key` in this scope or the nearest ancestor, returning the owning scope too.
    fn lookup(self: &Arc<Self>, key: &str) -> Option<(Arc<Self>, Binding)> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(binding) = current.bindings.read().get(key) {
                return Some((Arc::clone(current), binding.clone()));
            }
            scope = current.parent.as_ref();
        }
        None
    }
}

/// A registry scope. Cloning is cheap and yields a handle to the same scope.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ScopeInner>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates an empty root scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                parent: None,
                depth: 0,
                bindings: RwLock::new(FxHashMap::default()),
            }),
        }
    }

    /// Creates a child scope. The child sees every binding of its ancestors, now and later,
    /// while its own registrations stay private to it.
    #[must_use]
    pub fn create_scope(&self) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                parent: Some(Arc::clone(&self.inner)),
                depth: self.inner.depth + 1,
                bindings: RwLock::new(FxHashMap::default()),
            }),
        }
    }

    /// Binds a ready value, replacing any binding of `key` in this scope.
    pub fn register_value<T>(&self, key: impl Into<String>, value: T) -> &Self
    where
        T: Any + Send + Sync,
    {
        self.register_arc(key, Arc::new(value))
    }

    /// Binds an already shared value without re-wrapping it.
    pub fn register_arc<T>(&self, key: impl Into<String>, value: Arc<T>) -> &Self
    where
        T: Any + Send + Sync,
    {
        self.bind(key.into(), BindingKind::Value(value), type_name::<T>())
    }

    /// Binds a transient producer, invoked on every resolve.
    pub fn register_factory<T, F>(&self, key: impl Into<String>, factory: F) -> &Self
    where
        T: Any + Send + Sync,
        F: Fn(&Self) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.bind(key.into(), BindingKind::Factory(erase(factory)), type_name::<T>())
    }

    /// Binds a singleton produced on first resolve and cached in this scope.
    pub fn register_lazy<T, F>(&self, key: impl Into<String>, factory: F) -> &Self
    where
        T: Any + Send + Sync,
        F: Fn(&Self) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        let kind =
            BindingKind::Lazy { producer: erase(factory), cell: Arc::new(OnceLock::new()), origin: None };
        self.bind(key.into(), kind, type_name::<T>())
    }

    /// Copies the binding of `key`, as seen from `from`, into this scope without resolving it.
    ///
    /// Lazy bindings keep sharing their cached singleton with the source and are always
    /// produced against the scope that registered them.
    ///
    /// # Errors
    /// Returns [`ContainerError::UnresolvedKey`] if `from` cannot see `key`.
    pub fn import(&self, from: &Self, key: &str) -> Result<&Self, ContainerError> {
        let (owner, mut binding) =
            from.inner.lookup(key).ok_or_else(|| ContainerError::unresolved(key))?;
        if let BindingKind::Lazy { origin: origin @ None, .. } = &mut binding.kind {
            *origin = Some(owner);
        }
        self.inner.bindings.write().insert(key.to_owned(), binding);
        Ok(self)
    }

    /// Resolves `key` as a `T`, searching this scope and then its ancestors.
    ///
    /// # Errors
    /// Returns [`ContainerError::UnresolvedKey`] when no scope binds `key`,
    /// [`ContainerError::TypeMismatch`] when the binding holds another type, and
    /// [`ContainerError::Factory`] when a producer fails.
    pub fn resolve<T>(&self, key: &str) -> Result<Arc<T>, ContainerError>
    where
        T: Any + Send + Sync,
    {
        let (owner, binding) =
            self.inner.lookup(key).ok_or_else(|| ContainerError::unresolved(key))?;

        let value = match binding.kind {
            BindingKind::Value(value) => value,
            BindingKind::Factory(producer) => {
                producer(self).map_err(|err| ContainerError::producing(key, &err))?
            },
            BindingKind::Lazy { producer, cell, origin } => match cell.get() {
                Some(value) => Arc::clone(value),
                None => {
                    let owner = Self { inner: origin.unwrap_or(owner) };
                    let produced =
                        producer(&owner).map_err(|err| ContainerError::producing(key, &err))?;
                    Arc::clone(cell.get_or_init(|| produced))
                },
            },
        };

        value.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
            message: format!("'{key}' holds {}, not {}", binding.type_name, type_name::<T>())
                .into(),
            context: None,
        })
    }

    /// Resolves `key`, mapping an absent binding to `None`. Other failures still surface.
    ///
    /// # Errors
    /// Same as [`Container::resolve`] except for [`ContainerError::UnresolvedKey`].
    pub fn try_resolve<T>(&self, key: &str) -> Result<Option<Arc<T>>, ContainerError>
    where
        T: Any + Send + Sync,
    {
        match self.resolve::<T>(key) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_unresolved() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Whether `key` is visible from this scope.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lookup(key).is_some()
    }

    /// Keys bound in this scope's own layer, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.bindings.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Number of ancestors; the root scope has depth `0`.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    fn bind(&self, key: String, kind: BindingKind, type_name: &'static str) -> &Self {
        tracing::trace!(key = %key, ty = type_name, depth = self.inner.depth, "Binding registered");
        self.inner.bindings.write().insert(key, Binding { kind, type_name });
        self
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("depth", &self.inner.depth)
            .field("keys", &self.keys())
            .finish()
    }
}

fn erase<T, F>(factory: F) -> Producer
where
    T: Any + Send + Sync,
    F: Fn(&Container) -> Result<T, ContainerError> + Send + Sync + 'static,
{
    Arc::new(move |scope: &Container| factory(scope).map(|value| Arc::new(value) as AnyArc))
}
