//! # Database Infrastructure
//!
//! The lower-level connection handle shared by every module. Connection pooling and storage
//! engines live outside the platform core; this crate provides the handle shape the
//! bootstrap expects plus an in-process `mem://` engine that keeps schemaless records per
//! table.
//!
//! ## Example
//!
//! ```rust
//! use mosaic_database::{Database, DatabaseError};
//! use mosaic_domain::query::Filter;
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), DatabaseError> {
//!     let db = Database::builder().url("mem://").session("mosaic", "core").init().await?;
//!
//!     let row = serde_json::from_value(json!({ "title": "Mug" })).unwrap();
//!     let stored = db.insert("product", row)?;
//!     assert_eq!(stored["id"], json!(1));
//!
//!     let found = db.select("product", &[Filter::eq("title", "Mug")]);
//!     assert_eq!(found.len(), 1);
//!     Ok(())
//! }
//! ```

mod error;

pub use error::{DatabaseError, DatabaseErrorExt};

use fxhash::FxHashMap;
use mosaic_domain::query::{Filter, Record, link_key};
use parking_lot::RwLock;
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info};

const MEMORY_SCHEME: &str = "mem://";

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Record>,
    next_id: u64,
}

impl Table {
    fn assign_id(&mut self, record: &mut Record) -> Result<(), DatabaseError> {
        match record.get("id") {
            None | Some(Value::Null) => {
                self.next_id += 1;
                record.insert("id".to_owned(), Value::from(self.next_id));
            },
            Some(id) => {
                let key = link_key(id);
                if self.rows.iter().any(|row| row.get("id").and_then(link_key) == key) {
                    return Err(DatabaseError::Validation {
                        message: format!("Duplicate id {id}").into(),
                        context: None,
                    });
                }
                if let Some(n) = id.as_u64() {
                    self.next_id = self.next_id.max(n);
                }
            },
        }
        Ok(())
    }
}

/// Inner state of the [`Database`] handle.
#[derive(Debug)]
pub struct DatabaseInner {
    url: String,
    ns: String,
    db: String,
    tables: RwLock<FxHashMap<String, Table>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        debug!(ns = %self.ns, db = %self.db, "Connection handle dropped");
    }
}

impl DatabaseInner {
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.ns
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.db
    }

    /// Stores a record, assigning a numeric `id` when the record has none.
    ///
    /// # Errors
    /// Returns [`DatabaseError::Validation`] if a record with the same `id` already exists.
    pub fn insert(&self, table: &str, mut record: Record) -> Result<Record, DatabaseError> {
        let mut tables = self.tables.write();
        let table_state = tables.entry(table.to_owned()).or_default();
        table_state.assign_id(&mut record).context(format!("Inserting into '{table}'"))?;
        table_state.rows.push(record.clone());
        Ok(record)
    }

    /// Records of `table` matching every filter, in insertion order.
    #[must_use]
    pub fn select(&self, table: &str, filters: &[Filter]) -> Vec<Record> {
        let tables = self.tables.read();
        tables.get(table).map_or_else(Vec::new, |t| {
            t.rows.iter().filter(|row| filters.iter().all(|f| f.matches(row))).cloned().collect()
        })
    }

    #[must_use]
    pub fn get(&self, table: &str, id: &Value) -> Option<Record> {
        self.select(table, &[Filter::eq("id", id.clone())]).into_iter().next()
    }

    #[must_use]
    pub fn count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, |t| t.rows.len())
    }

    /// Liveness probe for the connection.
    ///
    /// # Errors
    /// Returns [`DatabaseError::Connection`] if the tables stay locked for over a second.
    #[allow(clippy::unused_async)]
    pub async fn health(&self) -> Result<(), DatabaseError> {
        self.tables
            .try_read_for(std::time::Duration::from_secs(1))
            .map(|_| ())
            .ok_or_else(|| DatabaseError::Connection {
                message: "Connection is busy".into(),
                context: Some(format!("{}/{}", self.ns, self.db).into()),
            })
    }

    /// Names of tables that have received at least one record, sorted.
    #[must_use]
    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

/// Cloneable connection handle.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates a new [`DatabaseBuilder`].
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Whether two handles point at the same connection.
    #[must_use]
    pub fn same_connection(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Deref for Database {
    type Target = DatabaseInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// A fluent builder for configuring and establishing a connection.
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    url: Option<String>,
    ns: Option<String>,
    db: Option<String>,
}

impl DatabaseBuilder {
    /// Creates a new [`DatabaseBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the namespace and database name.
    pub fn session(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.ns = Some(namespace.into());
        self.db = Some(database.into());
        self
    }

    /// Opens the connection.
    ///
    /// # Errors
    /// Returns [`DatabaseError::Validation`] if the URL or session is missing, and
    /// [`DatabaseError::Connection`] for engines other than `mem://`.
    #[allow(clippy::unused_async)]
    pub async fn init(self) -> Result<Database, DatabaseError> {
        let url = self.url.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
            DatabaseError::Validation { message: "Connection URL not provided".into(), context: None }
        })?;
        let (Some(ns), Some(db)) = (self.ns, self.db) else {
            return Err(DatabaseError::Validation {
                message: "Namespace and database must be provided".into(),
                context: None,
            });
        };

        if !url.starts_with(MEMORY_SCHEME) {
            return Err(DatabaseError::Connection {
                message: format!("Unsupported engine for '{url}'").into(),
                context: Some("Only mem:// is available in-process".into()),
            });
        }

        info!(url = %url, ns = %ns, db = %db, "Connection established");

        Ok(Database {
            inner: Arc::new(DatabaseInner { url, ns, db, tables: RwLock::new(FxHashMap::default()) }),
        })
    }
}
