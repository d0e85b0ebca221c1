//! Federated reads across isolated modules.
//!
//! [`RemoteQuery`] answers a [`QueryShape`] by asking each owning module for its records and
//! stitching the results in memory. Modules may persist to unrelated stores, so no join ever
//! reaches a database.
//!
//! Resolution of `{ "order": { "customer": true } }`:
//!
//! 1. fetch `order` records from the module owning `order`;
//! 2. collect the distinct `customer_id` values;
//! 3. fetch `customer` records with `id IN (..)` from its owner;
//! 4. attach each order's match under `customer`.

mod error;
mod shape;

pub use error::{FederationError, FederationErrorExt};
pub use shape::{QueryShape, ShapeNode};

use crate::modules::{ActiveModules, FetchRequest, ModuleHandle};
use crate::{BoxFuture, KernelError};
use fxhash::{FxHashMap, FxHashSet};
use mosaic_domain::joiner::{Cardinality, JoinerConfig, JoinerRelation};
use mosaic_domain::query::{Filter, Record, link_key};
use serde_json::{Map, Value};
use tracing::debug;

/// The `remoteQuery` binding.
#[derive(Debug, Clone)]
pub struct RemoteQuery {
    joiner: JoinerConfig,
    modules: ActiveModules,
}

impl RemoteQuery {
    /// Builds the query layer over the active isolated modules.
    ///
    /// # Errors
    /// Returns [`KernelError::Configuration`] if a relation points at an undeclared entity.
    pub fn build(joiner: JoinerConfig, modules: ActiveModules) -> Result<Self, KernelError> {
        for relation in &joiner.relations {
            for entity in [&relation.from, &relation.to] {
                if joiner.owner(entity).is_none() {
                    return Err(KernelError::Configuration {
                        message: format!("Relation '{}' references undeclared entity '{entity}'", relation.alias)
                            .into(),
                        context: Some("joiner".into()),
                    });
                }
            }
        }

        debug!(
            entities = joiner.entities.len(),
            relations = joiner.relations.len(),
            modules = modules.len(),
            "Remote query built"
        );
        Ok(Self { joiner, modules })
    }

    /// Entities whose owning module is active, sorted.
    #[must_use]
    pub fn entities(&self) -> Vec<&str> {
        self.joiner
            .entities
            .iter()
            .filter(|(_, owner)| self.modules.contains(&owner.module))
            .map(|(entity, _)| entity.as_str())
            .collect()
    }

    /// Resolves a query shape to `{ "<root>": [records..] }`.
    ///
    /// # Errors
    /// Returns a [`FederationError`] for malformed shapes, undeclared entities or relations,
    /// inactive owning modules and failed module fetches.
    pub async fn resolve(&self, shape: &Value) -> Result<Value, FederationError> {
        let shape = QueryShape::parse(shape)?;
        self.check(&shape.entity, &shape.node)?;

        let records = self.fetch_node(&shape.entity, &shape.node, shape.node.filters.clone()).await?;
        let projected = records.into_iter().map(|record| shape.node.project(record)).collect();

        let mut result = Map::new();
        result.insert(shape.entity, Value::Array(projected));
        Ok(Value::Object(result))
    }

    /// Validates the whole tree before any module is asked for data.
    fn check(&self, entity: &str, node: &ShapeNode) -> Result<(), FederationError> {
        self.owner_module(entity)?;
        for (alias, child) in &node.relations {
            let relation = self.relation(entity, alias)?;
            self.check(&relation.to, child)?;
        }
        Ok(())
    }

    fn owner_module(&self, entity: &str) -> Result<&ModuleHandle, FederationError> {
        let owner = self.joiner.owner(entity).ok_or_else(|| FederationError::UnknownEntity {
            message: entity.to_owned().into(),
            context: None,
        })?;
        self.modules.get(&owner.module).ok_or_else(|| FederationError::InactiveModule {
            message: owner.module.clone().into(),
            context: Some(format!("owner of '{entity}'").into()),
        })
    }

    fn relation(&self, entity: &str, alias: &str) -> Result<&JoinerRelation, FederationError> {
        self.joiner.relation_of(entity, alias).ok_or_else(|| FederationError::UnknownRelation {
            message: alias.to_owned().into(),
            context: Some(format!("on '{entity}'").into()),
        })
    }

    /// Fetches `entity` and stitches every requested relation into the records. Records come
    /// back unprojected so the parent can still join on their keys.
    fn fetch_node<'a>(
        &'a self,
        entity: &'a str,
        node: &'a ShapeNode,
        filters: Vec<Filter>,
    ) -> BoxFuture<'a, Result<Vec<Record>, FederationError>> {
        Box::pin(async move {
            let module = self.owner_module(entity)?;
            let request = FetchRequest { entity: entity.to_owned(), filters };
            let mut records =
                module.fetch(request).await.context(format!("fetching '{entity}'"))?;

            for (alias, child) in &node.relations {
                let relation = self.relation(entity, alias)?;
                let keys = distinct_values(&records, &relation.local_key);

                let related = if keys.is_empty() {
                    Vec::new()
                } else {
                    let mut filters = child.filters.clone();
                    filters.push(Filter::any_of(relation.foreign_key.clone(), keys));
                    self.fetch_node(&relation.to, child, filters).await?
                };

                stitch(&mut records, alias, relation, child, related);
            }

            Ok(records)
        })
    }
}

/// Non-null values of `field`, first occurrence order, without duplicates.
fn distinct_values(records: &[Record], field: &str) -> Vec<Value> {
    let mut seen = FxHashSet::default();
    records
        .iter()
        .filter_map(|record| record.get(field))
        .filter(|value| link_key(value).is_some_and(|key| seen.insert(key)))
        .cloned()
        .collect()
}

/// Equi-joins `related` onto `records` and attaches the matches under `alias`.
fn stitch(
    records: &mut [Record],
    alias: &str,
    relation: &JoinerRelation,
    child: &ShapeNode,
    related: Vec<Record>,
) {
    let mut index: FxHashMap<String, Vec<Value>> = FxHashMap::default();
    for record in related {
        if let Some(key) = record.get(&relation.foreign_key).and_then(link_key) {
            index.entry(key).or_default().push(child.project(record));
        }
    }

    for record in records {
        let matches = record.get(&relation.local_key).and_then(link_key).and_then(|key| index.get(&key));
        let attached = match relation.cardinality {
            Cardinality::OneToOne => {
                matches.and_then(|found| found.first()).cloned().unwrap_or(Value::Null)
            },
            Cardinality::OneToMany => Value::Array(matches.cloned().unwrap_or_default()),
        };
        record.insert(alias.to_owned(), attached);
    }
}
