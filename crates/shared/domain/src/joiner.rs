//! Declarative description of how entities link across modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many related records a relation yields per parent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// First match or `null`.
    OneToOne,
    /// Every match, possibly none.
    #[default]
    OneToMany,
}

/// The module that owns an entity and the field that identifies its records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOwner {
    pub module: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

fn default_primary_key() -> String {
    "id".to_owned()
}

/// A named link from records of `from` to records of `to`.
///
/// A record of `from` relates to every record of `to` whose `foreign_key` equals
/// the record's `local_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinerRelation {
    pub from: String,
    /// Field name the related data is attached under.
    pub alias: String,
    pub to: String,
    pub local_key: String,
    pub foreign_key: String,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl JoinerRelation {
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        alias: impl Into<String>,
        to: impl Into<String>,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            alias: alias.into(),
            to: to.into(),
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
            cardinality: Cardinality::OneToMany,
        }
    }

    #[must_use]
    pub const fn one_to_one(mut self) -> Self {
        self.cardinality = Cardinality::OneToOne;
        self
    }
}

/// Entity ownership plus the relations between entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinerConfig {
    pub entities: BTreeMap<String, EntityOwner>,
    pub relations: Vec<JoinerRelation>,
}

impl JoinerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `entity` as owned by `module`, keyed by `id`.
    #[must_use]
    pub fn entity(mut self, entity: impl Into<String>, module: impl Into<String>) -> Self {
        self.entities.insert(
            entity.into(),
            EntityOwner { module: module.into(), primary_key: default_primary_key() },
        );
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: JoinerRelation) -> Self {
        self.relations.push(relation);
        self
    }

    #[must_use]
    pub fn owner(&self, entity: &str) -> Option<&EntityOwner> {
        self.entities.get(entity)
    }

    /// Looks up the relation `alias` declared on `from`.
    #[must_use]
    pub fn relation_of(&self, from: &str, alias: &str) -> Option<&JoinerRelation> {
        self.relations.iter().find(|r| r.from == from && r.alias == alias)
    }

}
