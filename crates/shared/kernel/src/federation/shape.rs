use super::FederationError;
use mosaic_domain::query::Filter;
use serde_json::{Map, Value};

const ARGS: &str = "__args";
const FIELDS: &str = "__fields";

/// A parsed query: one root entity and the tree of relations requested below it.
///
/// ```json
/// { "order": { "__args": { "id": [1, 2] }, "customer": { "__fields": ["name"] } } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryShape {
    pub entity: String,
    pub node: ShapeNode,
}

/// Selection at one level of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeNode {
    pub filters: Vec<Filter>,
    /// Projection; `None` keeps every field.
    pub fields: Option<Vec<String>>,
    /// Requested relations as `(alias, selection)`, in request order.
    pub relations: Vec<(String, ShapeNode)>,
}

impl QueryShape {
    /// # Errors
    /// Returns [`FederationError::InvalidShape`] unless `value` is an object with exactly one
    /// key whose selection is `true` or an object.
    pub fn parse(value: &Value) -> Result<Self, FederationError> {
        let root = value
            .as_object()
            .ok_or_else(|| FederationError::invalid_shape("query must be an object"))?;

        let mut entries = root.iter();
        let (Some((entity, selection)), None) = (entries.next(), entries.next()) else {
            return Err(FederationError::invalid_shape(format!(
                "query must name exactly one root entity, found {}",
                root.len()
            )));
        };

        let node = ShapeNode::parse(entity, selection)?
            .ok_or_else(|| FederationError::invalid_shape(format!("root '{entity}' is not selected")))?;

        Ok(Self { entity: entity.clone(), node })
    }
}

impl ShapeNode {
    /// `Ok(None)` for an unselected (`false`) relation.
    fn parse(name: &str, selection: &Value) -> Result<Option<Self>, FederationError> {
        match selection {
            Value::Bool(true) => Ok(Some(Self::default())),
            Value::Bool(false) => Ok(None),
            Value::Object(entries) => Self::parse_object(name, entries).map(Some),
            other => Err(FederationError::InvalidShape {
                message: format!("selection must be true or an object, got {other}").into(),
                context: Some(name.to_owned().into()),
            }),
        }
    }

    fn parse_object(name: &str, entries: &Map<String, Value>) -> Result<Self, FederationError> {
        let mut node = Self::default();

        for (key, value) in entries {
            match key.as_str() {
                ARGS => node.filters = parse_args(name, value)?,
                FIELDS => node.fields = Some(parse_fields(name, value)?),
                alias => {
                    if let Some(child) = Self::parse(alias, value)? {
                        node.relations.push((alias.to_owned(), child));
                    }
                },
            }
        }

        Ok(node)
    }

    /// Keeps only the projected fields plus every requested relation alias.
    pub(crate) fn project(&self, mut record: mosaic_domain::query::Record) -> Value {
        if let Some(fields) = &self.fields {
            record.retain(|key, _| {
                fields.iter().any(|f| f == key) || self.relations.iter().any(|(alias, _)| alias == key)
            });
        }
        Value::Object(record)
    }
}

fn parse_args(name: &str, value: &Value) -> Result<Vec<Filter>, FederationError> {
    let args = value.as_object().ok_or_else(|| FederationError::InvalidShape {
        message: "__args must be an object".into(),
        context: Some(name.to_owned().into()),
    })?;
    Ok(args.iter().map(|(field, arg)| Filter::from_arg(field.clone(), arg)).collect())
}

fn parse_fields(name: &str, value: &Value) -> Result<Vec<String>, FederationError> {
    let invalid = || FederationError::InvalidShape {
        message: "__fields must be an array of strings".into(),
        context: Some(name.to_owned().into()),
    };
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|field| field.as_str().map(str::to_owned).ok_or_else(invalid))
        .collect()
}
