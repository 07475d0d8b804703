//! Wire types shared by every list screen.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use backoffice_core::{Entity, Owned, RowId, UserId};

/// Author of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBy {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
}

/// One record of a collection.
///
/// Rows are opaque apart from identity and ownership; they are never
/// mutated in place, a refetch replaces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    #[serde(default)]
    pub created_by: Option<CreatedBy>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Row {
    pub fn new(id: i64) -> Self {
        Self {
            id: RowId::new(id),
            created_by: None,
            attributes: Map::new(),
        }
    }

    pub fn created_by(mut self, id: i64, name: impl Into<String>) -> Self {
        self.created_by = Some(CreatedBy {
            id: UserId::new(id),
            name: name.into(),
        });
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

impl Entity for Row {
    type Id = RowId;

    fn id(&self) -> &RowId {
        &self.id
    }
}

impl Owned for Row {
    fn owner_id(&self) -> Option<UserId> {
        self.created_by.as_ref().map(|c| c.id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMeta {
    pub total: u64,
}

/// Collection endpoint response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    pub data: Vec<Row>,
    #[serde(default)]
    pub meta: ListMeta,
    /// Field name → display label overrides.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub count_edits: Option<u64>,
    #[serde(default)]
    pub entity_block_id: Option<i64>,
}

impl ListResponse {
    pub fn new(data: Vec<Row>, total: u64) -> Self {
        Self {
            data,
            meta: ListMeta { total },
            fields: BTreeMap::new(),
            count_edits: None,
            entity_block_id: None,
        }
    }
}

/// A fetched page as the views consume it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResult {
    pub rows: Vec<Row>,
    pub total_count: u64,
    pub field_labels: BTreeMap<String, String>,
    pub count_edits: Option<u64>,
    pub entity_block_id: Option<i64>,
}

impl ListResult {
    /// Label for a column: the server override, else the field name.
    pub fn label<'a>(&'a self, field: &'a str) -> &'a str {
        self.field_labels.get(field).map_or(field, String::as_str)
    }
}

impl From<ListResponse> for ListResult {
    fn from(resp: ListResponse) -> Self {
        Self {
            rows: resp.data,
            total_count: resp.meta.total,
            field_labels: resp.fields,
            count_edits: resp.count_edits,
            entity_block_id: resp.entity_block_id,
        }
    }
}
