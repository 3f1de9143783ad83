//! Reflection-free generic CRUD: every operation works on any registered
//! resource through its schema, with rows as JSON objects. No semantic
//! validation happens here; store errors pass through tagged by kind.

use crate::error::AdminError;
use crate::resource::Resource;
use crate::store::{DataStore, StoreQuery};
use serde_json::Value;

pub struct CrudService;

impl CrudService {
    /// Fetch all rows for a resource, no implicit filter, fully materialized.
    pub async fn list(store: &dyn DataStore, resource: &Resource) -> Result<Vec<Value>, AdminError> {
        Ok(store
            .find_all(&resource.collection, &StoreQuery::default())
            .await?)
    }

    /// Fetch one row by primary key. The id arrives as a path/query string
    /// and is coerced by the schema's key kind.
    pub async fn get(store: &dyn DataStore, resource: &Resource, id: &str) -> Result<Value, AdminError> {
        let key = resource.schema().coerce_id(id);
        store
            .find_by_key(&resource.collection, &key)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("{} {}", resource.name, id)))
    }

    /// Insert a new row; the identifier is assigned by the store.
    pub async fn create(
        store: &dyn DataStore,
        resource: &Resource,
        record: &Value,
    ) -> Result<Value, AdminError> {
        Ok(store.insert(&resource.collection, record).await?)
    }

    /// Upsert by primary key; the record must already carry it.
    pub async fn update(
        store: &dyn DataStore,
        resource: &Resource,
        record: &Value,
    ) -> Result<Value, AdminError> {
        Ok(store.save(&resource.collection, record).await?)
    }

    /// Delete by primary key.
    pub async fn delete(store: &dyn DataStore, resource: &Resource, id: &str) -> Result<(), AdminError> {
        let key = resource.schema().coerce_id(id);
        let existed = store.delete_by_key(&resource.collection, &key).await?;
        if !existed {
            return Err(AdminError::NotFound(format!("{} {}", resource.name, id)));
        }
        Ok(())
    }
}
