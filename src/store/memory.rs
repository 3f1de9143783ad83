//! In-memory store backend with integer key assignment. Used by tests and
//! demo setups; implements the full predicate, order, and paging semantics.

use super::{CompareOp, DataStore, Order, Predicate, StoreError, StoreQuery, KEY_ATTR};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Collection {
    next_key: u64,
    rows: Vec<Value>,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Keys arrive as numbers from stored rows and as strings from URL parts;
/// compare on the canonical text rendering.
fn key_eq(a: &Value, b: &Value) -> bool {
    canonical(a) == canonical(b)
}

fn canonical(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => canonical(a).cmp(&canonical(b)),
    }
}

fn matches(row: &Value, pred: &Predicate) -> bool {
    let field_value = match row.get(&pred.field) {
        Some(v) => v,
        None => return false,
    };
    match pred.op {
        CompareOp::Eq => key_eq(field_value, &pred.value),
        CompareOp::Like => canonical(field_value).contains(&canonical(&pred.value)),
        CompareOp::Gte => compare(field_value, &pred.value) != Ordering::Less,
        CompareOp::Lte => compare(field_value, &pred.value) != Ordering::Greater,
        CompareOp::In => match &pred.value {
            Value::Array(options) => options.iter().any(|o| key_eq(field_value, o)),
            _ => false,
        },
    }
}

fn sort_rows(rows: &mut [Value], order: &Order) {
    rows.sort_by(|a, b| {
        let av = a.get(&order.field).unwrap_or(&Value::Null);
        let bv = b.get(&order.field).unwrap_or(&Value::Null);
        let ord = compare(av, bv);
        if order.descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn find_all(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Value>, StoreError> {
        let guard = self.collections.read().await;
        let mut rows: Vec<Value> = guard
            .get(collection)
            .map(|c| {
                c.rows
                    .iter()
                    .filter(|r| query.predicates.iter().all(|p| matches(r, p)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(order) = &query.order {
            sort_rows(&mut rows, order);
        }
        let offset = query.offset.unwrap_or(0) as usize;
        let rows = rows.into_iter().skip(offset);
        Ok(match query.limit {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        })
    }

    async fn find_by_key(&self, collection: &str, key: &Value) -> Result<Option<Value>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard.get(collection).and_then(|c| {
            c.rows
                .iter()
                .find(|r| r.get(KEY_ATTR).is_some_and(|k| key_eq(k, key)))
                .cloned()
        }))
    }

    async fn count(&self, collection: &str, predicates: &[Predicate]) -> Result<u64, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|c| c.rows.iter().filter(|r| predicates.iter().all(|p| matches(r, p))).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, collection: &str, record: &Value) -> Result<Value, StoreError> {
        let mut guard = self.collections.write().await;
        let coll = guard.entry(collection.to_string()).or_default();
        coll.next_key += 1;
        let mut row = record.clone();
        match row.as_object_mut() {
            Some(obj) => obj.insert(KEY_ATTR.into(), Value::from(coll.next_key)),
            None => return Err(StoreError::Backend("record must be a JSON object".into())),
        };
        coll.rows.push(row.clone());
        Ok(row)
    }

    async fn save(&self, collection: &str, record: &Value) -> Result<Value, StoreError> {
        let key = record
            .get(KEY_ATTR)
            .cloned()
            .ok_or_else(|| StoreError::Backend("record carries no key".into()))?;
        let mut guard = self.collections.write().await;
        let coll = guard.entry(collection.to_string()).or_default();
        match coll
            .rows
            .iter_mut()
            .find(|r| r.get(KEY_ATTR).is_some_and(|k| key_eq(k, &key)))
        {
            Some(slot) => *slot = record.clone(),
            None => coll.rows.push(record.clone()),
        }
        Ok(record.clone())
    }

    async fn delete_by_key(&self, collection: &str, key: &Value) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().await;
        let coll = match guard.get_mut(collection) {
            Some(c) => c,
            None => return Ok(false),
        };
        let before = coll.rows.len();
        coll.rows
            .retain(|r| !r.get(KEY_ATTR).is_some_and(|k| key_eq(k, key)));
        Ok(coll.rows.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_sequential_keys() {
        let store = MemoryStore::new();
        let a = store.insert("things", &json!({"name": "a"})).await.unwrap();
        let b = store.insert("things", &json!({"name": "b"})).await.unwrap();
        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
    }

    #[tokio::test]
    async fn find_by_key_accepts_string_form() {
        let store = MemoryStore::new();
        store.insert("things", &json!({"name": "a"})).await.unwrap();
        let found = store.find_by_key("things", &json!("1")).await.unwrap();
        assert_eq!(found.unwrap()["name"], json!("a"));
    }

    #[tokio::test]
    async fn like_is_case_sensitive_contains() {
        let store = MemoryStore::new();
        store.insert("things", &json!({"name": "Widget"})).await.unwrap();
        store.insert("things", &json!({"name": "gadget"})).await.unwrap();
        let q = StoreQuery::filtered(vec![Predicate::new("name", CompareOp::Like, json!("dget"))]);
        assert_eq!(store.find_all("things", &q).await.unwrap().len(), 2);
        let q = StoreQuery::filtered(vec![Predicate::new("name", CompareOp::Like, json!("Wid"))]);
        assert_eq!(store.find_all("things", &q).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn range_predicates_are_inclusive() {
        let store = MemoryStore::new();
        for price in [5, 10, 15] {
            store.insert("things", &json!({"price": price})).await.unwrap();
        }
        let q = StoreQuery::filtered(vec![
            Predicate::new("price", CompareOp::Gte, json!("10")),
            Predicate::new("price", CompareOp::Lte, json!("15")),
        ]);
        assert_eq!(store.find_all("things", &q).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn order_and_paging() {
        let store = MemoryStore::new();
        for n in 1..=5 {
            store.insert("things", &json!({"n": n})).await.unwrap();
        }
        let q = StoreQuery {
            order: Some(Order {
                field: "n".into(),
                descending: true,
            }),
            offset: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        let rows = store.find_all("things", &q).await.unwrap();
        let ns: Vec<i64> = rows.iter().map(|r| r["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![4, 3]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.insert("things", &json!({"name": "a"})).await.unwrap();
        assert!(store.delete_by_key("things", &json!(1)).await.unwrap());
        assert!(!store.delete_by_key("things", &json!(1)).await.unwrap());
    }
}
