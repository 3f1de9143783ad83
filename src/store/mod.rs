//! Data-access capability. The engine issues one logical operation per call
//! against named collections of JSON rows; backends own all persistence,
//! concurrency, and referential-integrity concerns.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Comparison operator for a predicate. Composition across predicates is
/// always conjunctive (AND).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    /// Case-sensitive substring containment.
    Like,
    /// Inclusive lower bound.
    Gte,
    /// Inclusive upper bound.
    Lte,
    In,
}

#[derive(Clone, Debug)]
pub struct Predicate {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Predicate {
            field: field.into(),
            op,
            value,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

/// One store query: conjunctive predicates plus optional order and paging.
#[derive(Clone, Debug, Default)]
pub struct StoreQuery {
    pub predicates: Vec<Predicate>,
    pub order: Option<Order>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl StoreQuery {
    pub fn filtered(predicates: Vec<Predicate>) -> Self {
        StoreQuery {
            predicates,
            ..Default::default()
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("row not found")]
    RowNotFound,
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("backend: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::RowNotFound)
            || matches!(self, StoreError::Database(sqlx::Error::RowNotFound))
    }
}

/// Capability consumed by every component that touches persistent state.
/// Rows are JSON objects; the primary key lives under the `id` attribute
/// and is assigned by the store on insert.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetch all rows matching the query, fully materialized before return.
    async fn find_all(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Value>, StoreError>;

    /// Fetch exactly one row by primary key.
    async fn find_by_key(&self, collection: &str, key: &Value) -> Result<Option<Value>, StoreError>;

    async fn count(&self, collection: &str, predicates: &[Predicate]) -> Result<u64, StoreError>;

    /// Insert a new row. The returned row carries the store-assigned key.
    async fn insert(&self, collection: &str, record: &Value) -> Result<Value, StoreError>;

    /// Upsert by primary key. The record must already carry its key.
    async fn save(&self, collection: &str, record: &Value) -> Result<Value, StoreError>;

    /// Delete by primary key. Returns whether a row existed.
    async fn delete_by_key(&self, collection: &str, key: &Value) -> Result<bool, StoreError>;
}

/// Primary key attribute on every stored row.
pub const KEY_ATTR: &str = "id";
