//! PostgreSQL store backend: parameterized SQL built per query, JSON rows
//! in and out. Domain tables are the embedding application's schema; only
//! the system tables (users, sessions, permissions, audit) are created here.

use super::{CompareOp, DataStore, Predicate, StoreError, StoreQuery, KEY_ATTR};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, PgPool};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// System-table DDL. Call once at startup, before serving.
    pub async fn ensure_system_tables(&self) -> Result<(), StoreError> {
        const DDL: &[&str] = &[
            r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS permissions (
                id BIGSERIAL PRIMARY KEY,
                role TEXT NOT NULL,
                resource_name TEXT NOT NULL,
                action TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS audit_logs (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                user_email TEXT NOT NULL,
                resource_name TEXT NOT NULL,
                record_id TEXT NOT NULL,
                action TEXT NOT NULL,
                changes TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        ];
        for ddl in DDL {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Value>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(row_to_json))
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn find_all(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Value>, StoreError> {
        let mut q = QueryBuf::new();
        q.sql = format!("SELECT * FROM {}", quoted(collection));
        push_where(&mut q, &query.predicates);
        if let Some(order) = &query.order {
            q.sql.push_str(&format!(
                " ORDER BY {} {}",
                quoted(&order.field),
                if order.descending { "DESC" } else { "ASC" }
            ));
        }
        if let Some(limit) = query.limit {
            q.sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            q.sql.push_str(&format!(" OFFSET {}", offset));
        }
        self.fetch_all(&q).await
    }

    async fn find_by_key(&self, collection: &str, key: &Value) -> Result<Option<Value>, StoreError> {
        let mut q = QueryBuf::new();
        let n = q.push_param(key.clone());
        q.sql = format!(
            "SELECT * FROM {} WHERE {} = ${}",
            quoted(collection),
            quoted(KEY_ATTR),
            n
        );
        self.fetch_optional(&q).await
    }

    async fn count(&self, collection: &str, predicates: &[Predicate]) -> Result<u64, StoreError> {
        let mut q = QueryBuf::new();
        q.sql = format!("SELECT COUNT(*) FROM {}", quoted(collection));
        push_where(&mut q, predicates);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn insert(&self, collection: &str, record: &Value) -> Result<Value, StoreError> {
        let obj = record
            .as_object()
            .ok_or_else(|| StoreError::Backend("record must be a JSON object".into()))?;
        let mut q = QueryBuf::new();
        let mut cols = Vec::new();
        let mut placeholders = Vec::new();
        for (k, v) in obj {
            if k == KEY_ATTR {
                continue;
            }
            cols.push(quoted(k));
            placeholders.push(format!("${}", q.push_param(v.clone())));
        }
        q.sql = if cols.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING *", quoted(collection))
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                quoted(collection),
                cols.join(", "),
                placeholders.join(", ")
            )
        };
        self.fetch_optional(&q)
            .await?
            .ok_or(StoreError::RowNotFound)
    }

    async fn save(&self, collection: &str, record: &Value) -> Result<Value, StoreError> {
        let obj = record
            .as_object()
            .ok_or_else(|| StoreError::Backend("record must be a JSON object".into()))?;
        if !obj.contains_key(KEY_ATTR) {
            return Err(StoreError::Backend("record carries no key".into()));
        }
        let mut q = QueryBuf::new();
        let mut cols = Vec::new();
        let mut placeholders = Vec::new();
        let mut updates = Vec::new();
        for (k, v) in obj {
            let col = quoted(k);
            placeholders.push(format!("${}", q.push_param(v.clone())));
            if k != KEY_ATTR {
                updates.push(format!("{} = EXCLUDED.{}", col, col));
            }
            cols.push(col);
        }
        q.sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {} RETURNING *",
            quoted(collection),
            cols.join(", "),
            placeholders.join(", "),
            quoted(KEY_ATTR),
            updates.join(", ")
        );
        self.fetch_optional(&q)
            .await?
            .ok_or(StoreError::RowNotFound)
    }

    async fn delete_by_key(&self, collection: &str, key: &Value) -> Result<bool, StoreError> {
        let mut q = QueryBuf::new();
        let n = q.push_param(key.clone());
        q.sql = format!(
            "DELETE FROM {} WHERE {} = ${}",
            quoted(collection),
            quoted(KEY_ATTR),
            n
        );
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Quote identifier for PostgreSQL (collection and field names come from
/// registered metadata, never from request input).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

struct QueryBuf {
    sql: String,
    params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Query-string filter values arrive as text even for numeric and boolean
/// columns; bind them typed when they parse so Postgres comparisons
/// type-check.
fn coerced(v: &Value) -> Value {
    if let Value::String(s) = v {
        if let Ok(n) = s.parse::<i64>() {
            return Value::from(n);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::from(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
    }
    v.clone()
}

fn push_where(q: &mut QueryBuf, predicates: &[Predicate]) {
    let mut parts = Vec::new();
    for pred in predicates {
        let col = quoted(&pred.field);
        let part = match pred.op {
            CompareOp::Eq => format!("{} = ${}", col, q.push_param(coerced(&pred.value))),
            CompareOp::Like => {
                let needle = match &pred.value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("{} LIKE ${}", col, q.push_param(Value::from(format!("%{}%", needle))))
            }
            CompareOp::Gte => format!("{} >= ${}", col, q.push_param(coerced(&pred.value))),
            CompareOp::Lte => format!("{} <= ${}", col, q.push_param(coerced(&pred.value))),
            CompareOp::In => {
                let options = match &pred.value {
                    Value::Array(a) => a.clone(),
                    other => vec![other.clone()],
                };
                let placeholders: Vec<String> = options
                    .into_iter()
                    .map(|o| format!("${}", q.push_param(coerced(&o))))
                    .collect();
                format!("{} IN ({})", col, placeholders.join(", "))
            }
        };
        parts.push(part);
    }
    if !parts.is_empty() {
        q.sql.push_str(" WHERE ");
        q.sql.push_str(&parts.join(" AND "));
    }
}

/// A value that can be bound to a PostgreSQL query. Converts from
/// serde_json::Value; RFC 3339 strings bind as timestamptz so serialized
/// chrono fields (session expiry, audit timestamps) land in timestamp
/// columns without per-column casts.
#[derive(Clone, Debug)]
enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Json(Value),
}

impl PgBindValue {
    fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PgBindValue::I64(i)
                } else {
                    PgBindValue::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => match chrono::DateTime::parse_from_rfc3339(s) {
                Ok(d) => PgBindValue::Timestamp(d.with_timezone(&chrono::Utc)),
                Err(_) => PgBindValue::String(s.clone()),
            },
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<i32> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
            PgBindValue::Timestamp(d) => {
                <chrono::DateTime<chrono::Utc> as Encode<Postgres>>::encode_by_ref(d, buf)?
            }
            PgBindValue::Json(v) => <serde_json::Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    /// Each variant declares its wire type so parameters type-check against
    /// the column without SQL-level casts.
    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null | PgBindValue::String(_) => PgTypeInfo::with_name("TEXT"),
            PgBindValue::Bool(_) => PgTypeInfo::with_name("BOOL"),
            PgBindValue::I64(_) => PgTypeInfo::with_name("INT8"),
            PgBindValue::F64(_) => PgTypeInfo::with_name("FLOAT8"),
            PgBindValue::Timestamp(_) => PgTypeInfo::with_name("TIMESTAMPTZ"),
            PgBindValue::Json(_) => PgTypeInfo::with_name("JSONB"),
        })
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<serde_json::Value>, _>(name) {
        return j;
    }
    Value::Null
}
