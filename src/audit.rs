//! Append-only audit trail. Every mutating CRUD or action path records an
//! entry; the trail itself is never updated or deleted here.

use crate::auth::AdminUser;
use crate::store::DataStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const AUDIT_COLLECTION: &str = "audit_logs";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: u64,
    pub user_id: u64,
    pub user_email: String,
    pub resource_name: String,
    pub record_id: String,
    /// Create, Update, Delete, or a custom action name.
    pub action: String,
    pub changes: String,
    pub created_at: DateTime<Utc>,
}

/// Append an audit entry. A failed write is logged and swallowed; the
/// mutation it describes has already happened and is not rolled back.
pub async fn record_action(
    store: &dyn DataStore,
    user: &AdminUser,
    resource_name: &str,
    record_id: &str,
    action: &str,
    changes: &str,
) {
    let entry = AuditLogEntry {
        id: 0,
        user_id: user.id,
        user_email: user.email.clone(),
        resource_name: resource_name.to_string(),
        record_id: record_id.to_string(),
        action: action.to_string(),
        changes: changes.to_string(),
        created_at: Utc::now(),
    };
    let value = serde_json::to_value(&entry).expect("audit entry serializes");
    if let Err(e) = store.insert(AUDIT_COLLECTION, &value).await {
        tracing::warn!(resource = %resource_name, record = %record_id, error = %e, "audit write failed");
    }
}
