//! Role-based access control: an allow-list of (role, resource, action)
//! triples. No wildcards, no hierarchy; "edit" does not imply "show".

use crate::auth::ADMIN_ROLE;
use crate::error::AdminError;
use crate::store::{CompareOp, DataStore, Predicate};
use serde::{Deserialize, Serialize};

pub const PERMISSIONS_COLLECTION: &str = "permissions";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Permission {
    pub id: u64,
    pub role: String,
    pub resource_name: String,
    pub action: String,
}

/// True iff the role may perform the action on the resource. The admin role
/// bypasses the lookup entirely. Read-through on every call, so permission
/// edits take effect on the next check.
pub async fn is_allowed(
    store: &dyn DataStore,
    role: &str,
    resource_name: &str,
    action: &str,
) -> Result<bool, AdminError> {
    if role == ADMIN_ROLE {
        return Ok(true);
    }
    let count = store
        .count(
            PERMISSIONS_COLLECTION,
            &[
                Predicate::new("role", CompareOp::Eq, serde_json::json!(role)),
                Predicate::new("resource_name", CompareOp::Eq, serde_json::json!(resource_name)),
                Predicate::new("action", CompareOp::Eq, serde_json::json!(action)),
            ],
        )
        .await?;
    Ok(count > 0)
}

/// Persist one permission grant.
pub async fn grant(
    store: &dyn DataStore,
    role: &str,
    resource_name: &str,
    action: &str,
) -> Result<(), AdminError> {
    let permission = Permission {
        id: 0,
        role: role.to_string(),
        resource_name: resource_name.to_string(),
        action: action.to_string(),
    };
    store
        .insert(
            PERMISSIONS_COLLECTION,
            &serde_json::to_value(&permission).expect("permission serializes"),
        )
        .await?;
    Ok(())
}
