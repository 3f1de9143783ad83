//! Search API backing remote-search form controls: contains-match across
//! the resource's text fields, deduped by id, capped at ten hits.

use crate::dispatch::{AdminRequest, AdminResponse};
use crate::error::AdminError;
use crate::state::AdminContext;
use crate::store::{CompareOp, Predicate, StoreQuery, KEY_ATTR};
use crate::view::{SearchHit, ViewModel};
use serde_json::Value;

const MAX_HITS: u64 = 10;

pub async fn api(
    ctx: &AdminContext,
    resource_name: &str,
    request: &AdminRequest,
) -> Result<AdminResponse, AdminError> {
    let resource = ctx
        .registry
        .resource(resource_name)
        .ok_or_else(|| AdminError::NotFound(resource_name.to_string()))?;
    let needle = request.query_value("q").unwrap_or_default();

    // The store capability composes predicates conjunctively, so the
    // OR-across-fields semantics become one query per text field, merged.
    let mut hits: Vec<SearchHit> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for field in resource.fields.iter().filter(|f| f.field_type == "text") {
        let rows = ctx
            .store
            .find_all(
                &resource.collection,
                &StoreQuery {
                    predicates: vec![Predicate::new(
                        &field.name,
                        CompareOp::Like,
                        Value::from(needle),
                    )],
                    limit: Some(MAX_HITS),
                    ..Default::default()
                },
            )
            .await?;
        for row in rows {
            let id = row.get(KEY_ATTR).cloned().unwrap_or(Value::Null);
            let key = id.to_string();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            hits.push(SearchHit {
                text: display_text(&row, &id),
                id,
            });
            if hits.len() as u64 == MAX_HITS {
                return Ok(AdminResponse::View(ViewModel::Search { hits }));
            }
        }
    }
    Ok(AdminResponse::View(ViewModel::Search { hits }))
}

/// A human label for a hit: the record's name, falling back to its email,
/// falling back to the id.
fn display_text(row: &Value, id: &Value) -> String {
    for attr in ["name", "email"] {
        if let Some(Value::String(s)) = row.get(attr) {
            return s.clone();
        }
    }
    format!("ID: {}", id)
}
