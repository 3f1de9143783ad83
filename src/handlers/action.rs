//! Custom member, collection, and batch actions. These endpoints bypass the
//! permission table; registration of the named action is the gate, and an
//! unknown name is a not-found, not a forbidden.

use crate::auth::AdminUser;
use crate::dispatch::{ActionContext, AdminRequest, AdminResponse, ADMIN_PREFIX};
use crate::error::AdminError;
use crate::resource::Resource;
use crate::state::AdminContext;
use axum::http::Method;

pub async fn member(
    ctx: &AdminContext,
    resource: &Resource,
    request: &AdminRequest,
    user: &AdminUser,
) -> Result<AdminResponse, AdminError> {
    let name = request.query_value("name").unwrap_or_default();
    let action = resource
        .member_action(name)
        .ok_or_else(|| AdminError::NotFound(format!("action {}", name)))?;
    action
        .handler
        .run(ActionContext {
            admin: ctx,
            resource,
            user,
            request,
        })
        .await
}

pub async fn collection(
    ctx: &AdminContext,
    resource: &Resource,
    request: &AdminRequest,
    user: &AdminUser,
) -> Result<AdminResponse, AdminError> {
    let name = request.query_value("name").unwrap_or_default();
    let action = resource
        .collection_action(name)
        .ok_or_else(|| AdminError::NotFound(format!("action {}", name)))?;
    action
        .handler
        .run(ActionContext {
            admin: ctx,
            resource,
            user,
            request,
        })
        .await
}

pub async fn batch(
    ctx: &AdminContext,
    resource: &Resource,
    request: &AdminRequest,
    user: &AdminUser,
) -> Result<AdminResponse, AdminError> {
    if request.method != Method::POST {
        return Err(AdminError::BadRequest("method not allowed".into()));
    }
    let name = request.form.value("action_name").unwrap_or_default();
    let ids: Vec<String> = request
        .form
        .values("ids")
        .into_iter()
        .map(String::from)
        .collect();
    // An empty submission bounces back to the list, mirroring the form UX.
    if name.is_empty() || ids.is_empty() {
        return Ok(AdminResponse::Redirect {
            location: format!("{}/{}", ADMIN_PREFIX, resource.name),
            flash: None,
        });
    }
    let action = resource
        .batch_action(name)
        .ok_or_else(|| AdminError::NotFound(format!("action {}", name)))?;
    action
        .handler
        .run(
            ActionContext {
                admin: ctx,
                resource,
                user,
                request,
            },
            &ids,
        )
        .await
}
