//! Built-in CRUD screens: list, show, new/edit forms, save, delete.

use crate::audit;
use crate::auth::AdminUser;
use crate::dispatch::{AdminRequest, AdminResponse, ADMIN_PREFIX};
use crate::error::AdminError;
use crate::resource::{AssociationKind, Resource, View};
use crate::service::forms::apply_form;
use crate::service::CrudService;
use crate::state::AdminContext;
use crate::store::{CompareOp, Predicate, StoreQuery, KEY_ATTR};
use crate::view::{
    build_list_query, field_views, project_list, project_record, AssociationView, BelongsToView,
    FormView, ListView, Paging, ScopeView, ShowView, ViewModel,
};
use serde_json::Value;

pub async fn list(
    ctx: &AdminContext,
    resource: &Resource,
    request: &AdminRequest,
) -> Result<AdminResponse, AdminError> {
    let fields = resource.fields_for(View::Index)?;
    let lq = build_list_query(resource, &ctx.registry.config, &request.query);

    let total = ctx
        .store
        .count(&resource.collection, &lq.base.predicates)
        .await?;
    let rows = ctx.store.find_all(&resource.collection, &lq.paged()).await?;

    Ok(AdminResponse::View(ViewModel::List(ListView {
        resource: resource.name.clone(),
        rows: project_list(&fields, &rows),
        fields: field_views(&fields),
        paging: Paging::new(lq.page, lq.per_page, total),
        filters: lq.filters,
        scopes: resource
            .scopes
            .iter()
            .map(|s| ScopeView {
                name: s.name.clone(),
                label: s.label.clone(),
            })
            .collect(),
        current_scope: lq.current_scope,
        sort_field: lq.sort_field,
        sort_order: lq.sort_order,
    })))
}

pub async fn show(
    ctx: &AdminContext,
    resource: &Resource,
    request: &AdminRequest,
) -> Result<AdminResponse, AdminError> {
    let fields = resource.fields_for(View::Show)?;
    let id = request.query_value("id").unwrap_or_default();
    let item = CrudService::get(ctx.store.as_ref(), resource, id).await?;

    let mut associations = Vec::new();
    for assoc in &resource.associations {
        if assoc.kind != AssociationKind::HasMany {
            continue;
        }
        let Some(target) = ctx.registry.resource(&assoc.resource_name) else {
            tracing::warn!(association = %assoc.name, target = %assoc.resource_name, "association target not registered");
            continue;
        };
        let target_fields = target.fields_for(View::Index)?;
        let key = item.get(KEY_ATTR).cloned().unwrap_or(Value::Null);
        let related = ctx
            .store
            .find_all(
                &target.collection,
                &StoreQuery::filtered(vec![Predicate::new(&assoc.foreign_key, CompareOp::Eq, key)]),
            )
            .await?;
        associations.push(AssociationView {
            name: assoc.name.clone(),
            label: assoc.label.clone(),
            resource: target.name.clone(),
            items: project_list(&target_fields, &related),
            fields: field_views(&target_fields),
        });
    }

    Ok(AdminResponse::View(ViewModel::Show(ShowView {
        resource: resource.name.clone(),
        item: project_record(&fields, &item),
        fields: field_views(&fields),
        associations,
    })))
}

pub async fn new_form(ctx: &AdminContext, resource: &Resource) -> Result<AdminResponse, AdminError> {
    form_view(ctx, resource, None).await
}

pub async fn edit_form(
    ctx: &AdminContext,
    resource: &Resource,
    request: &AdminRequest,
) -> Result<AdminResponse, AdminError> {
    let id = request.query_value("id").unwrap_or_default();
    let item = CrudService::get(ctx.store.as_ref(), resource, id).await?;
    form_view(ctx, resource, Some(item)).await
}

async fn form_view(
    ctx: &AdminContext,
    resource: &Resource,
    item: Option<Value>,
) -> Result<AdminResponse, AdminError> {
    let fields = resource.fields_for(View::Edit)?;

    let mut belongs_to = Vec::new();
    for assoc in &resource.associations {
        if assoc.kind != AssociationKind::BelongsTo {
            continue;
        }
        let Some(target) = ctx.registry.resource(&assoc.resource_name) else {
            tracing::warn!(association = %assoc.name, target = %assoc.resource_name, "association target not registered");
            continue;
        };
        let count = ctx.store.count(&target.collection, &[]).await?;
        // Small targets inline their options; anything at or past the
        // threshold switches the form control to remote search.
        let (options, remote_search) = if count < ctx.registry.config.search_threshold {
            let rows = ctx
                .store
                .find_all(&target.collection, &StoreQuery::default())
                .await?;
            (Some(project_list(&target.fields, &rows)), false)
        } else {
            (None, true)
        };
        belongs_to.push(BelongsToView {
            name: assoc.name.clone(),
            label: assoc.label.clone(),
            resource: target.name.clone(),
            foreign_key: assoc.foreign_key.clone(),
            options,
            remote_search,
        });
    }

    Ok(AdminResponse::View(ViewModel::Form(FormView {
        resource: resource.name.clone(),
        item: item.map(|i| project_record(&fields, &i)),
        fields: field_views(&fields),
        belongs_to,
    })))
}

pub async fn save(
    ctx: &AdminContext,
    resource: &Resource,
    request: &AdminRequest,
    user: &AdminUser,
) -> Result<AdminResponse, AdminError> {
    let id = request.form.value(KEY_ATTR).unwrap_or_default();
    let is_update = !id.is_empty() && id != "0";

    let existing = if is_update {
        Some(CrudService::get(ctx.store.as_ref(), resource, id).await?)
    } else {
        None
    };
    let record = apply_form(resource, existing, &request.form, ctx.files.as_ref()).await?;

    let saved = if is_update {
        CrudService::update(ctx.store.as_ref(), resource, &record).await?
    } else {
        CrudService::create(ctx.store.as_ref(), resource, &record).await?
    };

    let record_id = saved
        .get(KEY_ATTR)
        .map(view_key)
        .unwrap_or_default();
    let action = if is_update { "Update" } else { "Create" };
    audit::record_action(
        ctx.store.as_ref(),
        user,
        &resource.name,
        &record_id,
        action,
        "Saved from form",
    )
    .await;

    Ok(AdminResponse::Redirect {
        location: format!("{}/{}", ADMIN_PREFIX, resource.name),
        flash: None,
    })
}

pub async fn delete(
    ctx: &AdminContext,
    resource: &Resource,
    request: &AdminRequest,
    user: &AdminUser,
) -> Result<AdminResponse, AdminError> {
    let id = request.query_value("id").unwrap_or_default();
    CrudService::delete(ctx.store.as_ref(), resource, id).await?;
    audit::record_action(
        ctx.store.as_ref(),
        user,
        &resource.name,
        id,
        "Delete",
        "Record deleted",
    )
    .await;
    Ok(AdminResponse::Redirect {
        location: format!("{}/{}", ADMIN_PREFIX, resource.name),
        flash: Some(format!("{} deleted successfully", resource.name)),
    })
}

fn view_key(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
