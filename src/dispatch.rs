//! The routing state machine. One transport-free entry point resolves an
//! inbound admin request to a handler:
//!
//!   static asset -> auth route -> authentication guard -> dashboard
//!     -> search API -> custom page -> resource action
//!
//! The order is load-bearing: uploads and login/logout must be reachable
//! before the guard, and the guard must precede all resource dispatch.

use crate::auth::{self, AdminUser};
use crate::error::AdminError;
use crate::handlers;
use crate::permissions;
use crate::resource::Resource;
use crate::state::AdminContext;
use crate::view::ViewModel;
use axum::http::Method;
use std::collections::HashMap;

/// Path prefix the admin panel is mounted under; baked into redirect
/// locations and upload reference paths.
pub const ADMIN_PREFIX: &str = "/admin";

#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Decoded form body: repeatable text fields plus file uploads.
#[derive(Clone, Debug, Default)]
pub struct FormData {
    pub fields: Vec<(String, String)>,
    pub files: Vec<(String, UploadedFile)>,
}

impl FormData {
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn values(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, f)| f)
    }
}

/// One inbound request, already stripped of the admin prefix.
#[derive(Clone, Debug)]
pub struct AdminRequest {
    pub method: Method,
    /// Path under the admin prefix, e.g. `/Item/edit`. Empty or `/` is the
    /// dashboard.
    pub path: String,
    pub query: HashMap<String, String>,
    pub form: FormData,
    pub session_token: Option<String>,
}

impl AdminRequest {
    pub fn get(path: &str) -> AdminRequest {
        AdminRequest {
            method: Method::GET,
            path: path.to_string(),
            query: HashMap::new(),
            form: FormData::default(),
            session_token: None,
        }
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Everything the dispatcher can hand back; the transport adapter maps each
/// variant onto the wire.
#[derive(Debug)]
pub enum AdminResponse {
    /// A rendering-ready projection for the (external) template layer.
    View(ViewModel),
    Redirect {
        location: String,
        flash: Option<String>,
    },
    Csv {
        filename: String,
        body: String,
    },
    /// A stored upload, served by file name through the file capability.
    Upload {
        file_name: String,
    },
    /// Login succeeded: persist the token as a scoped HTTP-only cookie and
    /// redirect.
    SessionStarted {
        token: String,
        location: String,
    },
    /// Logout: clear the cookie and redirect.
    SessionCleared {
        location: String,
    },
}

/// Context handed to member/collection/batch action handlers.
pub struct ActionContext<'a> {
    pub admin: &'a AdminContext,
    pub resource: &'a Resource,
    pub user: &'a AdminUser,
    pub request: &'a AdminRequest,
}

/// Context handed to custom page handlers.
pub struct PageContext<'a> {
    pub admin: &'a AdminContext,
    pub user: &'a AdminUser,
    pub request: &'a AdminRequest,
}

/// Resolve one request. Stateless between calls; all mutable state lives in
/// the store.
pub async fn dispatch(ctx: &AdminContext, request: &AdminRequest) -> Result<AdminResponse, AdminError> {
    let path = request.path.as_str();

    // (a) Static assets are served before any identity resolution.
    if let Some(file_name) = path.strip_prefix("/uploads/") {
        return Ok(AdminResponse::Upload {
            file_name: file_name.to_string(),
        });
    }

    let (user, role) =
        auth::identity_from_token(ctx.store.as_ref(), request.session_token.as_deref()).await?;

    // (b) Auth endpoints are reachable without a session.
    if path == "/login" || path == "/logout" {
        return handlers::auth::route(ctx, request, path).await;
    }

    // (c) Everything below requires a resolved identity.
    let Some(user) = user else {
        return Ok(AdminResponse::Redirect {
            location: format!("{}/login", ADMIN_PREFIX),
            flash: None,
        });
    };

    // (d) Dashboard.
    if path.is_empty() || path == "/" {
        return handlers::dashboard::render(ctx, &user).await;
    }

    // (e) Search API.
    if path.ends_with("/search") {
        let resource_name = path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        return handlers::search::api(ctx, resource_name, request).await;
    }

    let mut segments = path.trim_start_matches('/').split('/');
    let first = segments.next().unwrap_or_default();

    // (f) Custom pages shadow resources of the same name.
    if let Some(page) = ctx.registry.page(first) {
        let page_ctx = PageContext {
            admin: ctx,
            user: &user,
            request,
        };
        return page.handler.run(page_ctx).await;
    }

    // (g) Resource dispatch.
    let Some(resource) = ctx.registry.resource(first) else {
        return Err(AdminError::NotFound(first.to_string()));
    };
    let action = match segments.next() {
        Some(s) if !s.is_empty() => s,
        _ => "list",
    };

    // Custom-action endpoints are gated by the presence of a registered
    // action of that name instead of the permission table; export is a
    // built-in read path outside the table.
    let exempt = action == "export" || action.contains("action");
    if !exempt && !permissions::is_allowed(ctx.store.as_ref(), &role, &resource.name, action).await? {
        tracing::debug!(role = %role, resource = %resource.name, action = %action, "denied");
        return Err(AdminError::Forbidden);
    }

    handle_resource_action(ctx, resource, action, request, &user).await
}

async fn handle_resource_action(
    ctx: &AdminContext,
    resource: &Resource,
    action: &str,
    request: &AdminRequest,
    user: &AdminUser,
) -> Result<AdminResponse, AdminError> {
    tracing::debug!(resource = %resource.name, action = %action, "dispatch");
    match action {
        "export" => handlers::export::csv(ctx, resource).await,
        "action" => handlers::action::member(ctx, resource, request, user).await,
        "collection_action" => handlers::action::collection(ctx, resource, request, user).await,
        "batch_action" => handlers::action::batch(ctx, resource, request, user).await,
        "save" => handlers::resource::save(ctx, resource, request, user).await,
        "new" => handlers::resource::new_form(ctx, resource).await,
        "show" => handlers::resource::show(ctx, resource, request).await,
        "edit" => handlers::resource::edit_form(ctx, resource, request).await,
        "delete" => handlers::resource::delete(ctx, resource, request, user).await,
        _ => handlers::resource::list(ctx, resource, request).await,
    }
}
