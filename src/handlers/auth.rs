//! Login and logout endpoints. Reached before the authentication guard.

use crate::auth;
use crate::dispatch::{AdminRequest, AdminResponse, ADMIN_PREFIX};
use crate::error::AdminError;
use crate::state::AdminContext;
use crate::view::{LoginView, ViewModel};
use axum::http::Method;

pub async fn route(
    ctx: &AdminContext,
    request: &AdminRequest,
    path: &str,
) -> Result<AdminResponse, AdminError> {
    if path == "/login" {
        if request.method == Method::POST {
            return handle_login(ctx, request).await;
        }
        return Ok(login_view(ctx, None));
    }
    handle_logout(ctx, request).await
}

async fn handle_login(ctx: &AdminContext, request: &AdminRequest) -> Result<AdminResponse, AdminError> {
    let email = request.form.value("email").unwrap_or_default();
    let password = request.form.value("password").unwrap_or_default();
    match auth::login(ctx.store.as_ref(), &ctx.registry.config, email, password).await {
        Ok((_, session)) => Ok(AdminResponse::SessionStarted {
            token: session.id,
            location: ADMIN_PREFIX.to_string(),
        }),
        // Unknown email and bad password render identically.
        Err(AdminError::InvalidCredentials) => Ok(login_view(ctx, Some("Invalid credentials"))),
        Err(e) => Err(e),
    }
}

async fn handle_logout(ctx: &AdminContext, request: &AdminRequest) -> Result<AdminResponse, AdminError> {
    if let Some(token) = request.session_token.as_deref() {
        auth::logout(ctx.store.as_ref(), token).await?;
    }
    Ok(AdminResponse::SessionCleared {
        location: format!("{}/login", ADMIN_PREFIX),
    })
}

fn login_view(ctx: &AdminContext, error: Option<&str>) -> AdminResponse {
    AdminResponse::View(ViewModel::Login(LoginView {
        site_title: ctx.registry.config.site_title.clone(),
        error: error.map(String::from),
    }))
}
