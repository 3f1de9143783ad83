//! HTTP adapter: mounts the dispatcher on an axum router under the admin
//! prefix, decodes cookies/query/forms into an `AdminRequest`, and maps each
//! `AdminResponse` variant onto the wire.

use crate::dispatch::{dispatch, AdminRequest, AdminResponse, FormData, UploadedFile, ADMIN_PREFIX};
use crate::state::AdminContext;
use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use std::collections::HashMap;
use tower::ServiceExt;
use tower_http::limit::RequestBodyLimitLayer;

pub const SESSION_COOKIE: &str = "admin_session";
pub const FLASH_COOKIE: &str = "admin_flash";

/// Multipart uploads are capped at the same 32 MiB the form parser has
/// always allowed.
const BODY_LIMIT: usize = 32 * 1024 * 1024;

pub fn admin_router(ctx: AdminContext) -> Router {
    Router::new()
        .route(ADMIN_PREFIX, any(handle))
        .route(&format!("{}/", ADMIN_PREFIX), any(handle))
        .route(&format!("{}/*path", ADMIN_PREFIX), any(handle))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .with_state(ctx)
}

async fn handle(State(ctx): State<AdminContext>, req: Request) -> Response {
    let method = req.method().clone();
    let path = req
        .uri()
        .path()
        .strip_prefix(ADMIN_PREFIX)
        .unwrap_or_default()
        .to_string();
    let query: HashMap<String, String> = Query::try_from_uri(req.uri())
        .map(|Query(q)| q)
        .unwrap_or_default();
    let session_token = cookie_value(req.headers(), SESSION_COOKIE);

    let form = if method == Method::POST {
        match decode_form(req).await {
            Ok(form) => form,
            Err(response) => return response,
        }
    } else {
        FormData::default()
    };

    let request = AdminRequest {
        method,
        path,
        query,
        form,
        session_token,
    };
    match dispatch(&ctx, &request).await {
        Ok(response) => render(&ctx, response).await,
        Err(e) => e.into_response(),
    }
}

async fn decode_form(req: Request) -> Result<FormData, Response> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let mut form = FormData::default();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(IntoResponse::into_response)?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(IntoResponse::into_response)?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) if !file_name.is_empty() => {
                    let bytes = field.bytes().await.map_err(IntoResponse::into_response)?;
                    if !bytes.is_empty() {
                        form.files.push((
                            name,
                            UploadedFile {
                                file_name,
                                bytes: bytes.to_vec(),
                            },
                        ));
                    }
                }
                _ => {
                    let text = field.text().await.map_err(IntoResponse::into_response)?;
                    form.fields.push((name, text));
                }
            }
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let axum::Form(pairs) = axum::Form::<Vec<(String, String)>>::from_request(req, &())
            .await
            .map_err(IntoResponse::into_response)?;
        form.fields = pairs;
    }
    Ok(form)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('=').map(str::to_string))
}

async fn render(ctx: &AdminContext, response: AdminResponse) -> Response {
    match response {
        AdminResponse::View(view) => Json(view).into_response(),
        AdminResponse::Redirect { location, flash } => {
            let mut builder = Response::builder()
                .status(StatusCode::SEE_OTHER)
                .header(header::LOCATION, location);
            if let Some(message) = flash {
                builder = builder.header(header::SET_COOKIE, flash_cookie(&message));
            }
            builder.body(Body::empty()).unwrap_or_default()
        }
        AdminResponse::Csv { filename, body } => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/csv")
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment;filename={}", filename),
            )
            .body(Body::from(body))
            .unwrap_or_default(),
        AdminResponse::Upload { file_name } => match ctx.files.local_path(&file_name) {
            Some(path) => {
                let req = Request::builder().body(Body::empty()).unwrap_or_default();
                match tower_http::services::ServeFile::new(path).oneshot(req).await {
                    Ok(res) => res.map(Body::new).into_response(),
                    Err(_) => StatusCode::NOT_FOUND.into_response(),
                }
            }
            None => StatusCode::NOT_FOUND.into_response(),
        },
        AdminResponse::SessionStarted { token, location } => Response::builder()
            .status(StatusCode::SEE_OTHER)
            .header(header::LOCATION, location)
            .header(
                header::SET_COOKIE,
                format!("{}={}; Path={}; HttpOnly", SESSION_COOKIE, token, ADMIN_PREFIX),
            )
            .body(Body::empty())
            .unwrap_or_default(),
        AdminResponse::SessionCleared { location } => Response::builder()
            .status(StatusCode::SEE_OTHER)
            .header(header::LOCATION, location)
            .header(
                header::SET_COOKIE,
                format!("{}=; Path={}; Max-Age=0; HttpOnly", SESSION_COOKIE, ADMIN_PREFIX),
            )
            .body(Body::empty())
            .unwrap_or_default(),
    }
}

fn flash_cookie(message: &str) -> String {
    // Cookie values cannot carry raw spaces or semicolons; percent-encode
    // the handful of separators flash messages may contain.
    let encoded: String = message
        .chars()
        .map(|c| match c {
            ' ' => "%20".to_string(),
            ';' => "%3B".to_string(),
            ',' => "%2C".to_string(),
            c => c.to_string(),
        })
        .collect();
    format!("{}={}; Path={}; HttpOnly", FLASH_COOKIE, encoded, ADMIN_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_parsing_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; admin_session=abc123; other=x".parse().unwrap(),
        );
        assert_eq!(cookie_value(&headers, SESSION_COOKIE).as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn flash_cookie_encodes_separators() {
        let cookie = flash_cookie("Item deleted successfully");
        assert!(cookie.starts_with("admin_flash=Item%20deleted%20successfully"));
    }
}
