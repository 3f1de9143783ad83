//! Integration tests for login, logout, and session resolution.

mod common;

use admin_sdk::{auth, AdminError};
use chrono::{Duration, Utc};
use common::{default_env, login_token, seed_user};

#[tokio::test]
async fn login_mints_fresh_tokens_and_logout_invalidates() {
    let env = default_env();
    let store = env.ctx.store.as_ref();
    seed_user(store, "ops@example.com", "s3cret", "editor").await;

    let first = login_token(&env.ctx, "ops@example.com", "s3cret").await;
    let second = login_token(&env.ctx, "ops@example.com", "s3cret").await;
    assert_ne!(first, second, "each login mints a distinct token");

    let (user, role) = auth::identity_from_token(store, Some(&second)).await.unwrap();
    assert_eq!(user.unwrap().email, "ops@example.com");
    assert_eq!(role, "editor");

    auth::logout(store, &second).await.unwrap();
    let (user, role) = auth::identity_from_token(store, Some(&second)).await.unwrap();
    assert!(user.is_none());
    assert_eq!(role, "guest");

    // The first session is untouched by the second's logout.
    let (user, _) = auth::identity_from_token(store, Some(&first)).await.unwrap();
    assert!(user.is_some());
}

#[tokio::test]
async fn unknown_email_and_wrong_password_fail_identically() {
    let env = default_env();
    let store = env.ctx.store.as_ref();
    seed_user(store, "ops@example.com", "s3cret", "editor").await;

    let unknown = auth::login(store, &env.ctx.registry.config, "ghost@example.com", "s3cret").await;
    let wrong = auth::login(store, &env.ctx.registry.config, "ops@example.com", "wrong").await;
    assert!(matches!(unknown, Err(AdminError::InvalidCredentials)));
    assert!(matches!(wrong, Err(AdminError::InvalidCredentials)));
}

#[tokio::test]
async fn expired_session_never_resolves_even_though_row_exists() {
    let env = default_env();
    let store = env.ctx.store.as_ref();
    let user = seed_user(store, "ops@example.com", "s3cret", "editor").await;

    let session = auth::Session {
        id: "stale-token".into(),
        user_id: user.id,
        expires_at: Utc::now() - Duration::hours(1),
    };
    store
        .save(
            auth::SESSIONS_COLLECTION,
            &serde_json::to_value(&session).unwrap(),
        )
        .await
        .unwrap();

    // Row is physically present...
    assert!(store
        .find_by_key(auth::SESSIONS_COLLECTION, &serde_json::json!("stale-token"))
        .await
        .unwrap()
        .is_some());
    // ...but never resolves to a user.
    let (user, role) = auth::identity_from_token(store, Some("stale-token")).await.unwrap();
    assert!(user.is_none());
    assert_eq!(role, "guest");
}

#[tokio::test]
async fn missing_and_unknown_tokens_resolve_to_guest() {
    let env = default_env();
    let store = env.ctx.store.as_ref();

    let (user, role) = auth::identity_from_token(store, None).await.unwrap();
    assert!(user.is_none());
    assert_eq!(role, "guest");

    let (user, role) = auth::identity_from_token(store, Some("no-such-token")).await.unwrap();
    assert!(user.is_none());
    assert_eq!(role, "guest");
}

#[tokio::test]
async fn logout_of_unknown_token_is_not_an_error() {
    let env = default_env();
    auth::logout(env.ctx.store.as_ref(), "never-existed").await.unwrap();
}

#[tokio::test]
async fn session_ttl_comes_from_config() {
    let env = default_env();
    let store = env.ctx.store.as_ref();
    seed_user(store, "ops@example.com", "s3cret", "editor").await;

    let before = Utc::now();
    let (_, session) = auth::login(store, &env.ctx.registry.config, "ops@example.com", "s3cret")
        .await
        .unwrap();
    let ttl = env.ctx.registry.config.session_ttl_hours;
    assert!(session.expires_at >= before + Duration::hours(ttl) - Duration::minutes(1));
    assert!(session.expires_at <= Utc::now() + Duration::hours(ttl));
}
