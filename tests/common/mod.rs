//! Shared fixtures for integration tests.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use admin_sdk::{
    auth, AdminConfig, AdminContext, AdminUser, DataStore, DiskFileStore, MemoryStore, Registry,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Serialize, Deserialize, Default)]
pub struct Item {
    pub id: u64,
    pub name: String,
}

#[derive(Serialize, Deserialize, Default)]
pub struct Order {
    pub id: u64,
    pub item_id: u64,
    pub quantity: i64,
}

/// A context over an in-memory store plus the temp dir backing uploads.
pub struct TestEnv {
    pub ctx: AdminContext,
    _upload_dir: TempDir,
}

pub fn registry_with_items() -> Registry {
    let mut registry = Registry::new(AdminConfig::default());
    registry
        .register::<Item>()
        .expect("Item registers")
        .add_field("name", "Name", false)
        .expect("name field exists");
    registry
        .register::<Order>()
        .expect("Order registers")
        .add_field("quantity", "Quantity", false)
        .expect("quantity field exists");
    registry
}

pub fn env_with(registry: Registry) -> TestEnv {
    let upload_dir = TempDir::new().expect("should create temp upload dir");
    let ctx = AdminContext::new(
        registry,
        Arc::new(MemoryStore::new()),
        Arc::new(DiskFileStore::new(upload_dir.path())),
    );
    TestEnv {
        ctx,
        _upload_dir: upload_dir,
    }
}

pub fn default_env() -> TestEnv {
    env_with(registry_with_items())
}

/// Create a user with a hashed password and return the stored row.
pub async fn seed_user(store: &dyn DataStore, email: &str, password: &str, role: &str) -> AdminUser {
    let mut user = AdminUser {
        id: 0,
        email: email.to_string(),
        password_hash: String::new(),
        role: role.to_string(),
    };
    user.set_password(password).expect("password hashes");
    let row = store
        .insert(
            auth::USERS_COLLECTION,
            &serde_json::to_value(&user).expect("user serializes"),
        )
        .await
        .expect("user inserts");
    serde_json::from_value(row).expect("user row deserializes")
}

/// Log in and return the minted session token.
pub async fn login_token(ctx: &AdminContext, email: &str, password: &str) -> String {
    let (_, session) = auth::login(ctx.store.as_ref(), &ctx.registry.config, email, password)
        .await
        .expect("login succeeds");
    session.id
}
