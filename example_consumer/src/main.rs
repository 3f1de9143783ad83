//! Example consumer: registers a small shop schema against the in-memory
//! store and serves the admin panel on localhost.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Log in with admin@example.com / admin.

use admin_sdk::{
    admin_router, audit, dispatch::ActionContext, grant, AdminConfig, AdminContext, AdminError,
    AdminResponse, AdminUser, ChartDataProvider, DataStore, MemoryStore, Registry,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Serialize, Deserialize, Default)]
struct Category {
    id: u64,
    name: String,
}

#[derive(Serialize, Deserialize, Default)]
struct Product {
    id: u64,
    name: String,
    price: f64,
    stock: i64,
    category_id: u64,
    photo: String,
    discontinued: bool,
}

/// Marks the selected products as discontinued.
struct DiscontinueBatch;

#[async_trait]
impl admin_sdk::BatchActionHandler for DiscontinueBatch {
    async fn run(&self, ctx: ActionContext<'_>, ids: &[String]) -> Result<AdminResponse, AdminError> {
        for id in ids {
            let mut record =
                admin_sdk::CrudService::get(ctx.admin.store.as_ref(), ctx.resource, id).await?;
            if let Some(obj) = record.as_object_mut() {
                obj.insert("discontinued".into(), Value::Bool(true));
            }
            admin_sdk::CrudService::update(ctx.admin.store.as_ref(), ctx.resource, &record).await?;
            audit::record_action(
                ctx.admin.store.as_ref(),
                ctx.user,
                &ctx.resource.name,
                id,
                "batch_action",
                "Discontinued",
            )
            .await;
        }
        Ok(AdminResponse::Redirect {
            location: format!("{}/{}", admin_sdk::ADMIN_PREFIX, ctx.resource.name),
            flash: Some(format!("{} products discontinued", ids.len())),
        })
    }
}

/// Stock level per product, for the dashboard bar chart.
struct StockChart;

#[async_trait]
impl ChartDataProvider for StockChart {
    async fn data(&self, store: &dyn DataStore) -> Result<(Vec<String>, Vec<f64>), AdminError> {
        let rows = store
            .find_all("products", &admin_sdk::StoreQuery::default())
            .await
            .map_err(AdminError::from)?;
        let mut labels = Vec::new();
        let mut values = Vec::new();
        for row in rows {
            labels.push(row["name"].as_str().unwrap_or_default().to_string());
            values.push(row["stock"].as_f64().unwrap_or(0.0));
        }
        Ok((labels, values))
    }
}

fn build_registry() -> Result<Registry, admin_sdk::RegistryError> {
    let mut registry = Registry::new(AdminConfig {
        site_title: "Shop Admin".into(),
        ..Default::default()
    });

    registry
        .register::<Category>()?
        .add_field("name", "Name", false)?;

    let product = registry.register::<Product>()?;
    product
        .add_field("name", "Name", false)?
        .add_field("price", "Price", false)?
        .add_field("stock", "Stock", false)?
        .add_field("photo", "Photo", false)?
        .add_field("discontinued", "Discontinued", false)?
        .set_field_type("photo", "image", &[])?
        .set_decorator("price", |v| {
            Value::from(format!("${:.2}", v.as_f64().unwrap_or(0.0)))
        })?
        .set_index_fields(&["name", "price", "stock"])?;
    product
        .belongs_to("category", "Category", "Category", "category_id")
        .add_scope("in_stock", "In stock", |mut q| {
            q.predicates.push(admin_sdk::Predicate::new(
                "stock",
                admin_sdk::CompareOp::Gte,
                Value::from(1),
            ));
            q
        })
        .add_batch_action("discontinue", "Discontinue", Arc::new(DiscontinueBatch));

    registry.add_chart("Stock levels", "bar", Arc::new(StockChart));
    Ok(registry)
}

async fn seed(store: &dyn DataStore) -> Result<(), AdminError> {
    let mut root = AdminUser {
        id: 0,
        email: "admin@example.com".into(),
        password_hash: String::new(),
        role: "admin".into(),
    };
    root.set_password("admin")?;
    store
        .insert(
            admin_sdk::auth::USERS_COLLECTION,
            &serde_json::to_value(&root).expect("user serializes"),
        )
        .await?;

    let mut editor = AdminUser {
        id: 0,
        email: "editor@example.com".into(),
        password_hash: String::new(),
        role: "editor".into(),
    };
    editor.set_password("editor")?;
    store
        .insert(
            admin_sdk::auth::USERS_COLLECTION,
            &serde_json::to_value(&editor).expect("user serializes"),
        )
        .await?;
    for action in ["list", "show", "edit", "save"] {
        grant(store, "editor", "Product", action).await?;
    }

    let category = store
        .insert("categories", &serde_json::json!({"name": "Lighting"}))
        .await?;
    store
        .insert(
            "products",
            &serde_json::json!({
                "name": "Desk Lamp",
                "price": 49.0,
                "stock": 12,
                "category_id": category["id"],
                "photo": "",
                "discontinued": false,
            }),
        )
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("admin_sdk=debug")),
        )
        .init();

    let registry = build_registry()?;
    let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new());
    seed(store.as_ref()).await?;

    let upload_dir = registry.config.upload_dir.clone();
    let ctx = AdminContext::new(
        registry,
        store,
        Arc::new(admin_sdk::DiskFileStore::new(upload_dir)),
    );

    let app = admin_router(ctx);
    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("admin panel on http://{}/admin", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
