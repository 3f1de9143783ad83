//! Admin SDK: metadata-driven admin panel backend library.
//!
//! Register record types once at startup; the library derives generic CRUD
//! screens, filtered/sorted/paginated lists, role-based permissions, and an
//! audit trail over them, and routes inbound requests through a single
//! dispatcher.

pub mod audit;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod files;
pub mod handlers;
pub mod permissions;
pub mod registry;
pub mod resource;
pub mod routes;
pub mod schema;
pub mod service;
pub mod state;
pub mod store;
pub mod view;

pub use auth::{identity_from_token, login, logout, AdminUser, Session};
pub use config::AdminConfig;
pub use dispatch::{dispatch, AdminRequest, AdminResponse, FormData, ADMIN_PREFIX};
pub use error::{AdminError, RegistryError};
pub use files::{DiskFileStore, FileStore};
pub use permissions::{grant, is_allowed, Permission};
pub use registry::{ChartDataProvider, PageHandler, Registry};
pub use resource::{ActionHandler, BatchActionHandler, Resource, View};
pub use routes::admin_router;
pub use schema::{Record, RecordSchema};
pub use service::CrudService;
pub use state::AdminContext;
pub use store::{CompareOp, DataStore, MemoryStore, PgStore, Predicate, StoreQuery};
