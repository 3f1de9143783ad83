//! Generic CRUD execution and form application over registered resources.

pub mod crud;
pub mod forms;

pub use crud::CrudService;
