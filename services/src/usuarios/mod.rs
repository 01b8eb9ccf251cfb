//! The `usuarios` resource.
//!
//! - `model`: wire and domain types
//! - `record`: MongoDB document mapping
//! - `storage`: storage gateway trait and implementations
//! - `service`: operations with explicit outcomes
//! - `routes`: HTTP adapter

pub mod model;
pub mod record;
pub mod routes;
pub mod service;
pub mod storage;

pub use model::{
    CreateUsuarioResponse, ErrorResponse, MessageResponse, StoredUsuario, Usuario,
    UsuarioResponse,
};
pub use routes::{AppState, UsuarioPayload, usuario_routes};
pub use service::{UsuarioError, UsuarioService};
pub use storage::{MockUsuarioStorage, MongoUsuarioStorage, UsuarioStorage, UsuarioStorageError};
