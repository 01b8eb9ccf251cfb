//! Wire and domain types for the `usuarios` resource.

use serde::{Deserialize, Serialize};

/// A user record as accepted on create and update.
///
/// Deserialization is the schema check: a missing or mistyped required
/// field rejects the request before any storage call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usuario {
    /// National identity number, the business key.
    pub cedula: String,
    pub nombre: String,
    pub salario: f64,
    pub fecha_nacimiento: String,
    pub fecha_ingreso: String,
    pub cargo: String,
    #[serde(default)]
    pub banco: Option<String>,
}

/// A persisted user together with its storage-assigned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUsuario {
    /// Internal identifier, already rendered as a string.
    pub id: String,
    pub usuario: Usuario,
}

/// A user as returned by list and get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsuarioResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub usuario: Usuario,
}

impl From<StoredUsuario> for UsuarioResponse {
    fn from(stored: StoredUsuario) -> Self {
        Self {
            id: stored.id,
            usuario: stored.usuario,
        }
    }
}

/// Response for a successful create.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUsuarioResponse {
    pub message: String,
    pub id: String,
}

/// Response for successful update and delete, and for the liveness probe.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
