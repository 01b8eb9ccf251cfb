//! Operations on the `usuarios` resource.
//!
//! Every operation returns an explicit outcome: the success value, or a
//! [`UsuarioError`] naming one of the expected client-facing cases or an
//! opaque internal fault. Turning outcomes into HTTP responses is left to
//! [`routes`](super::routes).

use super::model::{StoredUsuario, Usuario};
use super::storage::{UsuarioStorage, UsuarioStorageError};

/// Failed outcome of a usuario operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsuarioError {
    /// Create was called with a `cedula` that is already stored.
    #[error("cédula already registered")]
    CedulaAlreadyRegistered(String),

    /// No stored user matches the requested `cedula`.
    #[error("user not found")]
    NotFound(String),

    /// Any other fault. Details are logged, never returned.
    #[error("internal error")]
    Internal,
}

// Logs the full fault server-side and hides it from the caller.
fn internal(operation: &'static str, err: &UsuarioStorageError) -> UsuarioError {
    tracing::error!(operation, error = %err, "Usuario storage failure");
    UsuarioError::Internal
}

/// The user resource operations over an injected storage gateway.
#[derive(Clone)]
pub struct UsuarioService<S> {
    storage: S,
}

impl<S> UsuarioService<S>
where
    S: UsuarioStorage,
{
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Lists every stored user in storage order.
    #[tracing::instrument(skip_all)]
    pub async fn list(&self) -> Result<Vec<StoredUsuario>, UsuarioError> {
        let usuarios = self
            .storage
            .find_all()
            .await
            .map_err(|e| internal("list", &e))?;

        tracing::debug!("Listed {} usuarios", usuarios.len());
        Ok(usuarios)
    }

    /// Looks a user up by `cedula`.
    #[tracing::instrument(skip_all, fields(cedula = %cedula))]
    pub async fn get(&self, cedula: &str) -> Result<StoredUsuario, UsuarioError> {
        self.storage
            .find_by_cedula(cedula)
            .await
            .map_err(|e| internal("get", &e))?
            .ok_or_else(|| UsuarioError::NotFound(cedula.to_owned()))
    }

    /// Creates a user and returns its new internal identifier.
    ///
    /// The existence probe answers the common case; a duplicate detected by
    /// the store itself (two creates racing past the probe) is reported the
    /// same way.
    #[tracing::instrument(skip_all, fields(cedula = %usuario.cedula))]
    pub async fn create(&self, usuario: &Usuario) -> Result<String, UsuarioError> {
        let existing = self
            .storage
            .find_by_cedula(&usuario.cedula)
            .await
            .map_err(|e| internal("create", &e))?;

        if existing.is_some() {
            tracing::info!("Cedula already registered");
            return Err(UsuarioError::CedulaAlreadyRegistered(
                usuario.cedula.clone(),
            ));
        }

        match self.storage.insert(usuario).await {
            Ok(id) => {
                tracing::info!(id = %id, "Usuario created");
                Ok(id)
            }
            Err(UsuarioStorageError::DuplicateCedula(cedula)) => {
                tracing::warn!("Cedula registered concurrently, insert rejected by storage");
                Err(UsuarioError::CedulaAlreadyRegistered(cedula))
            }
            Err(e) => Err(internal("create", &e)),
        }
    }

    /// Overwrites every field but `cedula` of the matching user.
    ///
    /// `cedula` selects the record; the one inside `usuario` is ignored.
    #[tracing::instrument(skip_all, fields(cedula = %cedula))]
    pub async fn update(&self, cedula: &str, usuario: &Usuario) -> Result<(), UsuarioError> {
        let matched = self
            .storage
            .replace_by_cedula(cedula, usuario)
            .await
            .map_err(|e| internal("update", &e))?;

        if matched == 0 {
            tracing::info!("No usuario to update");
            return Err(UsuarioError::NotFound(cedula.to_owned()));
        }

        tracing::info!("Usuario updated");
        Ok(())
    }

    /// Deletes the matching user.
    #[tracing::instrument(skip_all, fields(cedula = %cedula))]
    pub async fn delete(&self, cedula: &str) -> Result<(), UsuarioError> {
        let deleted = self
            .storage
            .delete_by_cedula(cedula)
            .await
            .map_err(|e| internal("delete", &e))?;

        if deleted == 0 {
            tracing::info!("No usuario to delete");
            return Err(UsuarioError::NotFound(cedula.to_owned()));
        }

        tracing::info!("Usuario deleted");
        Ok(())
    }
}
