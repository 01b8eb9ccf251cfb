//! HTTP routes for the `usuarios` resource.
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | GET | `/usuarios/` | 200, array of users with `_id` |
//! | POST | `/usuarios/` | 201, `{message, id}` |
//! | GET | `/usuarios/{cedula}` | 200, user with `_id` |
//! | PUT | `/usuarios/{cedula}` | 200, `{message}` |
//! | DELETE | `/usuarios/{cedula}` | 200, `{message}` |
//!
//! Failures are `{error, message}` bodies: 400 for a duplicate `cedula` or
//! an invalid payload, 404 for an unknown `cedula`, 500 for anything else.

use axum::{
    Json, Router,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use super::model::{
    CreateUsuarioResponse, ErrorResponse, MessageResponse, Usuario, UsuarioResponse,
};
use super::service::{UsuarioError, UsuarioService};
use super::storage::UsuarioStorage;

/// Shared state for the usuario routes.
#[derive(Clone)]
pub struct AppState<U> {
    pub usuarios: UsuarioService<U>,
}

impl<U> AppState<U>
where
    U: UsuarioStorage,
{
    /// Creates the state around the given storage implementation.
    pub fn new(storage: U) -> Self {
        Self {
            usuarios: UsuarioService::new(storage),
        }
    }
}

impl IntoResponse for UsuarioError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            UsuarioError::CedulaAlreadyRegistered(_) => {
                (StatusCode::BAD_REQUEST, "cedula_already_registered")
            }
            UsuarioError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            UsuarioError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        (
            status,
            Json(ErrorResponse::new(error_type, self.to_string())),
        )
            .into_response()
    }
}

/// JSON body checked against the `Usuario` schema.
///
/// Rejections keep the JSON error shape of the other failures instead of
/// axum's plain-text default.
pub struct UsuarioPayload(pub Usuario);

impl<S> FromRequest<S> for UsuarioPayload
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Usuario>::from_request(req, state).await {
            Ok(Json(usuario)) => Ok(Self(usuario)),
            Err(rejection) => {
                // Schema mismatches are a bad request here; buffering and
                // content-type failures keep their own status (413, 415).
                let status = match rejection.status() {
                    StatusCode::UNPROCESSABLE_ENTITY => StatusCode::BAD_REQUEST,
                    status => status,
                };
                tracing::debug!(%status, "Rejected usuario payload: {}", rejection.body_text());
                Err((
                    status,
                    Json(ErrorResponse::new("invalid_payload", rejection.body_text())),
                ))
            }
        }
    }
}

/// Creates the router for the usuario endpoints.
///
/// The collection is served both with and without the trailing slash.
pub fn usuario_routes<U>() -> Router<AppState<U>>
where
    U: UsuarioStorage,
{
    Router::new()
        .route(
            "/usuarios/",
            get(list_usuarios::<U>).post(create_usuario::<U>),
        )
        .route(
            "/usuarios",
            get(list_usuarios::<U>).post(create_usuario::<U>),
        )
        .route(
            "/usuarios/{cedula}",
            get(get_usuario::<U>)
                .put(update_usuario::<U>)
                .delete(delete_usuario::<U>),
        )
}

/// GET /usuarios/
#[tracing::instrument(skip_all)]
async fn list_usuarios<U>(State(state): State<AppState<U>>) -> Result<Response, UsuarioError>
where
    U: UsuarioStorage,
{
    let usuarios: Vec<UsuarioResponse> = state
        .usuarios
        .list()
        .await?
        .into_iter()
        .map(UsuarioResponse::from)
        .collect();

    Ok((StatusCode::OK, Json(usuarios)).into_response())
}

/// POST /usuarios/
///
/// ```json
/// { "message": "created", "id": "65f0c0ffee0000000000abcd" }
/// ```
#[tracing::instrument(skip_all)]
async fn create_usuario<U>(
    State(state): State<AppState<U>>,
    UsuarioPayload(usuario): UsuarioPayload,
) -> Result<Response, UsuarioError>
where
    U: UsuarioStorage,
{
    let id = state.usuarios.create(&usuario).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUsuarioResponse {
            message: "created".to_owned(),
            id,
        }),
    )
        .into_response())
}

/// GET /usuarios/{cedula}
#[tracing::instrument(skip_all)]
async fn get_usuario<U>(
    State(state): State<AppState<U>>,
    Path(cedula): Path<String>,
) -> Result<Response, UsuarioError>
where
    U: UsuarioStorage,
{
    let stored = state.usuarios.get(&cedula).await?;
    Ok((StatusCode::OK, Json(UsuarioResponse::from(stored))).into_response())
}

/// PUT /usuarios/{cedula}
///
/// Full overwrite; the path `cedula` wins over the one in the body.
#[tracing::instrument(skip_all)]
async fn update_usuario<U>(
    State(state): State<AppState<U>>,
    Path(cedula): Path<String>,
    UsuarioPayload(usuario): UsuarioPayload,
) -> Result<Response, UsuarioError>
where
    U: UsuarioStorage,
{
    state.usuarios.update(&cedula, &usuario).await?;
    Ok((StatusCode::OK, Json(MessageResponse::new("updated"))).into_response())
}

/// DELETE /usuarios/{cedula}
#[tracing::instrument(skip_all)]
async fn delete_usuario<U>(
    State(state): State<AppState<U>>,
    Path(cedula): Path<String>,
) -> Result<Response, UsuarioError>
where
    U: UsuarioStorage,
{
    state.usuarios.delete(&cedula).await?;
    Ok((StatusCode::OK, Json(MessageResponse::new("deleted"))).into_response())
}
