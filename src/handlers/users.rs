use crate::core::error::AppError;
use crate::core::state::AppState;
use crate::models::api::{CreateUserRequest, PatchUserRequest, UpdateUserRequest};
use crate::models::user::{looks_like_password_hash, User};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn flag_plaintext_password(password_hash: &str, username: &str) {
    if !looks_like_password_hash(password_hash) {
        warn!(
            username = %username,
            "passwordHash does not look like a password hash; storing the value as received"
        );
    }
}

/// List all users
///
/// GET /users
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = state.storage.find_all().await?;
    debug!(count = users.len(), "Listed users");

    Ok(Json(users))
}

/// Create a user
///
/// POST /users
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    flag_plaintext_password(&req.password_hash, &req.username);

    let user = User::from(req);
    let id = state.storage.create(user.clone()).await?;

    info!(user_id = %id, username = %user.username, "User created");

    let location = format!("/users/{id}");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(user.with_id(id)),
    )
        .into_response())
}

/// Get a user by identifier
///
/// GET /users/{id}
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<User>, AppError> {
    let Path(id) = path?;
    let user = state.storage.find_one(&id).await?;
    Ok(Json(user))
}

/// Replace every field of a user except its identifier
///
/// PUT /users/{id}
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    flag_plaintext_password(&req.password_hash, &req.username);

    state.storage.update(req.into_user(id.clone())).await?;

    info!(user_id = %id, "User updated");
    Ok(StatusCode::NO_CONTENT)
}

/// Update only the supplied fields of a user
///
/// PATCH /users/{id}
pub async fn partially_update_user_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<PatchUserRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    let Json(patch) = payload?;
    if let Some(password_hash) = &patch.password_hash {
        flag_plaintext_password(password_hash, patch.username.as_deref().unwrap_or(""));
    }

    state.storage.partially_update(&id, patch).await?;

    info!(user_id = %id, "User partially updated");
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a user
///
/// DELETE /users/{id}
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    state.storage.delete(&id).await?;

    info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
