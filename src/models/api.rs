use crate::models::user::{User, UserPatch};
use serde::{Deserialize, Serialize};

/// Body of `POST /users`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub password_hash: String,
    pub email: String,
}

impl From<CreateUserRequest> for User {
    fn from(req: CreateUserRequest) -> Self {
        User::new(req.username, req.password_hash, req.email)
    }
}

/// Body of `PUT /users/{id}`.
///
/// Any `id` in the payload is ignored; the path decides which record is replaced.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: String,
    pub password_hash: String,
    pub email: String,
}

impl UpdateUserRequest {
    pub fn into_user(self, id: String) -> User {
        User::new(self.username, self.password_hash, self.email).with_id(id)
    }
}

/// Body of `PATCH /users/{id}`
pub type PatchUserRequest = UserPatch;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub developer_message: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
}
