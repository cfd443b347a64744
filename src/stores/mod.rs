//! User persistence.
//!
//! [`UserStorage`] is the seam between HTTP handlers and the document store.
//! Identifiers are MongoDB ObjectIds rendered as 24-character lowercase hex.

pub mod memory;
pub mod mongo;

use crate::models::user::{User, UserPatch};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("user not found")]
    NotFound,

    #[error("{0}")]
    Persistence(String),

    #[error("{0}")]
    Encoding(String),
}

/// CRUD operations on stored users.
///
/// Dropping a returned future abandons the operation; implementations
/// hold no state across calls that a cancelled call could corrupt.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Insert a new record and return its assigned identifier
    async fn create(&self, user: User) -> Result<String, StorageError>;

    async fn find_one(&self, id: &str) -> Result<User, StorageError>;

    /// Every stored record, in no particular order
    async fn find_all(&self) -> Result<Vec<User>, StorageError>;

    /// Replace all non-identifier fields of the record `user.id`
    async fn update(&self, user: User) -> Result<(), StorageError>;

    /// Set only the fields present in `patch`
    async fn partially_update(&self, id: &str, patch: UserPatch) -> Result<(), StorageError>;

    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}

/// Parse a hex identifier into an ObjectId
pub fn parse_object_id(id: &str) -> Result<ObjectId, StorageError> {
    ObjectId::parse_str(id).map_err(|_| {
        StorageError::InvalidArgument(format!("failed to convert hex to ObjectID. HEX: {id}"))
    })
}
