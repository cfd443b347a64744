use crate::models::user::{User, UserPatch};
use crate::stores::{parse_object_id, StorageError, UserStorage};
use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::bson::oid::ObjectId;
use tracing::{debug, trace};

/// In-process user store with the same contract as the MongoDB adapter
pub struct MemoryUserStorage {
    users: DashMap<ObjectId, User>,
}

impl MemoryUserStorage {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for MemoryUserStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStorage for MemoryUserStorage {
    async fn create(&self, user: User) -> Result<String, StorageError> {
        debug!("create user");
        let oid = ObjectId::new();
        let id = oid.to_hex();

        self.users.insert(oid, user.with_id(id.clone()));

        Ok(id)
    }

    async fn find_one(&self, id: &str) -> Result<User, StorageError> {
        let oid = parse_object_id(id)?;

        self.users
            .get(&oid)
            .map(|entry| entry.value().clone())
            .ok_or(StorageError::NotFound)
    }

    async fn find_all(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.users.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn update(&self, user: User) -> Result<(), StorageError> {
        let oid = parse_object_id(&user.id)?;

        let mut entry = self.users.get_mut(&oid).ok_or(StorageError::NotFound)?;
        let stored = entry.value_mut();
        stored.username = user.username;
        stored.password_hash = user.password_hash;
        stored.email = user.email;

        trace!(id = %user.id, "Updated user");
        Ok(())
    }

    async fn partially_update(&self, id: &str, patch: UserPatch) -> Result<(), StorageError> {
        let oid = parse_object_id(id)?;

        let mut entry = self.users.get_mut(&oid).ok_or(StorageError::NotFound)?;
        entry.value_mut().apply_patch(&patch);

        trace!(id = %id, "Partially updated user");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let oid = parse_object_id(id)?;

        self.users
            .remove(&oid)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}
