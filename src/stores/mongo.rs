use crate::core::config::MongoConfig;
use crate::models::user::{User, UserPatch};
use crate::stores::{parse_object_id, StorageError, UserStorage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Persisted shape of a user record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub email: String,
}

impl From<UserDocument> for User {
    fn from(document: UserDocument) -> Self {
        User {
            id: document.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            username: document.username,
            password_hash: document.password_hash,
            email: document.email,
        }
    }
}

impl UserDocument {
    /// New document without `_id`; the server assigns one on insert
    pub fn for_insert(user: User) -> Self {
        Self {
            id: None,
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
        }
    }
}

/// `$set` payload for a full update. `_id` is never part of it.
pub fn full_update_set(user: &User) -> Document {
    doc! {
        "username": user.username.as_str(),
        "passwordHash": user.password_hash.as_str(),
        "email": user.email.as_str(),
    }
}

/// `$set` payload with only the fields present in `patch`
pub fn patch_set(patch: &UserPatch) -> Document {
    let mut set = Document::new();
    if let Some(username) = &patch.username {
        set.insert("username", username.as_str());
    }
    if let Some(password_hash) = &patch.password_hash {
        set.insert("passwordHash", password_hash.as_str());
    }
    if let Some(email) = &patch.email {
        set.insert("email", email.as_str());
    }
    set
}

/// Open a client for `config` and verify the server answers a ping
pub async fn connect(config: &MongoConfig) -> Result<Database> {
    let uri = format!("mongodb://{}:{}", config.host, config.port);
    let mut options = ClientOptions::parse(&uri)
        .await
        .context(format!("Failed to parse MongoDB address {uri}"))?;

    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    options.connect_timeout = Some(Duration::from_secs(config.connect_timeout));
    options.server_selection_timeout = Some(Duration::from_secs(config.connect_timeout));

    if !config.username.is_empty() {
        let source = if config.auth_db.is_empty() {
            None
        } else {
            Some(config.auth_db.clone())
        };

        options.credential = Some(
            Credential::builder()
                .username(config.username.clone())
                .password(config.password.clone())
                .source(source)
                .build(),
        );
    }

    let client = Client::with_options(options).context("Failed to create MongoDB client")?;
    let database = client.database(&config.database);

    database
        .run_command(doc! { "ping": 1 })
        .await
        .context(format!("Failed to connect to MongoDB at {uri}"))?;

    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        "Connected to MongoDB"
    );

    Ok(database)
}

/// User storage backed by a MongoDB collection
pub struct MongoUserStorage {
    collection: Collection<UserDocument>,
}

impl MongoUserStorage {
    pub fn new(database: &Database, collection: &str) -> Self {
        Self {
            collection: database.collection(collection),
        }
    }
}

#[async_trait]
impl UserStorage for MongoUserStorage {
    async fn create(&self, user: User) -> Result<String, StorageError> {
        debug!("create user");
        let result = self
            .collection
            .insert_one(UserDocument::for_insert(user))
            .await
            .map_err(|e| {
                StorageError::Persistence(format!("failed to create user due to error: {e}"))
            })?;

        debug!("convert InsertedID to ObjectID");
        match result.inserted_id.as_object_id() {
            Some(oid) => Ok(oid.to_hex()),
            None => Err(StorageError::Encoding(format!(
                "failed to convert object to hex. oid: {}",
                result.inserted_id
            ))),
        }
    }

    async fn find_one(&self, id: &str) -> Result<User, StorageError> {
        let oid = parse_object_id(id)?;

        let document = self
            .collection
            .find_one(doc! { "_id": oid })
            .await
            .map_err(|e| {
                StorageError::Persistence(format!(
                    "failed to find user by ID: {id} due to error {e}"
                ))
            })?;

        document.map(User::from).ok_or(StorageError::NotFound)
    }

    async fn find_all(&self) -> Result<Vec<User>, StorageError> {
        let cursor = self.collection.find(doc! {}).await.map_err(|e| {
            StorageError::Persistence(format!("failed to find all users due to error: {e}"))
        })?;

        let documents: Vec<UserDocument> = cursor.try_collect().await.map_err(|e| {
            StorageError::Persistence(format!("failed to read all documents from result: {e}"))
        })?;

        Ok(documents.into_iter().map(User::from).collect())
    }

    async fn update(&self, user: User) -> Result<(), StorageError> {
        let oid = parse_object_id(&user.id)?;

        let result = self
            .collection
            .update_one(doc! { "_id": oid }, doc! { "$set": full_update_set(&user) })
            .await
            .map_err(|e| {
                StorageError::Persistence(format!("failed to execute update query. error: {e}"))
            })?;

        if result.matched_count == 0 {
            return Err(StorageError::NotFound);
        }

        trace!(
            matched = result.matched_count,
            modified = result.modified_count,
            "Updated user"
        );
        Ok(())
    }

    async fn partially_update(&self, id: &str, patch: UserPatch) -> Result<(), StorageError> {
        let oid = parse_object_id(id)?;
        let filter = doc! { "_id": oid };

        // `$set` with an empty document is rejected by the server
        if patch.is_empty() {
            let count = self
                .collection
                .count_documents(filter)
                .await
                .map_err(|e| {
                    StorageError::Persistence(format!(
                        "failed to find user by ID: {id} due to error {e}"
                    ))
                })?;

            return if count == 0 {
                Err(StorageError::NotFound)
            } else {
                Ok(())
            };
        }

        let result = self
            .collection
            .update_one(filter, doc! { "$set": patch_set(&patch) })
            .await
            .map_err(|e| {
                StorageError::Persistence(format!("failed to execute update query. error: {e}"))
            })?;

        if result.matched_count == 0 {
            return Err(StorageError::NotFound);
        }

        trace!(
            matched = result.matched_count,
            modified = result.modified_count,
            "Partially updated user"
        );
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let oid = parse_object_id(id)?;

        let result = self
            .collection
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(|e| {
                StorageError::Persistence(format!("failed to delete document due to error: {e}"))
            })?;

        if result.deleted_count == 0 {
            return Err(StorageError::NotFound);
        }

        trace!(deleted = result.deleted_count, "Deleted user");
        Ok(())
    }
}
