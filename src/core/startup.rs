use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::{Config, SeedUserConfig, StorageBackend};
use crate::models::user::{looks_like_password_hash, User};
use crate::stores::memory::MemoryUserStorage;
use crate::stores::mongo::{self, MongoUserStorage};
use crate::stores::UserStorage;

/// Build the configured storage backend. For MongoDB this connects and pings the server.
pub async fn build_storage(config: &Config) -> Result<Arc<dyn UserStorage>> {
    match config.storage.backend {
        StorageBackend::Mongodb => {
            let mongo_config = &config.storage.mongodb;
            let database = mongo::connect(mongo_config)
                .await
                .context("Failed to initialize MongoDB storage")?;

            info!(collection = %mongo_config.collection, "MongoDB storage ready");
            Ok(Arc::new(MongoUserStorage::new(&database, &mongo_config.collection)))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data will not survive a restart");
            Ok(Arc::new(MemoryUserStorage::new()))
        }
    }
}

/// Insert the configured demo user and return its identifier
pub async fn create_seed_user(storage: &dyn UserStorage, seed: &SeedUserConfig) -> Result<String> {
    if !looks_like_password_hash(&seed.password_hash) {
        warn!(
            username = %seed.username,
            "Seed user password_hash does not look like a password hash"
        );
    }

    let user = User::new(
        seed.username.clone(),
        seed.password_hash.clone(),
        seed.email.clone(),
    );

    let id = storage
        .create(user)
        .await
        .context("Failed to create seed user")?;

    info!(user_id = %id, username = %seed.username, "Seed user created");
    Ok(id)
}
