use serde::{Deserialize, Serialize};

/// A stored user record.
///
/// `id` is empty until the store assigns one on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub email: String,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            username: username.into(),
            password_hash: password_hash.into(),
            email: email.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Apply the fields present in `patch`, leaving `id` untouched
    pub fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(password_hash) = &patch.password_hash {
            self.password_hash = password_hash.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
    }
}

/// Subset of user fields for a partial update
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub email: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password_hash.is_none() && self.email.is_none()
    }
}

/// Whether `value` looks like the output of a password hashing function
/// (PHC or modular crypt format, e.g. `$argon2id$...` or `$2b$...`).
///
/// The service stores whatever it is given; callers use this to flag
/// plaintext passwords sent in the `passwordHash` field.
pub fn looks_like_password_hash(value: &str) -> bool {
    let mut parts = value.split('$');

    // Leading '$' yields an empty first segment
    if parts.next() != Some("") {
        return false;
    }

    let algorithm = parts.next().unwrap_or("");
    let rest: Vec<&str> = parts.collect();

    !algorithm.is_empty()
        && algorithm
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        && rest.len() >= 2
        && rest.last().is_some_and(|s| !s.is_empty())
}
