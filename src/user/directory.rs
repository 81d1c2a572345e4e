//! The user directory: validated, indexed CRUD over the document store.

use rand::Rng;
use rand::rngs::OsRng;
use serde_json::{Value, json};

use crate::config::Configuration;
use crate::error::{DirectoryError, Result};
use crate::store::{DocumentStore, JsonStore, optional};
use crate::user::sanitize::{Sanitized, sanitize_user_data};
use crate::user::{
    AugmentedUser, OTP_LENGTH, PublicUser, UserId, UserPatch, UserType, paths,
};

/// URL-safe alphabet for generated one-time passwords.
const OTP_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Validating, indexed record store for user accounts.
///
/// Every mutation goes through the sanitation routine; the three reverse
/// indexes (`username->id`, `email->id`, `otp->id`) are kept consistent
/// with the primary table on each write. The directory holds its store
/// handle explicitly, so tests and embedders can supply their own.
pub struct UserDirectory<S = JsonStore> {
    store: S,
    debugging: bool,
}

impl UserDirectory<JsonStore> {
    /// Open the directory described by `config`.
    pub fn open(config: &Configuration) -> Result<Self> {
        Ok(Self {
            store: JsonStore::open(&config.database)?,
            debugging: config.debugging(),
        })
    }
}

impl<S: DocumentStore> UserDirectory<S> {
    /// Build a directory over an explicit store handle.
    pub fn with_store(store: S, debugging: bool) -> Self {
        Self { store, debugging }
    }

    /// Shared access to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn data(&self, path: &str) -> Result<Option<Value>> {
        optional(&self.store, path)
    }

    /// Delete tolerating an already-absent path.
    fn discard(&self, path: &str) -> Result<()> {
        match self.store.delete(path) {
            Err(DirectoryError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    /// Create a new valid login for a user and return the assigned id.
    ///
    /// The explicit arguments win over any same-named key in `extra`.
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        kind: UserType,
        extra: UserPatch,
    ) -> Result<UserId> {
        // The counter is seeded at deployment; zero and absent both mean a
        // broken database.
        let user_id = self
            .data(paths::NEXT_USER_ID)?
            .and_then(|id| id.as_u64())
            .filter(|id| *id != 0)
            .ok_or_else(|| {
                DirectoryError::App(
                    "failed to acquire next user id".to_owned(),
                )
            })?;

        let mut patch = extra;
        patch.insert("username".to_owned(), json!(username));
        patch.insert("password".to_owned(), json!(password));
        patch.insert("type".to_owned(), json!(kind.as_str()));

        let Sanitized { new, .. } =
            sanitize_user_data(&self.store, None, &patch)?;

        let email = field(&new, "email");
        let otp = field(&new, "otp");

        self.store.put(&paths::user(user_id), Value::Object(new))?;
        self.store.put(&paths::username(username), json!(user_id))?;
        if !email.is_empty() {
            self.store.put(&paths::email(&email), json!(user_id))?;
        }
        if !otp.is_empty() {
            self.store.put(&paths::otp(&otp), json!(user_id))?;
        }
        self.store.put(paths::NEXT_USER_ID, json!(user_id + 1))?;

        tracing::debug!(user_id, username, "user created");
        Ok(user_id)
    }

    /// Merge `patch` into an existing user's record.
    ///
    /// Validation runs against the merged candidate before anything is
    /// written; an invalid patch is never partially applied. An empty patch
    /// against an existing id is a no-op write.
    pub fn merge_user_data(
        &self,
        user_id: UserId,
        patch: &UserPatch,
    ) -> Result<()> {
        let Sanitized { old, new } =
            sanitize_user_data(&self.store, Some(user_id), patch)?;

        let new_username = field(&new, "username");
        let new_email = field(&new, "email");
        let new_otp = field(&new, "otp");
        let old_username = field(&old, "username");
        let old_email = field(&old, "email");
        let old_otp = field(&old, "otp");

        self.store.put(&paths::user(user_id), Value::Object(new))?;

        // Fix up each index the patch touched: write the new entry, then
        // drop the old value's entry. Identical old and new values keep
        // their entry untouched.
        if patch.contains_key("username") {
            self.store.put(&paths::username(&new_username), json!(user_id))?;
            if !old_username.is_empty() && old_username != new_username {
                self.discard(&paths::username(&old_username))?;
            }
        }
        if patch.contains_key("email") {
            if !new_email.is_empty() {
                self.store.put(&paths::email(&new_email), json!(user_id))?;
            }
            if !old_email.is_empty() && old_email != new_email {
                self.discard(&paths::email(&old_email))?;
            }
        }
        if patch.contains_key("otp") {
            if !new_otp.is_empty() {
                self.store.put(&paths::otp(&new_otp), json!(user_id))?;
            }
            if !old_otp.is_empty() && old_otp != new_otp {
                self.discard(&paths::otp(&old_otp))?;
            }
        }

        tracing::debug!(user_id, "user data merged");
        Ok(())
    }

    /// Hard-delete a user and its index entries. Idempotent: a missing id
    /// is a no-op.
    ///
    /// Most deletes in the system are soft deletes setting the `deleted`
    /// flag; this one destroys the record.
    pub fn delete_user(&self, user_id: UserId) -> Result<()> {
        let Some(old) = self.data(&paths::user(user_id))? else {
            return Ok(());
        };

        self.discard(&paths::user(user_id))?;
        for (value, path) in [
            (old.get("username"), paths::username as fn(&str) -> String),
            (old.get("email"), paths::email),
            (old.get("otp"), paths::otp),
        ] {
            if let Some(value) = value.and_then(Value::as_str)
                && !value.is_empty()
            {
                self.discard(&path(value))?;
            }
        }

        tracing::debug!(user_id, "user hard-deleted");
        Ok(())
    }

    pub fn user_id_from_username(&self, username: &str) -> Result<UserId> {
        self.data(&paths::username(username))?
            .and_then(|id| id.as_u64())
            .ok_or_else(|| {
                DirectoryError::NotFound(format!("username {username}"))
            })
    }

    pub fn user_id_from_email(&self, email: &str) -> Result<UserId> {
        self.data(&paths::email(email))?
            .and_then(|id| id.as_u64())
            .ok_or_else(|| {
                DirectoryError::NotFound(format!("email {email}"))
            })
    }

    pub fn user_id_from_otp(&self, otp: &str) -> Result<UserId> {
        self.data(&paths::otp(otp))?
            .and_then(|id| id.as_u64())
            .ok_or_else(|| DirectoryError::NotFound("otp".to_owned()))
    }

    pub fn does_user_id_exist(&self, user_id: UserId) -> Result<bool> {
        Ok(self.data(&paths::user(user_id))?.is_some())
    }

    pub fn does_username_exist(&self, username: &str) -> Result<bool> {
        Ok(self.data(&paths::username(username))?.is_some())
    }

    pub fn does_email_exist(&self, email: &str) -> Result<bool> {
        Ok(self.data(&paths::email(email))?.is_some())
    }

    /// Full user data, with the OTP withheld and the root user's
    /// `type`/`restricted`/`deleted` overridden by hardcoded safe values.
    ///
    /// The override happens only here, on read; the stored record keeps
    /// whatever was written.
    pub fn get_user(&self, user_id: UserId) -> Result<AugmentedUser> {
        let Some(Value::Object(mut data)) = self.data(&paths::user(user_id))?
        else {
            return Err(DirectoryError::NotFound(format!(
                "user id {user_id}"
            )));
        };

        // The OTP must never leave through this accessor.
        data.remove("otp");

        let root = self
            .data(paths::ROOT_USER_ID)?
            .and_then(|id| id.as_u64())
            == Some(user_id);
        if root {
            data.insert("type".to_owned(), json!("administrator"));
            data.insert("restricted".to_owned(), json!(false));
            data.insert("deleted".to_owned(), json!(false));
        }

        data.insert("userId".to_owned(), json!(user_id));
        data.insert("root".to_owned(), json!(root));
        data.insert("debugging".to_owned(), json!(self.debugging));

        Ok(serde_json::from_value(Value::Object(data))?)
    }

    pub fn get_public_user(&self, user_id: UserId) -> Result<PublicUser> {
        let Some(data) = self.data(&paths::user(user_id))? else {
            return Err(DirectoryError::NotFound(format!(
                "user id {user_id}"
            )));
        };

        public_projection(user_id, &data)
    }

    /// Public-shape projection of every user in the store.
    pub fn get_public_users(&self) -> Result<Vec<PublicUser>> {
        let Some(Value::Object(users)) = self.data(paths::USERS)? else {
            return Ok(Vec::new());
        };

        users
            .iter()
            .map(|(id, data)| {
                let user_id = id.parse().map_err(|_| {
                    DirectoryError::App(format!(
                        "non-numeric user id key \"{id}\""
                    ))
                })?;
                public_projection(user_id, data)
            })
            .collect()
    }

    /// Whether `username`/`password` name an existing, non-soft-deleted
    /// user. Degrades to `false` on every failure, including empty input.
    pub fn are_valid_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> bool {
        let Ok(user_id) = self.user_id_from_username(username) else {
            return false;
        };

        match self.get_user(user_id) {
            Ok(user) => !user.deleted && user.password == password,
            Err(_) => false,
        }
    }

    /// Generate, store and return a fresh one-time password for a user.
    ///
    /// Fails when the user does not exist or is soft-deleted; a previous
    /// OTP is replaced (and unindexed) as part of the merge.
    pub fn generate_otp_for(&self, user_id: UserId) -> Result<String> {
        let eligible = self
            .data(&paths::user(user_id))?
            .is_some_and(|data| {
                data.get("deleted").and_then(Value::as_bool) != Some(true)
            });
        if !eligible {
            return Err(DirectoryError::App(
                "OTP generation failed".to_owned(),
            ));
        }

        let otp: String = (0..OTP_LENGTH)
            .map(|_| {
                let index = OsRng.gen_range(0..OTP_ALPHABET.len());
                char::from(OTP_ALPHABET[index])
            })
            .collect();

        let mut patch = UserPatch::new();
        patch.insert("otp".to_owned(), json!(otp));
        self.merge_user_data(user_id, &patch)?;

        Ok(otp)
    }

    /// Clear a user's one-time password, dropping its index entry. No-op
    /// for missing ids or an already-empty OTP.
    pub fn clear_otp_for(&self, user_id: UserId) -> Result<()> {
        if self.data(&paths::user(user_id))?.is_some() {
            let mut patch = UserPatch::new();
            patch.insert("otp".to_owned(), json!(""));
            self.merge_user_data(user_id, &patch)?;
        }

        Ok(())
    }
}

fn field(record: &UserPatch, name: &str) -> String {
    record
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn public_projection(user_id: UserId, data: &Value) -> Result<PublicUser> {
    Ok(PublicUser {
        user_id,
        username: data
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        kind: serde_json::from_value(
            data.get("type").cloned().unwrap_or(Value::Null),
        )?,
    })
}
