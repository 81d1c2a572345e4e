//! Sanitation and validation of proposed user records.
//!
//! Every mutation of user data funnels through [`sanitize_user_data`], which
//! keeps the database from becoming corrupted: it merges the proposed patch
//! against the defaults and the existing record, then validates the merged
//! candidate field by field, failing fast on the first offending field.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde_json::{Map, Value};
use validator::ValidateEmail;

use crate::error::{DirectoryError, Result};
use crate::store::{DocumentStore, optional};
use crate::user::{
    MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH, PHONE_NUMBER_LENGTH, User,
    UserId, UserPatch, UserType, ZIP_LENGTH, paths,
};

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-zA-Z-]+$").expect("pattern is valid"));

/// Every field a patch may mention.
const KNOWN_FIELDS: [&str; 16] = [
    "username",
    "password",
    "type",
    "firstLogin",
    "restricted",
    "deleted",
    "lastLogin",
    "name",
    "elections",
    "email",
    "phone",
    "address",
    "city",
    "state",
    "zip",
    "otp",
];

/// Outcome of a successful sanitation run. Side-effect free: nothing has
/// been written to the store yet.
pub(crate) struct Sanitized {
    /// The pre-existing record, empty on the create path.
    pub old: Map<String, Value>,
    /// The fully populated, validated candidate record.
    pub new: Map<String, Value>,
}

/// Canonical default record. `type` is deliberately null so that a create
/// must always choose one.
fn default_user() -> Map<String, Value> {
    let Ok(Value::Object(mut map)) = serde_json::to_value(User::default())
    else {
        unreachable!("default user serializes to an object");
    };
    map.insert("type".to_owned(), Value::Null);
    map
}

/// Deep-merge `patch` into `target`. Nested objects merge recursively;
/// arrays and scalars from the patch overwrite wholesale. Arrays must not
/// be concatenated, otherwise repeated partial updates would grow the
/// `elections` lists without bound.
fn merge_into(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, incoming) in patch {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            },
            (_, incoming) => {
                target.insert(key.clone(), incoming.clone());
            },
        }
    }
}

/// JavaScript-style truthiness, used to coerce the three boolean flags.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => {
            number.as_f64().is_some_and(|n| n != 0.0)
        },
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Render a candidate value for an error message. Absent keys show as
/// `undefined` to distinguish them from explicit nulls.
fn shown(value: Option<&Value>) -> String {
    value.map_or_else(|| "undefined".to_owned(), Value::to_string)
}

fn field_str<'a>(
    record: &'a Map<String, Value>,
    field: &str,
) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// Produce a fully populated, validated candidate record from an optional
/// existing record and a partial patch, or fail.
///
/// `user_id` absent means the create path. Present, it must name an
/// existing record or the run fails with [`DirectoryError::NotFound`].
pub(crate) fn sanitize_user_data<S: DocumentStore>(
    store: &S,
    user_id: Option<UserId>,
    patch: &UserPatch,
) -> Result<Sanitized> {
    let old = match user_id {
        Some(id) => match optional(store, &paths::user(id))? {
            Some(Value::Object(record)) => Some(record),
            // The id was given, so it must exist.
            _ => {
                return Err(DirectoryError::NotFound(format!(
                    "user id {id}"
                )));
            },
        },
        None => None,
    };

    // Whitelist possible user data mutations.
    if patch.keys().any(|key| !KNOWN_FIELDS.contains(&key.as_str())) {
        let keys = patch.keys().cloned().collect::<Vec<_>>().join(", ");
        return Err(DirectoryError::expected(
            "only valid object key(s) in data",
            keys,
        ));
    }

    let mut candidate = default_user();
    if let Some(old) = &old {
        merge_into(&mut candidate, old);
    }
    merge_into(&mut candidate, patch);

    validate_username(store, &candidate, old.as_ref())?;

    // Password only has to be a string for now.
    // TODO: enforce expected ciphertext length once hashing lands.
    if !candidate.get("password").is_some_and(Value::is_string) {
        return Err(DirectoryError::expected(
            "password to be a string",
            shown(candidate.get("password")),
        ));
    }

    let kind_is_valid = field_str(&candidate, "type")
        .and_then(UserType::parse)
        .is_some();
    if !kind_is_valid {
        return Err(DirectoryError::expected(
            "valid type",
            shown(candidate.get("type")),
        ));
    }

    // firstLogin cannot go from false to true.
    let was_not_first_login = old
        .as_ref()
        .is_some_and(|old| old.get("firstLogin") == Some(&Value::Bool(false)));
    if was_not_first_login && truthy(candidate.get("firstLogin")) {
        return Err(DirectoryError::Validation(
            "firstLogin cannot be set to `true`".to_owned(),
        ));
    }

    // Coerce the three flags to strict booleans.
    for flag in ["firstLogin", "restricted", "deleted"] {
        let coerced = truthy(candidate.get(flag));
        candidate.insert(flag.to_owned(), Value::Bool(coerced));
    }

    let last_login_is_valid = candidate
        .get("lastLogin")
        .and_then(Value::as_object)
        .is_some_and(|login| {
            login.len() == 2
                && login.get("ip").is_some_and(Value::is_string)
                && login
                    .get("time")
                    .is_some_and(|time| time.is_null() || time.is_number())
        });
    if !last_login_is_valid {
        return Err(DirectoryError::expected(
            "a valid lastLogin",
            shown(candidate.get("lastLogin")),
        ));
    }

    let name_is_valid = candidate
        .get("name")
        .and_then(Value::as_object)
        .is_some_and(|name| {
            name.len() == 2
                && name.get("first").is_some_and(Value::is_string)
                && name.get("last").is_some_and(Value::is_string)
        });
    if !name_is_valid {
        return Err(DirectoryError::expected(
            "a valid name",
            shown(candidate.get("name")),
        ));
    }

    let elections_are_valid = candidate
        .get("elections")
        .and_then(Value::as_object)
        .is_some_and(|elections| {
            elections.len() == 2
                && ["eligible", "moderating"].iter().all(|list| {
                    elections.get(*list).and_then(Value::as_array).is_some_and(
                        |ids| {
                            ids.iter().all(|id| {
                                id.as_str().is_some_and(|id| !id.is_empty())
                            })
                        },
                    )
                })
        });
    if !elections_are_valid {
        return Err(DirectoryError::expected(
            "valid elections mappings",
            shown(candidate.get("elections")),
        ));
    }

    validate_email(store, &candidate, old.as_ref())?;
    validate_digit_field(
        &candidate,
        "phone",
        PHONE_NUMBER_LENGTH,
        "digit phone number (string)",
    )?;

    if !["address", "city", "state"]
        .iter()
        .all(|field| candidate.get(*field).is_some_and(Value::is_string))
    {
        return Err(DirectoryError::Validation(
            r#"any of the keys "address", "city", "state", or "zip" are invalid"#
                .to_owned(),
        ));
    }

    validate_digit_field(&candidate, "zip", ZIP_LENGTH, "digit zip code (string)")?;
    validate_otp(store, &candidate, old.as_ref())?;

    Ok(Sanitized {
        old: old.unwrap_or_default(),
        new: candidate,
    })
}

fn validate_username<S: DocumentStore>(
    store: &S,
    candidate: &Map<String, Value>,
    old: Option<&Map<String, Value>>,
) -> Result<()> {
    let Some(username) = field_str(candidate, "username") else {
        return Err(DirectoryError::expected(
            "username to be a string",
            shown(candidate.get("username")),
        ));
    };

    let length = username.chars().count();
    if length < MIN_USERNAME_LENGTH {
        return Err(DirectoryError::expected(
            format!("username.length >= {MIN_USERNAME_LENGTH}"),
            username,
        ));
    }
    if length > MAX_USERNAME_LENGTH {
        return Err(DirectoryError::expected(
            format!("username.length <= {MAX_USERNAME_LENGTH}"),
            username,
        ));
    }
    if !USERNAME_PATTERN.is_match(username) {
        return Err(DirectoryError::expected(
            "username to contain only characters a-z, A-Z, and -",
            username,
        ));
    }

    // Usernames remain unique; an unchanged username needs no lookup.
    let unchanged = old.and_then(|old| field_str(old, "username"))
        == Some(username);
    if !unchanged && optional(store, &paths::username(username))?.is_some() {
        return Err(DirectoryError::AlreadyExists(format!(
            "username \"{username}\""
        )));
    }

    Ok(())
}

fn validate_email<S: DocumentStore>(
    store: &S,
    candidate: &Map<String, Value>,
    old: Option<&Map<String, Value>>,
) -> Result<()> {
    let email = field_str(candidate, "email");
    let format_is_valid = match email {
        Some("") => true,
        Some(address) => address.validate_email(),
        None => false,
    };
    if !format_is_valid {
        return Err(DirectoryError::expected(
            "a valid email",
            shown(candidate.get("email")),
        ));
    }

    let email = email.unwrap_or_default();
    let unchanged =
        old.and_then(|old| field_str(old, "email")) == Some(email);
    if !email.is_empty()
        && !unchanged
        && optional(store, &paths::email(email))?.is_some()
    {
        return Err(DirectoryError::AlreadyExists(format!(
            "email \"{email}\""
        )));
    }

    Ok(())
}

fn validate_otp<S: DocumentStore>(
    store: &S,
    candidate: &Map<String, Value>,
    old: Option<&Map<String, Value>>,
) -> Result<()> {
    let Some(otp) = field_str(candidate, "otp") else {
        return Err(DirectoryError::expected(
            "otp",
            shown(candidate.get("otp")),
        ));
    };

    let unchanged = old.and_then(|old| field_str(old, "otp")) == Some(otp);
    if !otp.is_empty()
        && !unchanged
        && optional(store, &paths::otp(otp))?.is_some()
    {
        // Do not echo the token back.
        return Err(DirectoryError::AlreadyExists("otp".to_owned()));
    }

    Ok(())
}

fn validate_digit_field(
    candidate: &Map<String, Value>,
    field: &str,
    digits: usize,
    rule: &str,
) -> Result<()> {
    let well_formed = field_str(candidate, field).is_some_and(|value| {
        value.is_empty()
            || (value.chars().count() == digits
                && value.chars().all(|c| c.is_ascii_digit()))
    });

    if well_formed {
        Ok(())
    } else {
        Err(DirectoryError::expected(
            format!("{digits} {rule}"),
            shown(candidate.get(field)),
        ))
    }
}
