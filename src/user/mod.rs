//! User records and the directory that manages them.

mod directory;
mod sanitize;

pub use directory::UserDirectory;

use serde::{Deserialize, Serialize};

/// Shortest allowed username.
pub const MIN_USERNAME_LENGTH: usize = 5;
/// Longest allowed username.
pub const MAX_USERNAME_LENGTH: usize = 20;
/// Digit count of a well-formed phone number.
pub const PHONE_NUMBER_LENGTH: usize = 10;
/// Digit count of a well-formed zip code.
pub const ZIP_LENGTH: usize = 5;
/// Length of generated one-time passwords.
pub const OTP_LENGTH: usize = 30;

/// Identifier assigned at creation from the `nextUserId` counter. Strictly
/// increasing, never reused, immutable thereafter.
pub type UserId = u64;

/// Partial set of proposed field values, keyed by wire field name.
pub type UserPatch = serde_json::Map<String, serde_json::Value>;

/// Store paths used by the directory.
pub(crate) mod paths {
    use super::UserId;

    pub const NEXT_USER_ID: &str = "/nextUserId";
    pub const ROOT_USER_ID: &str = "/rootUserId";
    pub const USERS: &str = "/users";

    pub fn user(id: UserId) -> String {
        format!("/users/{id}")
    }

    pub fn username(username: &str) -> String {
        format!("/username->id/{username}")
    }

    pub fn email(email: &str) -> String {
        format!("/email->id/{email}")
    }

    pub fn otp(otp: &str) -> String {
        format!("/otp->id/{otp}")
    }
}

/// Privilege level of an account.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Administrator,
    Moderator,
    #[default]
    Voter,
    Reporter,
}

impl UserType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Moderator => "moderator",
            Self::Voter => "voter",
            Self::Reporter => "reporter",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "administrator" => Some(Self::Administrator),
            "moderator" => Some(Self::Moderator),
            "voter" => Some(Self::Voter),
            "reporter" => Some(Self::Reporter),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source address and time of the most recent login.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LastLogin {
    pub ip: String,
    /// Milliseconds since the epoch, or `None` before the first login.
    /// Callers may supply fractional milliseconds.
    pub time: Option<f64>,
}

/// Legal name split into its two halves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Name {
    pub first: String,
    pub last: String,
}

/// Election identifiers a user may vote in or moderates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Elections {
    pub eligible: Vec<String>,
    pub moderating: Vec<String>,
}

/// User record as stored at `/users/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub password: String,
    #[serde(rename = "type")]
    pub kind: UserType,
    pub first_login: bool,
    pub restricted: bool,
    pub deleted: bool,
    pub last_login: LastLogin,
    pub name: Name,
    pub elections: Elections,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub otp: String,
}

impl Default for User {
    fn default() -> Self {
        Self {
            username: String::default(),
            password: String::default(),
            kind: UserType::default(),
            first_login: true,
            restricted: false,
            deleted: false,
            last_login: LastLogin::default(),
            name: Name::default(),
            elections: Elections::default(),
            email: String::default(),
            phone: String::default(),
            address: String::default(),
            city: String::default(),
            state: String::default(),
            zip: String::default(),
            otp: String::default(),
        }
    }
}

/// Full record returned by [`UserDirectory::get_user`]: the stored user
/// minus its OTP, augmented with identity and environment context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AugmentedUser {
    pub user_id: UserId,
    pub username: String,
    pub password: String,
    #[serde(rename = "type")]
    pub kind: UserType,
    pub first_login: bool,
    pub restricted: bool,
    pub deleted: bool,
    pub last_login: LastLogin,
    pub name: Name,
    pub elections: Elections,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    /// Whether this user is the designated root user.
    pub root: bool,
    /// Whether clients should go into debugging mode.
    pub debugging: bool,
}

/// Projection safe to show to any caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub user_id: UserId,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: UserType,
}
