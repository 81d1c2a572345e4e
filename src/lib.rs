//! Electorate is the backend user directory of a small election-management
//! service: a validating, indexed record store layered over a generic
//! path-addressable JSON document store.
//!
//! The directory enforces the field-level invariants of user records,
//! maintains the `username->id`, `email->id` and `otp->id` reverse indexes
//! on every mutation, and exposes the account lifecycle: creation, merge
//! updates, hard deletes, credential checks and the one-time-password flow.
//!
//! ```no_run
//! use electorate::{Configuration, UserDirectory, UserPatch, UserType};
//!
//! # fn main() -> electorate::Result<()> {
//! let config = Configuration::default().read();
//! let directory = UserDirectory::open(&config)?;
//!
//! let id = directory.create_user(
//!     "first-voter",
//!     "hunter-two",
//!     UserType::Voter,
//!     UserPatch::new(),
//! )?;
//! assert!(directory.are_valid_credentials("first-voter", "hunter-two"));
//! assert_eq!(directory.get_public_user(id)?.username, "first-voter");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod user;

pub use config::{Configuration, Environment};
pub use error::{DirectoryError, Result};
pub use store::{DocumentStore, JsonStore, MemoryStore};
pub use user::{
    AugmentedUser, Elections, LastLogin, MAX_USERNAME_LENGTH,
    MIN_USERNAME_LENGTH, Name, OTP_LENGTH, PHONE_NUMBER_LENGTH, PublicUser,
    User, UserDirectory, UserId, UserPatch, UserType, ZIP_LENGTH,
};
