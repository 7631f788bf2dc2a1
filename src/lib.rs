//! Manage Active Directory users, security groups and group membership over
//! LDAP.
//!
//! The library wraps raw LDAP requests in entity-shaped operations. Users are
//! addressed by `sAMAccountName`, groups by common name; every operation looks
//! the entry up afresh and then acts on the DN it found.
//!
//! For a general primer on LDAP, the [introduction] in the `ldap3` crate which
//! is used here for interfacing with LDAP is an excellent resource.
//!
//! [introduction]: https://github.com/inejge/ldap3/blob/master/LDAP-primer.md
//!
//! # Getting started
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use ad_directory::{
//!     AttributeMap, Config, DirectoryConnection, DirectoryEntity, GroupEntity,
//!     MembershipManager, PasswordManager, PasswordReset, UserEntity,
//! };
//!
//! let config = Config::from_file("directory.toml")?;
//! let connection = Arc::new(DirectoryConnection::connect(&config).await?);
//! let users = UserEntity::new(connection.clone());
//! let groups = GroupEntity::new(connection.clone());
//!
//! users
//!     .add(
//!         AttributeMap::new()
//!             .with("sAMAccountName", "jdoe")
//!             .with("givenName", "John")
//!             .with("sn", "Doe"),
//!     )
//!     .await?;
//! groups.add(AttributeMap::new().with("groupname", "staff")).await?;
//!
//! let passwords = PasswordManager::new(users.clone(), &config.password)?;
//! if let PasswordReset::Generated(password) = passwords.reset_password("jdoe", None).await? {
//!     println!("Initial password: {password}");
//! }
//!
//! let membership = MembershipManager::new(users, groups);
//! if !membership.user_in_group("jdoe", "staff").await? {
//!     membership.add_user_to_group("jdoe", "staff").await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//! * One connection carries every request, one at a time. Concurrent
//!   modifications of the same entry are not isolated; the last one wins.
//! * Nothing is retried. Failed requests are returned to the caller.
//! * Active Directory only accepts password changes over an encrypted
//!   connection. Set `tls = true` (implied by port 636) to connect over
//!   `ldaps`; StartTLS is not supported.
//! * Passwords with characters above U+00FF cannot be encoded.

pub mod attributes;
pub mod config;
pub mod connection;
pub mod directory;
pub mod entity;
pub mod entry;
pub mod error;
pub mod group;
pub mod ldap;
pub mod membership;
pub mod password;
pub mod user;

pub use ldap3::{self, SearchEntry};

pub use crate::{
	attributes::{AttributeMap, AttributeValue},
	config::{Config, ConnectionConfig, PasswordConfig},
	connection::DirectoryConnection,
	directory::Directory,
	entity::DirectoryEntity,
	entry::SearchEntryExt,
	error::{Error, ProtocolError},
	group::GroupEntity,
	ldap::LdapClient,
	membership::MembershipManager,
	password::{PasswordManager, PasswordReset},
	user::{UserEntity, UserRecord},
};
