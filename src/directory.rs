//! The LDAP operations this library needs from a directory client.
use std::collections::HashSet;

use async_trait::async_trait;
use ldap3::{Mod, SearchEntry};

use crate::error::ProtocolError;

/// Minimal LDAP client surface. [`crate::ldap::LdapClient`] implements it on
/// top of `ldap3`; tests substitute an in-memory directory.
///
/// Every method is one request/response round trip. A server-side rejection
/// and a transport failure both come back as a [`ProtocolError`].
#[async_trait]
pub trait Directory: Send {
	/// Authenticate the session.
	async fn simple_bind(&mut self, bind_dn: &str, password: &str) -> Result<(), ProtocolError>;

	/// Search the subtree below `base` with `filter`, returning only `attrs`.
	async fn search(
		&mut self,
		base: &str,
		filter: &str,
		attrs: &[String],
	) -> Result<Vec<SearchEntry>, ProtocolError>;

	/// Create an entry.
	async fn add(
		&mut self,
		dn: &str,
		attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)>,
	) -> Result<(), ProtocolError>;

	/// Apply modifications to an entry in a single request.
	async fn modify(&mut self, dn: &str, mods: Vec<Mod<Vec<u8>>>) -> Result<(), ProtocolError>;

	/// Delete an entry.
	async fn delete(&mut self, dn: &str) -> Result<(), ProtocolError>;

	/// Rename and optionally move an entry (modify DN).
	async fn rename(
		&mut self,
		dn: &str,
		new_rdn: &str,
		delete_old_rdn: bool,
		new_superior: Option<&str>,
	) -> Result<(), ProtocolError>;

	/// Close the session.
	async fn unbind(&mut self) -> Result<(), ProtocolError>;
}
