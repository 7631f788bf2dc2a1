//! The bound session shared by all entity operations.

use std::collections::HashSet;

use ldap3::{Mod, SearchEntry};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
	config::Config,
	directory::Directory,
	error::{Error, ProtocolError},
	ldap::LdapClient,
};

/// One connection to the directory server, bound with the configured
/// account.
///
/// Requests are serialized: a session never has two requests in flight, so a
/// connection can be shared between tasks behind an [`std::sync::Arc`].
/// Nothing isolates concurrent writes to the same entry; the last modify
/// wins.
pub struct DirectoryConnection {
	/// The root under which entries are searched and created.
	base_dn: String,
	/// Account used for (re-)binding
	bind_user: String,
	/// Password of the bind account
	bind_password: String,
	/// The session and the last error it reported.
	session: Mutex<Session>,
}

impl std::fmt::Debug for DirectoryConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DirectoryConnection")
			.field("base_dn", &self.base_dn)
			.field("bind_user", &self.bind_user)
			.finish_non_exhaustive()
	}
}

/// Client plus the state that must change together with it.
struct Session {
	/// The protocol client
	client: Box<dyn Directory>,
	/// Most recent rejection seen on this session
	last_error: Option<ProtocolError>,
}

impl Session {
	/// Remember the error of a failed request.
	fn record<T>(&mut self, result: Result<T, ProtocolError>) -> Result<T, ProtocolError> {
		if let Err(err) = &result {
			self.last_error = Some(err.clone());
		}
		result
	}
}

impl DirectoryConnection {
	/// Connect to the configured server and bind.
	///
	/// Fails with [`Error::Connection`] without attempting a bind when the
	/// server cannot be reached, and with [`Error::Bind`] when the
	/// credentials are rejected.
	pub async fn connect(config: &Config) -> Result<Self, Error> {
		let client = LdapClient::connect(config).await?;
		Self::with_client(client, config).await
	}

	/// Bind an already connected client with the configured credentials.
	pub async fn with_client<D: Directory + 'static>(client: D, config: &Config) -> Result<Self, Error> {
		let connection = Self {
			base_dn: config.base_dn.clone(),
			bind_user: config.bind_user.clone(),
			bind_password: config.bind_password.clone(),
			session: Mutex::new(Session { client: Box::new(client), last_error: None }),
		};
		connection.bind().await?;
		Ok(connection)
	}

	/// (Re-)authenticate the session with the configured account. A
	/// successful bind clears [`Self::last_error`].
	pub async fn bind(&self) -> Result<(), Error> {
		debug!(user = %self.bind_user, "Binding to directory");
		let mut session = self.session.lock().await;
		let result = session.client.simple_bind(&self.bind_user, &self.bind_password).await;
		match session.record(result) {
			Ok(()) => {
				session.last_error = None;
				info!(user = %self.bind_user, "Bound to directory");
				Ok(())
			}
			Err(err) => {
				warn!(user = %self.bind_user, "Bind rejected: {err}");
				Err(Error::Bind(err))
			}
		}
	}

	/// The configured base DN.
	#[must_use]
	pub fn base_dn(&self) -> &str {
		&self.base_dn
	}

	/// The most recent error reported on this session, if any.
	pub async fn last_error(&self) -> Option<ProtocolError> {
		self.session.lock().await.last_error.clone()
	}

	/// Close the session.
	pub async fn unbind(&self) -> Result<(), ProtocolError> {
		let mut session = self.session.lock().await;
		let result = session.client.unbind().await;
		session.record(result)
	}

	/// Subtree search below the base DN.
	pub(crate) async fn search(
		&self,
		filter: &str,
		attrs: &[String],
	) -> Result<Vec<SearchEntry>, ProtocolError> {
		debug!(%filter, ?attrs, "Searching directory");
		let mut session = self.session.lock().await;
		let result = session.client.search(&self.base_dn, filter, attrs).await;
		session.record(result)
	}

	/// Create an entry.
	pub(crate) async fn add(
		&self,
		dn: &str,
		attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)>,
	) -> Result<(), ProtocolError> {
		debug!(%dn, "Adding entry");
		let mut session = self.session.lock().await;
		let result = session.client.add(dn, attrs).await;
		session.record(result)
	}

	/// Modify an entry.
	pub(crate) async fn modify(&self, dn: &str, mods: Vec<Mod<Vec<u8>>>) -> Result<(), ProtocolError> {
		debug!(%dn, "Modifying entry");
		let mut session = self.session.lock().await;
		let result = session.client.modify(dn, mods).await;
		session.record(result)
	}

	/// Delete an entry.
	pub(crate) async fn delete(&self, dn: &str) -> Result<(), ProtocolError> {
		debug!(%dn, "Deleting entry");
		let mut session = self.session.lock().await;
		let result = session.client.delete(dn).await;
		session.record(result)
	}

	/// Rename an entry, deleting the old RDN value.
	pub(crate) async fn rename(
		&self,
		dn: &str,
		new_rdn: &str,
		new_superior: &str,
	) -> Result<(), ProtocolError> {
		debug!(%dn, %new_rdn, %new_superior, "Renaming entry");
		let mut session = self.session.lock().await;
		let result = session.client.rename(dn, new_rdn, true, Some(new_superior)).await;
		session.record(result)
	}
}
