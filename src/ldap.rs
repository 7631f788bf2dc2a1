//! [`Directory`] implementation backed by an `ldap3` connection.

use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use ldap3::{LdapConnAsync, Mod, Scope, SearchEntry, SearchResult};
use tracing::{debug, error};

use crate::{
	config::Config,
	directory::Directory,
	error::{Error, ProtocolError},
};

/// Holds the `ldap3` handle of one connection to the directory server.
#[derive(Debug, Clone)]
pub struct LdapClient {
	/// The handle used to issue requests.
	ldap: ldap3::Ldap,
	/// Applied to every request when set.
	operation_timeout: Option<Duration>,
}

impl LdapClient {
	/// Create a connection to the server specified in the configuration. The
	/// connection is driven by a background task until it is unbound or
	/// dropped. No bind is performed.
	pub async fn connect(config: &Config) -> Result<Self, Error> {
		let url = config.url()?;
		debug!(%url, "Connecting to directory server");
		let settings = config.connection.to_settings();
		let (conn, ldap) = LdapConnAsync::from_url_with_settings(settings, &url)
			.await
			.map_err(Error::Connection)?;
		tokio::spawn(async move {
			if let Err(err) = conn.drive().await {
				error!("Ldap connection error {err}");
			}
		});
		Ok(Self { ldap, operation_timeout: config.connection.operation_timeout })
	}

	/// The handle to use for the next request, with the timeout applied.
	fn handle(&mut self) -> &mut ldap3::Ldap {
		if let Some(timeout) = self.operation_timeout {
			self.ldap.with_timeout(timeout);
		}
		&mut self.ldap
	}
}

#[async_trait]
impl Directory for LdapClient {
	async fn simple_bind(&mut self, bind_dn: &str, password: &str) -> Result<(), ProtocolError> {
		let result = self.handle().simple_bind(bind_dn, password).await?;
		result.success()?;
		Ok(())
	}

	async fn search(
		&mut self,
		base: &str,
		filter: &str,
		attrs: &[String],
	) -> Result<Vec<SearchEntry>, ProtocolError> {
		let SearchResult(entries, result) =
			self.handle().search(base, Scope::Subtree, filter, attrs.to_vec()).await?;
		result.success()?;
		// Active Directory answers subtree searches at the domain root with
		// continuation references to the other naming contexts.
		Ok(entries.into_iter().filter(|entry| !entry.is_ref()).map(SearchEntry::construct).collect())
	}

	async fn add(
		&mut self,
		dn: &str,
		attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)>,
	) -> Result<(), ProtocolError> {
		let result = self.handle().add(dn, attrs).await?;
		result.success()?;
		Ok(())
	}

	async fn modify(&mut self, dn: &str, mods: Vec<Mod<Vec<u8>>>) -> Result<(), ProtocolError> {
		let result = self.handle().modify(dn, mods).await?;
		result.success()?;
		Ok(())
	}

	async fn delete(&mut self, dn: &str) -> Result<(), ProtocolError> {
		let result = self.handle().delete(dn).await?;
		result.success()?;
		Ok(())
	}

	async fn rename(
		&mut self,
		dn: &str,
		new_rdn: &str,
		delete_old_rdn: bool,
		new_superior: Option<&str>,
	) -> Result<(), ProtocolError> {
		let result = self.handle().modifydn(dn, new_rdn, delete_old_rdn, new_superior).await?;
		result.success()?;
		Ok(())
	}

	async fn unbind(&mut self) -> Result<(), ProtocolError> {
		self.ldap.unbind().await?;
		Ok(())
	}
}
