//! Config for the directory connection.
use std::{path::Path, time::Duration};

use ldap3::LdapConnSettings;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Directory configuration.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
	/// Host name or address of the directory server
	pub host: String,
	/// Port of the directory server
	#[serde(default = "default_port")]
	pub port: u16,
	/// Connect over `ldaps`. Implied by port 636. Active Directory only
	/// accepts password changes over an encrypted connection.
	#[serde(default)]
	pub tls: bool,
	/// The account used to bind, as a DN or `user@domain`
	pub bind_user: String,
	/// The password for the bind account
	pub bind_password: String,
	/// Root under which entries are searched and created, e.g.
	/// `DC=example,DC=com`
	pub base_dn: String,
	/// Connection settings.
	#[serde(default)]
	pub connection: ConnectionConfig,
	/// Password generation settings
	#[serde(default)]
	pub password: PasswordConfig,
}

/// Default LDAP port
fn default_port() -> u16 {
	389
}

/// Well-known port of LDAP over TLS
const LDAPS_PORT: u16 = 636;

impl Config {
	/// Parse a configuration from TOML text.
	pub fn from_toml(text: &str) -> Result<Self, Error> {
		let config: Config = toml::from_str(text)?;
		config.password.validate()?;
		Ok(config)
	}

	/// Read and parse a TOML configuration file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
		Self::from_toml(&std::fs::read_to_string(path)?)
	}

	/// The URL of the configured server: `ldaps://` when TLS is enabled or
	/// the port is 636, `ldap://` otherwise.
	pub fn url(&self) -> Result<Url, Error> {
		let scheme = if self.tls || self.port == LDAPS_PORT { "ldaps" } else { "ldap" };
		Url::parse(&format!("{scheme}://{}:{}", self.host, self.port))
			.map_err(|err| Error::Invalid(format!("Invalid directory host {:?}: {err}", self.host)))
	}
}

/// Configuration for how to connect to the directory server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionConfig {
	/// Timeout to establish a connection in seconds.
	#[serde(default = "default_timeout")]
	pub timeout: u64,

	/// Timeout for each individual operation. Operations wait indefinitely
	/// when unset.
	#[serde(default)]
	pub operation_timeout: Option<Duration>,
}

/// Default connection timeout in seconds
fn default_timeout() -> u64 {
	5
}

impl Default for ConnectionConfig {
	fn default() -> Self {
		Self { timeout: default_timeout(), operation_timeout: None }
	}
}

impl ConnectionConfig {
	/// Create a [`LdapConnSettings`] based on this [`ConnectionConfig`]
	pub(crate) fn to_settings(&self) -> LdapConnSettings {
		LdapConnSettings::new().set_conn_timeout(Duration::from_secs(self.timeout))
	}
}

/// Settings for generated passwords
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PasswordConfig {
	/// Length of generated passwords. Must be a positive multiple of 4.
	#[serde(default = "default_password_length")]
	pub length: usize,
}

/// Default generated password length
fn default_password_length() -> usize {
	8
}

impl Default for PasswordConfig {
	fn default() -> Self {
		Self { length: default_password_length() }
	}
}

impl PasswordConfig {
	/// Check that the length can be split into 4-character blocks.
	pub fn validate(&self) -> Result<(), Error> {
		if self.length == 0 || self.length % 4 != 0 {
			return Err(Error::Invalid(format!(
				"Password length must be a positive multiple of 4, got {}",
				self.length
			)));
		}
		Ok(())
	}
}
