//! User accounts.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use ldap3::{dn_escape, ldap_escape, Mod, SearchEntry};
use tracing::{info, warn};
use unicase::UniCase;

use crate::{
	attributes::AttributeMap,
	connection::DirectoryConnection,
	entity::DirectoryEntity,
	entry::SearchEntryExt,
	error::Error,
};

/// `userAccountControl` of a normal, enabled account.
pub const NORMAL_ACCOUNT: u32 = 512;
/// `userAccountControl` bit marking an account as disabled.
pub const ACCOUNT_DISABLED: u32 = 2;

/// Object classes of a user entry, from most to least general.
const USER_OBJECT_CLASSES: [&str; 4] = ["top", "person", "organizationalPerson", "user"];
/// Attribute returned by a search when the caller asks for nothing specific.
const DEFAULT_ATTRIBUTE: &str = "sAMAccountName";
/// Optional input key appended to the surname to keep common names unique.
/// It is not a directory attribute and never sent to the server.
const USER_ID_KEY: &str = "userId";

/// A user found by [`UserEntity::search_with`]: its DN and the requested
/// attributes.
///
/// Every requested attribute is in exactly one of the two maps. Values the
/// server returned as binary (`objectGUID`, `objectSid`) are kept in
/// `binary_attributes`; everything else is in `attributes`, where an attribute
/// the entry does not have maps to an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
	/// Distinguished name of the user.
	pub dn: String,
	/// Text values of the requested attributes.
	pub attributes: BTreeMap<UniCase<String>, Vec<String>>,
	/// Requested attributes returned as binary.
	pub binary_attributes: BTreeMap<UniCase<String>, Vec<Vec<u8>>>,
}

impl UserRecord {
	/// Keep the requested attributes of a search result.
	fn from_entry(entry: &SearchEntry, requested: &[String]) -> Self {
		let mut attributes = BTreeMap::new();
		let mut binary_attributes = BTreeMap::new();
		for name in requested {
			let binary = entry.bin_attr_values(name);
			if binary.is_empty() {
				attributes.insert(UniCase::new(name.clone()), entry.attr_values(name).to_vec());
			} else {
				binary_attributes.insert(UniCase::new(name.clone()), binary.to_vec());
			}
		}
		Self { dn: entry.dn.clone(), attributes, binary_attributes }
	}

	/// Whether the account is enabled, read from `userAccountControl`. `None`
	/// when that attribute was not requested or is absent.
	pub fn is_enabled(&self) -> Option<Result<bool, Error>> {
		let value = self.attr_first("userAccountControl")?;
		Some(
			value
				.parse::<u32>()
				.map(|flags| flags & ACCOUNT_DISABLED == 0)
				.map_err(|_| Error::Invalid("userAccountControl".to_owned())),
		)
	}
}

impl SearchEntryExt for UserRecord {
	fn attr_values(&self, attr: &str) -> &[String] {
		self.attributes.get(&UniCase::new(attr.to_owned())).map(Vec::as_slice).unwrap_or_default()
	}

	fn bin_attr_values(&self, attr: &str) -> &[Vec<u8>] {
		self.binary_attributes
			.get(&UniCase::new(attr.to_owned()))
			.map(Vec::as_slice)
			.unwrap_or_default()
	}
}

/// User accounts, addressed by `sAMAccountName`.
#[derive(Debug, Clone)]
pub struct UserEntity {
	/// The shared session.
	connection: Arc<DirectoryConnection>,
}

impl UserEntity {
	/// Operate on users through the given connection.
	#[must_use]
	pub fn new(connection: Arc<DirectoryConnection>) -> Self {
		Self { connection }
	}

	/// The connection this entity uses.
	#[must_use]
	pub fn connection(&self) -> &Arc<DirectoryConnection> {
		&self.connection
	}

	/// Find a user by account name and return the given attributes (only
	/// `sAMAccountName` when `attrs` is empty). When several entries match,
	/// the first one is used.
	pub async fn search_with(&self, username: &str, attrs: &[&str]) -> Result<UserRecord, Error> {
		let requested: Vec<String> = if attrs.is_empty() {
			vec![DEFAULT_ATTRIBUTE.to_owned()]
		} else {
			attrs.iter().map(|&attr| attr.to_owned()).collect()
		};
		let filter = format!("(sAMAccountName={})", ldap_escape(username));
		let entries = self.connection.search(&filter, &requested).await.map_err(Error::Search)?;
		let entry = entries.first().ok_or_else(|| Error::NotFound(username.to_owned()))?;
		Ok(UserRecord::from_entry(entry, &requested))
	}

	/// Enable (`512`) or disable (`514`) an account.
	pub async fn toggle_account(&self, username: &str, enable: bool) -> Result<(), Error> {
		let flags = if enable { NORMAL_ACCOUNT } else { NORMAL_ACCOUNT | ACCOUNT_DISABLED };
		self.modify(username, AttributeMap::new().with("userAccountControl", flags)).await?;
		info!(%username, enable, "Toggled account");
		Ok(())
	}
}

#[async_trait]
impl DirectoryEntity for UserEntity {
	type Record = UserRecord;
	type Data = AttributeMap;
	type Changes = AttributeMap;

	async fn search(&self, username: &str) -> Result<UserRecord, Error> {
		self.search_with(username, &[]).await
	}

	/// Create a user. See [`new_user_entry`] for how the entry is built.
	async fn add(&self, data: AttributeMap) -> Result<(), Error> {
		let (dn, entry) = new_user_entry(data, self.connection.base_dn())?;
		if let Err(err) = self.connection.add(&dn, entry.to_ldap_attrs()).await {
			warn!(%dn, "Adding user failed: {err}");
			return Err(Error::Add(err));
		}
		info!(%dn, "Added user");
		Ok(())
	}

	/// Replace the given attributes of a user in one request.
	async fn modify(&self, username: &str, changes: AttributeMap) -> Result<(), Error> {
		if changes.is_empty() {
			return Err(Error::Validation("no attributes to modify".to_owned()));
		}
		let user = self.search(username).await?;
		let mods = changes
			.into_iter()
			.map(|(name, value)| Mod::Replace(name.into_inner().into_bytes(), value.to_set()))
			.collect();
		if let Err(err) = self.connection.modify(&user.dn, mods).await {
			warn!(dn = %user.dn, "Modifying user failed: {err}");
			return Err(Error::Modify(err));
		}
		Ok(())
	}

	async fn remove(&self, username: &str) -> Result<(), Error> {
		let user = self.search(username).await?;
		if let Err(err) = self.connection.delete(&user.dn).await {
			warn!(dn = %user.dn, "Removing user failed: {err}");
			return Err(Error::Remove(err));
		}
		info!(dn = %user.dn, "Removed user");
		Ok(())
	}
}

/// Build the DN and attributes of a new user from caller data.
///
/// `sAMAccountName` is required. With both `givenName` and `sn` non-blank the
/// common name is `"<givenName> <sn>"`, where an optional `userId` is appended to
/// the surname part; otherwise it is the account name. The common name is
/// also the display name. The account is created enabled. Everything else is
/// passed through unchanged.
pub fn new_user_entry(mut data: AttributeMap, base_dn: &str) -> Result<(String, AttributeMap), Error> {
	let account = match data.get_str("sAMAccountName").map(str::trim) {
		Some(account) if !account.is_empty() => account.to_owned(),
		_ => return Err(Error::Validation("sAMAccountName is required".to_owned())),
	};
	let user_id = data.remove(USER_ID_KEY);

	let common_name = match (name_part(&data, "givenName"), name_part(&data, "sn")) {
		(Some(given), Some(surname)) => {
			let mut surname = surname.to_owned();
			let id = user_id.as_ref().and_then(|id| id.as_str()).map(str::trim);
			if let Some(id) = id.filter(|id| !id.is_empty()) {
				surname.push(' ');
				surname.push_str(id);
			}
			format!("{given} {surname}")
		}
		_ => account,
	};

	let dn = format!("CN={},{base_dn}", dn_escape(common_name.as_str()));
	data.insert("objectClass", USER_OBJECT_CLASSES);
	data.insert("displayName", common_name);
	data.insert("userAccountControl", NORMAL_ACCOUNT);
	Ok((dn, data))
}

/// A trimmed name attribute, `None` when missing or blank.
fn name_part<'a>(data: &'a AttributeMap, name: &str) -> Option<&'a str> {
	data.get_str(name).map(str::trim).filter(|part| !part.is_empty())
}
