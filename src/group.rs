//! Security groups.

use std::sync::Arc;

use async_trait::async_trait;
use ldap3::{dn_escape, ldap_escape};
use tracing::{info, warn};

use crate::{
	attributes::AttributeMap,
	connection::DirectoryConnection,
	entity::DirectoryEntity,
	error::Error,
};

/// `groupType` flag for global scope.
pub const GLOBAL_GROUP: u32 = 0x0000_0002;
/// `groupType` flag for a security (rather than distribution) group.
pub const SECURITY_ENABLED: u32 = 0x8000_0000;
/// The only kind of group this library creates.
pub const GLOBAL_SECURITY_GROUP: u32 = GLOBAL_GROUP | SECURITY_ENABLED;

/// Attribute list meaning "no attributes" (RFC 4511 section 4.5.1.8).
const NO_ATTRIBUTES: &str = "1.1";

/// Groups, addressed by common name. New and renamed groups always live in
/// the `OU=groups` container below the base DN.
#[derive(Debug, Clone)]
pub struct GroupEntity {
	/// The shared session.
	connection: Arc<DirectoryConnection>,
}

impl GroupEntity {
	/// Operate on groups through the given connection.
	#[must_use]
	pub fn new(connection: Arc<DirectoryConnection>) -> Self {
		Self { connection }
	}

	/// The connection this entity uses.
	#[must_use]
	pub fn connection(&self) -> &Arc<DirectoryConnection> {
		&self.connection
	}

	/// DN of the container holding groups.
	fn container(&self) -> String {
		groups_container(self.connection.base_dn())
	}
}

/// DN of the container holding groups below `base_dn`.
#[must_use]
pub fn groups_container(base_dn: &str) -> String {
	format!("OU=groups,{base_dn}")
}

#[async_trait]
impl DirectoryEntity for GroupEntity {
	/// The DN of the group.
	type Record = String;
	type Data = AttributeMap;
	/// The new group name.
	type Changes = String;

	async fn search(&self, group_name: &str) -> Result<String, Error> {
		let filter = format!("(cn={})", ldap_escape(group_name));
		let entries = self
			.connection
			.search(&filter, &[NO_ATTRIBUTES.to_owned()])
			.await
			.map_err(Error::Search)?;
		entries
			.into_iter()
			.next()
			.map(|entry| entry.dn)
			.ok_or_else(|| Error::NotFound(group_name.to_owned()))
	}

	/// Create a global security group from `groupname` and an optional
	/// `groupdesc`. Other keys are ignored.
	async fn add(&self, data: AttributeMap) -> Result<(), Error> {
		let group_name = match data.get_str("groupname").map(str::trim) {
			Some(name) if !name.is_empty() => name,
			_ => return Err(Error::Validation("groupname is required".to_owned())),
		};
		let dn = format!("CN={},{}", dn_escape(group_name), self.container());
		let mut entry = AttributeMap::new()
			.with("cn", group_name)
			.with("sAMAccountName", group_name)
			.with("objectClass", ["top", "group"])
			.with("groupType", GLOBAL_SECURITY_GROUP);
		if let Some(description) = data.get_str("groupdesc") {
			entry.insert("description", description);
		}

		if let Err(err) = self.connection.add(&dn, entry.to_ldap_attrs()).await {
			warn!(%dn, "Adding group failed: {err}");
			return Err(Error::Add(err));
		}
		info!(%dn, "Added group");
		Ok(())
	}

	/// Rename a group. It is moved into the groups container if it lived
	/// anywhere else.
	async fn modify(&self, group_name: &str, new_name: String) -> Result<(), Error> {
		let new_name = new_name.trim();
		if new_name.is_empty() {
			return Err(Error::Validation("new group name is empty".to_owned()));
		}
		let dn = self.search(group_name).await?;
		let new_rdn = format!("cn={}", dn_escape(new_name));
		if let Err(err) = self.connection.rename(&dn, &new_rdn, &self.container()).await {
			warn!(%dn, %new_rdn, "Renaming group failed: {err}");
			return Err(Error::Modify(err));
		}
		info!(%dn, %new_rdn, "Renamed group");
		Ok(())
	}

	async fn remove(&self, group_name: &str) -> Result<(), Error> {
		let dn = self.search(group_name).await?;
		if let Err(err) = self.connection.delete(&dn).await {
			warn!(%dn, "Removing group failed: {err}");
			return Err(Error::Remove(err));
		}
		info!(%dn, "Removed group");
		Ok(())
	}
}
