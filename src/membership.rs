//! Group membership of users.
//!
//! Membership is written on the group's `member` attribute. The server
//! maintains the user's `memberOf` back-link, which is what
//! [`MembershipManager::user_in_group`] reads.

use std::collections::HashSet;

use ldap3::Mod;
use tracing::{info, warn};
use unicase::UniCase;

use crate::{
	entity::DirectoryEntity,
	entry::SearchEntryExt,
	error::Error,
	group::GroupEntity,
	user::UserEntity,
};

/// The group attribute listing member DNs.
const MEMBER: &str = "member";
/// The user attribute listing the DNs of the groups it belongs to.
const MEMBER_OF: &str = "memberOf";

/// Adds users to groups, removes them, and checks membership.
#[derive(Debug, Clone)]
pub struct MembershipManager {
	/// Used to resolve user DNs
	users: UserEntity,
	/// Used to resolve group DNs
	groups: GroupEntity,
}

impl MembershipManager {
	/// Manage membership between the given users and groups.
	#[must_use]
	pub fn new(users: UserEntity, groups: GroupEntity) -> Self {
		Self { users, groups }
	}

	/// Add a user to a group. Existing membership is not checked first, so
	/// adding twice is rejected by the server; use [`Self::user_in_group`]
	/// when that matters.
	pub async fn add_user_to_group(&self, username: &str, group_name: &str) -> Result<(), Error> {
		let (user_dn, group_dn) = self.resolve(username, group_name).await?;
		let change = Mod::Add(MEMBER.as_bytes().to_vec(), HashSet::from([user_dn.into_bytes()]));
		if let Err(err) = self.groups.connection().modify(&group_dn, vec![change]).await {
			warn!(%username, %group_dn, "Adding group member failed: {err}");
			return Err(Error::Modify(err));
		}
		info!(%username, %group_dn, "Added user to group");
		Ok(())
	}

	/// Remove a user from a group.
	pub async fn remove_user_from_group(&self, username: &str, group_name: &str) -> Result<(), Error> {
		let (user_dn, group_dn) = self.resolve(username, group_name).await?;
		let change = Mod::Delete(MEMBER.as_bytes().to_vec(), HashSet::from([user_dn.into_bytes()]));
		if let Err(err) = self.groups.connection().modify(&group_dn, vec![change]).await {
			warn!(%username, %group_dn, "Removing group member failed: {err}");
			return Err(Error::Modify(err));
		}
		info!(%username, %group_dn, "Removed user from group");
		Ok(())
	}

	/// Whether the user's `memberOf` lists the group. `false` when the user
	/// belongs to no group at all.
	pub async fn user_in_group(&self, username: &str, group_name: &str) -> Result<bool, Error> {
		let group_dn = self.groups.search(group_name).await?;
		let user = self.users.search_with(username, &[MEMBER_OF]).await?;
		let group_dn = UniCase::new(group_dn.as_str());
		Ok(user.attr_values(MEMBER_OF).iter().any(|dn| UniCase::new(dn.as_str()) == group_dn))
	}

	/// Look up the DNs of a user and a group.
	async fn resolve(&self, username: &str, group_name: &str) -> Result<(String, String), Error> {
		let user = self.users.search(username).await?;
		let group_dn = self.groups.search(group_name).await?;
		Ok((user.dn, group_dn))
	}
}
