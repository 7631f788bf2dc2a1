//! Operations shared by the user and group entity types.
use async_trait::async_trait;

use crate::error::Error;

/// Search, create, change and delete one kind of directory object, addressed
/// by its account or group name.
///
/// Each call resolves the object's DN from a fresh search; DNs are never
/// remembered between calls, so an entry renamed in between is still found.
#[async_trait]
pub trait DirectoryEntity {
	/// What a successful search returns.
	type Record;
	/// Input for creating an object.
	type Data: Send;
	/// Input for changing an object.
	type Changes: Send;

	/// Find an object by name. [`Error::NotFound`] when nothing matches,
	/// [`Error::Search`] when the search itself fails.
	async fn search(&self, name: &str) -> Result<Self::Record, Error>;

	/// Create an object.
	async fn add(&self, data: Self::Data) -> Result<(), Error>;

	/// Change an existing object.
	async fn modify(&self, name: &str, changes: Self::Changes) -> Result<(), Error>;

	/// Delete an existing object.
	async fn remove(&self, name: &str) -> Result<(), Error>;
}
