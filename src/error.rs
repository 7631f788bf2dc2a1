//! Error codes

/// Result code used when a request never produced a directory reply, e.g.
/// because the connection dropped or an operation timed out.
pub const SERVER_DOWN: u32 = 81;

/// Errors that can occur when using this library
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// The directory server could not be reached.
	#[error("Could not connect to the directory server: {0}")]
	Connection(#[source] ldap3::LdapError),
	/// The server rejected the bind credentials.
	#[error("Bind rejected: {0}")]
	Bind(ProtocolError),
	/// A search succeeded but nothing matched the given name.
	#[error("No directory entry found for {0:?}")]
	NotFound(String),
	/// The server refused a search, or the search could not be issued.
	#[error("Search failed: {0}")]
	Search(ProtocolError),
	/// The server refused to create an entry.
	#[error("Add failed: {0}")]
	Add(ProtocolError),
	/// The server refused to modify or rename an entry.
	#[error("Modify failed: {0}")]
	Modify(ProtocolError),
	/// The server refused to delete an entry.
	#[error("Remove failed: {0}")]
	Remove(ProtocolError),
	/// Caller input was rejected before anything was sent to the server.
	#[error("Invalid input: {0}")]
	Validation(String),
	/// Configuration or attribute data did not conform to the expected syntax.
	#[error("Malformed data: {0}")]
	Invalid(String),
	/// Reading a configuration file failed.
	#[error(transparent)]
	Io(#[from] std::io::Error),
	/// A configuration file was not valid TOML for [`crate::Config`].
	#[error(transparent)]
	Toml(#[from] toml::de::Error),
}

impl Error {
	/// The directory's result code and description, if this error carries one.
	#[must_use]
	pub fn protocol(&self) -> Option<&ProtocolError> {
		match self {
			Error::Bind(err)
			| Error::Search(err)
			| Error::Add(err)
			| Error::Modify(err)
			| Error::Remove(err) => Some(err),
			_ => None,
		}
	}
}

/// A rejected LDAP request: the numeric result code and its description.
///
/// Displays as `"<code>: <description>"`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {description}")]
pub struct ProtocolError {
	/// LDAP result code (RFC 4511 section 4.1.9).
	pub code: u32,
	/// Diagnostic text from the server, or the name of the result code when
	/// the server sent none.
	pub description: String,
}

impl ProtocolError {
	/// Create an error from a result code and description. An empty
	/// description is replaced by the code's standard name.
	pub fn new(code: u32, description: impl Into<String>) -> Self {
		let description = description.into();
		let description =
			if description.is_empty() { result_code_name(code).to_owned() } else { description };
		Self { code, description }
	}
}

/// Rejections reported by [`ldap3::LdapResult::success`] keep their result
/// code; every other client failure means no reply arrived.
impl From<ldap3::LdapError> for ProtocolError {
	fn from(err: ldap3::LdapError) -> Self {
		match err {
			ldap3::LdapError::LdapResult { result } => Self::new(result.rc, result.text),
			other => Self::new(SERVER_DOWN, other.to_string()),
		}
	}
}

/// Standard names for the result codes an Active Directory server commonly
/// returns.
#[must_use]
pub fn result_code_name(code: u32) -> &'static str {
	match code {
		0 => "Success",
		1 => "Operations error",
		2 => "Protocol error",
		3 => "Time limit exceeded",
		4 => "Size limit exceeded",
		8 => "Strong(er) authentication required",
		10 => "Referral",
		16 => "No such attribute",
		19 => "Constraint violation",
		20 => "Type or value exists",
		21 => "Invalid syntax",
		32 => "No such object",
		34 => "Invalid DN syntax",
		49 => "Invalid credentials",
		50 => "Insufficient access",
		51 => "Server is busy",
		52 => "Server is unavailable",
		53 => "Server is unwilling to perform",
		64 => "Naming violation",
		65 => "Object class violation",
		68 => "Already exists",
		SERVER_DOWN => "Can't contact LDAP server",
		85 => "Timed out",
		_ => "Unknown error",
	}
}
