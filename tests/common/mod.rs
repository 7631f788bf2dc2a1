use std::{
	collections::{BTreeMap, HashMap, HashSet},
	sync::{Arc, Mutex, MutexGuard},
};

use ad_directory::{
	ldap3::Mod, Config, ConnectionConfig, Directory, DirectoryConnection, PasswordConfig,
	ProtocolError, SearchEntry,
};
use async_trait::async_trait;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};
use unicase::UniCase;

pub const BASE: &str = "DC=example,DC=com";
pub const BIND_USER: &str = "CN=svc-directory,CN=Users,DC=example,DC=com";
pub const BIND_PASSWORD: &str = "verysecret";

/// Attributes of one entry, keyed case-insensitively but keeping the
/// spelling they were written with.
pub type Attributes = BTreeMap<UniCase<String>, Vec<Vec<u8>>>;

/// In-memory stand-in for an Active Directory domain controller.
#[derive(Debug, Default)]
pub struct State {
	/// Entries by DN
	pub entries: BTreeMap<UniCase<String>, (String, Attributes)>,
	/// Every request received, by operation name
	pub calls: Vec<&'static str>,
	/// Simulate an unreachable server
	pub offline: bool,
	/// Whether a bind succeeded
	pub bound: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDirectory {
	pub state: Arc<Mutex<State>>,
}

fn error(code: u32, text: &str) -> ProtocolError {
	ProtocolError::new(code, text)
}

fn key(name: &str) -> UniCase<String> {
	UniCase::new(name.to_owned())
}

/// Split `CN=foo,OU=bar` into `("CN", "foo")` and `"OU=bar"`.
fn split_dn(dn: &str) -> (&str, &str, &str) {
	let (rdn, parent) = dn.split_once(',').unwrap_or((dn, ""));
	let (attr, value) = rdn.split_once('=').unwrap_or((rdn, ""));
	(attr, value, parent)
}

impl FakeDirectory {
	pub fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap()
	}

	pub fn call_count(&self) -> usize {
		self.lock().calls.len()
	}

	pub fn set_offline(&self, offline: bool) {
		self.lock().offline = offline;
	}

	/// Raw values of an attribute of the entry at `dn`.
	pub fn attribute(&self, dn: &str, name: &str) -> Option<Vec<Vec<u8>>> {
		self.lock().entries.get(&key(dn)).and_then(|(_, attrs)| attrs.get(&key(name)).cloned())
	}

	pub fn exists(&self, dn: &str) -> bool {
		self.lock().entries.contains_key(&key(dn))
	}

	/// Register a request and check that it may proceed.
	fn begin(&self, call: &'static str) -> Result<MutexGuard<'_, State>, ProtocolError> {
		let mut state = self.lock();
		state.calls.push(call);
		if state.offline {
			return Err(error(81, "Can't contact LDAP server"));
		}
		if call != "bind" && !state.bound {
			return Err(error(1, "000004DC: LdapErr: DSID-0C090A5C, comment: In order to perform this operation a successful bind must be completed on the connection."));
		}
		Ok(state)
	}
}

/// Replace `old` by `new` in every `member` and `memberOf` value, or drop
/// the value when `new` is `None`.
fn relink(state: &mut State, old: &str, new: Option<&str>) {
	for (_, attrs) in state.entries.values_mut() {
		for name in ["member", "memberOf"] {
			if let Some(values) = attrs.get_mut(&key(name)) {
				values.retain(|value| new.is_some() || !value.eq_ignore_ascii_case(old.as_bytes()));
				for value in values.iter_mut() {
					if let Some(new) = new {
						if value.eq_ignore_ascii_case(old.as_bytes()) {
							*value = new.as_bytes().to_vec();
						}
					}
				}
				if values.is_empty() {
					attrs.remove(&key(name));
				}
			}
		}
	}
}

/// Add or remove `group_dn` in the `memberOf` of each member.
fn back_link(state: &mut State, group_dn: &str, members: &HashSet<Vec<u8>>, add: bool) {
	for member in members {
		let member = String::from_utf8_lossy(member).into_owned();
		if let Some((_, attrs)) = state.entries.get_mut(&key(&member)) {
			let values = attrs.entry(key("memberOf")).or_default();
			if add {
				values.push(group_dn.as_bytes().to_vec());
			} else {
				values.retain(|value| !value.eq_ignore_ascii_case(group_dn.as_bytes()));
			}
			if values.is_empty() {
				attrs.remove(&key("memberOf"));
			}
		}
	}
}

#[async_trait]
impl Directory for FakeDirectory {
	async fn simple_bind(&mut self, bind_dn: &str, password: &str) -> Result<(), ProtocolError> {
		let mut state = self.begin("bind")?;
		if bind_dn == BIND_USER && password == BIND_PASSWORD {
			state.bound = true;
			Ok(())
		} else {
			state.bound = false;
			Err(error(49, "80090308: LdapErr: DSID-0C09042A, comment: AcceptSecurityContext error, data 52e, v4563"))
		}
	}

	async fn search(
		&mut self,
		base: &str,
		filter: &str,
		attrs: &[String],
	) -> Result<Vec<SearchEntry>, ProtocolError> {
		let state = self.begin("search")?;
		let (attr, value) = filter
			.trim_start_matches('(')
			.trim_end_matches(')')
			.split_once('=')
			.ok_or_else(|| error(87, "Bad search filter"))?;
		let base = base.to_ascii_lowercase();

		let mut found = Vec::new();
		for (dn, entry) in state.entries.values() {
			if !dn.to_ascii_lowercase().ends_with(&base) {
				continue;
			}
			let matches = entry
				.get(&key(attr))
				.is_some_and(|values| values.iter().any(|v| v.eq_ignore_ascii_case(value.as_bytes())));
			if !matches {
				continue;
			}
			let mut result = HashMap::new();
			let mut binary = HashMap::new();
			for requested in attrs {
				// unicodePwd can be written but never read
				if requested.eq_ignore_ascii_case("unicodePwd") {
					continue;
				}
				if let Some((name, values)) = entry.get_key_value(&key(requested)) {
					// Like ldap3, attributes with any non-UTF-8 value are binary
					let text: Result<Vec<String>, _> =
						values.iter().map(|v| String::from_utf8(v.clone())).collect();
					if let Ok(text) = text {
						result.insert(name.as_str().to_owned(), text);
					} else {
						binary.insert(name.as_str().to_owned(), values.clone());
					}
				}
			}
			found.push(SearchEntry { dn: dn.clone(), attrs: result, bin_attrs: binary });
		}
		Ok(found)
	}

	async fn add(
		&mut self,
		dn: &str,
		attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)>,
	) -> Result<(), ProtocolError> {
		let mut state = self.begin("add")?;
		if state.entries.contains_key(&key(dn)) {
			return Err(error(68, "00002071: UpdErr: DSID-0305038D, problem 6005 (ENTRY_EXISTS)"));
		}
		let mut entry = Attributes::new();
		for (name, values) in attrs {
			let mut values: Vec<_> = values.into_iter().collect();
			values.sort();
			entry.insert(UniCase::new(String::from_utf8_lossy(&name).into_owned()), values);
		}
		let (rdn_attr, rdn_value, _) = split_dn(dn);
		entry.entry(key(&rdn_attr.to_ascii_lowercase())).or_insert_with(|| vec![rdn_value.as_bytes().to_vec()]);
		state.entries.insert(key(dn), (dn.to_owned(), entry));
		Ok(())
	}

	async fn modify(&mut self, dn: &str, mods: Vec<Mod<Vec<u8>>>) -> Result<(), ProtocolError> {
		let mut state = self.begin("modify")?;
		let (stored_dn, mut entry) =
			state.entries.get(&key(dn)).cloned().ok_or_else(|| error(32, "No such object"))?;
		let mut links = Vec::new();

		for change in mods {
			match change {
				Mod::Replace(name, values) => {
					let name = String::from_utf8_lossy(&name).into_owned();
					if values.is_empty() {
						entry.remove(&key(&name));
					} else {
						let mut values: Vec<_> = values.into_iter().collect();
						values.sort();
						entry.remove(&key(&name));
						entry.insert(UniCase::new(name), values);
					}
				}
				Mod::Add(name, values) => {
					let name = String::from_utf8_lossy(&name).into_owned();
					let current = entry.entry(UniCase::new(name.clone())).or_default();
					if values.iter().any(|v| current.contains(v)) {
						return Err(error(20, "00002083: AtrErr: DSID-03151904, #1: 0: 00000561 (ATT_OR_VALUE_EXISTS)"));
					}
					current.extend(values.iter().cloned());
					if name.eq_ignore_ascii_case("member") {
						links.push((values, true));
					}
				}
				Mod::Delete(name, values) => {
					let name = String::from_utf8_lossy(&name).into_owned();
					let current =
						entry.get_mut(&key(&name)).ok_or_else(|| error(16, "No such attribute"))?;
					if values.iter().any(|v| !current.contains(v)) {
						return Err(error(16, "00002080: AtrErr: DSID-03151904 (NO_ATTRIBUTE_OR_VAL)"));
					}
					if values.is_empty() {
						current.clear();
					} else {
						current.retain(|v| !values.contains(v));
					}
					if current.is_empty() {
						entry.remove(&key(&name));
					}
					if name.eq_ignore_ascii_case("member") {
						links.push((values, false));
					}
				}
				_ => return Err(error(53, "Unwilling to perform")),
			}
		}

		state.entries.insert(key(dn), (stored_dn.clone(), entry));
		for (members, add) in links {
			back_link(&mut state, &stored_dn, &members, add);
		}
		Ok(())
	}

	async fn delete(&mut self, dn: &str) -> Result<(), ProtocolError> {
		let mut state = self.begin("delete")?;
		let (stored_dn, _) =
			state.entries.remove(&key(dn)).ok_or_else(|| error(32, "No such object"))?;
		relink(&mut state, &stored_dn, None);
		Ok(())
	}

	async fn rename(
		&mut self,
		dn: &str,
		new_rdn: &str,
		delete_old_rdn: bool,
		new_superior: Option<&str>,
	) -> Result<(), ProtocolError> {
		let mut state = self.begin("rename")?;
		let (old_dn, mut entry) =
			state.entries.get(&key(dn)).cloned().ok_or_else(|| error(32, "No such object"))?;
		let (_, _, parent) = split_dn(&old_dn);
		let new_dn = format!("{new_rdn},{}", new_superior.unwrap_or(parent));
		if state.entries.contains_key(&key(&new_dn)) {
			return Err(error(68, "Already exists"));
		}
		let (rdn_attr, rdn_value, _) = split_dn(&new_dn);
		let values = entry.entry(key(&rdn_attr.to_ascii_lowercase())).or_default();
		if delete_old_rdn {
			values.clear();
		}
		values.push(rdn_value.as_bytes().to_vec());

		state.entries.remove(&key(dn));
		state.entries.insert(key(&new_dn), (new_dn.clone(), entry));
		relink(&mut state, &old_dn, Some(&new_dn));
		Ok(())
	}

	async fn unbind(&mut self) -> Result<(), ProtocolError> {
		let mut state = self.begin("unbind")?;
		state.bound = false;
		Ok(())
	}
}

pub fn init_tracing() {
	let tracing_filter = EnvFilter::default().add_directive(LevelFilter::DEBUG.into());
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_filter).with_test_writer().try_init();
}

#[must_use]
pub fn config() -> Config {
	Config {
		host: "dc01.example.com".to_owned(),
		port: 389,
		tls: false,
		bind_user: BIND_USER.to_owned(),
		bind_password: BIND_PASSWORD.to_owned(),
		base_dn: BASE.to_owned(),
		connection: ConnectionConfig::default(),
		password: PasswordConfig::default(),
	}
}

/// A connection bound to a fresh fake directory, plus a handle to inspect
/// the fake.
pub async fn connect() -> (Arc<DirectoryConnection>, FakeDirectory) {
	init_tracing();
	let fake = FakeDirectory::default();
	let connection = DirectoryConnection::with_client(fake.clone(), &config())
		.await
		.expect("bind against the fake directory");
	(Arc::new(connection), fake)
}
