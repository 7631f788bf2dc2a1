//! Attribute sets sent to and read from the directory.
use std::collections::{btree_map, BTreeMap, HashSet};

use unicase::UniCase;

/// The value of a single attribute: one value, or several for multi-valued
/// attributes such as `objectClass`.
///
/// Values are kept as raw bytes since some attributes (`unicodePwd`) are not
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
	/// A single value.
	Single(Vec<u8>),
	/// Several values, in the order given.
	Multi(Vec<Vec<u8>>),
}

impl AttributeValue {
	/// All values as byte slices.
	#[must_use]
	pub fn values(&self) -> Vec<&[u8]> {
		match self {
			AttributeValue::Single(value) => vec![value.as_slice()],
			AttributeValue::Multi(values) => values.iter().map(Vec::as_slice).collect(),
		}
	}

	/// The first value as text. Returns `None` for an empty list or a value
	/// that is not valid UTF-8.
	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		let first = match self {
			AttributeValue::Single(value) => value,
			AttributeValue::Multi(values) => values.first()?,
		};
		std::str::from_utf8(first).ok()
	}

	/// The values as the set type `ldap3` expects for add and modify requests.
	pub(crate) fn to_set(&self) -> HashSet<Vec<u8>> {
		self.values().into_iter().map(<[u8]>::to_vec).collect()
	}
}

impl From<&str> for AttributeValue {
	fn from(value: &str) -> Self {
		AttributeValue::Single(value.as_bytes().to_vec())
	}
}

impl From<String> for AttributeValue {
	fn from(value: String) -> Self {
		AttributeValue::Single(value.into_bytes())
	}
}

impl From<&String> for AttributeValue {
	fn from(value: &String) -> Self {
		AttributeValue::from(value.as_str())
	}
}

impl From<Vec<u8>> for AttributeValue {
	fn from(value: Vec<u8>) -> Self {
		AttributeValue::Single(value)
	}
}

impl From<i64> for AttributeValue {
	fn from(value: i64) -> Self {
		AttributeValue::from(value.to_string())
	}
}

impl From<u32> for AttributeValue {
	fn from(value: u32) -> Self {
		AttributeValue::from(value.to_string())
	}
}

impl From<Vec<String>> for AttributeValue {
	fn from(values: Vec<String>) -> Self {
		AttributeValue::Multi(values.into_iter().map(String::into_bytes).collect())
	}
}

impl<const N: usize> From<[&str; N]> for AttributeValue {
	fn from(values: [&str; N]) -> Self {
		AttributeValue::Multi(values.iter().map(|v| v.as_bytes().to_vec()).collect())
	}
}

/// Attribute names mapped to values. Names compare case-insensitively, as
/// they do in the directory: `sAMAccountName` and `samaccountname` are the
/// same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
	/// The attributes, ordered by case-folded name.
	inner: BTreeMap<UniCase<String>, AttributeValue>,
}

impl AttributeMap {
	/// An empty map.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	#[must_use]
	pub fn with(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
		self.insert(name, value);
		self
	}

	/// Set an attribute, replacing any value stored under the same name in
	/// any letter case. The most recent spelling of the name is kept.
	pub fn insert(&mut self, name: &str, value: impl Into<AttributeValue>) -> Option<AttributeValue> {
		let key = UniCase::new(name.to_owned());
		let previous = self.inner.remove(&key);
		self.inner.insert(key, value.into());
		previous
	}

	/// Look up an attribute.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&AttributeValue> {
		self.inner.get(&UniCase::new(name.to_owned()))
	}

	/// Look up an attribute as text.
	#[must_use]
	pub fn get_str(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(AttributeValue::as_str)
	}

	/// Remove an attribute.
	pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
		self.inner.remove(&UniCase::new(name.to_owned()))
	}

	/// Whether the attribute is set.
	#[must_use]
	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	/// Number of attributes.
	#[must_use]
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Whether no attribute is set.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Iterate over names and values.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
		self.inner.iter().map(|(name, value)| (name.as_str(), value))
	}

	/// The attributes in the form used by `ldap3` add requests.
	pub(crate) fn to_ldap_attrs(&self) -> Vec<(Vec<u8>, HashSet<Vec<u8>>)> {
		self.iter().map(|(name, value)| (name.as_bytes().to_vec(), value.to_set())).collect()
	}
}

impl IntoIterator for AttributeMap {
	type Item = (UniCase<String>, AttributeValue);
	type IntoIter = btree_map::IntoIter<UniCase<String>, AttributeValue>;

	fn into_iter(self) -> Self::IntoIter {
		self.inner.into_iter()
	}
}

impl<'a, V: Into<AttributeValue>> FromIterator<(&'a str, V)> for AttributeMap {
	fn from_iter<T: IntoIterator<Item = (&'a str, V)>>(iter: T) -> Self {
		let mut map = AttributeMap::new();
		for (name, value) in iter {
			map.insert(name, value);
		}
		map
	}
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use super::{AttributeMap, AttributeValue};

	#[test]
	fn names_are_case_insensitive() {
		let mut map = AttributeMap::new().with("sAMAccountName", "jdoe");
		assert_eq!(map.get_str("samaccountname"), Some("jdoe"));
		assert!(map.contains("SAMACCOUNTNAME"));

		let previous = map.insert("samaccountname", "jdoe2");
		assert_eq!(previous, Some(AttributeValue::from("jdoe")));
		assert_eq!(map.len(), 1, "Re-inserting under another case must not duplicate the key");
		assert_eq!(map.iter().next().map(|(name, _)| name), Some("samaccountname"));
	}

	#[test]
	fn multi_values() {
		let value = AttributeValue::from(["top", "group"]);
		assert_eq!(value.values(), vec![b"top".as_slice(), b"group".as_slice()]);
		assert_eq!(value.as_str(), Some("top"));
		assert_eq!(AttributeValue::Multi(vec![]).as_str(), None);
	}

	#[test]
	fn ldap_attrs() {
		let map = AttributeMap::new().with("cn", "Jane Doe").with("userAccountControl", 512_u32);
		let attrs = map.to_ldap_attrs();
		assert_eq!(attrs.len(), 2);
		let (_, uac) = attrs.iter().find(|(name, _)| name == b"userAccountControl").unwrap();
		assert!(uac.contains(b"512".as_slice()));
	}
}
