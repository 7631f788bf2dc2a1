//! Helper methods for extracting data from search results.
use ldap3::SearchEntry;
use time::{Duration, OffsetDateTime};

use crate::error::Error;

/// Seconds between the FILETIME epoch (1601-01-01) and the Unix epoch.
const FILETIME_UNIX_OFFSET: i64 = 11_644_473_600;
/// FILETIME ticks (100 ns) per second.
const FILETIME_TICKS_PER_SECOND: i64 = 10_000_000;

/// An extension trait for [`SearchEntry`] that provides convenience methods for
/// extracting data. Attribute names are matched case-insensitively, since
/// servers return them in their schema spelling rather than the requested one.
pub trait SearchEntryExt {
	/// Get all values of an attribute. Empty if the attribute is absent or
	/// its values are not valid UTF-8.
	fn attr_values(&self, attr: &str) -> &[String];

	/// Get all values of an attribute that the server returned as binary,
	/// such as `objectGUID` or `objectSid`.
	fn bin_attr_values(&self, attr: &str) -> &[Vec<u8>];

	/// Get the first value of an attribute. Will return `None` if attribute
	/// value is not valid UTF-8.
	fn attr_first(&self, attr: &str) -> Option<&str> {
		self.attr_values(attr).first().map(String::as_str)
	}

	/// Get the first value of an attribute as raw bytes, whether it was
	/// returned as text or as binary.
	fn bin_attr_first(&self, attr: &str) -> Option<&[u8]> {
		if let Some(value) = self.attr_values(attr).first() {
			return Some(value.as_bytes());
		}
		self.bin_attr_values(attr).first().map(Vec::as_slice)
	}

	/// Get the first value of an attribute, interpreted as an Active Directory
	/// FILETIME such as `pwdLastSet` or `lastLogonTimestamp`. `Ok(None)` means
	/// the attribute holds one of the "never" markers.
	fn filetime_first(&self, attr: &str) -> Option<Result<Option<OffsetDateTime>, Error>> {
		let value = self.attr_first(attr)?;
		Some(
			value
				.parse::<i64>()
				.map_err(|_| Error::Invalid(attr.to_owned()))
				.map(filetime_to_datetime),
		)
	}
}

impl SearchEntryExt for SearchEntry {
	fn attr_values(&self, attr: &str) -> &[String] {
		self.attrs
			.iter()
			.find(|(name, _)| name.eq_ignore_ascii_case(attr))
			.map(|(_, values)| values.as_slice())
			.unwrap_or_default()
	}

	fn bin_attr_values(&self, attr: &str) -> &[Vec<u8>] {
		self.bin_attrs
			.iter()
			.find(|(name, _)| name.eq_ignore_ascii_case(attr))
			.map(|(_, values)| values.as_slice())
			.unwrap_or_default()
	}
}

/// Convert a FILETIME (100 ns ticks since 1601-01-01 UTC) into a timestamp.
///
/// `0` and `i64::MAX` are used by the directory for "never" and map to
/// `None`, as does anything outside the representable range.
#[must_use]
pub fn filetime_to_datetime(ticks: i64) -> Option<OffsetDateTime> {
	if ticks <= 0 || ticks == i64::MAX {
		return None;
	}
	let seconds = ticks / FILETIME_TICKS_PER_SECOND - FILETIME_UNIX_OFFSET;
	let nanos = (ticks % FILETIME_TICKS_PER_SECOND) * 100;
	let time = OffsetDateTime::from_unix_timestamp(seconds).ok()?;
	time.checked_add(Duration::nanoseconds(nanos))
}
