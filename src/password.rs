//! Password resets and generation.
//!
//! Active Directory only accepts a new password through the `unicodePwd`
//! attribute, written as the quoted password in UTF-16LE over a connection it
//! considers secure.

use rand::Rng;
use tracing::info;

use crate::{
	attributes::AttributeMap,
	config::PasswordConfig,
	entity::DirectoryEntity,
	error::Error,
	user::UserEntity,
};

/// Pool for the uppercase character of each block.
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Pool for the lowercase character of each block.
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
/// Pool for the digit of each block.
const DIGITS: &[u8] = b"0123456789";
/// Pool for the symbol of each block.
const SYMBOLS: &[u8] = b"~!@#$%^&*_-|(){}[]:;<>?/";

/// Outcome of [`PasswordManager::reset_password`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordReset {
	/// A password was generated and set. The user must change it at next
	/// logon; the plaintext has to be handed to them.
	Generated(String),
	/// The supplied password was set.
	Set,
}

/// Sets user passwords.
#[derive(Debug, Clone)]
pub struct PasswordManager {
	/// The users whose passwords are managed
	users: UserEntity,
	/// Length of generated passwords
	length: usize,
}

impl PasswordManager {
	/// Create a manager generating passwords as configured.
	pub fn new(users: UserEntity, config: &PasswordConfig) -> Result<Self, Error> {
		config.validate()?;
		Ok(Self { users, length: config.length })
	}

	/// Set a user's password.
	///
	/// Without a password one is generated, `pwdLastSet` is set to `0` so the
	/// user has to pick a new one at next logon, and the generated password is
	/// returned. A supplied password is taken to be the user's own choice:
	/// `pwdLastSet` is left alone and the password is not echoed back.
	pub async fn reset_password(
		&self,
		username: &str,
		password: Option<&str>,
	) -> Result<PasswordReset, Error> {
		let (password, outcome) = match password {
			Some(password) => (password.to_owned(), PasswordReset::Set),
			None => {
				let generated = self.generate_password();
				(generated.clone(), PasswordReset::Generated(generated))
			}
		};

		let mut changes = AttributeMap::new().with("unicodePwd", encode_password(&password)?);
		if matches!(outcome, PasswordReset::Generated(_)) {
			changes.insert("pwdLastSet", 0_i64);
		}
		self.users.modify(username, changes).await?;
		info!(%username, generated = matches!(outcome, PasswordReset::Generated(_)), "Reset password");
		Ok(outcome)
	}

	/// Generate a password of the configured length.
	#[must_use]
	pub fn generate_password(&self) -> String {
		generate_password_with(&mut rand::thread_rng(), self.length)
	}
}

/// Encode a password for the `unicodePwd` attribute: the password in double
/// quotes, every character as a 2-byte little-endian code unit.
///
/// Only characters up to U+00FF are supported; anything else is rejected.
pub fn encode_password(password: &str) -> Result<Vec<u8>, Error> {
	let mut encoded = Vec::with_capacity((password.len() + 2) * 2);
	for c in std::iter::once('"').chain(password.chars()).chain(std::iter::once('"')) {
		let byte = u8::try_from(u32::from(c)).map_err(|_| {
			Error::Validation("password contains characters outside U+0000..U+00FF".to_owned())
		})?;
		encoded.extend_from_slice(&[byte, 0]);
	}
	Ok(encoded)
}

/// Generate a password of `length` characters (rounded down to a multiple of
/// 4). Every 4-character block holds one uppercase letter, one lowercase
/// letter, one digit and one symbol, in that order, each drawn uniformly from
/// its whole pool.
pub fn generate_password_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
	let mut password = String::with_capacity(length);
	for _ in 0..length / 4 {
		for pool in [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS] {
			password.push(char::from(pool[rng.gen_range(0..pool.len())]));
		}
	}
	password
}
