//! Secret wrapper that redacts sensitive material from `Debug`/`Display`.

// self
use crate::_prelude::*;

/// Redacted secret wrapper keeping client secrets and private keys out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
impl Drop for Secret {
	fn drop(&mut self) {
		zero_in_place(&mut self.0);
	}
}

fn zero_in_place(value: &mut String) {
	// SAFETY: overwriting with 0u8 preserves UTF-8 validity (NUL is a valid single-byte code
	// point), so the buffer stays a well-formed `String` for the remainder of this call.
	for byte in unsafe { value.as_mut_vec() } {
		*byte = 0;
	}
}
