//! Crate-wide error taxonomy shared across configuration, transport, crypto, JSON, and
//! data-lake components.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Opaque, boxed source error for transport/backend failures that do not belong to this crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by every public entry point in this crate.
#[derive(Debug, ThisError)]
pub enum Error {
	/// A required argument or callback slot was left unset where the contract demands one.
	#[error("Required argument `{argument}` was not provided.")]
	TriggeredWithNull {
		/// Name of the missing argument.
		argument: &'static str,
	},
	/// An argument was present but violated its contract (bad shape, bad range, bad combination).
	#[error("Invalid parameter: {reason}.")]
	InvalidParameter {
		/// Human-readable explanation of the violated contract.
		reason: String,
	},
	/// A host callback or local resource allocation could not be satisfied.
	#[error("Out of memory while {context}.")]
	OutOfMemory {
		/// What the crate was attempting when allocation failed.
		context: &'static str,
	},
	/// Configuration requested file-backed storage but no filesystem is available.
	#[error("File-backed storage is not available in this build.")]
	NoFileSupport,
	/// An invalid log level/verbosity was requested.
	#[error("Invalid log level requested.")]
	InvalidLogLevel,

	/// An operation that requires onboarding was invoked before `client_id` was set.
	#[error("Agent has not completed onboarding.")]
	NotOnboarded,
	/// `onboard` was invoked on an agent that already has a `client_id`.
	#[error("Agent has already completed onboarding; use rotate instead.")]
	AlreadyOnboarded,
	/// A data-plane call was attempted before any access token was ever acquired.
	#[error("No access token exists; call get_access_token first.")]
	NoAccessTokenExists,
	/// Neither an initial access token nor a paired credential load/save callback was supplied.
	#[error("No access token provided and no credential callbacks configured.")]
	NoAccessTokenProvided,
	/// `update_credentials` found the loaded material byte-identical to what is already held.
	#[error("Credentials are already up to date.")]
	CredentialsUpToDate,
	/// The save callback returned a failure after credentials were already updated in memory.
	#[error("Credentials were updated but could not be persisted.")]
	CredentialsNotSaved,
	/// The load callback reported that no credentials are stored yet.
	#[error("No credentials are available to load.")]
	CredentialsNotLoaded,
	/// The host's critical-section enter callback refused entry.
	#[error("Could not enter critical section.")]
	CannotEnterCriticalSection,

	/// Transport-level failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// HTTP response carried a status code mapped to a taxonomy variant.
	#[error(transparent)]
	Http(#[from] HttpStatusError),
	/// JSON facade failure (duplicate key, type mismatch, parse failure).
	#[error(transparent)]
	Json(#[from] JsonError),
	/// base64 / base64url decode failure.
	#[error("Content could not be decoded: {reason}.")]
	BadContentEncoding {
		/// Explanation of why decoding failed.
		reason: &'static str,
	},

	/// Signed-URL generation did not cover every object that had a path set.
	#[error("Signed URL generation failed for one or more objects.")]
	SignedUrlGenerationFail,

	/// Catch-all for failures that do not fit a more specific variant.
	#[error("{0}")]
	Fail(String),
}
impl Error {
	/// Convenience constructor for [`Error::InvalidParameter`].
	pub fn invalid_parameter(reason: impl Into<String>) -> Self {
		Self::InvalidParameter { reason: reason.into() }
	}
}

/// Transport-level failures raised by an [`crate::http::HttpTransport`] implementation.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The configured proxy host could not be resolved.
	#[error("Could not resolve proxy.")]
	CouldNotResolveProxy,
	/// The target host could not be resolved.
	#[error("Could not resolve host.")]
	CouldNotResolveHost,
	/// A TCP connection to the resolved host could not be established.
	#[error("Could not connect.")]
	CouldNotConnect,
	/// The TLS handshake failed.
	#[error("SSL handshake failed.")]
	SslHandshakeFail,
	/// Sending request bytes on the wire failed.
	#[error("Network send failed.")]
	NetworkSendFail,
	/// Reading response bytes from the wire failed.
	#[error("Network receive failed.")]
	NetworkReceiveFail,
	/// The peer's certificate could not be verified.
	#[error("Server certificate could not be verified.")]
	ServerCertificateNotVerified,
	/// The peer presented a malformed or otherwise improper certificate.
	#[error("Improper certificate.")]
	ImproperCertificate,
	/// The request exceeded `http_request_timeout` without completing.
	#[error("Request timed out.")]
	RequestTimeout,
	/// Transport-specific failure not covered by a named variant above.
	#[error("Transport error: {source}.")]
	Other {
		/// Underlying transport error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps an opaque transport-specific error.
	pub fn other(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Other { source: Box::new(src) }
	}
}

/// Errors mapped directly from HTTP status codes, per the fixed status table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum HttpStatusError {
	/// 400.
	#[error("Bad request (400).")]
	BadRequest,
	/// 401.
	#[error("Unauthorized (401).")]
	Unauthorized,
	/// 403.
	#[error("Forbidden (403).")]
	Forbidden,
	/// 404.
	#[error("Not found (404).")]
	NotFound,
	/// 409.
	#[error("Conflict (409).")]
	Conflict,
	/// 412.
	#[error("Precondition failed (412).")]
	PreconditionFail,
	/// 413.
	#[error("Request payload too large (413).")]
	RequestPayloadTooLarge,
	/// 429.
	#[error("Too many requests (429).")]
	TooManyRequests,
	/// 5xx.
	#[error("Server failed ({0}).", .0)]
	ServerFail(u16),
	/// Any status not covered by a named variant above.
	#[error("Unexpected result code ({0}).", .0)]
	UnexpectedResultCode(u16),
}
impl HttpStatusError {
	/// Maps an HTTP status code to the fixed taxonomy, or `None` for success/informational codes.
	pub fn from_status(status: u16) -> Option<Self> {
		match status {
			200 | 201 | 206 => None,
			400 => Some(Self::BadRequest),
			401 => Some(Self::Unauthorized),
			403 => Some(Self::Forbidden),
			404 => Some(Self::NotFound),
			409 => Some(Self::Conflict),
			412 => Some(Self::PreconditionFail),
			413 => Some(Self::RequestPayloadTooLarge),
			429 => Some(Self::TooManyRequests),
			500..=599 => Some(Self::ServerFail(status)),
			other => Some(Self::UnexpectedResultCode(other)),
		}
	}
}

/// Errors raised by the JSON facade (`crate::json`).
#[derive(Debug, ThisError)]
pub enum JsonError {
	/// Attempted to add a key that already exists on an object node.
	#[error("Key `{key}` already exists on this JSON object.")]
	NameDuplication {
		/// The duplicate key.
		key: String,
	},
	/// Accessor called against a node of a different JSON type.
	#[error("Expected JSON node of a different type (wanted {expected}).")]
	TypeMismatch {
		/// The type the caller expected.
		expected: &'static str,
	},
	/// The raw buffer could not be parsed as JSON.
	#[error("JSON could not be parsed: {source}.")]
	Parse {
		/// Underlying parse failure.
		#[source]
		source: serde_json::Error,
	},
}
impl From<serde_json::Error> for JsonError {
	fn from(source: serde_json::Error) -> Self {
		Self::Parse { source }
	}
}

/// Success outcomes distinguished by the source taxonomy; represented as `Ok` payloads
/// instead of error variants so callers use idiomatic `Result` matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpSuccess {
	/// 200.
	Ok,
	/// 201.
	Created,
	/// 206.
	PartialContent,
}
impl HttpSuccess {
	/// Maps a 2xx/partial-content status code to a [`HttpSuccess`] variant.
	pub fn from_status(status: u16) -> Option<Self> {
		match status {
			200 => Some(Self::Ok),
			201 => Some(Self::Created),
			206 => Some(Self::PartialContent),
			_ => None,
		}
	}
}

/// Maps a raw HTTP status code to either a [`HttpSuccess`] or the corresponding [`Error`].
pub fn map_http_status(status: u16) -> Result<HttpSuccess> {
	if let Some(success) = HttpSuccess::from_status(status) {
		return Ok(success);
	}

	Err(HttpStatusError::from_status(status)
		.map(Error::Http)
		.unwrap_or_else(|| Error::Fail(format!("Unhandled HTTP status {status}."))))
}

/// Precondition-checking helper replacing the source's `MCL_ASSERT_*` macro family.
///
/// `ensure!(condition, Error::variant)` returns early with the given error when the
/// condition is false.
macro_rules! ensure {
	($cond:expr, $err:expr) => {
		if !($cond) {
			return Err($err);
		}
	};
}
pub(crate) use ensure;

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn http_status_mapping_matches_fixed_table() {
		assert!(matches!(map_http_status(200), Ok(HttpSuccess::Ok)));
		assert!(matches!(map_http_status(201), Ok(HttpSuccess::Created)));
		assert!(matches!(map_http_status(206), Ok(HttpSuccess::PartialContent)));
		assert!(matches!(
			map_http_status(400),
			Err(Error::Http(HttpStatusError::BadRequest))
		));
		assert!(matches!(
			map_http_status(401),
			Err(Error::Http(HttpStatusError::Unauthorized))
		));
		assert!(matches!(
			map_http_status(500),
			Err(Error::Http(HttpStatusError::ServerFail(500)))
		));
		assert!(matches!(
			map_http_status(599),
			Err(Error::Http(HttpStatusError::ServerFail(599)))
		));
		assert!(matches!(
			map_http_status(499),
			Err(Error::Http(HttpStatusError::UnexpectedResultCode(499)))
		));
	}

	#[test]
	fn register_200_is_unexpected_result_code() {
		// The source treats a bare 200 on POST /register as unexpected since 201 is required;
		// callers enforce that by checking for `HttpSuccess::Created` explicitly rather than
		// accepting any success variant, so the mapping itself must still surface 200 as OK here.
		assert!(matches!(map_http_status(200), Ok(HttpSuccess::Ok)));
	}
}
