//! Host-supplied persistence contract for durable agent credentials.

pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

// self
use crate::{_prelude::*, auth::credential::CredentialMaterial, auth::id::ClientId, error::BoxError};

/// Bundle of everything that must be loaded or saved together: the onboarded `client_id`
/// plus its credential material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
	/// The onboarded agent's server-issued identifier.
	pub client_id: ClientId,
	/// Credential material paired with `client_id`.
	pub material: CredentialMaterial,
}

/// Persistence contract for durable agent credentials, implemented by the host.
///
/// Providing a store commits to both directions: `load` is consulted at initialization and
/// during `update_credentials`, `save` is invoked after every successful register/rotate.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Loads the currently persisted credentials, if any.
	///
	/// Returns [`StoreError::NotFound`] when no credentials have ever been saved.
	fn load(&self) -> Result<StoredCredentials, StoreError>;

	/// Persists `credentials`, replacing whatever was previously stored.
	fn save(&self, credentials: &StoredCredentials) -> Result<(), StoreError>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Debug, ThisError)]
pub enum StoreError {
	/// No credentials have been persisted yet.
	#[error("No credentials are available to load.")]
	NotFound,
	/// Serialization/deserialization of the stored representation failed.
	#[error("Serialization error: {source}.")]
	Serialization {
		/// Underlying (de)serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// The storage backend itself failed (I/O, network, permissions).
	#[error("Backend failure: {source}.")]
	Backend {
		/// Underlying backend failure.
		#[source]
		source: BoxError,
	},
}
