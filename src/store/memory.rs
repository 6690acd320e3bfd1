//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// crates.io
use parking_lot::RwLock;
// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StoreError, StoredCredentials},
};

/// Storage backend that keeps the credential bundle in-process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore(RwLock<Option<StoredCredentials>>);
impl MemoryCredentialStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds the store with an initial credential bundle.
	pub fn seeded(credentials: StoredCredentials) -> Self {
		Self(RwLock::new(Some(credentials)))
	}
}
impl CredentialStore for MemoryCredentialStore {
	fn load(&self) -> Result<StoredCredentials, StoreError> {
		self.0.read().clone().ok_or(StoreError::NotFound)
	}

	fn save(&self, credentials: &StoredCredentials) -> Result<(), StoreError> {
		*self.0.write() = Some(credentials.clone());

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{credential::ProfileMaterial, id::ClientId, secret::Secret};

	fn bundle() -> StoredCredentials {
		StoredCredentials {
			client_id: ClientId::new("agent-1").unwrap(),
			material: crate::auth::credential::CredentialMaterial {
				profile: ProfileMaterial::SharedSecret { client_secret: Secret::new("shh") },
				registration_access_token: Secret::new("rat"),
				registration_uri: Url::parse("https://host/register/1").unwrap(),
			},
		}
	}

	#[test]
	fn load_fails_until_seeded_or_saved() {
		let store = MemoryCredentialStore::new();

		assert!(matches!(store.load(), Err(StoreError::NotFound)));

		store.save(&bundle()).unwrap();

		assert_eq!(store.load().unwrap(), bundle());
	}

	#[test]
	fn seeded_store_loads_immediately() {
		let store = MemoryCredentialStore::seeded(bundle());

		assert_eq!(store.load().unwrap(), bundle());
	}
}
