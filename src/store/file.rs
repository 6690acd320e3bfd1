//! File-backed [`CredentialStore`] implementation for simple single-process hosts.

// std
use std::{fs, path::PathBuf};
// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StoreError, StoredCredentials},
};

/// Storage backend that persists the credential bundle as a JSON file.
///
/// Not suited to hosts with concurrent writers; the `save`/`load` pair does no file locking
/// beyond what the filesystem itself guarantees for whole-file writes.
#[derive(Clone, Debug)]
pub struct FileCredentialStore {
	path: PathBuf,
}
impl FileCredentialStore {
	/// Points the store at `path`, which need not exist yet.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}
impl CredentialStore for FileCredentialStore {
	fn load(&self) -> Result<StoredCredentials, StoreError> {
		let bytes = fs::read(&self.path).map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				StoreError::NotFound
			} else {
				StoreError::Backend { source: Box::new(e) }
			}
		})?;

		serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialization { source })
	}

	fn save(&self, credentials: &StoredCredentials) -> Result<(), StoreError> {
		let bytes = serde_json::to_vec_pretty(credentials)
			.map_err(|source| StoreError::Serialization { source })?;

		fs::write(&self.path, bytes).map_err(|e| StoreError::Backend { source: Box::new(e) })
	}
}
