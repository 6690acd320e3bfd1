//! In-memory vault combining agent identity, credential material, and session state.

// self
use crate::{
	_prelude::*,
	auth::{
		credential::{CredentialMaterial, ProfileMaterial},
		id::ClientId,
		identity::AgentIdentity,
		secret::Secret,
		session::SessionState,
	},
	crypto::{CryptoProvider, DefaultCryptoProvider},
};

#[derive(Default)]
struct Vault {
	identity: Option<AgentIdentity>,
	material: Option<CredentialMaterial>,
	session: SessionState,
}

/// Mutex-guarded container for everything a signing operation needs: agent identity,
/// credential material, session state, and the crypto primitives keyed by that material.
///
/// `Send + Sync` by construction (`parking_lot::Mutex`), so a single handle can be shared by
/// a [`Core`](crate::core::Core) across the borrowed lifetime of a
/// [`DataLake`](crate::datalake::DataLake).
pub struct SecurityHandler<C = DefaultCryptoProvider> {
	crypto: C,
	vault: Mutex<Vault>,
}
impl<C: CryptoProvider + Default> Default for SecurityHandler<C> {
	fn default() -> Self {
		Self::new(C::default())
	}
}
impl<C: CryptoProvider> SecurityHandler<C> {
	/// Builds a handler with no identity, material, or session yet established.
	pub fn new(crypto: C) -> Self {
		Self { crypto, vault: Mutex::new(Vault::default()) }
	}

	/// Sets the agent identity, overwriting any previously held value.
	pub fn set_identity(&self, identity: AgentIdentity) {
		self.vault.lock().identity = Some(identity);
	}

	/// Returns a clone of the currently held identity.
	pub fn identity(&self) -> Option<AgentIdentity> {
		self.vault.lock().identity.clone()
	}

	/// Replaces `client_id` on the held identity. Fails if no identity has been set yet.
	pub fn set_client_id(&self, client_id: ClientId) -> Result<()> {
		let mut vault = self.vault.lock();
		let identity = vault.identity.as_mut().ok_or(Error::NotOnboarded)?;

		identity.set_client_id(client_id);

		Ok(())
	}

	/// Returns a clone of the currently held credential material, if onboarding has completed.
	pub fn material(&self) -> Option<CredentialMaterial> {
		self.vault.lock().material.clone()
	}

	/// Atomically replaces the held credential material as a whole.
	pub fn replace_material(&self, material: CredentialMaterial) {
		self.vault.lock().material = Some(material);
	}

	/// Returns a clone of the current session state.
	pub fn session(&self) -> SessionState {
		self.vault.lock().session.clone()
	}

	/// Records a fresh access token, optionally alongside a server-reported wall clock.
	pub fn record_token(&self, access_token: Secret, server_time: Option<OffsetDateTime>) {
		self.vault.lock().session.record_token(access_token, server_time);
	}

	/// Drops the held access token.
	pub fn invalidate_session(&self) {
		self.vault.lock().session.invalidate();
	}

	/// Encodes `data` using the standard base64 alphabet.
	pub fn base64_encode(&self, data: &[u8]) -> String {
		self.crypto.base64(data)
	}

	/// Decodes standard base64.
	pub fn base64_decode(&self, s: &str) -> Result<Vec<u8>> {
		self.crypto.base64_decode(s)
	}

	/// Encodes `data` using the URL-safe base64 alphabet.
	pub fn base64_url_encode(&self, data: &[u8]) -> String {
		self.crypto.base64url(data)
	}

	/// Decodes URL-safe base64.
	pub fn base64_url_decode(&self, s: &str) -> Result<Vec<u8>> {
		self.crypto.base64url_decode(s)
	}

	/// Computes the SHA-256 digest of `data`.
	pub fn hash_sha256(&self, data: &[u8]) -> [u8; 32] {
		self.crypto.sha256(data)
	}

	/// Computes HMAC-SHA256 over `data`, keyed by the held `client_secret`.
	///
	/// Fails with [`Error::NotOnboarded`] if no material is held yet, or
	/// [`Error::InvalidParameter`] if the held profile is not `SharedSecret`.
	pub fn hmac_sha256(&self, data: &[u8]) -> Result<[u8; 32]> {
		let vault = self.vault.lock();
		let material = vault.material.as_ref().ok_or(Error::NotOnboarded)?;

		match &material.profile {
			ProfileMaterial::SharedSecret { client_secret } => {
				Ok(self.crypto.hmac_sha256(client_secret.expose().as_bytes(), data))
			},
			ProfileMaterial::Rsa3072 { .. } => {
				Err(Error::invalid_parameter("hmac_sha256 requires the SharedSecret profile"))
			},
		}
	}

	/// Returns a fresh 32-hex-character JWT id.
	pub fn generate_jti(&self) -> String {
		self.crypto.guid()
	}

	/// Returns a fresh 32-hex-character correlation id, one per outbound request.
	pub fn generate_correlation_id(&self) -> String {
		self.crypto.guid()
	}

	/// Generates a fresh RSA-3072 keypair, returning `(public_key_pem, private_key_pem)`.
	///
	/// Does not touch the held material; callers assign both keys atomically via
	/// [`SecurityHandler::replace_material`] once the pair has been accepted.
	pub fn generate_rsa_key(&self) -> Result<(String, String)> {
		self.crypto.rsa3072_generate()
	}

	/// Extracts `(n, e)`, each base64url-encoded, from a PEM-encoded RSA public key.
	pub fn rsa_modulus_exponent(&self, public_key_pem: &str) -> Result<(String, String)> {
		self.crypto.rsa_modulus_exponent(public_key_pem)
	}

	/// Returns the crypto primitives facade backing this handler.
	pub fn crypto(&self) -> &C {
		&self.crypto
	}

	/// Signs `data` with RSASSA-PKCS1-v1_5, keyed by the held `private_key_pem`.
	///
	/// Fails with [`Error::NotOnboarded`] if no material is held yet, or
	/// [`Error::InvalidParameter`] if the held profile is not `Rsa3072`.
	pub fn rsa_sign(&self, data: &[u8]) -> Result<Vec<u8>> {
		let vault = self.vault.lock();
		let material = vault.material.as_ref().ok_or(Error::NotOnboarded)?;

		match &material.profile {
			ProfileMaterial::Rsa3072 { private_key_pem, .. } => {
				self.crypto.rsa_sign(private_key_pem.expose(), data)
			},
			ProfileMaterial::SharedSecret { .. } => {
				Err(Error::invalid_parameter("rsa_sign requires the Rsa3072 profile"))
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{
		credential::SecurityProfile,
		id::{ClientId, TenantId},
	};

	#[test]
	fn hmac_sha256_fails_before_onboarding() {
		let handler = SecurityHandler::<DefaultCryptoProvider>::default();

		assert!(matches!(handler.hmac_sha256(b"data"), Err(Error::NotOnboarded)));
	}

	#[test]
	fn hmac_sha256_succeeds_once_shared_secret_material_is_held() {
		let handler = SecurityHandler::<DefaultCryptoProvider>::default();

		handler.replace_material(CredentialMaterial {
			profile: ProfileMaterial::SharedSecret { client_secret: Secret::new("shh") },
			registration_access_token: Secret::new("rat"),
			registration_uri: Url::parse("https://host/register/1").unwrap(),
		});

		assert!(handler.hmac_sha256(b"data").is_ok());
		assert!(matches!(
			handler.rsa_sign(b"data"),
			Err(Error::InvalidParameter { .. })
		));
	}

	#[test]
	fn set_client_id_requires_identity_to_exist_first() {
		let handler = SecurityHandler::<DefaultCryptoProvider>::default();

		assert!(matches!(
			handler.set_client_id(ClientId::new("agent-1").unwrap()),
			Err(Error::NotOnboarded)
		));

		handler.set_identity(AgentIdentity::unregistered(
			TenantId::new("tenant-1").unwrap(),
			SecurityProfile::SharedSecret,
		));
		handler.set_client_id(ClientId::new("agent-1").unwrap()).unwrap();

		assert_eq!(handler.identity().unwrap().client_id().unwrap().as_ref(), "agent-1");
	}
}
