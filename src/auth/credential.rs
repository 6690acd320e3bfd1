//! Durable agent credential material, variant over the configured security profile.

// self
use crate::{_prelude::*, auth::secret::Secret};

/// Signing scheme an onboarded agent authenticates with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityProfile {
	/// HMAC-SHA256 over a server-issued shared secret.
	SharedSecret,
	/// RSA-SHA256 over a locally held 3072-bit keypair.
	Rsa3072,
}

/// Profile-specific signing material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileMaterial {
	/// [`SecurityProfile::SharedSecret`] material.
	SharedSecret {
		/// High-entropy secret issued by the server at onboarding.
		client_secret: Secret,
	},
	/// [`SecurityProfile::Rsa3072`] material.
	Rsa3072 {
		/// PEM-encoded RSA public key, sent to the server as a JWKS entry.
		public_key_pem: String,
		/// PEM-encoded RSA private key, used to sign assertions locally.
		private_key_pem: Secret,
	},
}
impl ProfileMaterial {
	/// Returns the [`SecurityProfile`] this material was produced for.
	pub fn profile(&self) -> SecurityProfile {
		match self {
			Self::SharedSecret { .. } => SecurityProfile::SharedSecret,
			Self::Rsa3072 { .. } => SecurityProfile::Rsa3072,
		}
	}
}

/// Durable credential material held for an onboarded agent.
///
/// Replaced as a whole behind the security handler's mutex on every successful
/// register/rotate/update-credentials call, so no partially parsed response is ever observable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialMaterial {
	/// Profile-specific signing material.
	pub profile: ProfileMaterial,
	/// One-shot bearer token authorizing the next rotation request.
	pub registration_access_token: Secret,
	/// Absolute URL to PUT rotation requests to.
	pub registration_uri: Url,
}
impl CredentialMaterial {
	/// Returns `true` if `self` and `other` carry byte-identical secret/key and registration
	/// token material, used by `update_credentials` to detect a no-op reconciliation.
	pub fn material_eq(&self, other: &Self) -> bool {
		let profile_eq = match (&self.profile, &other.profile) {
			(
				ProfileMaterial::SharedSecret { client_secret: a },
				ProfileMaterial::SharedSecret { client_secret: b },
			) => a.expose() == b.expose(),
			(
				ProfileMaterial::Rsa3072 { public_key_pem: ap, private_key_pem: ak },
				ProfileMaterial::Rsa3072 { public_key_pem: bp, private_key_pem: bk },
			) => ap == bp && ak.expose() == bk.expose(),
			_ => false,
		};

		profile_eq
			&& self.registration_access_token.expose() == other.registration_access_token.expose()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn shared_secret(secret: &str, token: &str) -> CredentialMaterial {
		CredentialMaterial {
			profile: ProfileMaterial::SharedSecret { client_secret: Secret::new(secret) },
			registration_access_token: Secret::new(token),
			registration_uri: Url::parse("https://host/register/1").unwrap(),
		}
	}

	#[test]
	fn material_eq_ignores_registration_uri() {
		let a = shared_secret("secret", "token");
		let mut b = shared_secret("secret", "token");

		b.registration_uri = Url::parse("https://host/register/2").unwrap();

		assert!(a.material_eq(&b));
	}

	#[test]
	fn material_eq_detects_secret_change() {
		let a = shared_secret("secret", "token");
		let b = shared_secret("different", "token");

		assert!(!a.material_eq(&b));
	}

	#[test]
	fn material_eq_false_across_profiles() {
		let a = shared_secret("secret", "token");
		let b = CredentialMaterial {
			profile: ProfileMaterial::Rsa3072 {
				public_key_pem: "pub".into(),
				private_key_pem: Secret::new("priv"),
			},
			registration_access_token: Secret::new("token"),
			registration_uri: Url::parse("https://host/register/1").unwrap(),
		};

		assert!(!a.material_eq(&b));
	}
}
