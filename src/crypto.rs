//! Uniform facade over the cryptographic primitives the agent needs: secure randomness,
//! SHA-256, HMAC-SHA256, RSA-3072 keygen/sign, and base64 / base64url codecs.

// std
use std::fmt::Write as _;
// crates.io
use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rsa::{
	RsaPrivateKey, RsaPublicKey,
	pkcs1v15::SigningKey,
	pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
	traits::PublicKeyParts,
};
use sha2::{Digest, Sha256};
use signature::{SignatureEncoding, Signer};
// self
use crate::_prelude::*;

/// RSA modulus size mandated for the `RSA3072` security profile.
pub const RSA_KEY_BITS: usize = 3072;

type HmacSha256 = Hmac<Sha256>;

/// Uniform facade over the cryptographic primitives used across the crate.
///
/// Implementors must be `Send + Sync` so a single instance can be shared by a [`Core`](crate::core::Core)
/// across the borrowed lifetime of a [`DataLake`](crate::datalake::DataLake) handle.
pub trait CryptoProvider
where
	Self: Send + Sync,
{
	/// Fills and returns `n` cryptographically strong random bytes.
	fn random_bytes(&self, n: usize) -> Vec<u8>;

	/// Returns a fresh 32-hex-character identifier (128 bits of randomness).
	fn guid(&self) -> String {
		hex_encode(&self.random_bytes(16))
	}

	/// Computes the SHA-256 digest of `data`.
	fn sha256(&self, data: &[u8]) -> [u8; 32];

	/// Computes HMAC-SHA256 over `data` keyed by `key`.
	fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> [u8; 32];

	/// Generates a fresh RSA-3072 keypair, returning `(public_key_pem, private_key_pem)`.
	fn rsa3072_generate(&self) -> Result<(String, String)>;

	/// Signs `data` with RSASSA-PKCS1-v1_5 over SHA-256 using the PEM-encoded private key.
	fn rsa_sign(&self, private_key_pem: &str, data: &[u8]) -> Result<Vec<u8>>;

	/// Extracts `(n, e)` from a PEM-encoded public key, each base64url-encoded, for JWKS payloads.
	fn rsa_modulus_exponent(&self, public_key_pem: &str) -> Result<(String, String)>;

	/// Encodes `data` using the standard base64 alphabet with `=` padding.
	fn base64(&self, data: &[u8]) -> String {
		STANDARD.encode(data)
	}

	/// Encodes `data` using the URL-safe base64 alphabet without padding.
	fn base64url(&self, data: &[u8]) -> String {
		URL_SAFE_NO_PAD.encode(data)
	}

	/// Decodes standard base64 (`=` padding required).
	fn base64_decode(&self, s: &str) -> Result<Vec<u8>> {
		STANDARD.decode(s).map_err(|_| Error::BadContentEncoding { reason: "invalid base64" })
	}

	/// Decodes URL-safe base64 (no padding expected).
	fn base64url_decode(&self, s: &str) -> Result<Vec<u8>> {
		URL_SAFE_NO_PAD
			.decode(s)
			.map_err(|_| Error::BadContentEncoding { reason: "invalid base64url" })
	}
}

/// Default [`CryptoProvider`] backed by `rsa`, `sha2`, `hmac`, `rand`, and `base64`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCryptoProvider;
impl CryptoProvider for DefaultCryptoProvider {
	fn random_bytes(&self, n: usize) -> Vec<u8> {
		let mut buf = vec![0_u8; n];

		rand::rng().fill_bytes(&mut buf);

		buf
	}

	fn sha256(&self, data: &[u8]) -> [u8; 32] {
		let mut hasher = Sha256::new();

		hasher.update(data);
		hasher.finalize().into()
	}

	fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> [u8; 32] {
		let mut mac =
			HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length.");

		mac.update(data);
		mac.finalize().into_bytes().into()
	}

	fn rsa3072_generate(&self) -> Result<(String, String)> {
		let mut rng = rand::rngs::OsRng;
		let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
			.map_err(|e| Error::Fail(format!("RSA-3072 keypair generation failed: {e}.")))?;
		let public_key = RsaPublicKey::from(&private_key);
		let private_pem = private_key
			.to_pkcs8_pem(LineEnding::LF)
			.map_err(|e| Error::Fail(format!("RSA private key PEM encoding failed: {e}.")))?
			.to_string();
		let public_pem = public_key
			.to_public_key_pem(LineEnding::LF)
			.map_err(|e| Error::Fail(format!("RSA public key PEM encoding failed: {e}.")))?;

		Ok((public_pem, private_pem))
	}

	fn rsa_sign(&self, private_key_pem: &str, data: &[u8]) -> Result<Vec<u8>> {
		let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
			.map_err(|e| Error::Fail(format!("RSA private key could not be parsed: {e}.")))?;
		let signing_key = SigningKey::<Sha256>::new(private_key);
		let signature = signing_key.sign(data);

		Ok(signature.to_vec())
	}

	fn rsa_modulus_exponent(&self, public_key_pem: &str) -> Result<(String, String)> {
		let public_key = RsaPublicKey::from_public_key_pem(public_key_pem)
			.map_err(|e| Error::Fail(format!("RSA public key could not be parsed: {e}.")))?;
		let n = self.base64url(&public_key.n().to_bytes_be());
		let e = self.base64url(&public_key.e().to_bytes_be());

		Ok((n, e))
	}
}

/// Hex-encodes `bytes` in lowercase, matching the 32-hex-char correlation-id/GUID format.
pub fn hex_encode(bytes: &[u8]) -> String {
	let mut out = String::with_capacity(bytes.len() * 2);

	for byte in bytes {
		write!(out, "{byte:02x}").expect("Writing to a String cannot fail.");
	}

	out
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn guid_is_32_lowercase_hex_chars() {
		let crypto = DefaultCryptoProvider;
		let guid = crypto.guid();

		assert_eq!(guid.len(), 32);
		assert!(guid.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}

	#[test]
	fn base64_round_trips_every_byte_sequence() {
		let crypto = DefaultCryptoProvider;

		for sample in [&b""[..], b"a", b"ab", b"abc", b"abcd", &[0, 1, 2, 253, 254, 255]] {
			let encoded = crypto.base64(sample);
			let decoded = crypto.base64_decode(&encoded).expect("Valid base64 must decode.");

			assert_eq!(decoded, sample);
		}
	}

	#[test]
	fn base64url_round_trips_every_byte_sequence() {
		let crypto = DefaultCryptoProvider;

		for sample in [&b""[..], b"a", b"ab", b"abc", b"abcd", &[0, 1, 2, 253, 254, 255]] {
			let encoded = crypto.base64url(sample);
			let decoded =
				crypto.base64url_decode(&encoded).expect("Valid base64url must decode.");

			assert_eq!(decoded, sample);
		}
	}

	#[test]
	fn base64_decode_rejects_bad_input() {
		let crypto = DefaultCryptoProvider;

		assert!(crypto.base64_decode("not-valid-base64!!").is_err());
	}

	#[test]
	fn hmac_sha256_is_deterministic_and_key_sensitive() {
		let crypto = DefaultCryptoProvider;
		let a = crypto.hmac_sha256(b"key", b"message");
		let b = crypto.hmac_sha256(b"key", b"message");
		let c = crypto.hmac_sha256(b"other-key", b"message");

		assert_eq!(a, b);
		assert_ne!(a, c);
	}

	#[test]
	fn sha256_matches_known_vector() {
		let crypto = DefaultCryptoProvider;
		let digest = crypto.sha256(b"abc");

		assert_eq!(
			hex_encode(&digest),
			"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
		);
	}

	#[test]
	fn rsa3072_generate_sign_and_extract_modulus() {
		let crypto = DefaultCryptoProvider;
		let (public_pem, private_pem) =
			crypto.rsa3072_generate().expect("RSA-3072 keygen should succeed.");

		assert!(public_pem.contains("PUBLIC KEY"));
		assert!(private_pem.contains("PRIVATE KEY"));

		let signature =
			crypto.rsa_sign(&private_pem, b"payload").expect("RSA signing should succeed.");

		assert_eq!(signature.len(), RSA_KEY_BITS / 8);

		let (n, e) = crypto
			.rsa_modulus_exponent(&public_pem)
			.expect("Modulus/exponent extraction should succeed.");

		assert!(!n.is_empty());
		assert!(!e.is_empty());
	}
}
