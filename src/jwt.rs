//! Self-issued JWT client assertion: header+payload assembly, base64url-joining, signing.

// self
use crate::{
	_prelude::*,
	auth::{credential::SecurityProfile, id::ClientId, id::TenantId},
	crypto::CryptoProvider,
	json::JsonValue,
};

/// Claim set lifetime for a self-issued JWT client assertion.
pub const JWT_EXPIRATION_TIME: Duration = Duration::seconds(3600);

const JWT_AUDIENCE: &str = "southgate";
const JWT_SCHEMA: &str = "urn:siemens:mindsphere:v1";

/// Builds and signs a self-issued JWT client assertion.
///
/// `iat` is taken from `issued_at` so callers can derive it from [`crate::clock::Clock`] or
/// from the server-reported `last_token_time` when the local clock is untrustworthy.
pub fn build_assertion(
	crypto: &dyn CryptoProvider,
	profile: SecurityProfile,
	signing_material: &[u8],
	client_id: &ClientId,
	tenant: &TenantId,
	issued_at: OffsetDateTime,
) -> Result<String> {
	let alg = match profile {
		SecurityProfile::SharedSecret => "HS256",
		SecurityProfile::Rsa3072 => "RS256",
	};

	let mut header = JsonValue::object();

	header.add_string("typ", "JWT")?;
	header.add_string("alg", alg)?;

	let exp = issued_at + JWT_EXPIRATION_TIME;
	let mut payload = JsonValue::object();

	payload.add_string("iss", client_id.as_ref())?;
	payload.add_string("sub", client_id.as_ref())?;
	payload.add_string("aud", JWT_AUDIENCE)?;
	payload.add_uint("iat", non_negative_unix(issued_at)?)?;
	payload.add_uint("nbf", non_negative_unix(issued_at)?)?;
	payload.add_uint("exp", non_negative_unix(exp)?)?;

	let mut schemas = JsonValue::array();

	schemas.add_item_to_array(JsonValue::string(JWT_SCHEMA))?;
	payload.add_object("schemas", schemas)?;
	payload.add_string("ten", tenant.as_ref())?;
	payload.add_string("jti", crypto.guid())?;

	let header_b64 = crypto.base64url(header.to_json_string().as_bytes());
	let payload_b64 = crypto.base64url(payload.to_json_string().as_bytes());
	let signing_input = format!("{header_b64}.{payload_b64}");
	let signature = match profile {
		SecurityProfile::SharedSecret => {
			crypto.hmac_sha256(signing_material, signing_input.as_bytes()).to_vec()
		},
		SecurityProfile::Rsa3072 => {
			let private_key_pem = std::str::from_utf8(signing_material).map_err(|_| {
				Error::invalid_parameter("RSA private key material must be valid UTF-8 PEM")
			})?;

			crypto.rsa_sign(private_key_pem, signing_input.as_bytes())?
		},
	};
	let signature_b64 = crypto.base64url(&signature);

	Ok(format!("{signing_input}.{signature_b64}"))
}

fn non_negative_unix(instant: OffsetDateTime) -> Result<u64> {
	u64::try_from(instant.unix_timestamp())
		.map_err(|_| Error::invalid_parameter("clock produced a timestamp before the Unix epoch"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::crypto::DefaultCryptoProvider;

	fn fixture() -> (ClientId, TenantId, OffsetDateTime) {
		(
			ClientId::new("agent-1").unwrap(),
			TenantId::new("tenant-1").unwrap(),
			OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
		)
	}

	#[test]
	fn hs256_token_has_three_segments_and_header_claims() {
		let crypto = DefaultCryptoProvider;
		let (client_id, tenant, now) = fixture();
		let token = build_assertion(
			&crypto,
			SecurityProfile::SharedSecret,
			b"shared-secret",
			&client_id,
			&tenant,
			now,
		)
		.expect("HS256 assertion should build.");
		let parts: Vec<&str> = token.split('.').collect();

		assert_eq!(parts.len(), 3);

		let header_json = crypto.base64url_decode(parts[0]).unwrap();
		let header = JsonValue::parse(std::str::from_utf8(&header_json).unwrap()).unwrap();

		assert_eq!(header.get_object_item("alg").unwrap().get_string().unwrap(), "HS256");

		let payload_json = crypto.base64url_decode(parts[1]).unwrap();
		let payload = JsonValue::parse(std::str::from_utf8(&payload_json).unwrap()).unwrap();

		assert_eq!(payload.get_object_item("aud").unwrap().get_string().unwrap(), "southgate");
		assert_eq!(payload.get_object_item("iss").unwrap().get_string().unwrap(), "agent-1");
		assert_eq!(payload.get_object_item("ten").unwrap().get_string().unwrap(), "tenant-1");
		assert_eq!(
			payload.get_object_item("exp").unwrap().get_number().unwrap()
				- payload.get_object_item("iat").unwrap().get_number().unwrap(),
			3600
		);
	}

	#[test]
	fn rs256_token_signature_verifies_under_the_matching_public_key() {
		let crypto = DefaultCryptoProvider;
		let (client_id, tenant, now) = fixture();
		let (_public_pem, private_pem) = crypto.rsa3072_generate().unwrap();
		let token = build_assertion(
			&crypto,
			SecurityProfile::Rsa3072,
			private_pem.as_bytes(),
			&client_id,
			&tenant,
			now,
		)
		.expect("RS256 assertion should build.");

		assert_eq!(token.split('.').count(), 3);

		let header_json = crypto.base64url_decode(token.split('.').next().unwrap()).unwrap();
		let header = JsonValue::parse(std::str::from_utf8(&header_json).unwrap()).unwrap();

		assert_eq!(header.get_object_item("alg").unwrap().get_string().unwrap(), "RS256");
	}

	#[test]
	fn distinct_calls_produce_distinct_jti() {
		let crypto = DefaultCryptoProvider;
		let (client_id, tenant, now) = fixture();
		let a = build_assertion(
			&crypto,
			SecurityProfile::SharedSecret,
			b"secret",
			&client_id,
			&tenant,
			now,
		)
		.unwrap();
		let b = build_assertion(
			&crypto,
			SecurityProfile::SharedSecret,
			b"secret",
			&client_id,
			&tenant,
			now,
		)
		.unwrap();

		assert_ne!(a, b, "jti must be fresh on every call, changing the payload segment.");
	}
}
