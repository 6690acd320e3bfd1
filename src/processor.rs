//! Onboarding, key rotation, access-token exchange, and external credential reconciliation.
//!
//! These are free functions rather than methods on [`SecurityHandler`](crate::security::SecurityHandler)
//! because each one also needs the [`CoreConfiguration`], the [`HttpTransport`], and a [`Clock`] —
//! the owning [`Core`](crate::core::Core) wires all four together per call.

// self
use crate::{
	_prelude::*,
	auth::{
		credential::{CredentialMaterial, ProfileMaterial, SecurityProfile},
		id::ClientId,
		secret::Secret,
	},
	clock::{Clock, parse_iso8601_timestamp},
	config::CoreConfiguration,
	crypto::CryptoProvider,
	error::{HttpSuccess, map_http_status},
	http::{HttpMethod, HttpRequest, HttpTransport, RequestBody},
	json::JsonValue,
	jwt,
	obs::{FlowKind, FlowOutcome, FlowSpan, record_flow_outcome},
	security::SecurityHandler,
	store::StoredCredentials,
};

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
const GRANT_TYPE: &str = "client_credentials";
const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Onboards an unregistered agent via `POST {host}/api/agentmanagement/v3/register`.
///
/// Fails with [`Error::AlreadyOnboarded`] if a `client_id` is already held; the caller must use
/// [`rotate`] instead.
pub(crate) fn onboard<C: CryptoProvider>(
	configuration: &CoreConfiguration,
	transport: &dyn HttpTransport,
	security: &SecurityHandler<C>,
) -> Result<()> {
	let identity = security.identity().ok_or_else(|| {
		Error::Fail("Core must set an identity before onboard can be attempted.".into())
	})?;

	if identity.is_onboarded() {
		return Err(Error::AlreadyOnboarded);
	}

	let iat = configuration.initial_access_token().ok_or(Error::NoAccessTokenProvided)?.to_owned();
	let profile = configuration.security_profile();
	let correlation_id = security.generate_correlation_id();
	let span = FlowSpan::new(FlowKind::Onboard, "start", &correlation_id).entered();

	record_flow_outcome(FlowKind::Onboard, FlowOutcome::Attempt);

	let rsa_keys = match profile {
		SecurityProfile::SharedSecret => None,
		SecurityProfile::Rsa3072 => Some(security.generate_rsa_key()?),
	};
	let body = compose_registration_body(security, profile, rsa_keys.as_ref(), None)?;
	let mut request = HttpRequest::new(HttpMethod::Post, configuration.register_url().clone())
		.with_bytes_body(body.to_json_string().into_bytes());

	add_standard_headers(&mut request, &correlation_id);
	request.headers.insert("Authorization", format!("Bearer {iat}"));

	let outcome = run_registration_exchange(
		transport,
		request,
		HttpSuccess::Created,
		&correlation_id,
		profile,
		rsa_keys,
	);

	drop(span);

	match outcome {
		Ok((client_id, material)) => {
			security.set_client_id(client_id.clone())?;
			security.replace_material(material.clone());
			persist(configuration, client_id, material)?;
			record_flow_outcome(FlowKind::Onboard, FlowOutcome::Success);

			Ok(())
		},
		Err(e) => {
			record_flow_outcome(FlowKind::Onboard, FlowOutcome::Failure);

			Err(e)
		},
	}
}

/// Rotates the held client credentials via `PUT <registration_uri>`.
///
/// For the `Rsa3072` profile, a fresh keypair is generated *before* the request body is
/// composed, so a failed exchange never leaves the held private key mismatched with a public
/// key already sent to the server.
pub(crate) fn rotate<C: CryptoProvider>(
	configuration: &CoreConfiguration,
	transport: &dyn HttpTransport,
	security: &SecurityHandler<C>,
) -> Result<()> {
	let identity = security.identity().filter(|i| i.is_onboarded()).ok_or(Error::NotOnboarded)?;
	let current = security.material().ok_or(Error::NotOnboarded)?;
	let client_id = identity.client_id().expect("is_onboarded guarantees client_id is set.");
	let correlation_id = security.generate_correlation_id();
	let span = FlowSpan::new(FlowKind::Rotate, "start", &correlation_id).entered();

	record_flow_outcome(FlowKind::Rotate, FlowOutcome::Attempt);

	let rsa_keys = match current.profile.profile() {
		SecurityProfile::SharedSecret => None,
		SecurityProfile::Rsa3072 => Some(security.generate_rsa_key()?),
	};
	let body = compose_registration_body(
		security,
		current.profile.profile(),
		rsa_keys.as_ref(),
		Some(client_id),
	)?;
	let mut request = HttpRequest::new(HttpMethod::Put, current.registration_uri.clone())
		.with_bytes_body(body.to_json_string().into_bytes());

	add_standard_headers(&mut request, &correlation_id);
	request.headers.insert(
		"Authorization",
		format!("Bearer {}", current.registration_access_token.expose()),
	);

	let outcome = run_registration_exchange(
		transport,
		request,
		HttpSuccess::Ok,
		&correlation_id,
		current.profile.profile(),
		rsa_keys,
	);

	drop(span);

	match outcome {
		Ok((client_id, material)) => {
			security.set_client_id(client_id.clone())?;
			security.replace_material(material.clone());
			persist(configuration, client_id, material)?;
			record_flow_outcome(FlowKind::Rotate, FlowOutcome::Success);

			Ok(())
		},
		Err(e) => {
			record_flow_outcome(FlowKind::Rotate, FlowOutcome::Failure);

			Err(e)
		},
	}
}

/// Reconciles externally rotated credentials loaded via the configured
/// [`CredentialStore`](crate::store::CredentialStore).
///
/// Returns [`Error::CredentialsUpToDate`] without touching state if the loaded material is
/// byte-identical to what is already held.
pub(crate) fn update_credentials<C: CryptoProvider>(
	configuration: &CoreConfiguration,
	security: &SecurityHandler<C>,
) -> Result<()> {
	let correlation_id = security.generate_correlation_id();
	let span = FlowSpan::new(FlowKind::UpdateCredentials, "start", &correlation_id).entered();

	record_flow_outcome(FlowKind::UpdateCredentials, FlowOutcome::Attempt);

	let outcome = (|| {
		let store = configuration.credential_store().ok_or(Error::NoAccessTokenProvided)?;
		let identity = security.identity().filter(|i| i.is_onboarded()).ok_or(Error::NotOnboarded)?;
		let current = security.material().ok_or(Error::NotOnboarded)?;
		let client_id = identity.client_id().expect("is_onboarded guarantees client_id is set.");
		let loaded = store.load().map_err(|e| Error::Fail(e.to_string()))?;

		if &loaded.client_id != client_id {
			return Err(Error::invalid_parameter("loaded client_id does not match the held identity"));
		}
		if loaded.material.material_eq(&current) {
			return Err(Error::CredentialsUpToDate);
		}

		security.replace_material(loaded.material);

		Ok(())
	})();

	drop(span);

	match outcome {
		Ok(()) => {
			record_flow_outcome(FlowKind::UpdateCredentials, FlowOutcome::Success);

			Ok(())
		},
		Err(e) => {
			record_flow_outcome(FlowKind::UpdateCredentials, FlowOutcome::Failure);

			Err(e)
		},
	}
}

/// Exchanges the held client credentials for a fresh bearer access token via
/// `POST {host}/api/agentmanagement/v3/oauth/token`, using a self-issued JWT client assertion.
pub(crate) fn get_access_token<C: CryptoProvider>(
	configuration: &CoreConfiguration,
	transport: &dyn HttpTransport,
	security: &SecurityHandler<C>,
	clock: &dyn Clock,
) -> Result<()> {
	let identity = security.identity().filter(|i| i.is_onboarded()).ok_or(Error::NotOnboarded)?;
	let material = security.material().ok_or(Error::NotOnboarded)?;
	let client_id = identity.client_id().expect("is_onboarded guarantees client_id is set.");
	let tenant = identity.tenant();
	let profile = identity.security_profile();
	let session = security.session();
	let issued_at = session.last_token_time().unwrap_or_else(|| clock.now());
	let signing_material: Vec<u8> = match &material.profile {
		ProfileMaterial::SharedSecret { client_secret } => {
			client_secret.expose().as_bytes().to_vec()
		},
		ProfileMaterial::Rsa3072 { private_key_pem, .. } => {
			private_key_pem.expose().as_bytes().to_vec()
		},
	};
	let assertion = jwt::build_assertion(
		security.crypto(),
		profile,
		&signing_material,
		client_id,
		tenant,
		issued_at,
	)?;
	let body = url::form_urlencoded::Serializer::new(String::new())
		.append_pair("grant_type", GRANT_TYPE)
		.append_pair("client_assertion_type", CLIENT_ASSERTION_TYPE)
		.append_pair("client_assertion", &assertion)
		.finish();
	let correlation_id = security.generate_correlation_id();
	let span = FlowSpan::new(FlowKind::GetAccessToken, "start", &correlation_id).entered();

	record_flow_outcome(FlowKind::GetAccessToken, FlowOutcome::Attempt);

	let mut request = HttpRequest::new(HttpMethod::Post, configuration.token_url().clone());

	request.headers.insert("Content-Type", CONTENT_TYPE_FORM);
	request.headers.insert("Correlation-ID", correlation_id.clone());
	request.body = RequestBody::Bytes(body.into_bytes());

	let result = transport.send(request).map_err(Error::from).and_then(|response| {
		map_http_status(response.status)?;

		let server_time = response.headers.get("Server-Time").and_then(parse_iso8601_timestamp);
		let payload = JsonValue::parse(
			std::str::from_utf8(&response.body)
				.map_err(|_| Error::invalid_parameter("access-token response was not UTF-8"))?,
		)?;
		let access_token = get_json_string(&payload, "access_token")?;

		Ok((access_token, server_time))
	});

	drop(span);

	match result {
		Ok((access_token, server_time)) => {
			security.record_token(Secret::new(access_token), server_time);
			record_flow_outcome(FlowKind::GetAccessToken, FlowOutcome::Success);

			Ok(())
		},
		Err(e) => {
			security.invalidate_session();
			record_flow_outcome(FlowKind::GetAccessToken, FlowOutcome::Failure);

			Err(e)
		},
	}
}

fn add_standard_headers(request: &mut HttpRequest, correlation_id: &str) {
	request.headers.insert("Content-Type", CONTENT_TYPE_JSON);
	request.headers.insert("Accept", CONTENT_TYPE_JSON);
	request.headers.insert("Correlation-ID", correlation_id.to_owned());
}

fn compose_registration_body<C: CryptoProvider>(
	security: &SecurityHandler<C>,
	profile: SecurityProfile,
	rsa_keys: Option<&(String, String)>,
	client_id: Option<&ClientId>,
) -> Result<JsonValue> {
	let mut root = JsonValue::object();

	if let Some(client_id) = client_id {
		root.add_string("client_id", client_id.as_ref())?;
	}

	if let SecurityProfile::Rsa3072 = profile {
		let (public_key_pem, _) =
			rsa_keys.expect("Rsa3072 profile always generates a keypair before composing a body.");
		let (n, e) = security.rsa_modulus_exponent(public_key_pem)?;
		let mut key = JsonValue::object();

		key.add_string("kty", "RSA")?;
		key.add_string("n", n)?;
		key.add_string("e", e)?;
		key.add_string("kid", security.generate_jti())?;

		let mut keys = JsonValue::array();

		keys.add_item_to_array(key)?;

		let mut jwks = JsonValue::object();

		jwks.add_object("keys", keys)?;
		root.add_object("jwks", jwks)?;
	}

	Ok(root)
}

fn run_registration_exchange(
	transport: &dyn HttpTransport,
	request: HttpRequest,
	expected: HttpSuccess,
	correlation_id: &str,
	profile: SecurityProfile,
	rsa_keys: Option<(String, String)>,
) -> Result<(ClientId, CredentialMaterial)> {
	let response = transport.send(request)?;
	let success = map_http_status(response.status)?;

	if success != expected {
		return Err(Error::invalid_parameter(format!(
			"registration exchange returned an unexpected success code for correlation id {correlation_id}"
		)));
	}

	let payload = JsonValue::parse(
		std::str::from_utf8(&response.body)
			.map_err(|_| Error::invalid_parameter("registration response was not UTF-8"))?,
	)?;
	let client_id = ClientId::new(get_json_string(&payload, "client_id")?)?;
	let registration_access_token =
		Secret::new(get_json_string(&payload, "registration_access_token")?);
	let registration_uri = Url::parse(&get_json_string(&payload, "registration_client_uri")?)
		.map_err(|e| Error::invalid_parameter(format!("invalid registration_client_uri: {e}")))?;
	let profile_material = match profile {
		SecurityProfile::SharedSecret => ProfileMaterial::SharedSecret {
			client_secret: Secret::new(get_json_string(&payload, "client_secret")?),
		},
		SecurityProfile::Rsa3072 => {
			let (public_key_pem, private_key_pem) = rsa_keys
				.expect("Rsa3072 profile always generates a keypair before composing a body.");

			ProfileMaterial::Rsa3072 { public_key_pem, private_key_pem: Secret::new(private_key_pem) }
		},
	};

	Ok((
		client_id,
		CredentialMaterial { profile: profile_material, registration_access_token, registration_uri },
	))
}

fn get_json_string(payload: &JsonValue, name: &str) -> Result<String> {
	let node = payload
		.get_object_item(name)
		.ok_or_else(|| Error::invalid_parameter(format!("response missing `{name}`")))?;

	node.get_string()
		.map(str::to_owned)
		.map_err(|_| Error::invalid_parameter(format!("`{name}` was not a string")))
}

fn persist(
	configuration: &CoreConfiguration,
	client_id: ClientId,
	material: CredentialMaterial,
) -> Result<()> {
	let Some(store) = configuration.credential_store() else { return Ok(()) };

	store.save(&StoredCredentials { client_id, material }).map_err(|_| Error::CredentialsNotSaved)
}
