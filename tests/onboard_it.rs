#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use edgelink_core::{
	_preludet::*,
	auth::{credential::SecurityProfile, id::TenantId},
	config::CoreConfiguration,
	error::Error,
};

fn configuration(server: &MockServer, initial_access_token: &str) -> CoreConfiguration {
	CoreConfiguration::builder(server.base_url(), TenantId::new("tenant-1").unwrap())
		.user_agent("edgelink-agent/1.0")
		.initial_access_token(initial_access_token)
		.build()
		.expect("Minimal configuration should build against the mock server's base URL.")
}

#[test]
fn onboard_assigns_client_id_and_persists_material() {
	let server = MockServer::start();
	let mock = server.mock(|when, then| {
		when.method(POST)
			.path("/api/agentmanagement/v3/register")
			.header("authorization", "Bearer iat-1");
		then.status(201).header("content-type", "application/json").body(
			r#"{"client_id":"c-1","client_secret":"s-1","registration_access_token":"rat-1","registration_client_uri":"https://host.example.com/register/c-1"}"#,
		);
	});
	let core = build_test_core(configuration(&server, "iat-1"));

	core.onboard().expect("Onboard should succeed on 201 Created.");

	mock.assert();

	let identity = core.identity().expect("Core must hold an identity after construction.");

	assert!(identity.is_onboarded());
	assert_eq!(identity.client_id().unwrap().as_ref(), "c-1");
}

#[test]
fn onboard_rejects_a_bare_200() {
	let server = MockServer::start();

	server.mock(|when, then| {
		when.method(POST).path("/api/agentmanagement/v3/register");
		then.status(200)
			.header("content-type", "application/json")
			.body(r#"{"client_id":"c-1","client_secret":"s-1"}"#);
	});

	let core = build_test_core(configuration(&server, "iat-1"));

	assert!(matches!(core.onboard(), Err(Error::Http(_))));
	assert!(!core.identity().unwrap().is_onboarded());
}

#[test]
fn onboard_twice_reports_already_onboarded() {
	let server = MockServer::start();

	server.mock(|when, then| {
		when.method(POST).path("/api/agentmanagement/v3/register");
		then.status(201).header("content-type", "application/json").body(
			r#"{"client_id":"c-1","client_secret":"s-1","registration_access_token":"rat-1","registration_client_uri":"https://host.example.com/register/c-1"}"#,
		);
	});

	let core = build_test_core(configuration(&server, "iat-1"));

	core.onboard().expect("First onboard should succeed.");

	assert!(matches!(core.onboard(), Err(Error::AlreadyOnboarded)));
}

#[test]
fn rotate_key_requires_prior_onboarding() {
	let server = MockServer::start();
	let core = build_test_core(configuration(&server, "iat-1"));

	assert!(matches!(core.rotate_key(), Err(Error::NotOnboarded)));
}

#[test]
fn onboard_with_rsa_profile_generates_and_submits_jwks() {
	let server = MockServer::start();
	let mock = server.mock(|when, then| {
		when.method(POST)
			.path("/api/agentmanagement/v3/register")
			.body_contains("\"jwks\"")
			.body_contains("\"kty\":\"RSA\"");
		then.status(201).header("content-type", "application/json").body(
			r#"{"client_id":"c-rsa","registration_access_token":"rat-1","registration_client_uri":"https://host.example.com/register/c-rsa"}"#,
		);
	});
	let configuration = CoreConfiguration::builder(server.base_url(), TenantId::new("tenant-1").unwrap())
		.user_agent("edgelink-agent/1.0")
		.initial_access_token("iat-1")
		.security_profile(SecurityProfile::Rsa3072)
		.build()
		.expect("RSA-profile configuration should build.");
	let core = build_test_core(configuration);

	core.onboard().expect("RSA onboarding should succeed on 201 Created.");

	mock.assert();
	assert!(core.identity().unwrap().is_onboarded());
}
