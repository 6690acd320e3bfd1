#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use edgelink_core::{
	_preludet::*,
	auth::{credential::SecurityProfile, id::TenantId},
	config::CoreConfiguration,
	core::Core,
	error::Error,
	http::ReqwestHttpTransport,
};

fn configuration(server: &MockServer) -> CoreConfiguration {
	CoreConfiguration::builder(server.base_url(), TenantId::new("tenant-1").unwrap())
		.user_agent("edgelink-agent/1.0")
		.initial_access_token("iat-1")
		.build()
		.expect("Minimal configuration should build against the mock server's base URL.")
}

fn onboard(server: &MockServer, core: &Core<ReqwestHttpTransport>) {
	let _onboard_mock = server.mock(|when, then| {
		when.method(POST).path("/api/agentmanagement/v3/register");
		then.status(201).header("content-type", "application/json").body(
			r#"{"client_id":"c-1","client_secret":"s-1","registration_access_token":"rat-1","registration_client_uri":"https://host.example.com/register/c-1"}"#,
		);
	});

	core.onboard().expect("Onboard should succeed before token exchange tests run.");
}

#[test]
fn get_access_token_requires_onboarding_first() {
	let server = MockServer::start();
	let core = build_test_core(configuration(&server));

	assert!(matches!(core.get_access_token(), Err(Error::NotOnboarded)));
}

#[test]
fn get_access_token_records_a_bearer_token_on_success() {
	let server = MockServer::start();
	let core = build_test_core(configuration(&server));

	onboard(&server, &core);

	let token_mock = server.mock(|when, then| {
		when.method(POST)
			.path("/api/agentmanagement/v3/oauth/token")
			.header("content-type", "application/x-www-form-urlencoded")
			.body_contains("grant_type=client_credentials")
			.body_contains("client_assertion_type=urn%3Aietf%3Aparams%3Aoauth%3Aclient-assertion-type%3Ajwt-bearer");
		then.status(200)
			.header("content-type", "application/json")
			.body(r#"{"access_token":"at-1","token_type":"Bearer","expires_in":3600}"#);
	});

	core.get_access_token().expect("Token exchange should succeed on 200 OK.");

	token_mock.assert();
	assert_eq!(core.access_token().unwrap().expose(), "at-1");
}

#[test]
fn get_access_token_invalidates_session_on_failure() {
	let server = MockServer::start();
	let core = build_test_core(configuration(&server));

	onboard(&server, &core);
	server.mock(|when, then| {
		when.method(POST).path("/api/agentmanagement/v3/oauth/token");
		then.status(400).header("content-type", "application/json").body(r#"{"error":"invalid_client"}"#);
	});

	assert!(matches!(core.get_access_token(), Err(Error::Http(_))));
	assert!(core.access_token().is_none());
}

#[test]
fn rsa_profile_signs_client_assertion_with_rs256() {
	let server = MockServer::start();
	let configuration = CoreConfiguration::builder(server.base_url(), TenantId::new("tenant-1").unwrap())
		.user_agent("edgelink-agent/1.0")
		.initial_access_token("iat-1")
		.security_profile(SecurityProfile::Rsa3072)
		.build()
		.expect("RSA-profile configuration should build.");
	let core = build_test_core(configuration);

	server.mock(|when, then| {
		when.method(POST).path("/api/agentmanagement/v3/register");
		then.status(201).header("content-type", "application/json").body(
			r#"{"client_id":"c-rsa","registration_access_token":"rat-1","registration_client_uri":"https://host.example.com/register/c-rsa"}"#,
		);
	});

	core.onboard().expect("RSA onboarding should succeed.");

	let token_mock = server.mock(|when, then| {
		when.method(POST)
			.path("/api/agentmanagement/v3/oauth/token")
			.body_contains("client_assertion=");
		then.status(200)
			.header("content-type", "application/json")
			.body(r#"{"access_token":"at-rsa","token_type":"Bearer","expires_in":3600}"#);
	});

	core.get_access_token().expect("RSA-signed token exchange should succeed.");

	token_mock.assert();
}
