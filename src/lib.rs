//! Agent-side onboarding, self-issued-JWT token exchange, and signed-URL blob upload client
//! for resource-constrained industrial IoT devices.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod core;
pub mod crypto;
pub mod datalake;
pub mod error;
pub mod http;
pub mod json;
pub mod jwt;
pub mod list;
pub mod obs;
pub mod processor;
pub mod security;
pub mod store;

#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::CoreConfiguration,
		core::Core,
		http::ReqwestHttpTransport,
		security::SecurityHandler,
	};

	/// Builds a blocking reqwest client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestHttpTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.timeout(std::time::Duration::from_secs(5))
			.build()
			.expect("Failed to build insecure reqwest client for tests.");

		ReqwestHttpTransport::with_client(client)
	}

	/// Constructs a [`Core`] backed by the insecure test transport for the given configuration.
	pub fn build_test_core(configuration: CoreConfiguration) -> Core<ReqwestHttpTransport> {
		Core::with_transport(configuration, test_reqwest_transport(), SecurityHandler::default())
	}
}

mod _prelude {
	pub use std::{
		collections::{HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::blocking::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
