//! Validated, immutable-after-build core configuration and endpoint URL composition.

// std
use std::{sync::Arc, time::Duration as StdDuration};
// self
use crate::{
	_prelude::*,
	auth::{credential::SecurityProfile, id::MAX_HOST_NAME_LENGTH, id::TenantId},
	store::CredentialStore,
};

const MAX_PROXY_FIELD_LENGTH: usize = 64;
const DEFAULT_HTTP_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(300);

/// Transport used to reach a configured proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyType {
	/// Plain HTTP proxy.
	Http,
	/// HTTPS proxy.
	Https,
	/// SOCKS4 proxy.
	Socks4,
	/// SOCKS5 proxy.
	Socks5,
}

/// Proxy connection settings.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
	/// Proxy transport kind.
	pub proxy_type: ProxyType,
	/// Proxy host name or address.
	pub host: String,
	/// Proxy port.
	pub port: u16,
	/// Optional username for proxy authentication.
	pub user: Option<String>,
	/// Password for proxy authentication; required if `user` is set.
	pub password: Option<String>,
	/// Optional NTLM domain.
	pub domain: Option<String>,
}

/// Source of a trust anchor certificate for the default transport.
#[derive(Clone, Debug)]
pub enum CertificateSource {
	/// A PEM-encoded certificate, inline.
	Pem(String),
	/// A path to a file containing a PEM-encoded certificate.
	File(String),
}

/// Pairs a host's enter/leave callbacks around the three credential-mutating flows.
///
/// Both directions are expressed on one trait so there is no representable "enter without
/// leave" configuration error; implementors must be reentrant-safe.
pub trait CriticalSection
where
	Self: Send + Sync,
{
	/// Called before a credential-mutating flow begins.
	fn enter(&self) -> Result<()>;
	/// Called after a credential-mutating flow completes, successfully or not.
	fn leave(&self) -> Result<()>;
}

/// Validated, immutable-after-build configuration for a [`Core`](crate::core::Core) handle.
#[derive(Clone)]
pub struct CoreConfiguration {
	host: Url,
	tenant: TenantId,
	user_agent: String,
	security_profile: SecurityProfile,
	http_request_timeout: StdDuration,
	proxy: Option<ProxyConfig>,
	certificate: Option<CertificateSource>,
	initial_access_token: Option<String>,
	credential_store: Option<Arc<dyn CredentialStore>>,
	critical_section: Option<Arc<dyn CriticalSection>>,
	register_url: Url,
	token_url: Url,
}
impl CoreConfiguration {
	/// Starts building a configuration for `host` (scheme + authority, no path) and `tenant`.
	pub fn builder(host: impl AsRef<str>, tenant: TenantId) -> CoreConfigurationBuilder {
		CoreConfigurationBuilder::new(host, tenant)
	}

	/// Returns the configured host.
	pub fn host(&self) -> &Url {
		&self.host
	}

	/// Returns the configured tenant.
	pub fn tenant(&self) -> &TenantId {
		&self.tenant
	}

	/// Returns the `User-Agent` header value, already prefixed with `MCL/<version> (...)`.
	pub fn user_agent(&self) -> &str {
		&self.user_agent
	}

	/// Returns the configured security profile.
	pub fn security_profile(&self) -> SecurityProfile {
		self.security_profile
	}

	/// Returns the per-request timeout.
	pub fn http_request_timeout(&self) -> StdDuration {
		self.http_request_timeout
	}

	/// Returns the configured proxy, if any.
	pub fn proxy(&self) -> Option<&ProxyConfig> {
		self.proxy.as_ref()
	}

	/// Returns the configured trust anchor certificate, if any.
	pub fn certificate(&self) -> Option<&CertificateSource> {
		self.certificate.as_ref()
	}

	/// Returns the initial access token used for onboarding, if any.
	pub fn initial_access_token(&self) -> Option<&str> {
		self.initial_access_token.as_deref()
	}

	/// Returns the configured credential store, if any.
	pub fn credential_store(&self) -> Option<&Arc<dyn CredentialStore>> {
		self.credential_store.as_ref()
	}

	/// Returns the configured critical-section wrapper, if any.
	pub fn critical_section(&self) -> Option<&Arc<dyn CriticalSection>> {
		self.critical_section.as_ref()
	}

	/// Returns the cached `POST /register` endpoint URL.
	pub fn register_url(&self) -> &Url {
		&self.register_url
	}

	/// Returns the cached `POST /oauth/token` endpoint URL.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}
}

/// Errors raised while building a [`CoreConfiguration`].
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// `host` was missing, empty, too long, or not a valid URL.
	#[error("Invalid host: {reason}.")]
	InvalidHost {
		/// Explanation of why the host was rejected.
		reason: String,
	},
	/// `user_agent` was missing, empty, or exceeded the maximum length.
	#[error("Invalid user agent: {reason}.")]
	InvalidUserAgent {
		/// Explanation of why the user agent was rejected.
		reason: String,
	},
	/// `proxy_host` was set without `proxy_port`/`proxy_type`, or a proxy field exceeded its bound.
	#[error("Invalid proxy configuration: {reason}.")]
	InvalidProxy {
		/// Explanation of why the proxy configuration was rejected.
		reason: String,
	},
	/// `proxy_user` was set without `proxy_password`.
	#[error("Proxy user was set without a proxy password.")]
	ProxyUserWithoutPassword,
}
impl From<ConfigError> for Error {
	fn from(e: ConfigError) -> Self {
		Error::invalid_parameter(e.to_string())
	}
}

/// Builder for [`CoreConfiguration`].
pub struct CoreConfigurationBuilder {
	host: String,
	tenant: TenantId,
	user_agent: Option<String>,
	security_profile: SecurityProfile,
	http_request_timeout: StdDuration,
	proxy: Option<ProxyConfig>,
	certificate: Option<CertificateSource>,
	initial_access_token: Option<String>,
	credential_store: Option<Arc<dyn CredentialStore>>,
	critical_section: Option<Arc<dyn CriticalSection>>,
}
impl CoreConfigurationBuilder {
	/// Seeds a new builder with `host` and `tenant`.
	pub fn new(host: impl AsRef<str>, tenant: TenantId) -> Self {
		Self {
			host: host.as_ref().to_owned(),
			tenant,
			user_agent: None,
			security_profile: SecurityProfile::SharedSecret,
			http_request_timeout: DEFAULT_HTTP_REQUEST_TIMEOUT,
			proxy: None,
			certificate: None,
			initial_access_token: None,
			credential_store: None,
			critical_section: None,
		}
	}

	/// Sets the `User-Agent` free-text fragment; the final header is `MCL/<version> (<text>)`.
	pub fn user_agent(mut self, text: impl Into<String>) -> Self {
		self.user_agent = Some(text.into());

		self
	}

	/// Sets the security profile (default [`SecurityProfile::SharedSecret`]).
	pub fn security_profile(mut self, profile: SecurityProfile) -> Self {
		self.security_profile = profile;

		self
	}

	/// Overrides the per-request timeout (default 300s).
	pub fn http_request_timeout(mut self, timeout: StdDuration) -> Self {
		self.http_request_timeout = timeout;

		self
	}

	/// Sets the proxy configuration.
	pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
		self.proxy = Some(proxy);

		self
	}

	/// Sets the trust anchor certificate source.
	pub fn certificate(mut self, certificate: CertificateSource) -> Self {
		self.certificate = Some(certificate);

		self
	}

	/// Sets the initial access token used to authorize onboarding.
	pub fn initial_access_token(mut self, token: impl Into<String>) -> Self {
		self.initial_access_token = Some(token.into());

		self
	}

	/// Sets the host-supplied credential store.
	pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
		self.credential_store = Some(store);

		self
	}

	/// Sets the host-supplied critical-section wrapper.
	pub fn critical_section(mut self, section: Arc<dyn CriticalSection>) -> Self {
		self.critical_section = Some(section);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<CoreConfiguration, ConfigError> {
		if self.host.is_empty() || self.host.len() > MAX_HOST_NAME_LENGTH {
			return Err(ConfigError::InvalidHost {
				reason: format!("must be 1-{MAX_HOST_NAME_LENGTH} characters"),
			});
		}

		let host = Url::parse(&self.host)
			.map_err(|e| ConfigError::InvalidHost { reason: e.to_string() })?;

		let user_agent_text = self.user_agent.ok_or(ConfigError::InvalidUserAgent {
			reason: "user_agent is required".to_owned(),
		})?;

		if user_agent_text.is_empty() || user_agent_text.len() > MAX_HOST_NAME_LENGTH {
			return Err(ConfigError::InvalidUserAgent {
				reason: format!("must be 1-{MAX_HOST_NAME_LENGTH} characters"),
			});
		}

		if let Some(proxy) = &self.proxy {
			if proxy.host.is_empty() || proxy.host.len() > MAX_PROXY_FIELD_LENGTH {
				return Err(ConfigError::InvalidProxy {
					reason: format!("proxy host must be 1-{MAX_PROXY_FIELD_LENGTH} characters"),
				});
			}
			if proxy.user.is_some() && proxy.password.is_none() {
				return Err(ConfigError::ProxyUserWithoutPassword);
			}
			for field in [&proxy.user, &proxy.password, &proxy.domain].into_iter().flatten() {
				if field.len() > MAX_PROXY_FIELD_LENGTH {
					return Err(ConfigError::InvalidProxy {
						reason: format!(
							"proxy user/password/domain must be at most {MAX_PROXY_FIELD_LENGTH} characters"
						),
					});
				}
			}
		}

		let user_agent = format!("MCL/{} ({user_agent_text})", env!("CARGO_PKG_VERSION"));
		let register_url = host
			.join("/api/agentmanagement/v3/register")
			.map_err(|e| ConfigError::InvalidHost { reason: e.to_string() })?;
		let token_url = host
			.join("/api/agentmanagement/v3/oauth/token")
			.map_err(|e| ConfigError::InvalidHost { reason: e.to_string() })?;

		Ok(CoreConfiguration {
			host,
			tenant: self.tenant,
			user_agent,
			security_profile: self.security_profile,
			http_request_timeout: self.http_request_timeout,
			proxy: self.proxy,
			certificate: self.certificate,
			initial_access_token: self.initial_access_token,
			credential_store: self.credential_store,
			critical_section: self.critical_section,
			register_url,
			token_url,
		})
	}
}
