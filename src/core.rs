//! Owning handle tying configuration, transport, and security state together.

// self
use crate::{
	_prelude::*,
	auth::{identity::AgentIdentity, secret::Secret},
	clock::{Clock, SystemClock},
	config::CoreConfiguration,
	crypto::{CryptoProvider, DefaultCryptoProvider},
	http::HttpTransport,
	processor,
	security::SecurityHandler,
};

/// Owns everything a credential or data-lake flow needs: validated configuration, the
/// blocking transport, and the mutex-guarded security vault.
///
/// A [`DataLake`](crate::datalake::DataLake) borrows this handle for the lifetime of its own
/// calls rather than holding an `Arc`, since every flow in this crate runs to completion
/// before returning (SPEC_FULL.md §5): there is no background task that could outlive `Core`.
pub struct Core<T, C = DefaultCryptoProvider>
where
	T: HttpTransport,
	C: CryptoProvider,
{
	configuration: CoreConfiguration,
	transport: T,
	security: SecurityHandler<C>,
	clock: Arc<dyn Clock>,
}
impl<T, C> Core<T, C>
where
	T: HttpTransport,
	C: CryptoProvider,
{
	/// Builds a handle from a validated configuration, a transport, and a security handler.
	///
	/// Seeds the security handler with an unregistered identity for the configuration's tenant
	/// and security profile; [`Core::onboard`] fails until a `client_id` has been assigned.
	pub fn with_transport(
		configuration: CoreConfiguration,
		transport: T,
		security: SecurityHandler<C>,
	) -> Self {
		security.set_identity(AgentIdentity::unregistered(
			configuration.tenant().clone(),
			configuration.security_profile(),
		));

		Self { configuration, transport, security, clock: Arc::new(SystemClock) }
	}

	/// Overrides the time source used for JWT `iat` and token-record bookkeeping.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Returns the validated configuration this handle was built from.
	pub fn configuration(&self) -> &CoreConfiguration {
		&self.configuration
	}

	/// Returns the currently held agent identity.
	pub fn identity(&self) -> Option<AgentIdentity> {
		self.security.identity()
	}

	/// Returns the current bearer access token, if [`Core::get_access_token`] has succeeded at
	/// least once since the last invalidation.
	pub fn access_token(&self) -> Option<Secret> {
		self.security.session().access_token().cloned()
	}

	/// Onboards an unregistered agent via `POST {host}/api/agentmanagement/v3/register`.
	pub fn onboard(&self) -> Result<()> {
		self.guarded(|| processor::onboard(&self.configuration, &self.transport, &self.security))
	}

	/// Rotates the held client credentials via `PUT <registration_uri>`.
	pub fn rotate_key(&self) -> Result<()> {
		self.guarded(|| processor::rotate(&self.configuration, &self.transport, &self.security))
	}

	/// Reconciles externally rotated credentials loaded via the configured credential store.
	pub fn update_credentials(&self) -> Result<()> {
		self.guarded(|| processor::update_credentials(&self.configuration, &self.security))
	}

	/// Exchanges the held client credentials for a fresh bearer access token.
	pub fn get_access_token(&self) -> Result<()> {
		processor::get_access_token(
			&self.configuration,
			&self.transport,
			&self.security,
			self.clock.as_ref(),
		)
	}

	pub(crate) fn transport(&self) -> &T {
		&self.transport
	}

	pub(crate) fn security(&self) -> &SecurityHandler<C> {
		&self.security
	}

	/// Runs `f` inside the configured critical section, if one was set. `leave` is always
	/// called once `enter` succeeds, even if `f` failed, so a host-provided lock is never left
	/// held past a single flow.
	fn guarded<R>(&self, f: impl FnOnce() -> Result<R>) -> Result<R> {
		let Some(section) = self.configuration.critical_section() else { return f() };

		section.enter()?;

		let result = f();
		let leave_result = section.leave();

		result.and_then(|value| leave_result.map(|()| value))
	}
}
impl<T, C> Debug for Core<T, C>
where
	T: HttpTransport,
	C: CryptoProvider,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Core")
			.field("host", &self.configuration.host().as_str())
			.field("tenant", &self.configuration.tenant().as_ref())
			.field("identity", &self.security.identity())
			.finish()
	}
}
