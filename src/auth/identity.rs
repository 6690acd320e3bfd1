//! Stable per-device agent identity.

// self
use crate::{
	_prelude::*,
	auth::{
		credential::SecurityProfile,
		id::{ClientId, TenantId},
	},
};

/// Stable per-device identity. `client_id` is unset until onboarding succeeds and is never
/// mutated in place afterward; rotation replaces it with a freshly allocated value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentIdentity {
	client_id: Option<ClientId>,
	tenant: TenantId,
	security_profile: SecurityProfile,
}
impl AgentIdentity {
	/// Creates an identity for an agent that has not yet onboarded.
	pub fn unregistered(tenant: TenantId, security_profile: SecurityProfile) -> Self {
		Self { client_id: None, tenant, security_profile }
	}

	/// Returns the onboarded `client_id`, if any.
	pub fn client_id(&self) -> Option<&ClientId> {
		self.client_id.as_ref()
	}

	/// Returns the tenant this agent belongs to.
	pub fn tenant(&self) -> &TenantId {
		&self.tenant
	}

	/// Returns the configured security profile.
	pub fn security_profile(&self) -> SecurityProfile {
		self.security_profile
	}

	/// Returns `true` once onboarding has assigned a `client_id`.
	pub fn is_onboarded(&self) -> bool {
		self.client_id.is_some()
	}

	/// Replaces `client_id` with a freshly allocated value, as onboarding or rotation do.
	pub fn set_client_id(&mut self, client_id: ClientId) {
		self.client_id = Some(client_id);
	}
}
