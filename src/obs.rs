//! Optional observability helpers for credential and data-lake flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `edgelink_core.flow` with the `flow` and
//!   `stage` fields.
//! - Enable `metrics` to increment the `edgelink_core_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Credential/data-lake flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Onboarding (`POST /register`).
	Onboard,
	/// Credential rotation (`PUT registration_uri`).
	Rotate,
	/// Access token exchange (`POST /oauth/token`).
	GetAccessToken,
	/// External credential reconciliation.
	UpdateCredentials,
	/// Signed-URL batch minting.
	GenerateSignedUrls,
	/// Streaming object upload.
	Upload,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Onboard => "onboard",
			Self::Rotate => "rotate",
			Self::GetAccessToken => "get_access_token",
			Self::UpdateCredentials => "update_credentials",
			Self::GenerateSignedUrls => "generate_signed_urls",
			Self::Upload => "upload",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
