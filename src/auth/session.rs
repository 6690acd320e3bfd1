//! Ephemeral session state: the current bearer access token and last known server time.

// self
use crate::{_prelude::*, auth::secret::Secret};

/// Ephemeral, non-persisted session state.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
	access_token: Option<Secret>,
	last_token_time: Option<OffsetDateTime>,
}
impl SessionState {
	/// Returns the current bearer access token, if one has been acquired.
	pub fn access_token(&self) -> Option<&Secret> {
		self.access_token.as_ref()
	}

	/// Returns the server-reported wall clock from the last successful token exchange.
	pub fn last_token_time(&self) -> Option<OffsetDateTime> {
		self.last_token_time
	}

	/// Records a fresh access token, optionally alongside the server's reported time.
	pub fn record_token(&mut self, access_token: Secret, server_time: Option<OffsetDateTime>) {
		self.access_token = Some(access_token);

		if let Some(server_time) = server_time {
			self.last_token_time = Some(server_time);
		}
	}

	/// Drops the held access token; any non-OK response is treated as an implicit invalidation.
	pub fn invalidate(&mut self) {
		self.access_token = None;
	}
}
