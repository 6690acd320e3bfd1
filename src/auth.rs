//! Agent identity, credential material, and session state.

pub mod credential;
pub mod id;
pub mod identity;
pub mod secret;
pub mod session;

pub use credential::*;
pub use id::*;
pub use identity::*;
pub use secret::*;
pub use session::*;
