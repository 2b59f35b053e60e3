//! Account identifiers, redacted secrets, and the cached access credential.

pub mod credential;
pub mod id;
pub mod secret;

pub use credential::*;
pub use id::*;
pub use secret::*;
