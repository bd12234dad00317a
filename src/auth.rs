//! Credential secrets, the stored credential pair, and authentication wire types.

pub mod credentials;
pub mod secret;
pub mod user;

pub use credentials::*;
pub use secret::*;
pub use user::*;
