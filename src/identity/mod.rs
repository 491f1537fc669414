pub mod claims;
pub mod http;
pub mod provider;

pub use claims::{Session, SessionClaims, SessionError, SessionVerifier};
pub use http::{identity_from_payload, HttpIdentityProvider};
pub use provider::{EmailAddress, Identity, IdentityError, IdentityProvider, PublicMetadata};
