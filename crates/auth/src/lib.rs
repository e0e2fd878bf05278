//! `tourbook-auth`: boundary to the external identity collaborator.
//!
//! Credentials are issued elsewhere; this crate only decodes the verified
//! identity and role claims and answers owner/elevated policy questions.
//! It is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize_owner_or_elevated, require_elevated};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::Principal;
pub use roles::Role;
