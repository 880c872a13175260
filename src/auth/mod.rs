//! Authentication: password hashing, bearer credentials and the request
//! extractor that turns a credential into a caller identity.

pub mod credentials;
pub mod extractor;
pub mod password;

pub use credentials::{Claims, CredentialError, CredentialService};
pub use extractor::AuthUser;
pub use password::{hash_password, verify_password};
