mod extractor;
mod session;

pub use extractor::{AdminUser, AuthError, AuthUser};
pub use session::{hash_token, SessionIdentityProvider};
