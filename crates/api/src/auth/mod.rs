//! Authentication module for Authgate

pub mod cookie;
pub mod flows;
pub mod jwt;
pub mod middleware;
pub mod oauth;
pub mod password;

pub use flows::{AuthFlows, OAuthLogin, SignupInput};
pub use jwt::{Claims, IssuedToken, JwtError, JwtManager};
pub use middleware::{require_admin, require_auth, AuthUser};
pub use oauth::{OAuthClient, OAuthError};
pub use password::{generate_salt, hash_password, verify_password};
