#![doc = include_str!("../README.md")]

pub mod error;
pub mod middleware;
pub mod oauth;
pub mod random;
pub mod resource;
pub mod session;

// Re-exports for convenient access
pub use error::Error;
pub use oauth::{
    AuthClient, AuthorizationRequest, IdClaims, OAuthConfig, TokenResponse, decode_id_claims,
};
pub use random::{generate_nonce, generate_state};
pub use resource::{Profile, ResourceClient};
pub use session::{Session, SessionId, SessionStore, SharedSession};
