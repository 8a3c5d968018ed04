//! Warden Auth — access token issuance/verification, refresh secret
//! generation, and the session lifecycle engine.

pub mod config;
pub mod error;
pub mod notify;
pub mod password;
pub mod refresh;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use notify::{HttpIpChangeNotifier, IpChangeNotice, IpChangeNotifier, LogIpChangeNotifier};
pub use service::{
    AuthService, LoginInput, LoginOutput, RegisterInput, RotateInput, RotateOutput,
};
pub use token::{AccessClaims, ClaimsCodec};
