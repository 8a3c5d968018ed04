//! Warden Core — domain models, repository traits and error types
//! shared by the auth engine and the storage layer.

pub mod error;
pub mod models;
pub mod repository;
