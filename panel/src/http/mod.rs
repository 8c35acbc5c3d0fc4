//! Outbound HTTP integrations

pub mod client;
pub mod dockerhub;
pub mod github;
