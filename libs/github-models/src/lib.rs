//! Response models for the external APIs the test panel talks to
//!
//! GitHub GraphQL (pull requests, teams, viewer), GitHub OAuth and DockerHub.

pub mod models;

pub use models::*;
