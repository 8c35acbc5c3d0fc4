//! Deployment reconciliation and generated configuration

pub mod auto;
pub mod compose;
pub mod eligibility;
pub mod formalize;
pub mod names;
pub mod nginx;
pub mod source;
pub mod store;
