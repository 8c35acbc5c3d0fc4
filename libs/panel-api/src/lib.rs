//! Test panel HTTP API models
//!
//! Every endpoint answers with either `{"data": ...}` or `{"error": "..."}`.

use serde::{Deserialize, Serialize};

/// Successful response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Error response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Response of the OAuth code exchange. `error` is always `false` on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub error: bool,
    pub data: String,
}

/// Response of a database clone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Disk usage of the root file system, in bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsage {
    pub disk_path: String,
    pub free: u64,
    pub size: u64,
}

/// Authenticated user as exposed to the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub name: String,
    pub login: String,
    pub organization: OrganizationResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationResponse {
    /// Team name to member logins
    pub teams: std::collections::BTreeMap<String, Vec<String>>,
}
