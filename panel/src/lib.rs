//! Test Panel Library
//!
//! Manages test instances of Specify 7: the deployment state, the generated
//! nginx and docker compose configuration, automatic deployment of pull
//! requests that are ready for testing, and the test databases.

pub mod app;
pub mod authn;
pub mod database;
pub mod deploy;
pub mod diagnostic;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod telemetry;
pub mod utils;
pub mod workers;
