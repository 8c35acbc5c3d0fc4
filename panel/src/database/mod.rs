//! Test database management

pub mod archive;
pub mod queries;
pub mod shell;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;
use tokio::process::ChildStdout;
use tracing::{error, info, warn};

use crate::database::archive::{prepare_dump, UploadKind};
use crate::database::queries::DatabaseQueries;
use crate::database::shell::MysqlCli;
use crate::errors::PanelError;
use crate::filesys::dir::Dir;
use crate::storage::settings::MysqlSettings;

/// Schemas that belong to the server itself
pub const SYSTEM_DATABASES: [&str; 4] = ["information_schema", "performance_schema", "mysql", "sys"];

/// Password hash assigned to every user of an uploaded database
pub const TEST_USER_PASSWORD: &str = "EC62DEF08F5E4FD556DAA86AEC5F3FB0390EF8A862A41ECA";

static DATABASE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("database name pattern is valid"));

/// Database names are interpolated into SQL and command lines
pub fn validate_database_name(name: &str) -> Result<(), PanelError> {
    if DATABASE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(PanelError::ValidationError(
            "Database name is invalid".to_string(),
        ))
    }
}

/// Name for a copy of `name` made at `time`
pub fn clone_name(name: &str, time: DateTime<Local>) -> String {
    format!("{}_{}", name, time.format("%Y_%m_%d_%H_%M"))
}

/// Database operations offered by the panel
#[derive(Debug, Clone)]
pub struct Databases {
    queries: DatabaseQueries,
    cli: MysqlCli,
}

impl Databases {
    pub fn new(settings: &MysqlSettings) -> Self {
        Self {
            queries: DatabaseQueries::connect_lazy(settings),
            cli: MysqlCli::new(settings.clone()),
        }
    }

    pub fn queries(&self) -> &DatabaseQueries {
        &self.queries
    }

    pub async fn get_databases(&self) -> Result<BTreeMap<String, Option<String>>, PanelError> {
        self.queries.get_databases().await
    }

    /// First database that has a schema version
    pub async fn first_database(&self) -> Result<Option<String>, PanelError> {
        Ok(self
            .get_databases()
            .await?
            .into_iter()
            .find_map(|(name, version)| version.map(|_| name)))
    }

    pub async fn get_database_sizes(&self) -> Result<BTreeMap<String, f64>, PanelError> {
        self.queries.get_database_sizes().await
    }

    pub async fn get_users(&self, name: &str) -> Result<BTreeMap<i64, String>, PanelError> {
        validate_database_name(name)?;
        self.queries.get_users(name).await
    }

    pub async fn drop_database(&self, name: &str) -> Result<(), PanelError> {
        validate_database_name(name)?;
        self.queries.drop_database(name).await
    }

    pub async fn make_admin(&self, name: &str, user_id: i64) -> Result<(), PanelError> {
        validate_database_name(name)?;
        self.queries.make_admin(name, user_id).await
    }

    /// Copy `name` into a new timestamped database and return the new name
    pub async fn clone_database(&self, name: &str) -> Result<String, PanelError> {
        validate_database_name(name)?;
        let new_name = clone_name(name, Local::now());
        info!("Cloning database {} into {}", name, new_name);

        self.queries.recreate_database(&new_name).await?;
        self.cli.clone_into(name, &new_name).await?;

        info!("Database {} cloned into {}", name, new_name);
        Ok(new_name)
    }

    /// SQL dump of `name`, produced while it is read
    pub fn export_database(&self, name: &str) -> Result<ChildStdout, PanelError> {
        validate_database_name(name)?;
        info!("Exporting database {}", name);
        self.cli.export(name)
    }

    /// Replace `name` with the dump uploaded to `upload`. Temporary files
    /// are removed whether or not the import succeeds.
    pub async fn upload_database(
        &self,
        name: &str,
        upload: &Path,
        file_name: &str,
        work_dir: &Dir,
    ) -> Result<(), PanelError> {
        validate_database_name(name)?;
        let result = self.import_upload(name, upload, file_name, work_dir).await;

        if let Err(e) = work_dir.delete().await {
            warn!("Unable to remove {}: {}", work_dir.path().display(), e);
        }
        if let Err(e) = &result {
            error!("Upload of database {} failed: {}", name, e);
        }
        result
    }

    async fn import_upload(
        &self,
        name: &str,
        upload: &Path,
        file_name: &str,
        work_dir: &Dir,
    ) -> Result<(), PanelError> {
        let kind = UploadKind::from_file_name(file_name);
        info!("Importing {} ({:?}) into database {}", file_name, kind, name);

        let (prepared, stripped) = prepare_dump(upload, kind, work_dir.path()).await?;
        if stripped > 0 {
            info!("Removed {} database statements from the dump", stripped);
        }

        self.queries.recreate_database(name).await?;
        self.cli.import_file(name, &prepared).await?;
        self.queries.reset_passwords(name, TEST_USER_PASSWORD).await?;

        info!("Database {} imported", name);
        Ok(())
    }
}
