//! SQL queries against the MySQL server hosting the test databases

use std::collections::BTreeMap;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::Row;
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::database::SYSTEM_DATABASES;
use crate::errors::PanelError;
use crate::storage::settings::MysqlSettings;

/// Connection pool for the administrative queries. Database names are
/// interpolated into statements and must be validated by the caller.
#[derive(Debug, Clone)]
pub struct DatabaseQueries {
    pool: MySqlPool,
}

impl DatabaseQueries {
    /// Create a pool that connects on first use
    pub fn connect_lazy(settings: &MysqlSettings) -> Self {
        let mut options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.username);
        if let Some(password) = &settings.password {
            options = options.password(password.expose_secret());
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(options);

        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// User databases, excluding the server's own schemas
    pub async fn list_databases(&self) -> Result<Vec<String>, PanelError> {
        let databases: Vec<String> = sqlx::query_scalar("SHOW DATABASES")
            .fetch_all(&self.pool)
            .await?;

        Ok(databases
            .into_iter()
            .filter(|name| !SYSTEM_DATABASES.contains(&name.as_str()))
            .collect())
    }

    /// Specify 6 schema version of a database. Databases without a readable
    /// `spversion` table have none.
    pub async fn schema_version(&self, database: &str) -> Option<String> {
        let query = format!("SELECT AppVersion FROM `{}`.spversion LIMIT 1", database);
        match sqlx::query_scalar::<_, Option<String>>(&query)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(version) => version.flatten(),
            Err(e) => {
                debug!("No schema version for {}: {}", database, e);
                None
            }
        }
    }

    /// Every user database with its schema version
    pub async fn get_databases(&self) -> Result<BTreeMap<String, Option<String>>, PanelError> {
        let mut databases = BTreeMap::new();
        for name in self.list_databases().await? {
            let version = self.schema_version(&name).await;
            databases.insert(name, version);
        }
        Ok(databases)
    }

    /// Size of every user database in megabytes, rounded to one decimal
    pub async fn get_database_sizes(&self) -> Result<BTreeMap<String, f64>, PanelError> {
        let rows = sqlx::query(
            "SELECT CAST(table_schema AS CHAR) AS name, \
                    CAST(SUM(data_length + index_length) AS UNSIGNED) AS size \
             FROM information_schema.tables \
             GROUP BY table_schema",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut sizes = BTreeMap::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            if SYSTEM_DATABASES.contains(&name.as_str()) {
                continue;
            }
            let bytes: Option<u64> = row.try_get("size")?;
            sizes.insert(name, bytes_to_megabytes(bytes.unwrap_or(0)));
        }
        Ok(sizes)
    }

    /// Specify users of a database, by id
    pub async fn get_users(&self, database: &str) -> Result<BTreeMap<i64, String>, PanelError> {
        let query = format!("SELECT SpecifyUserID, Name FROM `{}`.specifyuser", database);
        let users: Vec<(i64, String)> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        Ok(users.into_iter().collect())
    }

    pub async fn drop_database(&self, database: &str) -> Result<(), PanelError> {
        info!("Dropping database {}", database);
        sqlx::raw_sql(&format!("DROP DATABASE `{}`", database))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drop `database` if present and create it empty
    pub async fn recreate_database(&self, database: &str) -> Result<(), PanelError> {
        sqlx::raw_sql(&format!("DROP DATABASE IF EXISTS `{}`", database))
            .execute(&self.pool)
            .await?;
        sqlx::raw_sql(&format!("CREATE DATABASE `{}`", database))
            .execute(&self.pool)
            .await?;
        debug!("Created empty database {}", database);
        Ok(())
    }

    /// Grant a user every permission in every collection
    pub async fn make_admin(&self, database: &str, user_id: i64) -> Result<(), PanelError> {
        let query = format!(
            "INSERT INTO `{}`.spuserpolicy (resource, action, collection_id, specifyuser_id) \
             VALUES ('%', '%', NULL, ?)",
            database
        );
        sqlx::query(&query).bind(user_id).execute(&self.pool).await?;
        info!("Granted admin rights to user {} in {}", user_id, database);
        Ok(())
    }

    /// Set the password hash of every user
    pub async fn reset_passwords(&self, database: &str, password: &str) -> Result<(), PanelError> {
        let query = format!("UPDATE `{}`.specifyuser SET Password = ?", database);
        let result = sqlx::query(&query).bind(password).execute(&self.pool).await?;
        debug!("Reset {} passwords in {}", result.rows_affected(), database);
        Ok(())
    }
}

pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    let megabytes = bytes as f64 / 1024.0 / 1024.0;
    (megabytes * 10.0).round() / 10.0
}
