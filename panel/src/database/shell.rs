//! `mysql` and `mysqldump` child processes

use std::path::Path;
use std::process::Stdio;

use secrecy::ExposeSecret;
use tokio::process::{ChildStdout, Command};
use tracing::{debug, error, warn};

use crate::errors::PanelError;
use crate::storage::settings::MysqlSettings;

/// Runs the MySQL command line clients against the configured server.
/// The password is handed over through `MYSQL_PWD`.
#[derive(Debug, Clone)]
pub struct MysqlCli {
    settings: MysqlSettings,
}

impl MysqlCli {
    pub fn new(settings: MysqlSettings) -> Self {
        Self { settings }
    }

    fn command(&self, program: &str) -> Command {
        let mut command = Command::new(program);
        command
            .arg(format!("--host={}", self.settings.host))
            .arg(format!("--port={}", self.settings.port))
            .arg(format!("--user={}", self.settings.username))
            .kill_on_drop(true);
        if let Some(password) = &self.settings.password {
            command.env("MYSQL_PWD", password.expose_secret());
        }
        command
    }

    /// Dump for download: `--databases` keeps the `USE` line so the file
    /// names its source.
    fn export_command(&self, database: &str) -> Command {
        let mut command = self.command("mysqldump");
        command.args(["--databases", database, "--no-create-db"]);
        command
    }

    /// Dump for piping into another database. The database is passed
    /// positionally so no `USE` line redirects the import back to `database`.
    fn clone_source_command(&self, database: &str) -> Command {
        let mut command = self.command("mysqldump");
        command.arg(database);
        command
    }

    /// Copy the contents of `source` into the existing database `target`
    pub async fn clone_into(&self, source: &str, target: &str) -> Result<(), PanelError> {
        debug!("Piping mysqldump {} into mysql {}", source, target);

        let mut dump = self
            .clone_source_command(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let dump_stdout: Stdio = dump
            .stdout
            .take()
            .ok_or_else(|| PanelError::CommandError("mysqldump has no stdout".to_string()))?
            .try_into()?;

        let import = self
            .command("mysql")
            .arg(target)
            .stdin(dump_stdout)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let (dump_output, import_output) =
            tokio::try_join!(dump.wait_with_output(), import.wait_with_output())?;

        if !dump_output.status.success() {
            return Err(command_error("mysqldump", &dump_output.stderr));
        }
        if !import_output.status.success() {
            return Err(command_error("mysql", &import_output.stderr));
        }
        Ok(())
    }

    /// Start dumping `database`; the SQL is read from the returned stdout
    pub fn export(&self, database: &str) -> Result<ChildStdout, PanelError> {
        let mut child = self
            .export_command(database)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PanelError::CommandError("mysqldump has no stdout".to_string()))?;

        let database = database.to_string();
        tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(output) if output.status.success() => {
                    debug!("Export of {} finished", database);
                }
                Ok(output) => {
                    error!(
                        "Export of {} failed: {}",
                        database,
                        String::from_utf8_lossy(&output.stderr).trim()
                    );
                }
                Err(e) => warn!("Unable to wait for mysqldump: {}", e),
            }
        });

        Ok(stdout)
    }

    /// Execute the SQL file at `path` in `database`
    pub async fn import_file(&self, database: &str, path: &Path) -> Result<(), PanelError> {
        debug!("Importing {} into {}", path.display(), database);
        let input = tokio::fs::File::open(path).await?.into_std().await;

        let output = self
            .command("mysql")
            .arg(format!("--database={}", database))
            .stdin(Stdio::from(input))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(command_error("mysql", &output.stderr));
        }
        Ok(())
    }
}

/// Run a command to completion and return its stdout
pub async fn run(program: &str, args: &[&str]) -> Result<String, PanelError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(command_error(program, &output.stderr));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command and write its stdout to `destination`
pub async fn run_to_file(program: &str, args: &[&str], destination: &Path) -> Result<(), PanelError> {
    let file = tokio::fs::File::create(destination).await?.into_std().await;
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(file))
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(command_error(program, &output.stderr));
    }
    Ok(())
}

fn command_error(program: &str, stderr: &[u8]) -> PanelError {
    let message = String::from_utf8_lossy(stderr).trim().to_string();
    error!("{} failed: {}", program, message);
    PanelError::CommandError(format!("{}: {}", program, message))
}
