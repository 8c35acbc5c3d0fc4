//! Environment checks printed by `--diagnostic`

use std::process::Stdio;

use anyhow::Context;
use colored::Colorize;
use tokio::process::Command;

use crate::app::options::AppOptions;
use crate::database::Databases;
use crate::filesys::dir::Dir;

/// Outcome of one check
#[derive(Debug, Clone)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl Check {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed,
            detail: detail.into(),
        }
    }
}

/// Programs the database operations shell out to
const REQUIRED_PROGRAMS: [&str; 4] = ["mysql", "mysqldump", "tar", "unzip"];

async fn check_program(program: &str) -> Check {
    let found = Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false);
    Check::new(
        program,
        found,
        if found { "found in PATH" } else { "not found in PATH" },
    )
}

/// Create `dir` and write a scratch file into it
async fn try_directory(dir: &Dir) -> anyhow::Result<()> {
    dir.create().await.context("unable to create")?;
    let scratch = dir.file(".diagnostic");
    scratch.write_string("ok").await.context("not writable")?;
    scratch.delete().await.context("unable to clean up")?;
    Ok(())
}

async fn check_directory(name: &str, dir: &Dir) -> Check {
    match try_directory(dir).await {
        Ok(()) => Check::new(name, true, dir.path().display().to_string()),
        Err(e) => Check::new(name, false, format!("{}: {:#}", dir.path().display(), e)),
    }
}

async fn check_mysql(options: &AppOptions) -> Check {
    let databases = Databases::new(&options.mysql);
    let target = format!("{}:{}", options.mysql.host, options.mysql.port);
    let result = databases.queries().list_databases().await;
    databases.queries().pool().close().await;
    match result {
        Ok(names) => Check::new("mysql server", true, format!("{} ({} databases)", target, names.len())),
        Err(e) => Check::new("mysql server", false, format!("{}: {}", target, e)),
    }
}

/// Run every check
pub async fn collect_checks(options: &AppOptions) -> Vec<Check> {
    let mut checks = vec![
        check_directory("state directory", &options.layout.state_dir()).await,
        check_directory("nginx directory", &options.layout.nginx_conf_dir()).await,
    ];
    for program in REQUIRED_PROGRAMS {
        checks.push(check_program(program).await);
    }
    checks.push(check_mysql(options).await);
    checks.push(Check::new(
        "github oauth",
        options.github.client_id.is_some() && options.github.client_secret.is_some(),
        "client id and secret",
    ));
    checks.push(Check::new(
        "github personal token",
        options.personal_token().is_some(),
        "used by the webhook and the reconciler",
    ));
    checks
}

/// Print the checks; returns whether all of them passed
pub async fn run_diagnostic(options: &AppOptions) -> bool {
    println!("{}", "Test panel diagnostic".bold());
    let checks = collect_checks(options).await;
    for check in &checks {
        let status = if check.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!("  [{}] {:<24} {}", status, check.name, check.detail.dimmed());
    }
    checks.iter().all(|check| check.passed)
}
