//! Locating and preparing SQL dumps from uploaded files

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

use crate::database::shell::{run, run_to_file};
use crate::errors::PanelError;

/// How an uploaded file is packaged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Tar,
    Zip,
    Plain,
}

impl UploadKind {
    /// Decide from the uploaded file name: any `tar`/`tgz` extension means a
    /// tarball, a final `zip` extension a zip archive.
    pub fn from_file_name(file_name: &str) -> Self {
        let extensions: Vec<&str> = file_name.split('.').skip(1).collect();
        if extensions.iter().any(|ext| *ext == "tar" || *ext == "tgz") {
            UploadKind::Tar
        } else if extensions.last() == Some(&"zip") {
            UploadKind::Zip
        } else {
            UploadKind::Plain
        }
    }
}

/// Member paths from the output of `unzip -l`
pub fn parse_zip_listing(listing: &str) -> Vec<String> {
    let lines: Vec<&str> = listing.trim().lines().collect();
    if lines.len() < 5 {
        return Vec::new();
    }
    lines[3..lines.len() - 2]
        .iter()
        .filter_map(|line| line.split("   ").last())
        .map(|name| name.trim().to_string())
        .collect()
}

/// Member paths from the output of `tar t`
pub fn parse_tar_listing(listing: &str) -> Vec<String> {
    listing
        .trim()
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// First member that looks like a SQL dump
pub fn find_sql_member(members: &[String]) -> Option<&String> {
    members.iter().find(|member| member.ends_with(".sql"))
}

/// Extract the SQL dump from `archive` into `work_dir` and return its path.
/// Plain uploads are returned as they are.
pub async fn extract_sql_dump(
    archive: &Path,
    kind: UploadKind,
    work_dir: &Path,
) -> Result<PathBuf, PanelError> {
    let archive_path = archive.to_string_lossy();

    let members = match kind {
        UploadKind::Plain => return Ok(archive.to_path_buf()),
        UploadKind::Tar => parse_tar_listing(&run("tar", &["t", "-f", &archive_path]).await?),
        UploadKind::Zip => parse_zip_listing(&run("unzip", &["-l", &archive_path]).await?),
    };
    let member = find_sql_member(&members).ok_or_else(|| {
        PanelError::ValidationError("Unable to find a database dump in the archive".to_string())
    })?;
    debug!("Found database dump {} in {}", member, archive_path);

    match kind {
        UploadKind::Tar => {
            let depth = member.split('/').count() - 1;
            let work_dir_path = work_dir.to_string_lossy();
            run(
                "tar",
                &[
                    "xf",
                    &archive_path,
                    &format!("--strip-components={}", depth),
                    "-C",
                    &work_dir_path,
                    member,
                ],
            )
            .await?;
            let file_name = Path::new(member)
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("database.sql"));
            Ok(work_dir.join(file_name))
        }
        _ => {
            let destination = work_dir.join("database.sql");
            run_to_file("unzip", &["-p", &archive_path, member], &destination).await?;
            Ok(destination)
        }
    }
}

/// Extract the dump of `upload` into `work_dir/extracted` and write the
/// stripped copy to `work_dir/prepared.sql`, whatever the archive members
/// are called. Returns the prepared file and the number of stripped lines.
pub async fn prepare_dump(
    upload: &Path,
    kind: UploadKind,
    work_dir: &Path,
) -> Result<(PathBuf, u64), PanelError> {
    let extract_dir = work_dir.join("extracted");
    fs::create_dir_all(&extract_dir).await?;
    let dump = extract_sql_dump(upload, kind, &extract_dir).await?;

    let prepared = work_dir.join("prepared.sql");
    let stripped = strip_database_statements(&dump, &prepared).await?;
    Ok((prepared, stripped))
}

/// Lines that would create or switch to a database other than the target
fn is_database_statement(line: &[u8]) -> bool {
    line.starts_with(b"CREATE DATABASE") || line.starts_with(b"USE ")
}

/// Copy `source` to `destination`, blanking `CREATE DATABASE` and `USE`
/// lines so the dump imports into whichever database it is loaded into.
pub async fn strip_database_statements(
    source: &Path,
    destination: &Path,
) -> Result<u64, PanelError> {
    if source == destination {
        return Err(PanelError::Internal(format!(
            "Refusing to strip {} onto itself",
            source.display()
        )));
    }
    let mut reader = BufReader::new(fs::File::open(source).await?);
    let mut writer = BufWriter::new(fs::File::create(destination).await?);
    let mut line = Vec::new();
    let mut stripped = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if is_database_statement(&line) {
            stripped += 1;
            if line.ends_with(b"\n") {
                writer.write_all(b"\n").await?;
            }
        } else {
            writer.write_all(&line).await?;
        }
    }

    writer.flush().await?;
    Ok(stripped)
}
