//! Host disk usage

use std::path::Path;

use panel_api::DiskUsage;
use sysinfo::Disks;

use crate::errors::PanelError;

/// Usage of the disk that holds `path`: the disk with the longest mount
/// point that is a prefix of `path`
pub fn disk_usage(path: &str) -> Result<DiskUsage, PanelError> {
    let disks = Disks::new_with_refreshed_list();
    let target = Path::new(path);

    let disk = disks
        .iter()
        .filter(|disk| target.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .ok_or_else(|| PanelError::NotFound(format!("No disk is mounted at {}", path)))?;

    Ok(DiskUsage {
        disk_path: path.to_string(),
        free: disk.available_space(),
        size: disk.total_space(),
    })
}
