//! Formalization: fill in derived fields and resolve hostname collisions

use crate::deploy::names::{generate_hostname, get_unique_name};
use crate::models::deployment::{ActiveDeployment, Deployment};

/// Manual deployments first, then at most `max_auto_deployments`
/// auto-deployed ones. Relative order within each group is preserved.
pub fn limit_auto_deployments(
    deployments: Vec<Deployment>,
    max_auto_deployments: usize,
) -> Vec<Deployment> {
    let (automatic, manual): (Vec<_>, Vec<_>) = deployments
        .into_iter()
        .partition(|deployment| deployment.was_auto_deployed);

    manual
        .into_iter()
        .chain(automatic.into_iter().take(max_auto_deployments))
        .collect()
}

/// Add missing details for newly added deployments and update `deployed_at`
/// for existing deployments that were changed.
///
/// Entries are compared with `previous` by position: `deployed_at` is reset
/// to `now` when the branch, database or schema version differs from the
/// previous entry at the same index. Hostnames are recomputed and made unique
/// in list order.
pub fn formalize_state(
    state: Vec<Deployment>,
    previous: Option<&[Deployment]>,
    max_auto_deployments: usize,
    now: i64,
) -> Vec<ActiveDeployment> {
    let limited = limit_auto_deployments(state, max_auto_deployments);
    let mut formalized: Vec<ActiveDeployment> = Vec::with_capacity(limited.len());

    for (index, deployment) in limited.into_iter().enumerate() {
        let changed = previous
            .and_then(|previous| previous.get(index))
            .is_some_and(|previous| !deployment.same_target(previous));
        let deployed_at = if changed {
            now
        } else {
            deployment.deployed_at.unwrap_or(now)
        };

        let used: Vec<&str> = formalized
            .iter()
            .map(|active| active.hostname.as_str())
            .collect();
        let hostname = get_unique_name(&generate_hostname(&deployment), &used);

        formalized.push(ActiveDeployment {
            hostname,
            deployed_at,
            accessed_at: deployment.accessed_at.unwrap_or(now),
            branch: deployment.branch,
            database: deployment.database,
            schema_version: deployment.schema_version,
            was_auto_deployed: deployment.was_auto_deployed,
            notes: deployment.notes,
            group: deployment.group,
            digest: deployment.digest,
        });
    }

    formalized
}
