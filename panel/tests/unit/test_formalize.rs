//! Formalization unit tests

use testpanel::deploy::formalize::{formalize_state, limit_auto_deployments};
use testpanel::deploy::names::{generate_hostname, get_unique_name};

use crate::support::deployment;

const NOW: i64 = 1_700_000_000_000;

#[test]
fn test_hostname_is_canonicalized() {
    let hostname = generate_hostname(&deployment("feature/Forms_1", "Sp7Demo", "6.8.03"));
    assert_eq!(hostname, "sp7demo-featureforms1");

    let hostname = generate_hostname(&deployment("---", "123", "6.8.03"));
    assert_eq!(hostname, "database-branch");
}

#[test]
fn test_unique_name_increments_largest_suffix() {
    assert_eq!(get_unique_name("db-main", &["db-other"]), "db-main");
    assert_eq!(get_unique_name("db-main", &["db-main"]), "db-main-1");
    assert_eq!(
        get_unique_name("db-main", &["db-main", "db-main-1", "db-main-4"]),
        "db-main-5"
    );
}

#[test]
fn test_formalize_assigns_unique_hostnames() {
    let state = vec![
        deployment("main", "db", "6.8.03"),
        deployment("main", "db", "6.8.01"),
        deployment("main", "db", "6.8.03"),
    ];

    let formalized = formalize_state(state, None, 6, NOW);

    let hostnames: Vec<&str> = formalized.iter().map(|d| d.hostname.as_str()).collect();
    assert_eq!(hostnames, vec!["db-main", "db-main-1", "db-main-2"]);
}

#[test]
fn test_formalize_unique_hostnames_with_saturated_suffix() {
    let branch = "x-18446744073709551615";
    let state = vec![
        deployment(branch, "db", "6.8.03"),
        deployment(branch, "db", "6.8.03"),
        deployment(branch, "db", "6.8.03"),
    ];

    let formalized = formalize_state(state, None, 6, NOW);

    let hostnames: Vec<&str> = formalized.iter().map(|d| d.hostname.as_str()).collect();
    assert_eq!(
        hostnames,
        vec!["db-x-18446744073709551615", "db-x-1", "db-x-2"]
    );
}

#[test]
fn test_formalize_fills_timestamps() {
    let mut existing = deployment("main", "db", "6.8.03");
    existing.deployed_at = Some(100);
    existing.accessed_at = Some(200);

    let formalized = formalize_state(
        vec![existing, deployment("develop", "db", "6.8.03")],
        None,
        6,
        NOW,
    );

    assert_eq!(formalized[0].deployed_at, 100);
    assert_eq!(formalized[0].accessed_at, 200);
    assert_eq!(formalized[1].deployed_at, NOW);
    assert_eq!(formalized[1].accessed_at, NOW);
}

#[test]
fn test_formalize_resets_deployed_at_when_target_changes() {
    let mut unchanged = deployment("main", "db", "6.8.03");
    unchanged.deployed_at = Some(100);
    let mut changed = deployment("develop", "other_db", "6.8.03");
    changed.deployed_at = Some(100);

    let previous = vec![
        deployment("main", "db", "6.8.03"),
        deployment("develop", "db", "6.8.03"),
    ];
    let formalized = formalize_state(vec![unchanged, changed], Some(&previous), 6, NOW);

    assert_eq!(formalized[0].deployed_at, 100);
    assert_eq!(formalized[1].deployed_at, NOW);
}

#[test]
fn test_limit_keeps_manual_deployments_first() {
    let mut auto_a = deployment("a", "db", "6.8.03");
    auto_a.was_auto_deployed = true;
    let mut auto_b = deployment("b", "db", "6.8.03");
    auto_b.was_auto_deployed = true;
    let manual = deployment("manual", "db", "6.8.03");

    let limited = limit_auto_deployments(vec![auto_a, manual, auto_b], 1);

    let branches: Vec<&str> = limited.iter().map(|d| d.branch.as_str()).collect();
    assert_eq!(branches, vec!["manual", "a"]);
}

#[test]
fn test_formalize_applies_limit() {
    let state: Vec<_> = (0..4)
        .map(|i| {
            let mut d = deployment(&format!("pr-{}", i), "db", "6.8.03");
            d.was_auto_deployed = true;
            d
        })
        .collect();

    let formalized = formalize_state(state, None, 2, NOW);
    assert_eq!(formalized.len(), 2);
    assert_eq!(formalized[0].hostname, "db-pr-0");
}
