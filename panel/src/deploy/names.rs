//! Hostname derivation and name collision handling

use std::sync::LazyLock;

use regex::Regex;

use crate::models::deployment::Deployment;

/// Leading non-letters, trailing non-alphanumerics, and anything that is not
/// a lowercase letter, digit or dash.
static INVALID_HOSTNAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^a-z]+|[^0-9a-z]+$|[^0-9a-z\-]+").expect("hostname pattern is valid")
});

/// Reduce a string to something usable as a DNS label fragment
pub fn canonicalize_token(value: &str) -> String {
    INVALID_HOSTNAME_CHARS
        .replace_all(&value.to_lowercase(), "")
        .into_owned()
}

/// `<database>-<branch>`, with placeholders for parts that canonicalize to
/// nothing. Not yet unique.
pub fn generate_hostname(deployment: &Deployment) -> String {
    let database = canonicalize_token(&deployment.database);
    let branch = canonicalize_token(&deployment.branch);
    format!(
        "{}-{}",
        if database.is_empty() { "database" } else { &database },
        if branch.is_empty() { "branch" } else { &branch },
    )
}

/// Split `name-N` into `("name", Some(N))`
fn split_suffix(name: &str) -> (&str, Option<u64>) {
    match name.rsplit_once('-') {
        Some((stem, suffix))
            if !stem.is_empty()
                && !suffix.is_empty()
                && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            match suffix.parse() {
                Ok(number) => (stem, Some(number)),
                Err(_) => (name, None),
            }
        }
        _ => (name, None),
    }
}

/// Return `name` if unused, otherwise `<stem>-<max + 1>` where `stem` is
/// `name` without a numeric suffix and `max` is the largest suffix among
/// used names sharing that stem (a bare stem counts as 0). When that
/// suffix cannot be incremented, the lowest free suffix is used instead.
pub fn get_unique_name<S: AsRef<str>>(name: &str, used_names: &[S]) -> String {
    if !used_names.iter().any(|used| used.as_ref() == name) {
        return name.to_string();
    }

    let (stem, _) = split_suffix(name);
    let max = used_names
        .iter()
        .filter_map(|used| {
            let used = used.as_ref();
            if used == stem {
                return Some(0);
            }
            match split_suffix(used) {
                (used_stem, Some(number)) if used_stem == stem => Some(number),
                _ => None,
            }
        })
        .max()
        .unwrap_or(0);

    let mut next = max.checked_add(1).unwrap_or(1);
    loop {
        let candidate = format!("{}-{}", stem, next);
        if !used_names.iter().any(|used| used.as_ref() == candidate) {
            return candidate;
        }
        next = next.checked_add(1).unwrap_or(1);
    }
}

/// Most frequent value; the earliest one wins ties
pub fn most_common<T: PartialEq + Clone>(values: &[T]) -> Option<T> {
    let mut best: Option<(usize, &T)> = None;
    for value in values {
        let count = values.iter().filter(|other| *other == value).count();
        if best.is_none_or(|(best_count, _)| count > best_count) {
            best = Some((count, value));
        }
    }
    best.map(|(_, value)| value.clone())
}
