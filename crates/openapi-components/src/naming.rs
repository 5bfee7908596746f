//! Component name resolution.
//!
//! Names are derived from an explicit override, the `operationId`, or the method and path, then
//! slugified to `[a-z0-9_]`, capped at [`MAX_NAME_LEN`] and made unique against the names
//! already taken in the current build pass.

use crate::routes::Route;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

pub const MAX_NAME_LEN: usize = 56;

/// Separator after which an `operationId` carries disambiguation noise (`listPets__v2`).
const OPERATION_ID_DELIMITER: &str = "__";

static NON_SLUG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^a-z0-9_]+").ok());

/// Lowercase, collapse every run of characters outside `[a-z0-9_]` into one `_`, and trim
/// leading and trailing underscores.
#[must_use]
pub fn slugify(input: &str) -> String {
    let lower = input.to_lowercase();
    let replaced = match NON_SLUG_RE.as_ref() {
        Some(re) => re.replace_all(&lower, "_").into_owned(),
        None => lower
            .chars()
            .map(|c| {
                if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect(),
    };
    replaced.trim_matches('_').to_string()
}

/// Slugs are ASCII, so byte truncation is character truncation.
fn truncate(name: &str, max: usize) -> &str {
    if name.len() > max { &name[..max] } else { name }
}

/// Lowercased method followed by the path segments, placeholder braces stripped.
fn synthesized_base(route: &Route) -> String {
    let mut parts = vec![route.method.as_str().to_lowercase()];
    parts.extend(
        route
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_start_matches('{').trim_end_matches('}').to_string()),
    );
    parts.join("_")
}

/// The slugified, capped name a route would get before collision handling.
///
/// `overrides` is keyed by `operationId`.
#[must_use]
pub fn base_name(route: &Route, overrides: &HashMap<String, String>) -> String {
    let raw = match route.operation_id.as_deref() {
        Some(id) => match overrides.get(id) {
            Some(explicit) => explicit.clone(),
            None => id
                .split_once(OPERATION_ID_DELIMITER)
                .map_or(id, |(head, _)| head)
                .to_string(),
        },
        None => synthesized_base(route),
    };

    let mut slug = slugify(&raw);
    if slug.is_empty() {
        slug = slugify(&synthesized_base(route));
    }
    if slug.is_empty() {
        slug = "operation".to_string();
    }
    truncate(&slug, MAX_NAME_LEN).trim_end_matches('_').to_string()
}

/// Reserve a unique name derived from `base`: `base`, then `base_2`, `base_3`, …
///
/// The base is shortened as needed so the suffixed name stays within [`MAX_NAME_LEN`].
pub fn reserve_unique_name(taken: &mut HashSet<String>, base: &str) -> String {
    let base = truncate(base, MAX_NAME_LEN);
    if taken.insert(base.to_string()) {
        return base.to_string();
    }

    let mut counter: u64 = 2;
    loop {
        let suffix = format!("_{counter}");
        let head = truncate(base, MAX_NAME_LEN.saturating_sub(suffix.len()));
        let candidate = format!("{head}{suffix}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Resolve the final name for `route` and record it in `taken`.
pub fn resolve_name(
    route: &Route,
    overrides: &HashMap<String, String>,
    taken: &mut HashSet<String>,
) -> String {
    reserve_unique_name(taken, &base_name(route, overrides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::HttpMethod;

    fn no_overrides() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn slugify_normalizes_runs_and_trims() {
        assert_eq!(slugify("List Pets!"), "list_pets");
        assert_eq!(slugify("--get/users/{id}--"), "get_users_id");
        assert_eq!(slugify("already_snake"), "already_snake");
        assert_eq!(slugify("Ünïcode-Näme"), "n_code_n_me");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn operation_id_is_cut_at_double_underscore() {
        let route = Route::new(HttpMethod::Get, "/pets").with_operation_id("listPets__v2__beta");
        assert_eq!(base_name(&route, &no_overrides()), "listpets");
    }

    #[test]
    fn explicit_override_wins_over_operation_id() {
        let route = Route::new(HttpMethod::Get, "/pets").with_operation_id("listPets__v2");
        let overrides = HashMap::from([("listPets__v2".to_string(), "All Pets".to_string())]);
        assert_eq!(base_name(&route, &overrides), "all_pets");
    }

    #[test]
    fn synthesizes_from_method_and_path() {
        let route = Route::new(HttpMethod::Delete, "/users/{user_id}/sessions");
        assert_eq!(
            base_name(&route, &no_overrides()),
            "delete_users_user_id_sessions"
        );
    }

    #[test]
    fn synthesized_names_have_no_doubled_separators() {
        for (method, path, expected) in [
            (HttpMethod::Get, "/", "get"),
            (HttpMethod::Get, "/status", "get_status"),
            (HttpMethod::Put, "//a//{b}/", "put_a_b"),
            (HttpMethod::Patch, "/v1/items/{item-id}", "patch_v1_items_item_id"),
        ] {
            let route = Route::new(method, path);
            let name = base_name(&route, &no_overrides());
            assert_eq!(name, expected);
            assert!(!name.contains("__"), "{name}");
        }
    }

    #[test]
    fn unusable_operation_id_falls_back_to_method_and_path() {
        let route = Route::new(HttpMethod::Get, "/status").with_operation_id("***");
        assert_eq!(base_name(&route, &no_overrides()), "get_status");
    }

    #[test]
    fn colliding_names_are_numbered_without_gaps() {
        let mut taken = HashSet::new();
        let names: Vec<String> = (0..5)
            .map(|_| {
                let route = Route::new(HttpMethod::Get, "/x").with_operation_id("foo");
                resolve_name(&route, &no_overrides(), &mut taken)
            })
            .collect();
        assert_eq!(names, vec!["foo", "foo_2", "foo_3", "foo_4", "foo_5"]);
        assert_eq!(taken.len(), 5);
    }

    #[test]
    fn names_never_exceed_the_cap() {
        let long_id = "a".repeat(200);
        let mut taken = HashSet::new();
        for _ in 0..12 {
            let route = Route::new(HttpMethod::Post, "/x").with_operation_id(long_id.clone());
            let name = resolve_name(&route, &no_overrides(), &mut taken);
            assert!(name.len() <= MAX_NAME_LEN, "{name} is {} chars", name.len());
        }
        assert!(taken.contains(&format!("{}_10", "a".repeat(MAX_NAME_LEN - 3))));

        let long_path = format!("/{}", "segment/".repeat(30));
        let route = Route::new(HttpMethod::Get, long_path);
        assert!(base_name(&route, &no_overrides()).len() <= MAX_NAME_LEN);
    }

    #[test]
    fn resolution_is_deterministic() {
        let routes: Vec<Route> = ["a", "b", "a", "c", "a"]
            .iter()
            .map(|id| Route::new(HttpMethod::Get, "/").with_operation_id(*id))
            .collect();
        let run = || {
            let mut taken = HashSet::new();
            routes
                .iter()
                .map(|r| resolve_name(r, &no_overrides(), &mut taken))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
        assert_eq!(run(), vec!["a", "b", "a_2", "c", "a_3"]);
    }
}
