//! Version comparison: exact string inequality against `current_version`.
//! Manifests may use arbitrary tag names, so no semver crate is pulled in
//! here.

pub fn is_newer(tag_name: &str, current_version: &str) -> bool {
    tag_name != current_version
}
