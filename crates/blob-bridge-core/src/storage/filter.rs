//! Prefix decomposition shared by the native listing paths.

/// Split an enumeration prefix into the directory to list natively and the
/// residual name prefix inside that directory.
///
/// `""` and `"/"` list from the top. `"a/b/c"` lists `a/b` and keeps `c` as
/// the residual. `"a/b/"` lists `a/b` with no residual.
pub fn split_prefix(prefix: &str) -> (&str, &str) {
    let prefix = prefix.trim_start_matches('/');
    match prefix.rfind('/') {
        Some(idx) => (&prefix[..idx], &prefix[idx + 1..]),
        None => ("", prefix),
    }
}

/// Directory a native listing may be narrowed to without losing matches.
///
/// Filter prefixes are lower-cased, so a base holding cased characters may
/// not name the directory that stores the matching keys. Such prefixes list
/// from the top and leave the work to the post-filter.
pub fn native_base(prefix: &str) -> &str {
    let (base, _) = split_prefix(prefix);
    if base.chars().any(|c| c.is_lowercase() || c.is_uppercase()) {
        ""
    } else {
        base
    }
}

/// Join a base key and a child name with a single separator.
pub fn join_key(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}
